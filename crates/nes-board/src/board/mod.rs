//! The per-cartridge board: regions, dispatch, and the common state chunks.
//!
//! A concrete board is a struct holding a [`BaseBoard`] plus whatever
//! registers and clock units its hardware has. It implements [`BoardLogic`]
//! — a handful of hooks — and receives the rest through a blanket [`Board`]
//! impl: the canonical reset mapping, bus dispatch through the router, PPU
//! routing through the CHR and nametable regions, and the common save-state
//! chunks. Shared behavior is composed this way rather than inherited.
//!
//! The canonical reset map covers four fixed windows: open bus over
//! `0x4018..=0x5FFF`, work RAM over `0x6000..=0x7FFF` when the board backs
//! any, and four 8K PRG windows over `0x8000..=0xFFFF`. A hard reset also
//! applies the descriptor's PRG layout and nametable policy; a soft reset
//! leaves bank state alone. Board registers are installed on top by
//! `reset_board`, replacing whatever canonical handlers they shadow.

pub mod descriptor;
pub mod registry;

mod fme7;
mod mmc3;
mod nrom;
mod uxrom;

use crate::bank::{Banked, WindowSize};
use crate::context::{Context, Mirroring};
use crate::error::Error;
use crate::host::Host;
use crate::router::Router;
use crate::source::Source;
use crate::state::{self, ByteReader, ChunkWriter, Tag};

use descriptor::BoardDescriptor;

pub const TAG_PRG: Tag = Tag::new(*b"PRG\0");
pub const TAG_CHR: Tag = Tag::new(*b"CHR\0");
pub const TAG_NMT: Tag = Tag::new(*b"NMT\0");
pub const TAG_WRK: Tag = Tag::new(*b"WRK\0");

const PRG_MAX: usize = 0x10_0000;
const CHR_MAX: usize = 0x8_0000;
const CIRAM: usize = 0x0800;

/// The regions and dispatch tables every board is built on.
pub struct BaseBoard<B> {
    pub router: Router<B>,
    /// 0x8000..=0xFFFF, four 8K windows.
    pub prg: Banked,
    /// PPU 0x0000..=0x1FFF, eight 1K windows.
    pub chr: Banked,
    /// PPU 0x2000..=0x2FFF, four 1K windows over CIRAM.
    pub nmt: Banked,
    /// 0x6000..=0x7FFF when the board backs work RAM.
    pub wrk: Option<Banked>,
    pub descriptor: &'static BoardDescriptor,
    pub tag: Tag,
    /// Mirroring the image header asked for, kept for reset-time policy.
    pub header: Mirroring,
}

impl<B> BaseBoard<B> {
    /// Build the region set for one cartridge. The board is unusable until
    /// the first `reset(host, true)` installs its memory map.
    #[must_use]
    pub fn new(descriptor: &'static BoardDescriptor, tag: Tag, ctx: Context) -> Self {
        let Context {
            prg,
            chr,
            mirroring,
            battery,
            wrk_hint,
            ..
        } = ctx;

        debug_assert!(!prg.is_empty());
        let declared = prg.len().max(1).next_power_of_two().clamp(0x2000, PRG_MAX);
        let prg = Banked::new(
            0x8000,
            0x8000,
            WindowSize::K8,
            Source::with_data(prg, declared, false),
        );

        let chr_source = match descriptor.chr_ram {
            Some(size) => {
                if !chr.is_empty() {
                    log::warn!(
                        "CHR ROM discarded: the {} board is wired for CHR RAM",
                        descriptor.name
                    );
                }
                Source::ram(size)
            }
            None if chr.is_empty() => {
                log::info!("no CHR ROM in the image, backing an 8K CHR RAM");
                Source::ram(0x2000)
            }
            None => {
                let declared = chr.len().next_power_of_two().clamp(0x2000, CHR_MAX);
                Source::with_data(chr, declared, false)
            }
        };
        let chr = Banked::new(0x0000, 0x2000, WindowSize::K1, chr_source);

        let mut nmt = Banked::new(0x2000, 0x1000, WindowSize::K1, Source::ram(CIRAM));
        if mirroring == Mirroring::FourScreen {
            nmt = nmt.with_secondary(Source::ram(CIRAM));
        }

        let wrk_size = descriptor.wrk.resolve(wrk_hint, battery);
        let wrk = (wrk_size > 0)
            .then(|| Banked::new(0x6000, 0x2000, WindowSize::K8, Source::ram(wrk_size)));

        Self {
            router: Router::new(),
            prg,
            chr,
            nmt,
            wrk,
            descriptor,
            tag,
            header: mirroring,
        }
    }

    /// Whether the cartridge carries its own extra nametable RAM.
    #[must_use]
    pub fn four_screen(&self) -> bool {
        self.nmt.source_count() > 1
    }

    /// Point the four nametable windows per `mirroring`.
    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        let windows: [(u8, u32); 4] = match mirroring {
            Mirroring::Horizontal => [(0, 0), (0, 0), (0, 1), (0, 1)],
            Mirroring::Vertical => [(0, 0), (0, 1), (0, 0), (0, 1)],
            Mirroring::SingleLow => [(0, 0); 4],
            Mirroring::SingleHigh => [(0, 1); 4],
            Mirroring::FourScreen => {
                if self.four_screen() {
                    [(0, 0), (0, 1), (1, 0), (1, 1)]
                } else {
                    log::warn!("four-screen requested without the extra nametable RAM");
                    [(0, 0), (0, 1), (0, 0), (0, 1)]
                }
            }
        };
        for (i, (source, bank)) in windows.into_iter().enumerate() {
            self.nmt
                .swap_window_from(source, WindowSize::K1, 0x2000 + (i as u16) * 0x400, bank);
        }
    }
}

/// What the host machine drives a loaded cartridge through.
pub trait Board {
    /// Re-install the memory map. `hard` additionally restores the
    /// descriptor's power-on banks and nametable policy.
    fn reset(&mut self, host: &mut dyn Host, hard: bool);

    fn cpu_read(&mut self, addr: u16) -> u8;
    fn cpu_write(&mut self, host: &mut dyn Host, addr: u16, value: u8);
    fn ppu_read(&mut self, addr: u16) -> u8;
    fn ppu_write(&mut self, addr: u16, value: u8);

    /// Catch clock units up to the host's master-clock position.
    fn update(&mut self, host: &mut dyn Host);

    /// One qualifying PPU A12 rising edge, stamped with its cycle.
    fn a12(&mut self, host: &mut dyn Host, cycle: u64);

    /// Frame boundary: rebase counters so they stay bounded forever.
    fn vsync(&mut self, host: &mut dyn Host);

    /// Append the full board state to `w` as root-level chunks.
    fn save(&self, w: &mut ChunkWriter);

    /// Restore from a stream written by [`save`](Self::save). The whole
    /// stream is parsed before any live state is touched.
    fn load(&mut self, host: &mut dyn Host, stream: &[u8]) -> Result<(), Error>;

    fn descriptor(&self) -> &'static BoardDescriptor;
    fn tag(&self) -> Tag;
}

/// The hooks a concrete board supplies; everything else is blanket-wired.
pub trait BoardLogic: Sized + 'static {
    fn base(&self) -> &BaseBoard<Self>;
    fn base_mut(&mut self) -> &mut BaseBoard<Self>;

    /// Install board registers and defaults. Runs after the canonical map,
    /// so remapping a canonical window here wins.
    fn reset_board(&mut self, host: &mut dyn Host, hard: bool);

    /// Append the board chunk payload (a nested chunk sequence).
    fn save_board(&self, _w: &mut ChunkWriter) {}

    /// Restore from the board chunk payload. Unknown nested tags are the
    /// board's to skip.
    fn load_board(&mut self, _host: &mut dyn Host, _payload: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    /// See [`Board::update`].
    fn tick(&mut self, _host: &mut dyn Host) {}

    /// See [`Board::a12`].
    fn edge(&mut self, _host: &mut dyn Host, _cycle: u64) {}

    /// See [`Board::vsync`].
    fn frame(&mut self, _host: &mut dyn Host) {}
}

fn read_prg<B: BoardLogic>(board: &mut B, addr: u16) -> u8 {
    board.base().prg.read(addr)
}

fn write_prg<B: BoardLogic>(board: &mut B, _host: &mut dyn Host, addr: u16, value: u8) {
    let base = board.base_mut();
    if base.prg.writable_at(addr) {
        base.prg.write(addr, value);
    } else {
        log::debug!("dropped write to PRG ROM at {addr:#06x}");
    }
}

fn read_wrk<B: BoardLogic>(board: &mut B, addr: u16) -> u8 {
    board
        .base()
        .wrk
        .as_ref()
        .map_or((addr >> 8) as u8, |wrk| wrk.read(addr))
}

fn write_wrk<B: BoardLogic>(board: &mut B, _host: &mut dyn Host, addr: u16, value: u8) {
    if let Some(wrk) = board.base_mut().wrk.as_mut() {
        wrk.write(addr, value);
    }
}

impl<B: BoardLogic> Board for B {
    fn reset(&mut self, host: &mut dyn Host, hard: bool) {
        {
            let base = self.base_mut();
            // Open bus everywhere, then the canonical windows on top.
            base.router.reset();
            if base.wrk.is_some() {
                base.router.map(0x6000, 0x7FFF, read_wrk::<B>, write_wrk::<B>);
            }
            base.router.map(0x8000, 0xFFFF, read_prg::<B>, write_prg::<B>);
            if hard {
                let last = base.prg.last_bank(WindowSize::K8);
                let banks = base.descriptor.prg.banks(last);
                base.prg.swap_banks(WindowSize::K8, 0x8000, &banks);
                let init = if base.header == Mirroring::FourScreen {
                    base.descriptor.nmt_alt
                } else {
                    base.descriptor.nmt
                };
                base.set_mirroring(init.resolve(base.header));
            }
        }
        self.reset_board(host, hard);
    }

    fn cpu_read(&mut self, addr: u16) -> u8 {
        let read = self.base().router.read_handler(addr);
        read(self, addr)
    }

    fn cpu_write(&mut self, host: &mut dyn Host, addr: u16, value: u8) {
        let write = self.base().router.write_handler(addr);
        write(self, host, addr, value);
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        let base = self.base();
        if addr < 0x2000 {
            base.chr.read(addr)
        } else {
            base.nmt.read(addr)
        }
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        let base = self.base_mut();
        if addr < 0x2000 {
            if base.chr.writable_at(addr) {
                base.chr.write(addr, value);
            } else {
                log::debug!("dropped write to CHR ROM at {addr:#06x}");
            }
        } else {
            base.nmt.write(addr, value);
        }
    }

    fn update(&mut self, host: &mut dyn Host) {
        self.tick(host);
    }

    fn a12(&mut self, host: &mut dyn Host, cycle: u64) {
        self.edge(host, cycle);
    }

    fn vsync(&mut self, host: &mut dyn Host) {
        self.frame(host);
    }

    fn save(&self, w: &mut ChunkWriter) {
        let base = self.base();
        save_region(w, TAG_PRG, &base.prg);
        save_region(w, TAG_CHR, &base.chr);
        save_region(w, TAG_NMT, &base.nmt);
        if let Some(wrk) = &base.wrk {
            save_region(w, TAG_WRK, wrk);
        }
        w.begin(base.tag);
        self.save_board(w);
        w.end();
    }

    fn load(&mut self, host: &mut dyn Host, stream: &[u8]) -> Result<(), Error> {
        let root = state::chunks(stream)?;
        let own = self.base().tag;

        // Stage and validate everything before touching live state.
        let mut prg = None;
        let mut chr = None;
        let mut nmt = None;
        let mut wrk = None;
        let mut board = None;
        for chunk in &root {
            match chunk.tag {
                TAG_PRG => prg = Some(parse_region(chunk)?),
                TAG_CHR => chr = Some(parse_region(chunk)?),
                TAG_NMT => nmt = Some(parse_region(chunk)?),
                TAG_WRK => wrk = Some(parse_region(chunk)?),
                tag if tag == own => board = Some(chunk.payload),
                tag => log::warn!("skipping unrecognized `{tag}` chunk"),
            }
        }

        let base = self.base_mut();
        if let Some(region) = &prg {
            region.apply(&mut base.prg);
        }
        if let Some(region) = &chr {
            region.apply(&mut base.chr);
        }
        if let Some(region) = &nmt {
            region.apply(&mut base.nmt);
        }
        match (&wrk, base.wrk.as_mut()) {
            (Some(region), Some(live)) => region.apply(live),
            (Some(_), None) => log::warn!("work RAM chunk for a board backing none"),
            _ => {}
        }
        if let Some(payload) = board {
            self.load_board(host, payload)?;
        }
        Ok(())
    }

    fn descriptor(&self) -> &'static BoardDescriptor {
        self.base().descriptor
    }

    fn tag(&self) -> Tag {
        self.base().tag
    }
}

/// One region chunk: the window table, then each writable source's bytes.
fn save_region(w: &mut ChunkWriter, tag: Tag, region: &Banked) {
    w.begin(tag);
    w.u8(region.window_count() as u8);
    for i in 0..region.window_count() {
        let (source, offset) = region.window(i);
        w.u8(source);
        w.u32(offset);
    }
    let writable: Vec<usize> = (0..region.source_count())
        .filter(|&i| region.source(i).writable())
        .collect();
    w.u8(writable.len() as u8);
    for index in writable {
        w.u8(index as u8);
        w.packed(region.source(index).bytes());
    }
    w.end();
}

/// Stage one region chunk, reporting which chunk was bad on failure.
fn parse_region(chunk: &state::Chunk<'_>) -> Result<RegionState, Error> {
    RegionState::parse(chunk.payload).map_err(|err| match err {
        Error::Truncated(_) => Error::BadChunk(chunk.tag, "payload ends early"),
        other => other,
    })
}

/// A region chunk decoded but not yet committed.
struct RegionState {
    windows: Vec<(u8, u32)>,
    rams: Vec<(u8, Vec<u8>)>,
}

impl RegionState {
    fn parse(payload: &[u8]) -> Result<Self, Error> {
        let mut r = ByteReader::new(payload);
        let count = r.u8()? as usize;
        let mut windows = Vec::with_capacity(count);
        for _ in 0..count {
            let source = r.u8()?;
            let offset = r.u32()?;
            windows.push((source, offset));
        }
        let ram_count = r.u8()? as usize;
        let mut rams = Vec::with_capacity(ram_count);
        for _ in 0..ram_count {
            let index = r.u8()?;
            let data = r.unpacked()?;
            rams.push((index, data));
        }
        Ok(Self { windows, rams })
    }

    fn apply(&self, region: &mut Banked) {
        if self.windows.len() != region.window_count() {
            log::warn!(
                "window table has {} entries, region has {}",
                self.windows.len(),
                region.window_count()
            );
        }
        let count = self.windows.len().min(region.window_count());
        for (i, &(source, offset)) in self.windows.iter().take(count).enumerate() {
            region.set_window(i, source, offset);
        }
        for &(index, ref data) in &self.rams {
            let index = index as usize;
            if index < region.source_count() && region.source(index).writable() {
                region.source_mut(index).fill_from(data);
            }
        }
    }
}

pub use fme7::Fme7;
pub use mmc3::Mmc3;
pub use nrom::Nrom;
pub use uxrom::Uxrom;
