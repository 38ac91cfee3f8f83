//! MMC3 (mapper 4): dynamic 8K/1K banking and the scanline counter IRQ.
//!
//! Registers live in `0x8000..=0xFFFF`, paired by even/odd address:
//!
//! | even     | odd      |
//! |----------|----------|
//! | `0x8000` bank select | `0x8001` bank data |
//! | `0xA000` mirroring   | `0xA001` work RAM control |
//! | `0xC000` IRQ latch   | `0xC001` IRQ reload |
//! | `0xE000` IRQ disable + acknowledge | `0xE001` IRQ enable |
//!
//! Bank select bit 6 flips the PRG arrangement, bit 7 flips which CHR half
//! gets the two 2K windows. The scanline counter is clocked by filtered
//! A12 rising edges, one per visible scanline while rendering.

use crate::bank::WindowSize;
use crate::board::descriptor::BoardDescriptor;
use crate::board::{BaseBoard, Board, BoardLogic};
use crate::clock::{A12, A12Flavor, Signal};
use crate::context::{Context, Mirroring};
use crate::error::Error;
use crate::host::Host;
use crate::state::{self, ByteReader, ChunkWriter, Tag};

const TAG_REG: Tag = Tag::new(*b"REG\0");
const TAG_IRQ: Tag = Tag::new(*b"IRQ\0");

/// The scanline counter proper: latch, down-counter, reload request.
#[derive(Default)]
struct Counter {
    latch: u8,
    counter: u8,
    reload: bool,
    enabled: bool,
}

impl Signal for Counter {
    fn signal(&mut self) -> bool {
        if self.counter == 0 || self.reload {
            self.counter = self.latch;
            self.reload = false;
        } else {
            self.counter -= 1;
        }
        self.counter == 0 && self.enabled
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct Mmc3 {
    base: BaseBoard<Self>,
    command: u8,
    regs: [u8; 8],
    wrk_ctrl: u8,
    irq: A12<Counter>,
}

impl Mmc3 {
    pub(crate) fn boxed(
        descriptor: &'static BoardDescriptor,
        tag: Tag,
        ctx: Context,
    ) -> Box<dyn Board> {
        Box::new(Self {
            base: BaseBoard::new(descriptor, tag, ctx),
            command: 0,
            regs: POWER_ON_REGS,
            wrk_ctrl: 0x80,
            irq: A12::new(Counter::default(), A12Flavor::Direct),
        })
    }

    fn apply_prg(&mut self) {
        let last = self.base.prg.last_bank(WindowSize::K8);
        let second = last.saturating_sub(1);
        let low = u32::from(self.regs[6]);
        let mid = u32::from(self.regs[7]);
        let banks = if self.command & 0x40 == 0 {
            [low, mid, second, last]
        } else {
            [second, mid, low, last]
        };
        self.base.prg.swap_banks(WindowSize::K8, 0x8000, &banks);
    }

    fn apply_chr(&mut self, host: &mut dyn Host) {
        host.ppu_sync();
        let (half_2k, half_1k): (u16, u16) = if self.command & 0x80 == 0 {
            (0x0000, 0x1000)
        } else {
            (0x1000, 0x0000)
        };
        self.base
            .chr
            .swap_window(WindowSize::K2, half_2k, u32::from(self.regs[0] >> 1));
        self.base
            .chr
            .swap_window(WindowSize::K2, half_2k + 0x0800, u32::from(self.regs[1] >> 1));
        for k in 0..4u16 {
            let bank = u32::from(self.regs[2 + k as usize]);
            self.base
                .chr
                .swap_window(WindowSize::K1, half_1k + k * 0x400, bank);
        }
    }
}

const POWER_ON_REGS: [u8; 8] = [0, 2, 4, 5, 6, 7, 0, 1];

fn write_bank(board: &mut Mmc3, host: &mut dyn Host, addr: u16, value: u8) {
    if addr & 1 == 0 {
        board.command = value;
        board.apply_prg();
        board.apply_chr(host);
    } else {
        board.regs[(board.command & 0x07) as usize] = value;
        if board.command & 0x07 <= 5 {
            board.apply_chr(host);
        } else {
            board.apply_prg();
        }
    }
}

fn write_mirror(board: &mut Mmc3, _host: &mut dyn Host, addr: u16, value: u8) {
    if addr & 1 == 0 {
        // Four-screen boards hardwire the register away.
        if !board.base.four_screen() {
            board.base.set_mirroring(if value & 1 == 0 {
                Mirroring::Vertical
            } else {
                Mirroring::Horizontal
            });
        }
    } else {
        board.wrk_ctrl = value;
    }
}

fn read_wrk(board: &mut Mmc3, addr: u16) -> u8 {
    match (&board.base.wrk, board.wrk_ctrl & 0x80 != 0) {
        (Some(wrk), true) => wrk.read(addr),
        _ => (addr >> 8) as u8,
    }
}

fn write_wrk(board: &mut Mmc3, _host: &mut dyn Host, addr: u16, value: u8) {
    if board.wrk_ctrl & 0x80 != 0 && board.wrk_ctrl & 0x40 == 0 {
        if let Some(wrk) = board.base.wrk.as_mut() {
            wrk.write(addr, value);
        }
    }
}

fn write_irq(board: &mut Mmc3, _host: &mut dyn Host, addr: u16, value: u8) {
    let counter = board.irq.policy_mut();
    if addr & 1 == 0 {
        counter.latch = value;
    } else {
        counter.counter = 0;
        counter.reload = true;
    }
}

fn write_irq_enable(board: &mut Mmc3, host: &mut dyn Host, addr: u16, _value: u8) {
    if addr & 1 == 0 {
        board.irq.policy_mut().enabled = false;
        host.clear_irq();
    } else {
        board.irq.policy_mut().enabled = true;
    }
}

impl BoardLogic for Mmc3 {
    fn base(&self) -> &BaseBoard<Self> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseBoard<Self> {
        &mut self.base
    }

    fn reset_board(&mut self, host: &mut dyn Host, hard: bool) {
        if hard {
            self.command = 0;
            self.regs = POWER_ON_REGS;
            self.wrk_ctrl = 0x80;
        }
        self.base.router.map_write(0x8000, 0x9FFF, write_bank);
        self.base.router.map_write(0xA000, 0xBFFF, write_mirror);
        self.base.router.map_write(0xC000, 0xDFFF, write_irq);
        self.base.router.map_write(0xE000, 0xFFFF, write_irq_enable);
        if self.base.wrk.is_some() {
            self.base.router.map(0x6000, 0x7FFF, read_wrk, write_wrk);
        }
        self.irq.reset(host, hard, true);
        if hard {
            self.apply_prg();
            self.apply_chr(host);
        }
    }

    fn edge(&mut self, host: &mut dyn Host, cycle: u64) {
        self.irq.update(host, cycle);
    }

    fn frame(&mut self, host: &mut dyn Host) {
        self.irq.vsync(host);
    }

    fn save_board(&self, w: &mut ChunkWriter) {
        w.begin(TAG_REG);
        w.u8(self.command);
        w.bytes(&self.regs);
        w.u8(self.wrk_ctrl);
        w.end();

        w.begin(TAG_IRQ);
        self.irq.save(w);
        let counter = self.irq.policy();
        w.u8(counter.latch);
        w.u8(counter.counter);
        w.u8(u8::from(counter.reload));
        w.u8(u8::from(counter.enabled));
        w.end();
    }

    fn load_board(&mut self, host: &mut dyn Host, payload: &[u8]) -> Result<(), Error> {
        for chunk in state::chunks(payload)? {
            match chunk.tag {
                TAG_REG => {
                    let mut r = ByteReader::new(chunk.payload);
                    let command = r.u8()?;
                    let mut regs = [0u8; 8];
                    regs.copy_from_slice(r.bytes(8)?);
                    let wrk_ctrl = r.u8()?;
                    self.command = command;
                    self.regs = regs;
                    self.wrk_ctrl = wrk_ctrl;
                }
                TAG_IRQ => {
                    let mut r = ByteReader::new(chunk.payload);
                    self.irq.load(&mut r)?;
                    let counter = Counter {
                        latch: r.u8()?,
                        counter: r.u8()?,
                        reload: r.u8()? != 0,
                        enabled: r.u8()? != 0,
                    };
                    *self.irq.policy_mut() = counter;
                    // Re-assert the host's notification slot.
                    let connected = self.irq.connected();
                    self.irq.connect(host, connected);
                }
                tag => log::warn!("skipping unrecognized `{tag}` board chunk"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::board::Board;
    use crate::board::registry::create;
    use crate::board::tests::ScriptHost;
    use crate::context::Context;

    /// 128K PRG / 64K CHR where every byte names its own bank.
    fn board(host: &mut ScriptHost) -> Box<dyn Board> {
        let prg: Vec<u8> = (0..128 * 1024).map(|i| (i / 0x2000) as u8).collect();
        let chr: Vec<u8> = (0..64 * 1024).map(|i| (i / 0x400) as u8).collect();
        let mut ctx = Context::new(4, prg, chr);
        ctx.battery = true;
        let mut board = create(ctx).expect("create");
        board.reset(host, true);
        board
    }

    fn select(board: &mut dyn Board, host: &mut ScriptHost, reg: u8, bank: u8) {
        board.cpu_write(host, 0x8000, reg);
        board.cpu_write(host, 0x8001, bank);
    }

    #[test]
    fn reset_claims_the_a12_slot() {
        let mut host = ScriptHost::new();
        let _board = board(&mut host);
        assert!(host.a12_connected);
    }

    #[test]
    fn prg_mode_flip_exchanges_the_switch_and_fixed_windows() {
        let mut host = ScriptHost::new();
        let mut board = board(&mut host);
        select(board.as_mut(), &mut host, 6, 9);
        assert_eq!(board.cpu_read(0x8000), 9);
        assert_eq!(board.cpu_read(0xC000), 14);

        // Mode 1: the switchable window moves to 0xC000.
        board.cpu_write(&mut host, 0x8000, 0x46);
        assert_eq!(board.cpu_read(0x8000), 14);
        assert_eq!(board.cpu_read(0xC000), 9);
        assert_eq!(board.cpu_read(0xE000), 15);
    }

    #[test]
    fn chr_registers_follow_the_mode_bit() {
        let mut host = ScriptHost::new();
        let mut board = board(&mut host);
        select(board.as_mut(), &mut host, 0, 21); // 2K register, even bank 20
        select(board.as_mut(), &mut host, 2, 33);
        assert_eq!(board.ppu_read(0x0000), 20);
        assert_eq!(board.ppu_read(0x0400), 21);
        assert_eq!(board.ppu_read(0x1000), 33);

        // Mode 1 swaps the halves.
        board.cpu_write(&mut host, 0x8000, 0x80);
        assert_eq!(board.ppu_read(0x1000), 20);
        assert_eq!(board.ppu_read(0x0000), 33);
    }

    #[test]
    fn scanline_counter_fires_after_the_latched_count() {
        let mut host = ScriptHost::new();
        let mut board = board(&mut host);
        board.cpu_write(&mut host, 0xC000, 2); // latch
        board.cpu_write(&mut host, 0xC001, 0); // reload on next edge
        board.cpu_write(&mut host, 0xE001, 0); // enable

        // Edges spaced past the filter window, one per scanline.
        let step = 1364;
        for line in 1..=3u64 {
            host.now = line * step;
            board.a12(&mut host, line * step);
        }
        // Reload to 2, then 1, then 0: fires on the third edge.
        assert_eq!(host.irqs, vec![3 * step]);
    }

    #[test]
    fn disable_acknowledges_a_pending_interrupt() {
        let mut host = ScriptHost::new();
        let mut board = board(&mut host);
        board.cpu_write(&mut host, 0xC000, 0);
        board.cpu_write(&mut host, 0xC001, 0);
        board.cpu_write(&mut host, 0xE001, 0);
        host.now = 5000;
        board.a12(&mut host, 5000); // latch 0: fires every edge
        assert_eq!(host.irqs.len(), 1);

        board.cpu_write(&mut host, 0xE000, 0);
        assert_eq!(host.cleared, 1);
        host.now = 10000;
        board.a12(&mut host, 10000);
        assert_eq!(host.irqs.len(), 1);
    }

    #[test]
    fn mirroring_register_flips_the_nametables() {
        let mut host = ScriptHost::new();
        let mut board = board(&mut host);
        board.ppu_write(0x2000, 0x11);
        // Vertical out of reset: 0x2800 shares with 0x2000.
        assert_eq!(board.ppu_read(0x2800), 0x11);

        board.cpu_write(&mut host, 0xA000, 1); // horizontal
        board.ppu_write(0x2000, 0x22);
        assert_eq!(board.ppu_read(0x2400), 0x22);
        assert_ne!(board.ppu_read(0x2800), 0x22);
    }

    #[test]
    fn work_ram_control_gates_access() {
        let mut host = ScriptHost::new();
        let mut board = board(&mut host);
        board.cpu_write(&mut host, 0x6000, 0x42);
        assert_eq!(board.cpu_read(0x6000), 0x42);

        // Write protect.
        board.cpu_write(&mut host, 0xA001, 0xC0);
        board.cpu_write(&mut host, 0x6000, 0x55);
        assert_eq!(board.cpu_read(0x6000), 0x42);

        // Disabled entirely: open bus.
        board.cpu_write(&mut host, 0xA001, 0x00);
        assert_eq!(board.cpu_read(0x6000), 0x60);
    }
}
