//! FME-7 and its Sunsoft 5B sibling (mapper 69 and the extension id).
//!
//! A command port at `0x8000..=0x9FFF` selects one of sixteen registers;
//! the parameter port at `0xA000..=0xBFFF` writes the selected one:
//!
//! - `0x0..=0x7` — 1K CHR bank for the matching window
//! - `0x8` — the `0x6000` window: bank number, RAM/ROM select, RAM enable
//! - `0x9..=0xB` — the three switchable 8K PRG windows
//! - `0xC` — mirroring
//! - `0xD` — IRQ control (writes acknowledge a pending IRQ)
//! - `0xE`/`0xF` — IRQ counter low/high
//!
//! The IRQ counter decrements once per CPU cycle and fires on the tick
//! that takes it from zero; it wraps and keeps counting. The audio chip on
//! the 5B is not modeled.

use crate::bank::WindowSize;
use crate::board::descriptor::BoardDescriptor;
use crate::board::{BaseBoard, Board, BoardLogic};
use crate::clock::{M2, Signal};
use crate::context::{Context, Mirroring};
use crate::error::Error;
use crate::host::Host;
use crate::state::{self, ByteReader, ChunkWriter, Tag};

const TAG_REG: Tag = Tag::new(*b"REG\0");
const TAG_IRQ: Tag = Tag::new(*b"IRQ\0");

/// 16-bit down-counter, one tick per CPU cycle.
#[derive(Default)]
struct Counter {
    counter: u16,
    counting: bool,
}

impl Signal for Counter {
    fn signal(&mut self) -> bool {
        if !self.counting {
            return false;
        }
        let expired = self.counter == 0;
        self.counter = self.counter.wrapping_sub(1);
        expired
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct Fme7 {
    base: BaseBoard<Self>,
    command: u8,
    bank_6000: u8,
    map_ram: bool,
    ram_enable: bool,
    irq: M2<Counter>,
}

impl Fme7 {
    pub(crate) fn boxed(
        descriptor: &'static BoardDescriptor,
        tag: Tag,
        ctx: Context,
    ) -> Box<dyn Board> {
        Box::new(Self {
            base: BaseBoard::new(descriptor, tag, ctx),
            command: 0,
            bank_6000: 0,
            map_ram: true,
            ram_enable: false,
            irq: M2::new(Counter::default(), 12),
        })
    }
}

fn write_command(board: &mut Fme7, _host: &mut dyn Host, _addr: u16, value: u8) {
    board.command = value & 0x0F;
}

fn write_param(board: &mut Fme7, host: &mut dyn Host, _addr: u16, value: u8) {
    match board.command {
        0x0..=0x7 => {
            host.ppu_sync();
            board.base.chr.swap_window(
                WindowSize::K1,
                u16::from(board.command) * 0x400,
                u32::from(value),
            );
        }
        0x8 => {
            board.bank_6000 = value & 0x3F;
            board.map_ram = value & 0x40 != 0;
            board.ram_enable = value & 0x80 != 0;
        }
        0x9..=0xB => {
            let window = 0x8000 + (u16::from(board.command) - 0x9) * 0x2000;
            board
                .base
                .prg
                .swap_window(WindowSize::K8, window, u32::from(value & 0x3F));
        }
        0xC => board.base.set_mirroring(match value & 0x03 {
            0 => Mirroring::Vertical,
            1 => Mirroring::Horizontal,
            2 => Mirroring::SingleLow,
            _ => Mirroring::SingleHigh,
        }),
        0xD => {
            // Catch the counter up before the control change takes effect.
            board.irq.update(host);
            host.clear_irq();
            board.irq.connect(value & 0x01 != 0);
            board.irq.policy_mut().counting = value & 0x80 != 0;
        }
        0xE => {
            board.irq.update(host);
            let counter = board.irq.policy_mut();
            counter.counter = (counter.counter & 0xFF00) | u16::from(value);
        }
        0xF => {
            board.irq.update(host);
            let counter = board.irq.policy_mut();
            counter.counter = (counter.counter & 0x00FF) | (u16::from(value) << 8);
        }
        _ => {}
    }
}

fn read_6000(board: &mut Fme7, addr: u16) -> u8 {
    if board.map_ram {
        match (&board.base.wrk, board.ram_enable) {
            (Some(wrk), true) => wrk.read(addr),
            _ => (addr >> 8) as u8,
        }
    } else {
        let offset = usize::from(board.bank_6000) * 0x2000 + usize::from(addr & 0x1FFF);
        board.base.prg.source(0).read(offset)
    }
}

fn write_6000(board: &mut Fme7, _host: &mut dyn Host, addr: u16, value: u8) {
    if board.map_ram && board.ram_enable {
        if let Some(wrk) = board.base.wrk.as_mut() {
            wrk.write(addr, value);
        }
    }
}

impl BoardLogic for Fme7 {
    fn base(&self) -> &BaseBoard<Self> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseBoard<Self> {
        &mut self.base
    }

    fn reset_board(&mut self, host: &mut dyn Host, hard: bool) {
        if hard {
            self.command = 0;
            self.bank_6000 = 0;
            self.map_ram = true;
            self.ram_enable = false;
        }
        self.base.router.map(0x6000, 0x7FFF, read_6000, write_6000);
        self.base.router.map_write(0x8000, 0x9FFF, write_command);
        self.base.router.map_write(0xA000, 0xBFFF, write_param);
        self.irq.set_divider(host.cycles_per(1) as u32);
        let line = !hard && self.irq.connected();
        self.irq.reset(host, hard, line);
    }

    fn tick(&mut self, host: &mut dyn Host) {
        self.irq.update(host);
    }

    fn frame(&mut self, host: &mut dyn Host) {
        self.irq.update(host);
        self.irq.set_divider(host.cycles_per(1) as u32);
        self.irq.vsync(host);
    }

    fn save_board(&self, w: &mut ChunkWriter) {
        w.begin(TAG_REG);
        w.u8(self.command);
        w.u8(self.bank_6000);
        w.u8(u8::from(self.map_ram));
        w.u8(u8::from(self.ram_enable));
        w.end();

        w.begin(TAG_IRQ);
        self.irq.save(w);
        let counter = self.irq.policy();
        w.u16(counter.counter);
        w.u8(u8::from(counter.counting));
        w.end();
    }

    fn load_board(&mut self, _host: &mut dyn Host, payload: &[u8]) -> Result<(), Error> {
        for chunk in state::chunks(payload)? {
            match chunk.tag {
                TAG_REG => {
                    let mut r = ByteReader::new(chunk.payload);
                    let command = r.u8()?;
                    let bank_6000 = r.u8()?;
                    let map_ram = r.u8()? != 0;
                    let ram_enable = r.u8()? != 0;
                    self.command = command;
                    self.bank_6000 = bank_6000;
                    self.map_ram = map_ram;
                    self.ram_enable = ram_enable;
                }
                TAG_IRQ => {
                    let mut r = ByteReader::new(chunk.payload);
                    self.irq.load(&mut r)?;
                    let counter = Counter {
                        counter: r.u16()?,
                        counting: r.u8()? != 0,
                    };
                    *self.irq.policy_mut() = counter;
                }
                tag => log::warn!("skipping unrecognized `{tag}` board chunk"),
            }
        }
        Ok(())
    }
}
