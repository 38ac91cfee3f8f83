//! UxROM (mapper 2): 16K PRG switching through a discrete-logic latch.
//!
//! One write-only register covers all of `0x8000..=0xFFFF` and selects the
//! 16K bank at `0x8000`; the last bank stays fixed at `0xC000`. The latch
//! shares the data bus with ROM during the write, so the stored value is
//! the CPU byte ANDed with whatever ROM drives at that address.

use crate::bank::WindowSize;
use crate::board::descriptor::BoardDescriptor;
use crate::board::{BaseBoard, Board, BoardLogic};
use crate::context::Context;
use crate::host::Host;
use crate::state::Tag;

pub struct Uxrom {
    base: BaseBoard<Self>,
}

impl Uxrom {
    pub(crate) fn boxed(
        descriptor: &'static BoardDescriptor,
        tag: Tag,
        ctx: Context,
    ) -> Box<dyn Board> {
        Box::new(Self {
            base: BaseBoard::new(descriptor, tag, ctx),
        })
    }
}

fn write_bank(board: &mut Uxrom, _host: &mut dyn Host, addr: u16, value: u8) {
    let rom = board.base.prg.read(addr);
    board
        .base
        .prg
        .swap_window(WindowSize::K16, 0x8000, u32::from(value & rom & 0x0F));
}

impl BoardLogic for Uxrom {
    fn base(&self) -> &BaseBoard<Self> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseBoard<Self> {
        &mut self.base
    }

    fn reset_board(&mut self, _host: &mut dyn Host, _hard: bool) {
        self.base.router.map_write(0x8000, 0xFFFF, write_bank);
    }
}
