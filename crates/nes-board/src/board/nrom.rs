//! NROM (mapper 0): no banking, no registers.
//!
//! The degenerate board: the canonical map is the whole story. A 16K image
//! mirrors into the upper half through the source mask.

use crate::board::descriptor::BoardDescriptor;
use crate::board::{BaseBoard, Board, BoardLogic};
use crate::context::Context;
use crate::host::Host;
use crate::state::Tag;

pub struct Nrom {
    base: BaseBoard<Self>,
}

impl Nrom {
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

impl BoardLogic for Nrom {
    fn base(&self) -> &BaseBoard<Self> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseBoard<Self> {
        &mut self.base
    }

    fn reset_board(&mut self, _host: &mut dyn Host, _hard: bool) {}
}
