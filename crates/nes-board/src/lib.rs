//! NES cartridge board framework.
//!
//! Virtualizes the mapper hardware sitting between the CPU/PPU address
//! buses and cartridge memory: bank-switched windows over owned byte
//! sources, per-address dispatch across cartridge space, two cycle-accurate
//! IRQ scheduling primitives, a static board table with a factory, and a
//! chunked save-state protocol.
//!
//! The host machine owns the master clock, the IRQ line, and the PPU;
//! boards see it through the [`Host`] trait and are driven through
//! [`Board`]. Concrete boards implement [`BoardLogic`] on top of a
//! [`BaseBoard`] and get the canonical behavior blanket-wired.

mod bank;
mod board;
mod clock;
mod context;
mod error;
mod host;
mod router;
mod source;
mod state;

pub use bank::{Banked, WindowSize};
pub use board::descriptor::{BoardDescriptor, DESCRIPTORS, NmtInit, PrgLayout};
pub use board::registry::{create, verify};
pub use board::{
    BaseBoard, Board, BoardLogic, Fme7, Mmc3, Nrom, TAG_CHR, TAG_NMT, TAG_PRG, TAG_WRK, Uxrom,
};
pub use clock::{A12, A12Flavor, IRQ_DELAY, M2, Signal};
pub use context::{Context, Mirroring, WrkConfig};
pub use error::Error;
pub use host::{Host, Mode};
pub use router::{IO_BASE, ReadFn, Router, WriteFn};
pub use source::Source;
pub use state::{ByteReader, Chunk, ChunkWriter, Tag, chunks};
