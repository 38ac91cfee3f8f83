//! What the cartridge loader hands over when a board is built.

use bitflags::bitflags;

/// Nametable mirroring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    /// Horizontal mirroring (vertical scrolling games).
    Horizontal,
    /// Vertical mirroring (horizontal scrolling games).
    Vertical,
    /// Single-screen, lower bank.
    SingleLow,
    /// Single-screen, upper bank.
    SingleHigh,
    /// Cartridge provides two extra nametables.
    FourScreen,
}

bitflags! {
    /// Work-RAM sizing policy.
    ///
    /// A descriptor declares what a board needs; the loader's battery-file
    /// hint can widen it. `AUTO` defers the decision to the first non-empty
    /// save data seen.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WrkConfig: u16 {
        const NONE = 1 << 0;
        const K1   = 1 << 1;
        const K2   = 1 << 2;
        const K4   = 1 << 3;
        const K8   = 1 << 4;
        const K16  = 1 << 5;
        const K32  = 1 << 6;
        const AUTO = 1 << 7;
    }
}

impl WrkConfig {
    /// Resolve the policy to a concrete byte size.
    ///
    /// A named size always wins (the largest, if several bits are set).
    /// `AUTO` sizes from the battery hint when one exists — rounded up to a
    /// power of two — and otherwise backs 8K only when the cartridge is
    /// battery-equipped.
    #[must_use]
    pub fn resolve(self, hint: Option<usize>, battery: bool) -> usize {
        for (flag, size) in [
            (Self::K32, 32 * 1024),
            (Self::K16, 16 * 1024),
            (Self::K8, 8 * 1024),
            (Self::K4, 4 * 1024),
            (Self::K2, 2 * 1024),
            (Self::K1, 1024),
        ] {
            if self.contains(flag) {
                return size;
            }
        }
        if self.contains(Self::AUTO) {
            if let Some(len) = hint {
                if len > 0 {
                    return len.next_power_of_two().min(32 * 1024);
                }
            }
            if battery {
                return 8 * 1024;
            }
        }
        0
    }
}

/// Loader output describing one cartridge image.
///
/// The loader itself (file formats, archives, header quirks) lives with the
/// host; boards only ever see this digested form. `checksum` exists for the
/// handful of boards that special-case known dumps; the core never reads it.
pub struct Context {
    /// iNES mapper number, or an extension id (>= 256) for boards with no
    /// assigned number.
    pub id: u16,
    pub prg: Vec<u8>,
    pub chr: Vec<u8>,
    /// Mirroring requested by the image header.
    pub mirroring: Mirroring,
    /// The cartridge carries battery-backed work RAM.
    pub battery: bool,
    /// Size of an existing save file for this cartridge, if any.
    pub wrk_hint: Option<usize>,
    /// CRC of the PRG image, for board-scoped dump overrides.
    pub checksum: u32,
}

impl Context {
    #[must_use]
    pub fn new(id: u16, prg: Vec<u8>, chr: Vec<u8>) -> Self {
        Self {
            id,
            prg,
            chr,
            mirroring: Mirroring::Horizontal,
            battery: false,
            wrk_hint: None,
            checksum: 0,
        }
    }
}
