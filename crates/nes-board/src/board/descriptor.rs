//! Static per-mapper configuration.
//!
//! One read-only table drives board construction: which PRG layout a board
//! powers up with, how its nametables come out of reset, and how much work
//! RAM it is wired for. The table is sorted by id; ids below 256 are iNES
//! mapper numbers, ids from 256 up are extension ids for boards that never
//! received one.

use crate::context::{Mirroring, WrkConfig};
use crate::state::Tag;

/// Canonical power-on PRG arrangements, expressed as the four 8K windows
/// covering `0x8000..=0xFFFF`. `last` is the index of the last 8K bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrgLayout {
    /// Linear from bank 0 (a fixed 32K image).
    Linear,
    /// First 16K mirrored into both halves.
    Mirror16,
    /// First 8K mirrored through the whole space.
    Mirror8,
    /// Switchable 16K low, last 16K bank fixed high.
    FixLast16,
    /// Three switchable 8K windows, last 8K bank fixed high.
    FixLast8,
    /// The last 32K of the image.
    LastLinear,
    /// One switchable 32K group.
    Switch32,
    /// Last 16K mirrored into both halves.
    MirrorLast16,
}

impl PrgLayout {
    /// The four 8K bank indices this layout selects at hard reset.
    #[must_use]
    pub fn banks(self, last: u32) -> [u32; 4] {
        match self {
            Self::Linear | Self::Switch32 => [0, 1, 2, 3],
            Self::Mirror16 => [0, 1, 0, 1],
            Self::Mirror8 => [0, 0, 0, 0],
            Self::FixLast16 => [0, 1, last.saturating_sub(1), last],
            Self::FixLast8 => [0, 1, 2, last],
            Self::LastLinear => [
                last.saturating_sub(3),
                last.saturating_sub(2),
                last.saturating_sub(1),
                last,
            ],
            Self::MirrorLast16 => {
                let second = last.saturating_sub(1);
                [second, last, second, last]
            }
        }
    }
}

/// How the nametables come out of a hard reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NmtInit {
    /// Follow the mirroring the image header asked for.
    Header,
    Horizontal,
    Vertical,
    SingleLow,
    FourScreen,
}

impl NmtInit {
    #[must_use]
    pub fn resolve(self, header: Mirroring) -> Mirroring {
        match self {
            Self::Header => header,
            Self::Horizontal => Mirroring::Horizontal,
            Self::Vertical => Mirroring::Vertical,
            Self::SingleLow => Mirroring::SingleLow,
            Self::FourScreen => Mirroring::FourScreen,
        }
    }
}

/// One row of the board table.
pub struct BoardDescriptor {
    pub id: u16,
    pub name: &'static str,
    pub prg: PrgLayout,
    /// Nametable policy for the board's standard wiring.
    pub nmt: NmtInit,
    /// Policy when the cartridge is wired for four-screen instead.
    pub nmt_alt: NmtInit,
    pub wrk: WrkConfig,
    /// `Some(size)`: the board is wired for CHR RAM of `size` bytes and any
    /// CHR ROM in the image is discarded.
    pub chr_ram: Option<usize>,
}

/// The board table, sorted by id.
///
/// MMC3 powers up with vertical mirroring from its own mirroring register;
/// the header bit is ignored unless the cartridge is four-screen wired.
pub static DESCRIPTORS: &[BoardDescriptor] = &[
    BoardDescriptor {
        id: 0,
        name: "NROM",
        prg: PrgLayout::Linear,
        nmt: NmtInit::Header,
        nmt_alt: NmtInit::Header,
        wrk: WrkConfig::NONE,
        chr_ram: None,
    },
    BoardDescriptor {
        id: 2,
        name: "UNROM",
        prg: PrgLayout::FixLast16,
        nmt: NmtInit::Header,
        nmt_alt: NmtInit::Header,
        wrk: WrkConfig::NONE,
        chr_ram: Some(0x2000),
    },
    BoardDescriptor {
        id: 4,
        name: "TKROM",
        prg: PrgLayout::FixLast16,
        nmt: NmtInit::Vertical,
        nmt_alt: NmtInit::FourScreen,
        wrk: WrkConfig::AUTO,
        chr_ram: None,
    },
    BoardDescriptor {
        id: 69,
        name: "JLROM",
        prg: PrgLayout::FixLast8,
        nmt: NmtInit::Header,
        nmt_alt: NmtInit::Header,
        wrk: WrkConfig::AUTO,
        chr_ram: None,
    },
    BoardDescriptor {
        id: EXT_SUNSOFT_5B,
        name: "SUNSOFT-5B",
        prg: PrgLayout::FixLast8,
        nmt: NmtInit::Header,
        nmt_alt: NmtInit::Header,
        wrk: WrkConfig::AUTO,
        chr_ram: None,
    },
];

/// Extension id for the Sunsoft 5B, the FME-7 variant with the audio chip.
pub const EXT_SUNSOFT_5B: u16 = 256;

/// Save-state tags for extension ids, kept in bijection with the `>= 256`
/// rows of [`DESCRIPTORS`] (checked by `registry::verify`).
pub(crate) static EXT_TAGS: &[(u16, [u8; 4])] = &[(EXT_SUNSOFT_5B, *b"S5B\0")];

/// Look up a board descriptor by id.
#[must_use]
pub fn find(id: u16) -> Option<&'static BoardDescriptor> {
    DESCRIPTORS
        .binary_search_by_key(&id, |d| d.id)
        .ok()
        .map(|i| &DESCRIPTORS[i])
}

/// Save-state tag for a board id: decimal digits for iNES numbers, the
/// extension table for ids from 256 up.
#[must_use]
pub fn board_tag(id: u16) -> Option<Tag> {
    if id < 256 {
        Some(Tag::numeric(id))
    } else {
        EXT_TAGS
            .iter()
            .find(|&&(ext, _)| ext == id)
            .map(|&(_, bytes)| Tag::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardDescriptor, DESCRIPTORS, NmtInit, PrgLayout, board_tag, find};
    use crate::context::Mirroring;
    use crate::state::Tag;

    #[test]
    fn table_is_sorted_for_binary_search() {
        for pair in DESCRIPTORS.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[test]
    fn find_hits_every_row_and_nothing_else() {
        for d in DESCRIPTORS {
            let found: &BoardDescriptor = find(d.id).expect("present");
            assert_eq!(found.name, d.name);
        }
        assert!(find(1).is_none());
        assert!(find(300).is_none());
    }

    #[test]
    fn fix_last_layouts_pin_the_top_of_the_image() {
        // 128K PRG = 16 8K banks.
        assert_eq!(PrgLayout::FixLast16.banks(15), [0, 1, 14, 15]);
        assert_eq!(PrgLayout::FixLast8.banks(15), [0, 1, 2, 15]);
        assert_eq!(PrgLayout::LastLinear.banks(15), [12, 13, 14, 15]);
    }

    #[test]
    fn small_images_saturate_instead_of_wrapping() {
        assert_eq!(PrgLayout::FixLast16.banks(1), [0, 1, 0, 1]);
        assert_eq!(PrgLayout::LastLinear.banks(1), [0, 0, 0, 1]);
    }

    #[test]
    fn header_policy_passes_the_header_through() {
        assert_eq!(
            NmtInit::Header.resolve(Mirroring::Vertical),
            Mirroring::Vertical
        );
        assert_eq!(
            NmtInit::Vertical.resolve(Mirroring::Horizontal),
            Mirroring::Vertical
        );
    }

    #[test]
    fn numeric_and_extension_tags() {
        assert_eq!(board_tag(4), Some(Tag::numeric(4)));
        assert_eq!(board_tag(256), Some(Tag::new(*b"S5B\0")));
        assert_eq!(board_tag(999), None);
    }
}
