//! Bank-switched windows over cartridge memory.
//!
//! A `Banked` region divides an address span into fixed-granularity windows,
//! each redirected to some block of a backing [`Source`]. Swapping a window
//! is an index update; reads and writes resolve `(window, offset)` pairs
//! with bounds enforced by the source's mirror mask, never raw pointers.
//!
//! Swaps may use any `WindowSize` that is a multiple of the region's
//! granularity: an 8K swap over a 1K-granular CHR region updates the eight
//! windows it covers in one call.

use crate::source::Source;

/// Bank window sizes supported by swap operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum WindowSize {
    K1 = 0x0400,
    K2 = 0x0800,
    K4 = 0x1000,
    K8 = 0x2000,
    K16 = 0x4000,
    K24 = 0x6000,
    K32 = 0x8000,
    K40 = 0xA000,
}

impl WindowSize {
    #[must_use]
    pub const fn bytes(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy)]
struct Window {
    source: u8,
    offset: u32,
}

/// A bank-switched address region backed by one or two sources.
pub struct Banked {
    base: u16,
    span_mask: usize,
    granularity: usize,
    windows: Box<[Window]>,
    sources: Vec<Source>,
}

impl Banked {
    /// Create a region of `span` bytes at `base`, split into windows of
    /// `granularity` bytes, all initially pointing at block 0 of `primary`.
    #[must_use]
    pub fn new(base: u16, span: usize, granularity: WindowSize, primary: Source) -> Self {
        let granularity = granularity.bytes();
        debug_assert!(span.is_power_of_two() && span >= granularity);
        let count = span / granularity;
        Self {
            base,
            span_mask: span - 1,
            granularity,
            windows: vec![Window { source: 0, offset: 0 }; count].into_boxed_slice(),
            sources: vec![primary],
        }
    }

    /// Attach a second source (e.g. CHR RAM alongside CHR ROM, or external
    /// nametable memory alongside CIRAM).
    #[must_use]
    pub fn with_secondary(mut self, source: Source) -> Self {
        debug_assert_eq!(self.sources.len(), 1);
        self.sources.push(source);
        self
    }

    /// Number of windows in the region.
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Number of `size`-byte banks in the primary source.
    #[must_use]
    pub fn bank_count(&self, size: WindowSize) -> u32 {
        (self.sources[0].size() / size.bytes()) as u32
    }

    /// Index of the last `size`-byte bank in the primary source.
    #[must_use]
    pub fn last_bank(&self, size: WindowSize) -> u32 {
        self.bank_count(size).saturating_sub(1)
    }

    /// Point the window(s) covering `addr` at bank `bank` of the window's
    /// current source. The effective byte range is
    /// `(bank * size) mod source.size`, extent `size`.
    pub fn swap_window(&mut self, size: WindowSize, addr: u16, bank: u32) {
        let size = size.bytes();
        debug_assert_eq!(size % self.granularity, 0);
        let first = ((addr as usize - self.base as usize) & self.span_mask) / self.granularity;
        for k in 0..size / self.granularity {
            let window = &mut self.windows[first + k];
            let mask = self.sources[window.source as usize].mask();
            window.offset = ((bank as usize * size + k * self.granularity) & mask) as u32;
        }
    }

    /// Swap several consecutive `size`-byte windows in one call, for boards
    /// that always move a group of banks together.
    pub fn swap_banks(&mut self, size: WindowSize, addr: u16, banks: &[u32]) {
        for (i, &bank) in banks.iter().enumerate() {
            self.swap_window(size, addr + (i * size.bytes()) as u16, bank);
        }
    }

    /// Like [`swap_window`](Self::swap_window), but also re-target the
    /// covered windows at source `source`.
    pub fn swap_window_from(&mut self, source: u8, size: WindowSize, addr: u16, bank: u32) {
        debug_assert!((source as usize) < self.sources.len());
        let bytes = size.bytes();
        let first = ((addr as usize - self.base as usize) & self.span_mask) / self.granularity;
        for k in 0..bytes / self.granularity {
            self.windows[first + k].source = source;
        }
        self.swap_window(size, addr, bank);
    }

    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        let rel = (addr as usize - self.base as usize) & self.span_mask;
        let window = self.windows[rel / self.granularity];
        self.sources[window.source as usize].read(window.offset as usize + rel % self.granularity)
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        let rel = (addr as usize - self.base as usize) & self.span_mask;
        let window = self.windows[rel / self.granularity];
        self.sources[window.source as usize]
            .write(window.offset as usize + rel % self.granularity, value);
    }

    /// Whether the source currently selected for `addr` accepts writes.
    #[must_use]
    pub fn writable_at(&self, addr: u16) -> bool {
        let rel = (addr as usize - self.base as usize) & self.span_mask;
        let window = self.windows[rel / self.granularity];
        self.sources[window.source as usize].writable()
    }

    /// Raw `(source, byte offset)` of window `index`, for serialization.
    #[must_use]
    pub fn window(&self, index: usize) -> (u8, u32) {
        let w = self.windows[index];
        (w.source, w.offset)
    }

    /// Restore one window from serialized state. The offset is re-masked
    /// against the named source so foreign state cannot index out of range.
    pub fn set_window(&mut self, index: usize, source: u8, offset: u32) {
        let source = if (source as usize) < self.sources.len() {
            source
        } else {
            0
        };
        let mask = self.sources[source as usize].mask();
        self.windows[index] = Window {
            source,
            offset: (offset as usize & mask) as u32,
        };
    }

    /// Number of attached sources (1 or 2).
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn source(&self, index: usize) -> &Source {
        &self.sources[index]
    }

    pub fn source_mut(&mut self, index: usize) -> &mut Source {
        &mut self.sources[index]
    }
}
