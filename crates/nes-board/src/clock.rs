//! Cycle-accurate interrupt scheduling primitives.
//!
//! Two units cover every cartridge IRQ scheme. [`M2`] replays a board's
//! counter once per divider of master-clock cycles, catching up lazily to
//! wherever the CPU has advanced, so a late `update()` never loses an edge.
//! [`A12`] ticks on rising edges of PPU address line 12, filtered so the
//! multiple toggles inside one pattern fetch count as a single edge; it is
//! the basis of scanline-synchronized IRQs.
//!
//! Both are generic over a [`Signal`] policy: the board-specific counter
//! state machine, one `signal()` call per qualifying tick. Interrupts are
//! never asserted directly; units ask the host to assert at an exact future
//! master-clock position, reproducing the hardware's pipeline latency.
//!
//! Counters are rebased every frame through `vsync()` so they stay small
//! over arbitrarily long runs; all rebase arithmetic saturates rather than
//! wraps, so a missed rebase degrades to late interrupts, not spurious ones.

use crate::host::Host;
use crate::state::{ByteReader, ChunkWriter};
use crate::Error;

/// Master-clock cycles between a counter expiring and the IRQ line
/// actually going low.
pub const IRQ_DELAY: u64 = 2;

/// CPU cycles A12 must stay low for a rising edge to qualify.
const A12_FILTER: u64 = 3;

/// A board-specific counter clocked by an [`M2`] or [`A12`] unit.
///
/// `signal()` advances the counter by one tick and reports whether an
/// interrupt should be requested for that tick.
pub trait Signal {
    fn signal(&mut self) -> bool;

    /// Return to power-on state. Called on hard reset only.
    fn reset(&mut self) {}
}

/// Master-clock-driven scheduler.
///
/// `count` is the master-clock position of the next scheduled check. An
/// `update()` replays `signal()` at every divider step between `count` and
/// the host's current position, stamping each check with its own cycle.
pub struct M2<P> {
    policy: P,
    count: u64,
    divider: u32,
    connected: bool,
}

impl<P: Signal> M2<P> {
    #[must_use]
    pub fn new(policy: P, divider: u32) -> Self {
        Self {
            policy,
            count: 0,
            divider,
            connected: false,
        }
    }

    /// Replay missed checks up to the host's current master-clock position.
    ///
    /// Each check that signals schedules exactly one interrupt, at that
    /// check's own cycle plus [`IRQ_DELAY`] — not at the (possibly much
    /// later) cycle `update()` happens to run at.
    pub fn update(&mut self, host: &mut dyn Host) {
        let step = u64::from(self.divider);
        if step == 0 {
            return;
        }
        let now = host.cycles();
        while self.count <= now {
            let stamp = self.count;
            self.count += step;
            if self.policy.signal() && self.connected {
                host.irq(stamp + IRQ_DELAY);
            }
        }
    }

    /// Rebase the counter by one frame. Call every frame; saturates at
    /// zero if a frame was somehow skipped.
    pub fn vsync(&mut self, host: &mut dyn Host) {
        self.count = self.count.saturating_sub(host.frame_cycles());
    }

    /// Re-arm at the current master-clock position. A hard reset also
    /// returns the policy to power-on state; `connected` carries the IRQ
    /// line enable across a soft reset.
    pub fn reset(&mut self, host: &dyn Host, hard: bool, connected: bool) {
        if hard {
            self.policy.reset();
        }
        self.connected = connected;
        self.count = host.cycles() + u64::from(self.divider);
    }

    /// Attach or detach the unit from the IRQ line. A detached unit still
    /// counts, it just never requests interrupts.
    pub fn connect(&mut self, connected: bool) {
        self.connected = connected;
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn set_divider(&mut self, divider: u32) {
        self.divider = divider;
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    pub fn save(&self, w: &mut ChunkWriter) {
        w.u64(self.count);
        w.u32(self.divider);
        w.u8(u8::from(self.connected));
    }

    pub fn load(&mut self, r: &mut ByteReader<'_>) -> Result<(), Error> {
        self.count = r.u64()?;
        self.divider = r.u32()?;
        self.connected = r.u8()? != 0;
        Ok(())
    }
}

/// Which interrupt latency an A12-driven board exhibits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum A12Flavor {
    /// The IRQ is requested on the qualifying edge itself.
    Direct,
    /// The IRQ is requested two CPU cycles after the edge.
    Delayed,
}

/// PPU-address-line-edge-driven scheduler.
///
/// The PPU reports each rising edge of address bit 12 with its cycle
/// stamp. `count` holds the cycle before which edges are filtered out:
/// every accepted edge pushes it `duration` past itself, so the rapid
/// toggles within a single fetch collapse into one tick. `duration`
/// depends on the video mode and is recomputed at every vsync.
pub struct A12<P> {
    policy: P,
    count: u64,
    duration: u64,
    delay: u64,
    flavor: A12Flavor,
    connected: bool,
}

impl<P: Signal> A12<P> {
    #[must_use]
    pub fn new(policy: P, flavor: A12Flavor) -> Self {
        Self {
            policy,
            count: 0,
            duration: 0,
            delay: 0,
            flavor,
            connected: false,
        }
    }

    /// Process one rising edge observed at `cycle`.
    pub fn update(&mut self, host: &mut dyn Host, cycle: u64) {
        let target = self.count;
        self.count = cycle + self.duration;
        if cycle >= target && self.policy.signal() {
            host.irq(cycle + self.delay);
        }
    }

    /// Rebase the edge filter by one frame and refresh the mode-derived
    /// periods (the frame boundary is where a mode switch takes effect).
    pub fn vsync(&mut self, host: &mut dyn Host) {
        self.refresh_periods(host);
        self.count = self.count.saturating_sub(host.frame_cycles());
    }

    /// Re-arm at the current master-clock position; see [`M2::reset`].
    /// Connecting claims the host's single A12 notification slot.
    pub fn reset(&mut self, host: &mut dyn Host, hard: bool, connected: bool) {
        if hard {
            self.policy.reset();
        }
        self.refresh_periods(host);
        self.count = host.cycles() + self.duration;
        self.connect(host, connected);
    }

    /// Subscribe to or release the PPU's edge notification slot.
    pub fn connect(&mut self, host: &mut dyn Host, connected: bool) {
        self.connected = connected;
        host.connect_a12(connected);
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    fn refresh_periods(&mut self, host: &dyn Host) {
        self.duration = host.cycles_per(A12_FILTER);
        self.delay = match self.flavor {
            A12Flavor::Direct => 0,
            A12Flavor::Delayed => host.cycles_per(2),
        };
    }

    pub fn save(&self, w: &mut ChunkWriter) {
        w.u64(self.count);
        w.u8(u8::from(self.connected));
    }

    pub fn load(&mut self, r: &mut ByteReader<'_>) -> Result<(), Error> {
        self.count = r.u64()?;
        self.connected = r.u8()? != 0;
        Ok(())
    }
}
