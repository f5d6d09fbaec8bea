//! Time-stamp counter sources for `RDTSC`.
//!
//! The only architectural guarantee the model exposes is ordering: two reads from the same
//! source with no intervening [`VirtualTsc::write`] satisfy `second >= first`. The source is a
//! trait so tests can substitute a deterministic counter for the real one.

use std::time::Instant;

/// Nominal frequency used when the counter is derived from a host clock.
pub const DEFAULT_TSC_FREQ_HZ: u64 = 1_000_000_000;

pub trait TscSource {
    fn read_tsc(&mut self) -> u64;
}

impl<T: TscSource + ?Sized> TscSource for &mut T {
    fn read_tsc(&mut self) -> u64 {
        (**self).read_tsc()
    }
}

impl<T: TscSource + ?Sized> TscSource for Box<T> {
    fn read_tsc(&mut self) -> u64 {
        (**self).read_tsc()
    }
}

/// `RDTSC` result split the way the instruction writes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RdtscValue {
    pub eax: u32,
    pub edx: u32,
}

impl RdtscValue {
    pub fn from_u64(tsc: u64) -> Self {
        Self {
            eax: (tsc & 0xffff_ffff) as u32,
            edx: (tsc >> 32) as u32,
        }
    }

    pub fn value(self) -> u64 {
        (u64::from(self.edx) << 32) | u64::from(self.eax)
    }
}

pub fn rdtsc<T: TscSource + ?Sized>(source: &mut T) -> RdtscValue {
    RdtscValue::from_u64(source.read_tsc())
}

/// The host's counter: the hardware TSC on x86_64, otherwise a [`VirtualTsc`] over the host's
/// monotonic clock.
#[derive(Debug)]
pub struct HostTsc {
    #[cfg(not(target_arch = "x86_64"))]
    fallback: VirtualTsc,
}

impl HostTsc {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_arch = "x86_64"))]
            fallback: VirtualTsc::new(DEFAULT_TSC_FREQ_HZ),
        }
    }
}

impl Default for HostTsc {
    fn default() -> Self {
        Self::new()
    }
}

impl TscSource for HostTsc {
    #[cfg(target_arch = "x86_64")]
    #[allow(unsafe_code)]
    fn read_tsc(&mut self) -> u64 {
        // SAFETY: RDTSC is available on every x86_64 CPU and has no memory effects.
        unsafe { core::arch::x86_64::_rdtsc() }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn read_tsc(&mut self) -> u64 {
        self.fallback.read_tsc()
    }
}

/// A frequency-scaled counter over a monotonic host clock.
#[derive(Debug, Clone)]
pub struct VirtualTsc {
    freq_hz: u64,
    epoch: Instant,
    base_ns: u64,
    base_tsc: u64,
}

impl VirtualTsc {
    pub fn new(freq_hz: u64) -> Self {
        Self {
            freq_hz,
            epoch: Instant::now(),
            base_ns: 0,
            base_tsc: 0,
        }
    }

    pub fn freq_hz(&self) -> u64 {
        self.freq_hz
    }

    fn now_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Counter value at `now_ns` nanoseconds after creation.
    pub fn read_at(&self, now_ns: u64) -> u64 {
        let delta_ns = now_ns.saturating_sub(self.base_ns);
        let delta_tsc = ((delta_ns as u128) * (self.freq_hz as u128)) / 1_000_000_000u128;
        self.base_tsc.wrapping_add(delta_tsc as u64)
    }

    /// Resets the counter so that it reads `tsc_value` at `now_ns`.
    pub fn write_at(&mut self, now_ns: u64, tsc_value: u64) {
        self.base_ns = now_ns;
        self.base_tsc = tsc_value;
    }

    pub fn write(&mut self, tsc_value: u64) {
        let now = self.now_ns();
        self.write_at(now, tsc_value);
    }
}

impl TscSource for VirtualTsc {
    fn read_tsc(&mut self) -> u64 {
        self.read_at(self.now_ns())
    }
}

/// Advances by a fixed step on every read.
#[derive(Debug, Clone)]
pub struct SteppingTsc {
    next: u64,
    step: u64,
}

impl SteppingTsc {
    pub fn new(start: u64, step: u64) -> Self {
        Self { next: start, step }
    }
}

impl TscSource for SteppingTsc {
    fn read_tsc(&mut self) -> u64 {
        let value = self.next;
        self.next = self.next.wrapping_add(self.step);
        value
    }
}

/// Replays a fixed sequence of readings, then keeps returning the last one.
///
/// An empty script reads as a counter stuck at zero.
#[derive(Debug, Clone)]
pub struct ScriptedTsc {
    values: Vec<u64>,
    pos: usize,
}

impl ScriptedTsc {
    pub fn new(values: impl Into<Vec<u64>>) -> Self {
        Self {
            values: values.into(),
            pos: 0,
        }
    }

    pub fn reads(&self) -> usize {
        self.pos
    }
}

impl TscSource for ScriptedTsc {
    fn read_tsc(&mut self) -> u64 {
        let value = match self.values.get(self.pos) {
            Some(&v) => v,
            None => self.values.last().copied().unwrap_or(0),
        };
        self.pos += 1;
        value
    }
}
