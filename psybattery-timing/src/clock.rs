use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const NANOS_PER_MS: u64 = 1_000_000;

pub fn ms_to_ns(ms: u64) -> u64 {
    ms.saturating_mul(NANOS_PER_MS)
}

pub fn ns_to_ms(ns: u64) -> f64 {
    ns as f64 / NANOS_PER_MS as f64
}

/// Monotonic time source in nanoseconds since the clock's origin.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> u64;
    fn sleep(&self, d: Duration);

    fn elapsed(&self, since: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(since))
    }

    fn sleep_until(&self, deadline: u64) {
        let now = self.now();
        if deadline > now {
            self.sleep(Duration::from_nanos(deadline - now));
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationStats {
    pub samples: usize,
    pub mean_overshoot_ns: f64,
    pub jitter_ns: f64,
    pub min_overshoot_ns: f64,
    pub max_overshoot_ns: f64,
}

impl CalibrationStats {
    fn from_overshoots(overshoots: &[f64]) -> Self {
        if overshoots.is_empty() {
            return Self {
                samples: 0,
                mean_overshoot_ns: 0.0,
                jitter_ns: 0.0,
                min_overshoot_ns: 0.0,
                max_overshoot_ns: 0.0,
            };
        }
        let n = overshoots.len() as f64;
        let mean = overshoots.iter().sum::<f64>() / n;
        let var = overshoots.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let min = overshoots.iter().copied().fold(f64::INFINITY, f64::min);
        let max = overshoots.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            samples: overshoots.len(),
            mean_overshoot_ns: mean,
            jitter_ns: var.sqrt(),
            min_overshoot_ns: min,
            max_overshoot_ns: max,
        }
    }
}

/// Wall clock backed by `Instant` with a precise sleep where the platform has one.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl Clock for MonotonicClock {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Sleeps `samples` times for `target` and measures how late each wake-up was.
    pub fn calibrate(&self, target: Duration, samples: usize) -> CalibrationStats {
        let target_ns = target.as_nanos() as f64;
        let overshoots: Vec<f64> = (0..samples)
            .map(|_| {
                let before = self.now();
                self.sleep(target);
                let slept = self.now().saturating_sub(before) as f64;
                (slept - target_ns).max(0.0)
            })
            .collect();
        let stats = CalibrationStats::from_overshoots(&overshoots);
        tracing::debug!(
            samples = stats.samples,
            mean_overshoot_ms = stats.mean_overshoot_ns / NANOS_PER_MS as f64,
            jitter_ms = stats.jitter_ns / NANOS_PER_MS as f64,
            "sleep calibration"
        );
        stats
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Manually stepped clock. Clones share the same time, so a test can keep a
/// handle while the timeline owns another. Sleeping advances time instantly.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now_ns: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns
            .fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Moves to an absolute instant. Never goes backwards.
    pub fn set(&self, at_ns: u64) {
        self.now_ns.fetch_max(at_ns, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}
