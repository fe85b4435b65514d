use atomic_float::AtomicF32;
use std::sync::atomic::Ordering;

/// Receives per-sample metering values from the audio thread. Implementations must not block or
/// allocate.
pub trait MeterSink {
    /// The magnitude of the gain change applied to a sample, in decibels.
    fn record_gain_reduction(&self, db: f32);
    /// The adapted time constants and the squared crest factor they were derived from.
    fn record_auto_times(&self, attack_ms: f32, release_ms: f32, crest_factor_sq: f32);
}

/// Latched peak meters. Every value holds the maximum recorded since it was last read, and
/// reading it resets it to zero.
#[derive(Debug)]
pub struct Meters {
    gain_reduction_db: AtomicF32,
    attack_ms: AtomicF32,
    release_ms: AtomicF32,
    crest_factor_sq: AtomicF32,
}

impl Default for Meters {
    fn default() -> Self {
        Self::new()
    }
}

impl Meters {
    pub fn new() -> Self {
        Self {
            gain_reduction_db: AtomicF32::new(0.0),
            attack_ms: AtomicF32::new(0.0),
            release_ms: AtomicF32::new(0.0),
            crest_factor_sq: AtomicF32::new(0.0),
        }
    }

    pub fn take_gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db.swap(0.0, Ordering::Relaxed)
    }

    pub fn take_attack_ms(&self) -> f32 {
        self.attack_ms.swap(0.0, Ordering::Relaxed)
    }

    pub fn take_release_ms(&self) -> f32 {
        self.release_ms.swap(0.0, Ordering::Relaxed)
    }

    pub fn take_crest_factor_sq(&self) -> f32 {
        self.crest_factor_sq.swap(0.0, Ordering::Relaxed)
    }
}

impl MeterSink for Meters {
    fn record_gain_reduction(&self, db: f32) {
        self.gain_reduction_db.fetch_max(db, Ordering::Relaxed);
    }

    fn record_auto_times(&self, attack_ms: f32, release_ms: f32, crest_factor_sq: f32) {
        self.attack_ms.fetch_max(attack_ms, Ordering::Relaxed);
        self.release_ms.fetch_max(release_ms, Ordering::Relaxed);
        self.crest_factor_sq.fetch_max(crest_factor_sq, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latches_maximum() {
        let meters = Meters::new();
        meters.record_gain_reduction(3.0);
        meters.record_gain_reduction(9.5);
        meters.record_gain_reduction(1.0);
        assert_eq!(meters.take_gain_reduction_db(), 9.5);
    }

    #[test]
    fn test_read_resets() {
        let meters = Meters::new();
        meters.record_auto_times(20.0, 180.0, 2.0);
        meters.record_auto_times(5.0, 300.0, 8.0);

        assert_eq!(meters.take_attack_ms(), 20.0);
        assert_eq!(meters.take_release_ms(), 300.0);
        assert_eq!(meters.take_crest_factor_sq(), 8.0);

        assert_eq!(meters.take_attack_ms(), 0.0);
        assert_eq!(meters.take_release_ms(), 0.0);
        assert_eq!(meters.take_crest_factor_sq(), 0.0);
        assert_eq!(meters.take_gain_reduction_db(), 0.0);
    }
}
