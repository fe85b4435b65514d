/// Running peak-to-RMS ratio of a signal, tracked in the squared domain.
#[derive(Debug, Clone)]
pub struct CrestFactor {
    sample_rate: u32,
    coef: f32,

    peak_last_sq: f32,
    rms_last_sq: f32,
}

impl CrestFactor {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            coef: 0.0,
            peak_last_sq: 0.0,
            rms_last_sq: 0.0,
        }
    }

    /// Set the integration time of both trackers, in seconds.
    pub fn set_coef(&mut self, time_secs: f32) {
        self.coef = (-1.0 / (self.sample_rate as f32 * time_secs)).exp();
    }

    #[cfg(test)]
    pub(crate) fn coef(&self) -> f32 {
        self.coef
    }

    /// The squared running peak and the running mean square, in that order.
    #[cfg(test)]
    pub(crate) fn state(&self) -> (f32, f32) {
        (self.peak_last_sq, self.rms_last_sq)
    }

    /// Update the trackers and return the current crest factor. This is NaN until the signal has
    /// had some energy, and it becomes NaN again if the mean square ever underflows to zero.
    /// Callers need to check the result with [`f32::is_finite()`].
    pub fn process(&mut self, input: f32) -> f32 {
        let in_sq = input * input;
        let factor = (1.0 - self.coef) * in_sq;

        self.peak_last_sq = in_sq.max(self.coef * self.peak_last_sq + factor);
        self.rms_last_sq = self.coef * self.rms_last_sq + factor;

        (self.peak_last_sq / self.rms_last_sq).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{PI, SQRT_2};

    fn crest(sample_rate: u32) -> CrestFactor {
        let mut crest = CrestFactor::new(sample_rate);
        crest.set_coef(0.2);
        crest
    }

    #[test]
    fn test_coefficient() {
        let crest = crest(48000);
        let expected = (-1.0_f32 / 9600.0).exp();
        assert!((crest.coef() - expected).abs() < 1e-7);
        assert!(crest.coef() > 0.0 && crest.coef() < 1.0);
    }

    #[test]
    fn test_sine_converges_to_sqrt_2() {
        let mut crest = crest(48000);
        // 1 kHz at 48 kHz is exactly 48 samples per period
        let mut value = 0.0;
        for i in 0..96000 {
            let phase = 2.0 * PI * (i % 48) as f32 / 48.0;
            value = crest.process(0.5 * phase.sin());
        }
        assert!((value - SQRT_2).abs() < 0.03, "crest factor was {value}");
    }

    #[test]
    fn test_square_wave_is_one() {
        let mut crest = crest(48000);
        let mut value = 0.0;
        for i in 0..200_000 {
            value = crest.process(if i % 2 == 0 { 0.7 } else { -0.7 });
        }
        assert!((value - 1.0).abs() < 5e-3, "crest factor was {value}");
    }

    #[test]
    fn test_transients_raise_crest_factor() {
        let mut crest = crest(48000);
        for _ in 0..48000 {
            crest.process(0.01);
        }
        let steady = crest.process(0.01);
        let spike = crest.process(1.0);
        assert!(spike > 10.0 * steady);
    }

    #[test]
    fn test_silence_is_not_finite() {
        let mut crest = crest(48000);
        assert!(!crest.process(0.0).is_finite());
        assert_eq!(crest.state(), (0.0, 0.0));
    }

    #[test]
    fn test_accumulators_non_negative() {
        let mut crest = crest(44100);
        for i in 0..4410 {
            crest.process(((i * 7919) % 200) as f32 / 100.0 - 1.0);
            let (peak, rms) = crest.state();
            assert!(peak >= 0.0 && rms >= 0.0);
            assert!(peak >= rms);
        }
    }
}
