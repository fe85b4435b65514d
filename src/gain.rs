use nih_plug::prelude::{util, Enum};

use crate::envelope::{BallisticType, EnvelopeFollower};

/// Added to magnitudes before converting them to decibels.
pub const DETECTOR_FLOOR: f32 = 0.000001;

/// Where the level detector sits and what it returns to between transients.
#[derive(Enum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    /// The follower tracks the input directly and decays toward silence.
    #[id = "return_to_zero"]
    #[name = "Return To Zero"]
    ReturnToZero,
    /// The follower's input never drops below the threshold, so it settles there instead of at
    /// zero.
    #[id = "return_to_threshold"]
    #[name = "Return To Threshold"]
    ReturnToThreshold,
    /// The follower smooths the instantaneous attenuation in decibels.
    #[id = "log_domain"]
    #[name = "Log Domain"]
    #[default]
    LogDomain,
}

/// Whether the log-domain detector adapts its time constants to the signal's crest factor.
#[derive(Enum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Automation {
    #[id = "manual"]
    #[name = "Manual"]
    #[default]
    Manual,
    #[id = "auto"]
    #[name = "Auto"]
    Auto,
}

/// Control values for one processing block. These are read once per block and stay fixed until
/// the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockParams {
    pub architecture: Architecture,
    pub automation: Automation,
    pub ballistic_type: BallisticType,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub ratio: f32,
    pub threshold_db: f32,
    pub mix: f32,
    pub volume_db: f32,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self {
            architecture: Architecture::default(),
            automation: Automation::default(),
            ballistic_type: BallisticType::default(),
            attack_ms: 10.0,
            release_ms: 100.0,
            ratio: 4.0,
            threshold_db: -12.0,
            mix: 1.0,
            volume_db: 0.0,
        }
    }
}

/// A processed sample together with the gain change applied to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainOutput {
    pub sample: f32,
    /// Signed gain change in decibels. Negative values mean the sample was attenuated.
    pub gain_db: f32,
}

/// Time constants derived from the crest factor in automatic mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoTimes {
    pub attack_ms: f32,
    pub release_ms: f32,
    pub crest_factor_sq: f32,
}

/// Scale the attack and release times by the squared crest factor. Returns `None` when the crest
/// factor is not usable, in which case the block's own time constants apply.
pub fn auto_times(attack_ms: f32, release_ms: f32, crest_factor: f32) -> Option<AutoTimes> {
    if !crest_factor.is_finite() || crest_factor <= 0.0 {
        return None;
    }

    let crest_factor_sq = crest_factor * crest_factor;
    let attack_auto = 4.0 * attack_ms / crest_factor_sq;
    let release_auto = (4.0 * release_ms / crest_factor_sq - attack_auto).max(1.0);
    if !attack_auto.is_finite() || !release_auto.is_finite() {
        return None;
    }

    Some(AutoTimes {
        attack_ms: attack_auto,
        release_ms: release_auto,
        crest_factor_sq,
    })
}

/// The per-block constants of the gain computer. None of the architectures keep state of their
/// own, the envelope follower they are given belongs to the channel.
#[derive(Debug, Clone, Copy)]
pub struct GainStage {
    mix: f32,
    mix_inverse: f32,
    /// `1 / ratio - 1`. Negative when compressing, positive when expanding.
    ratio_inverse: f32,
    volume_gain: f32,
    threshold_db: f32,
    threshold_gain: f32,
    /// The log-domain follower only sees magnitudes, this restores the attenuation's sign.
    feedback_sign: f32,
}

impl GainStage {
    pub fn new(params: &BlockParams) -> Self {
        Self {
            mix: params.mix,
            mix_inverse: 1.0 - params.mix,
            ratio_inverse: (1.0 / params.ratio) - 1.0,
            volume_gain: util::db_to_gain(params.volume_db),
            threshold_db: params.threshold_db,
            threshold_gain: util::db_to_gain(params.threshold_db),
            feedback_sign: if params.ratio > 1.0 { -1.0 } else { 1.0 },
        }
    }

    pub fn ratio_inverse(&self) -> f32 {
        self.ratio_inverse
    }

    pub fn threshold_gain(&self) -> f32 {
        self.threshold_gain
    }

    /// The static curve: the gain change for a level in decibels. The threshold is inclusive.
    #[inline]
    pub fn attenuation_db(&self, level_db: f32) -> f32 {
        if level_db >= self.threshold_db {
            (level_db - self.threshold_db) * self.ratio_inverse
        } else {
            0.0
        }
    }

    /// Apply a gain change to the input and blend the result with the dry signal.
    #[inline]
    fn apply(&self, input: f32, gain_db: f32) -> GainOutput {
        let wet = input * util::db_to_gain(gain_db);
        GainOutput {
            sample: self.volume_gain * (self.mix * wet + self.mix_inverse * input),
            gain_db,
        }
    }

    #[inline]
    fn feed_forward(&self, input: f32, envelope: f32) -> GainOutput {
        let smooth_db = util::gain_to_db(envelope + DETECTOR_FLOOR);
        self.apply(input, self.attenuation_db(smooth_db))
    }

    #[inline]
    pub fn return_to_zero(&self, input: f32, follower: &mut EnvelopeFollower) -> GainOutput {
        let envelope = follower.process(input);
        self.feed_forward(input, envelope)
    }

    #[inline]
    pub fn return_to_threshold(&self, input: f32, follower: &mut EnvelopeFollower) -> GainOutput {
        let envelope = follower.process(input.max(self.threshold_gain));
        self.feed_forward(input, envelope)
    }

    #[inline]
    pub fn log_domain(&self, input: f32, follower: &mut EnvelopeFollower) -> GainOutput {
        let in_db = util::gain_to_db(input.abs() + DETECTOR_FLOOR);
        let smooth_db = self.feedback_sign * follower.process(self.attenuation_db(in_db));
        self.apply(input, smooth_db)
    }
}
