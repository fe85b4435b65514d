use nih_plug::prelude::Enum;

/// How the follower rises and falls. The variant order matches the host-facing choice list, so
/// the parameter index maps directly onto a variant.
#[derive(Enum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BallisticType {
    /// Peak hold with a one-pole release, followed by one-pole attack smoothing of the held peak.
    #[id = "decoupled"]
    #[name = "Decoupled"]
    Decoupled,
    /// Attack toward the input while it exceeds the envelope, otherwise decay toward zero.
    #[id = "branching"]
    #[name = "Branching"]
    Branching,
    /// Like [`BallisticType::Decoupled`], but the release stage glides toward the input instead of
    /// toward zero.
    #[id = "smooth_decoupled"]
    #[name = "Smooth Decoupled"]
    SmoothDecoupled,
    /// Like [`BallisticType::Branching`], but the release branch glides toward the input.
    #[id = "smooth_branching"]
    #[name = "Smooth Branching"]
    #[default]
    SmoothBranching,
}

/// Attack/release envelope follower. The output tracks the magnitude of whatever is fed into it,
/// which can be a linear sample or, for the log-domain detector, an attenuation in decibels.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    sample_rate: u32,
    ballistic_type: BallisticType,

    /// `exp(-1000 / (attack_ms * sample_rate))`.
    attack_coef: f32,
    /// `exp(-1000 / (release_ms * sample_rate))`.
    release_coef: f32,

    /// The smoothed output.
    out_last: f32,
    /// Intermediate peak stage, only used by the decoupled modes.
    out1_last: f32,
}

impl EnvelopeFollower {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            ballistic_type: BallisticType::default(),
            attack_coef: 0.0,
            release_coef: 0.0,
            out_last: 0.0,
            out1_last: 0.0,
        }
    }

    /// Recompute both coefficients. Times must be positive, the parameter ranges take care of
    /// that.
    pub fn set_coef(&mut self, attack_ms: f32, release_ms: f32) {
        let sample_rate = self.sample_rate as f32;
        self.attack_coef = (-1000.0 / (attack_ms * sample_rate)).exp();
        self.release_coef = (-1000.0 / (release_ms * sample_rate)).exp();
    }

    pub fn set_ballistic_type(&mut self, ballistic_type: BallisticType) {
        self.ballistic_type = ballistic_type;
    }

    pub fn ballistic_type(&self) -> BallisticType {
        self.ballistic_type
    }

    #[cfg(test)]
    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn attack_coef(&self) -> f32 {
        self.attack_coef
    }

    pub fn release_coef(&self) -> f32 {
        self.release_coef
    }

    /// The previously returned envelope value.
    pub fn current(&self) -> f32 {
        self.out_last
    }

    /// The held peak of the decoupled modes.
    pub fn held_peak(&self) -> f32 {
        self.out1_last
    }

    /// Feed one value through the follower and return the new envelope.
    pub fn process(&mut self, input: f32) -> f32 {
        let in_abs = input.abs();
        let attack = self.attack_coef;
        let release = self.release_coef;

        match self.ballistic_type {
            BallisticType::Decoupled => {
                self.out1_last = in_abs.max(release * self.out1_last);
                self.out_last = attack * self.out_last + (1.0 - attack) * self.out1_last;
            }
            BallisticType::Branching => {
                self.out_last = if in_abs > self.out_last {
                    attack * self.out_last + (1.0 - attack) * in_abs
                } else {
                    release * self.out_last
                };
            }
            BallisticType::SmoothDecoupled => {
                self.out1_last = in_abs.max(release * self.out1_last + (1.0 - release) * in_abs);
                self.out_last = attack * self.out_last + (1.0 - attack) * self.out1_last;
            }
            BallisticType::SmoothBranching => {
                self.out_last = if in_abs > self.out_last {
                    attack * self.out_last + (1.0 - attack) * in_abs
                } else {
                    release * self.out_last + (1.0 - release) * in_abs
                };
            }
        }

        self.out_last
    }
}
