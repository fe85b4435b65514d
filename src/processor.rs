use nih_plug::prelude::*;

use crate::crest::CrestFactor;
use crate::envelope::EnvelopeFollower;
use crate::gain::{auto_times, Architecture, Automation, BlockParams, GainOutput, GainStage};
use crate::meters::MeterSink;

/// Integration time of the crest factor trackers, in seconds.
pub const CREST_INTEGRATION_TIME: f32 = 0.2;

/// The detector state belonging to a single channel.
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub envelope: EnvelopeFollower,
    pub crest: CrestFactor,
}

impl ChannelState {
    fn new(sample_rate: u32) -> Self {
        let mut crest = CrestFactor::new(sample_rate);
        crest.set_coef(CREST_INTEGRATION_TIME);

        Self {
            envelope: EnvelopeFollower::new(sample_rate),
            crest,
        }
    }

    fn process(
        &mut self,
        samples: &mut [f32],
        params: &BlockParams,
        stage: &GainStage,
        meters: Option<&dyn MeterSink>,
    ) {
        let envelope = &mut self.envelope;
        envelope.set_coef(params.attack_ms, params.release_ms);
        envelope.set_ballistic_type(params.ballistic_type);

        match params.architecture {
            Architecture::ReturnToZero => {
                for sample in samples.iter_mut() {
                    let out = stage.return_to_zero(*sample, envelope);
                    *sample = write_meters(out, meters);
                }
            }
            Architecture::ReturnToThreshold => {
                for sample in samples.iter_mut() {
                    let out = stage.return_to_threshold(*sample, envelope);
                    *sample = write_meters(out, meters);
                }
            }
            Architecture::LogDomain => {
                let automatic = params.automation == Automation::Auto;
                for sample in samples.iter_mut() {
                    if automatic {
                        let crest_factor = self.crest.process(*sample);
                        adapt_time_constants(envelope, params, crest_factor, meters);
                    }

                    let out = stage.log_domain(*sample, envelope);
                    *sample = write_meters(out, meters);
                }
            }
        }
    }
}

/// Derive this sample's time constants from the crest factor. Samples without a usable crest
/// factor fall back to the block's own attack and release.
#[inline]
fn adapt_time_constants(
    envelope: &mut EnvelopeFollower,
    params: &BlockParams,
    crest_factor: f32,
    meters: Option<&dyn MeterSink>,
) {
    match auto_times(params.attack_ms, params.release_ms, crest_factor) {
        Some(times) => {
            envelope.set_coef(times.attack_ms, times.release_ms);
            if let Some(meters) = meters {
                meters.record_auto_times(times.attack_ms, times.release_ms, times.crest_factor_sq);
            }
        }
        None => envelope.set_coef(params.attack_ms, params.release_ms),
    }
}

#[inline]
fn write_meters(out: GainOutput, meters: Option<&dyn MeterSink>) -> f32 {
    if let Some(meters) = meters {
        meters.record_gain_reduction(out.gain_db.abs());
    }
    out.sample
}

/// Runs the compressor over a block of audio, one detector per channel. Nothing happens until
/// [`ChannelProcessor::prepare()`] has been called.
#[derive(Debug, Default)]
pub struct ChannelProcessor {
    channels: Option<Box<[ChannelState]>>,
}

impl ChannelProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate fresh detector state for `num_channels` channels. This discards all previous
    /// state and must not be called from the audio thread.
    pub fn prepare(&mut self, sample_rate: f32, num_channels: usize) {
        let sample_rate = (sample_rate as u32).max(1);
        self.channels = Some(
            (0..num_channels)
                .map(|_| ChannelState::new(sample_rate))
                .collect(),
        );
    }

    pub fn is_prepared(&self) -> bool {
        self.channels.is_some()
    }

    #[cfg(test)]
    pub(crate) fn num_channels(&self) -> usize {
        self.channels.as_ref().map_or(0, |channels| channels.len())
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelState> {
        self.channels.as_ref()?.get(index)
    }

    /// Process `buffer` in place. The parameters apply to the whole block. Channels beyond the
    /// prepared channel count are left untouched. Calling this before
    /// [`ChannelProcessor::prepare()`] is a debug assertion failure, release builds leave the
    /// buffer as is.
    pub fn process_block(
        &mut self,
        buffer: &mut [&mut [f32]],
        params: &BlockParams,
        meters: Option<&dyn MeterSink>,
    ) {
        let Some(channels) = self.channels.as_deref_mut() else {
            nih_debug_assert_failure!("Processing a block before the processor was prepared");
            return;
        };

        let stage = GainStage::new(params);
        for (samples, state) in buffer.iter_mut().zip(channels.iter_mut()) {
            state.process(samples, params, &stage, meters);
        }
    }
}
