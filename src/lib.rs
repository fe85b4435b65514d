use nih_plug::prelude::*;
use std::sync::Arc;

pub mod crest;
pub use crest::CrestFactor;
pub mod envelope;
pub use envelope::{BallisticType, EnvelopeFollower};
pub mod gain;
pub use gain::{auto_times, Architecture, Automation, BlockParams, GainStage};
pub mod meters;
pub use meters::{MeterSink, Meters};
pub mod processor;
pub use processor::ChannelProcessor;

pub struct CrestCompressor {
    params: Arc<CrestCompressorParams>,
    processor: ChannelProcessor,
    meters: Arc<Meters>,
}

#[derive(Params)]
pub struct CrestCompressorParams {
    /// Lets the log-domain detector derive its time constants from the crest factor.
    #[id = "automation"]
    pub automation: EnumParam<Automation>,

    #[id = "ballistic_type"]
    pub ballistic_type: EnumParam<BallisticType>,

    #[id = "architecture"]
    pub architecture: EnumParam<Architecture>,

    #[id = "attack"]
    pub attack: FloatParam,

    #[id = "release"]
    pub release: FloatParam,

    /// Values below 1 expand instead of compress.
    #[id = "ratio"]
    pub ratio: FloatParam,

    #[id = "threshold"]
    pub threshold: FloatParam,

    /// Dry/wet balance, `0` bypasses the gain computer entirely.
    #[id = "mix"]
    pub mix: FloatParam,

    /// Output gain applied after the dry/wet mix.
    #[id = "volume"]
    pub volume: FloatParam,
}

impl Default for CrestCompressor {
    fn default() -> Self {
        Self {
            params: Arc::new(CrestCompressorParams::default()),
            processor: ChannelProcessor::new(),
            meters: Arc::new(Meters::new()),
        }
    }
}

impl CrestCompressor {
    /// Peak meters written by debug builds. Reading a value resets it.
    pub fn meters(&self) -> Arc<Meters> {
        self.meters.clone()
    }
}

impl Default for CrestCompressorParams {
    fn default() -> Self {
        let defaults = BlockParams::default();

        Self {
            automation: EnumParam::new("Automation", defaults.automation),
            ballistic_type: EnumParam::new("Ballistic Type", defaults.ballistic_type),
            architecture: EnumParam::new("Architecture", defaults.architecture),
            attack: FloatParam::new(
                "Attack",
                defaults.attack_ms,
                FloatRange::Skewed {
                    min: 0.1,
                    max: 80.0,
                    factor: 0.5,
                },
            )
            .with_step_size(0.1)
            .with_unit(" ms"),
            release: FloatParam::new(
                "Release",
                defaults.release_ms,
                FloatRange::Skewed {
                    min: 1.0,
                    max: 200.0,
                    factor: 0.5,
                },
            )
            .with_step_size(1.0)
            .with_unit(" ms"),
            ratio: FloatParam::new(
                "Ratio",
                defaults.ratio,
                FloatRange::Linear { min: 0.5, max: 8.0 },
            )
            .with_step_size(0.1)
            .with_unit(":1"),
            threshold: FloatParam::new(
                "Threshold",
                defaults.threshold_db,
                FloatRange::Linear {
                    min: -60.0,
                    max: 12.0,
                },
            )
            .with_step_size(1.0)
            .with_unit(" dB"),
            mix: FloatParam::new("Mix", defaults.mix, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_step_size(0.05)
                .with_unit("%")
                .with_value_to_string(formatters::v2s_f32_percentage(0))
                .with_string_to_value(formatters::s2v_f32_percentage()),
            volume: FloatParam::new(
                "Volume",
                defaults.volume_db,
                FloatRange::Linear {
                    min: -24.0,
                    max: 24.0,
                },
            )
            .with_step_size(0.1)
            .with_unit(" dB"),
        }
    }
}

impl CrestCompressorParams {
    /// Read every parameter once. The result is used for an entire block.
    pub fn snapshot(&self) -> BlockParams {
        BlockParams {
            architecture: self.architecture.value(),
            automation: self.automation.value(),
            ballistic_type: self.ballistic_type.value(),
            attack_ms: self.attack.value(),
            release_ms: self.release.value(),
            ratio: self.ratio.value(),
            threshold_db: self.threshold.value(),
            mix: self.mix.value(),
            volume_db: self.volume.value(),
        }
    }
}

impl Plugin for CrestCompressor {
    const NAME: &'static str = "Crest Compressor";
    const VENDOR: &'static str = "Daishi Suzuki";
    const URL: &'static str = env!("CARGO_PKG_HOMEPAGE");
    const EMAIL: &'static str = "zukky.rikugame@gmail.com";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // The first audio IO layout is used as the default. The other layouts may be selected either
    // explicitly or automatically by the host or the user depending on the plugin API/backend.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),

            aux_input_ports: &[],
            aux_output_ports: &[],

            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::None;

    // Parameters are read once per block
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let Some(num_channels) = audio_io_layout.main_output_channels else {
            return false;
        };

        // Detector state is only ever created here, `reset()` keeps it as is
        self.processor.prepare(buffer_config.sample_rate, num_channels.get() as usize);
        nih_log!(
            "Prepared {} channel(s) at {} Hz",
            num_channels,
            buffer_config.sample_rate
        );

        true
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        if buffer.samples() == 0 {
            return ProcessStatus::Normal;
        }

        let params = self.params.snapshot();
        let meters: Option<&dyn MeterSink> = if cfg!(debug_assertions) {
            Some(&*self.meters)
        } else {
            None
        };
        self.processor.process_block(buffer.as_slice(), &params, meters);

        ProcessStatus::Normal
    }
}

impl ClapPlugin for CrestCompressor {
    const CLAP_ID: &'static str = "com.zukky.crest-compressor";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Feed-forward and log-domain compressor with crest-factor automation");
    const CLAP_MANUAL_URL: Option<&'static str> = Some(Self::URL);
    const CLAP_SUPPORT_URL: Option<&'static str> = None;

    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Compressor,
    ];
}

impl Vst3Plugin for CrestCompressor {
    const VST3_CLASS_ID: [u8; 16] = *b"CrestCompressor!";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Dynamics];
}

nih_export_clap!(CrestCompressor);
nih_export_vst3!(CrestCompressor);

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyContext;

    impl ProcessContext<CrestCompressor> for DummyContext {
        fn plugin_api(&self) -> PluginApi { PluginApi::Vst3 }
        fn execute_background(&self, _task: ()) {}
        fn execute_gui(&self, _task: ()) {}
        fn transport(&self) -> &Transport { unreachable!("transport unused") }
        fn next_event(&mut self) -> Option<PluginNoteEvent<CrestCompressor>> { None }
        fn send_event(&mut self, _event: PluginNoteEvent<CrestCompressor>) {}
        fn set_latency_samples(&self, _samples: u32) {}
        fn set_current_voice_capacity(&self, _capacity: u32) {}
    }

    fn prepared_plugin() -> CrestCompressor {
        let mut plugin = CrestCompressor::default();
        plugin.processor.prepare(48000.0, 2);
        plugin
    }

    #[test]
    fn test_snapshot_defaults() {
        let plugin = CrestCompressor::default();
        assert_eq!(plugin.params.snapshot(), BlockParams::default());
    }

    #[test]
    fn test_process_silence() {
        let mut plugin = prepared_plugin();
        let mut left = vec![0.0_f32; 64];
        let mut right = vec![0.0_f32; 64];
        let mut buffer = Buffer::default();
        unsafe { buffer.set_slices(64, |out| *out = vec![&mut left, &mut right]) };
        let mut aux = AuxiliaryBuffers { inputs: &mut [], outputs: &mut [] };
        let mut ctx = DummyContext;
        plugin.process(&mut buffer, &mut aux, &mut ctx);
        for ch in buffer.as_slice() {
            assert!(ch.iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_process_compresses_loud_input() {
        let mut plugin = prepared_plugin();
        let mut left = vec![1.0_f32; 4096];
        let mut right = vec![1.0_f32; 4096];
        let mut buffer = Buffer::default();
        unsafe { buffer.set_slices(4096, |out| *out = vec![&mut left, &mut right]) };
        let mut aux = AuxiliaryBuffers { inputs: &mut [], outputs: &mut [] };
        let mut ctx = DummyContext;
        plugin.process(&mut buffer, &mut aux, &mut ctx);
        let slices = buffer.as_slice();
        assert!(slices[0][4095] < 1.0);
        assert!(slices[0].iter().all(|&s| s > 0.0 && s <= 1.0));
        assert_eq!(slices[0], slices[1]);

        if cfg!(debug_assertions) {
            assert!(plugin.meters().take_gain_reduction_db() > 0.0);
        }
    }

    #[test]
    fn test_empty_buffer() {
        let mut plugin = prepared_plugin();
        let mut buffer = Buffer::default();
        let mut aux = AuxiliaryBuffers { inputs: &mut [], outputs: &mut [] };
        let mut ctx = DummyContext;
        assert!(matches!(
            plugin.process(&mut buffer, &mut aux, &mut ctx),
            ProcessStatus::Normal
        ));
    }
}
