use json_parser::impl_json;

/// JSON-facing mirror of [`simulcast::FrameDelayConfig`].
#[derive(Debug, Clone, Copy)]
pub struct FrameDelaySettings {
    pub min_delay_ms: i64,
    pub initial_min_delay_ms: i64,
    pub latency_reduction_step_ms: i64,
}

impl Default for FrameDelaySettings {
    fn default() -> Self {
        FrameDelaySettings {
            min_delay_ms: 0,
            initial_min_delay_ms: 0,
            latency_reduction_step_ms: 20,
        }
    }
}

impl_json! {
    FrameDelaySettings {
        min_delay_ms: i64,
        initial_min_delay_ms: i64,
        latency_reduction_step_ms: i64,
    }
}

impl From<FrameDelaySettings> for mediacore::FrameDelayConfig {
    fn from(settings: FrameDelaySettings) -> Self {
        mediacore::FrameDelayConfig {
            min_delay_ms: settings.min_delay_ms,
            initial_min_delay_ms: settings.initial_min_delay_ms,
            latency_reduction_step_ms: settings.latency_reduction_step_ms,
        }
    }
}
