use json_parser::impl_json;

/// JSON-facing mirror of [`simulcast::SimulcastConfig`], kept separate so
/// the runtime crate doesn't need to depend on this workspace's JSON macro.
#[derive(Debug, Clone, Copy)]
pub struct SimulcastSettings {
    pub max_queue_size: usize,
    /// See `DESIGN.md`'s open-question resolution for the switch-down
    /// silence timeout.
    pub silence_timeout_frames: u32,
}

impl Default for SimulcastSettings {
    fn default() -> Self {
        SimulcastSettings {
            max_queue_size: 32,
            silence_timeout_frames: 3,
        }
    }
}

impl_json! {
    SimulcastSettings {
        max_queue_size: usize,
        silence_timeout_frames: u32,
    }
}

impl From<SimulcastSettings> for mediacore::SimulcastConfig {
    fn from(settings: SimulcastSettings) -> Self {
        mediacore::SimulcastConfig {
            num_layers: 1,
            max_queue_size: settings.max_queue_size,
            silence_timeout_frames: settings.silence_timeout_frames,
        }
    }
}
