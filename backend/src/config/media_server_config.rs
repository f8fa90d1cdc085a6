use json_parser::{from_str, impl_json};
use std::error::Error;

use crate::config::{FrameDelaySettings, LoggingConfig, RtmpServerConfig, SimulcastSettings};

/// Top-level media server configuration.
#[derive(Debug, Clone, Default)]
pub struct MediaServerConfig {
    pub server: RtmpServerConfig,
    pub simulcast: SimulcastSettings,
    pub frame_delay: FrameDelaySettings,
    pub logging: LoggingConfig,
}

impl_json! {
    MediaServerConfig {
        server: RtmpServerConfig,
        simulcast: SimulcastSettings,
        frame_delay: FrameDelaySettings,
        logging: LoggingConfig,
    }
}

impl MediaServerConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self, Box<dyn Error>> {
        let content = config_loader::load_config_file(path)?;
        from_str(&content).map_err(|e| e.into())
    }
}
