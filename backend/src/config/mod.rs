//! Media server configuration

pub mod frame_delay_settings;
pub mod logging_config;
pub mod media_server_config;
pub mod rtmp_server_config;
pub mod simulcast_settings;

pub use frame_delay_settings::FrameDelaySettings;
pub use logging_config::LoggingConfig;
pub use media_server_config::MediaServerConfig;
pub use rtmp_server_config::RtmpServerConfig;
pub use simulcast_settings::SimulcastSettings;
