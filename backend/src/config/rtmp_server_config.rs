use json_parser::impl_json;

/// RTMP ingest server configuration.
#[derive(Debug, Clone)]
pub struct RtmpServerConfig {
    pub bind_address: String,
    pub rtmp_port: u32,
    pub max_chunk_size: u32,
    pub window_ack_size: u32,
    /// Application names a `connect` command's `app` field is matched
    /// against via longest-prefix match (see `ApplicationRegistry`).
    pub applications: Vec<String>,
}

impl Default for RtmpServerConfig {
    fn default() -> Self {
        RtmpServerConfig {
            bind_address: "0.0.0.0".to_string(),
            rtmp_port: 1935,
            max_chunk_size: 128,
            window_ack_size: 2_500_000,
            applications: vec!["live".to_string()],
        }
    }
}

impl_json! {
    RtmpServerConfig {
        bind_address: String,
        rtmp_port: u32,
        max_chunk_size: u32,
        window_ack_size: u32,
        applications: Vec<String>,
    }
}
