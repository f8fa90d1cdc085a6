//! Exercises `MediaServerConfig::load_from_file` against real files on
//! disk, including the "unset fields fall back to defaults" behavior
//! `json_parser::impl_json!`'s generated `Deserialize` provides.

use std::io::Write;

use media_server::MediaServerConfig;

#[test]
fn loads_a_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server_config.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"{{
            "server": {{
                "bind_address": "0.0.0.0",
                "rtmp_port": 1936,
                "max_chunk_size": 4096,
                "window_ack_size": 5000000,
                "applications": ["live", "live/room"]
            }},
            "simulcast": {{
                "max_queue_size": 64,
                "silence_timeout_frames": 5
            }},
            "frame_delay": {{
                "min_delay_ms": 10,
                "initial_min_delay_ms": 50,
                "latency_reduction_step_ms": 5
            }},
            "logging": {{
                "log_file_path": "server.log",
                "log_level": "warn",
                "enable_console": false,
                "enable_file": true
            }}
        }}"#
    )
    .unwrap();

    let config = MediaServerConfig::load_from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(config.server.rtmp_port, 1936);
    assert_eq!(config.server.applications, vec!["live".to_string(), "live/room".to_string()]);
    assert_eq!(config.simulcast.max_queue_size, 64);
    assert_eq!(config.frame_delay.latency_reduction_step_ms, 5);
    assert_eq!(config.logging.log_level, "warn");
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial_config.json");
    std::fs::write(&path, r#"{"server": {"rtmp_port": 2000}}"#).unwrap();

    let config = MediaServerConfig::load_from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(config.server.rtmp_port, 2000);
    // Unset fields keep RtmpServerConfig::default()'s values.
    assert_eq!(config.server.max_chunk_size, 128);
    assert_eq!(config.server.applications, vec!["live".to_string()]);
}

#[test]
fn missing_file_is_an_error() {
    let result = MediaServerConfig::load_from_file("/nonexistent/path/server_config.json");
    assert!(result.is_err());
}
