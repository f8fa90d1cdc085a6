pub mod config;
pub mod tcp;

use config::MediaServerConfig;

fn main() {
    println!("RTMP Media Server - Starting...");

    // Load configuration
    let config = load_config();

    // Initialize logger
    let logger = initialize_logger(&config);

    logger.info("RTMP Media Server starting...");

    // Run RTMP accept loop
    run_rtmp_server(&config, logger);
}

/// Initializes the main logger from configuration
fn initialize_logger(config: &MediaServerConfig) -> logging::Logger {
    let log_level = config
        .logging
        .log_level
        .parse()
        .unwrap_or(logging::LogLevel::Info);
    let log_path = config.logging.log_file_path.clone().into();
    let enable_console = config.logging.enable_console;

    match logging::Logger::with_component(log_path, log_level, "Main".to_string(), enable_console) {
        Ok(logger) => {
            println!(
                "Logging initialized: {} (level: {})",
                config.logging.log_file_path, config.logging.log_level
            );
            logger
        }
        Err(e) => {
            eprintln!("Failed to create logger: {}", e);
            eprintln!("Cannot continue without logging system.");
            std::process::exit(1);
        }
    }
}

/// Loads configuration from file or returns default values
fn load_config() -> MediaServerConfig {
    // Determine the configuration file path in this order:
    // 1. CONFIG environment variable
    // 2. First command-line argument
    // 3. Default to "server_config.json"
    if let Ok(json_str) = std::env::var("CONFIG") {
        match json_parser::from_str::<MediaServerConfig>(&json_str) {
            Ok(cfg) => {
                println!("Configuration loaded from CONFIG env as JSON string");
                return cfg;
            }
            Err(e) => {
                eprintln!("CONFIG env is not valid JSON: {}", e);
            }
        }
    }

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "server_config.json".to_string());

    match MediaServerConfig::load_from_file(&config_path) {
        Ok(c) => {
            println!("Configuration loaded from: {}", config_path);
            c
        }
        Err(e) => {
            eprintln!(" Failed to load configuration from {}: {}", config_path, e);
            eprintln!("Using default values...");
            MediaServerConfig::default()
        }
    }
}

/// Runs the RTMP accept loop (blocking)
fn run_rtmp_server(config: &MediaServerConfig, main_logger: logging::Logger) {
    let bind_addr = format!("{}:{}", config.server.bind_address, config.server.rtmp_port);

    let rtmp_logger = main_logger.for_component("RTMP").unwrap_or_else(|e| {
        eprintln!("Failed to create RTMP logger: {}", e);
        std::process::exit(1);
    });

    let rtmp_server = tcp::RtmpServer::new(config.server.clone(), rtmp_logger.clone());

    println!("RTMP server starting on {}", bind_addr);
    rtmp_logger.info(&format!("RTMP server starting on {}", bind_addr));

    if let Err(e) = rtmp_server.start() {
        rtmp_logger.error(&format!("RTMP server error: {}", e));
        std::process::exit(1);
    }
}
