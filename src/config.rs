use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub resources: ResourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    pub show_headers: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub allow_cors: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResourcesConfig {
    pub static_dir: String,
}

impl Config {
    /// Load configuration from `config.toml` (optional) and `MIDWAY_*`
    /// environment variables, falling back to coded defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from the specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("MIDWAY"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.allow_cors", false)?
            .set_default("resources.static_dir", "static")?
            .build()?;

        settings.try_deserialize()
    }

    /// Socket address for the given port override, or the configured port
    pub fn socket_addr(&self, port: Option<u16>) -> Result<SocketAddr, String> {
        let port = port.unwrap_or(self.server.port);
        format!("{}:{}", self.server.host, port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

impl Default for Config {
    /// Coded defaults, identical to the `load` fallbacks
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                workers: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: true,
                show_headers: false,
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
                max_connections: None,
            },
            http: HttpConfig { allow_cors: false },
            resources: ResourcesConfig {
                static_dir: "static".to_string(),
            },
        }
    }
}
