//! Server configuration
//!
//! Configuration is loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Public base URL for link generation (optional)
    pub public_base_url: Option<String>,

    /// Document upload configuration
    pub document: DocumentConfig,

    /// WebSocket keepalive configuration
    pub ws: WsTimingConfig,

    /// Static file serving
    pub static_files: StaticFilesConfig,
}

/// Document-related configuration
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Directory uploaded documents are stored under
    pub upload_dir: PathBuf,
    /// Maximum upload size in bytes
    pub max_upload_size: usize,
}

/// WebSocket keepalive timing
#[derive(Debug, Clone)]
pub struct WsTimingConfig {
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
}

/// Static file serving configuration
#[derive(Debug, Clone, Default)]
pub struct StaticFilesConfig {
    /// Directory to serve; disabled when unset
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_base_url: None,
            document: DocumentConfig::default(),
            ws: WsTimingConfig::default(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_upload_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl Default for WsTimingConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Server config
        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }
        if let Ok(url) = env::var("PUBLIC_BASE_URL")
            && !url.is_empty()
        {
            config.public_base_url = Some(url);
        }

        // Document config
        if let Ok(dir) = env::var("UPLOAD_DIR")
            && !dir.is_empty()
        {
            config.document.upload_dir = PathBuf::from(dir);
        }
        if let Ok(val) = env::var("MAX_UPLOAD_SIZE_MB")
            && let Ok(mb) = val.parse::<usize>()
        {
            config.document.max_upload_size = mb * 1024 * 1024;
        }

        // WebSocket config
        if let Ok(val) = env::var("WS_PING_INTERVAL_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.ws.ping_interval = Duration::from_secs(secs);
        }
        if let Ok(val) = env::var("WS_PING_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.ws.ping_timeout = Duration::from_secs(secs);
        }

        // Static files
        if let Ok(dir) = env::var("STATIC_FILES_DIR")
            && !dir.is_empty()
        {
            config.static_files.dir = Some(PathBuf::from(dir));
        }

        config
    }
}
