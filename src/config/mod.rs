use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite connection string
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// DashScope API key for the vision-language model
    pub dashscope_api_key: String,

    /// OpenAI-compatible DashScope endpoint
    #[serde(default = "default_dashscope_base_url")]
    pub dashscope_base_url: String,

    /// Vision model name
    #[serde(default = "default_dashscope_model")]
    pub dashscope_model: String,

    /// Base URL of the presentation service receiving notifications
    #[serde(default = "default_web_base_url")]
    pub web_base_url: String,

    /// Number of concurrent classification workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Timeout for one model call, in seconds. A hung call must not pin a
    /// worker slot forever.
    #[serde(default = "default_classifier_timeout_secs")]
    pub classifier_timeout_secs: u64,

    /// Timeout for one notification POST, in seconds
    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,

    /// Directory where inspection images are stored
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_url() -> String {
    "sqlite:data/inspection.db".to_string()
}

fn default_dashscope_base_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()
}

fn default_dashscope_model() -> String {
    "qwen-vl-plus".to_string()
}

fn default_web_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_worker_count() -> usize {
    10
}

fn default_classifier_timeout_secs() -> u64 {
    120
}

fn default_notify_timeout_secs() -> u64 {
    5
}

fn default_image_dir() -> String {
    "data/images".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
