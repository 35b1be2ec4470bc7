#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub classifier_url: String,
    pub classifier_api_key: Option<String>,
    pub classifier_model: String,
    pub classifier_timeout_secs: u64,
    pub analysis_workers: usize,
    pub analysis_queue_capacity: usize,
    pub analysis_sweep_capacity: usize,
    pub analysis_max_attempts: u32,
    pub analysis_backoff_base_ms: u64,
    pub reprocess_cron: String,
    pub trends_default_top: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("classifier_url", &self.classifier_url)
            .field(
                "classifier_api_key",
                &self.classifier_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("classifier_model", &self.classifier_model)
            .field("classifier_timeout_secs", &self.classifier_timeout_secs)
            .field("analysis_workers", &self.analysis_workers)
            .field("analysis_queue_capacity", &self.analysis_queue_capacity)
            .field("analysis_sweep_capacity", &self.analysis_sweep_capacity)
            .field("analysis_max_attempts", &self.analysis_max_attempts)
            .field("analysis_backoff_base_ms", &self.analysis_backoff_base_ms)
            .field("reprocess_cron", &self.reprocess_cron)
            .field("trends_default_top", &self.trends_default_top)
            .finish()
    }
}
