use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppEnv {
    pub backend_url: String,
    pub backend_api_key: String,
    /// Interval of the REST backend's change-feed polling tasks.
    pub poll_interval_ms: u64,
    pub avatar_bucket: String,
    pub capture_bucket: String,
}

impl Default for AppEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEnv {
    pub fn new() -> Self {
        dotenv().ok();

        Self {
            backend_url: env::var("BACKEND_URL").expect("BACKEND_URL must be set"),
            backend_api_key: env::var("BACKEND_API_KEY").expect("BACKEND_API_KEY must be set"),
            poll_interval_ms: Self::get_env("SUBSCRIBE_POLL_INTERVAL_MS", 1500),
            avatar_bucket: Self::get_str_env("AVATAR_BUCKET", "avatars".to_owned()),
            capture_bucket: Self::get_str_env("CAPTURE_BUCKET", "captures".to_owned()),
        }
    }

    fn get_env(var: &str, default: u64) -> u64 {
        env::var(var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_str_env(var: &str, default: String) -> String {
        env::var(var).unwrap_or(default)
    }
}
