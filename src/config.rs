use clap::Args;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Base URL of the payments REST service, including its path prefix
    #[arg(long, env = "PAYMENTS_API_URL", default_value = "http://localhost:8080/api", global = true)]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "PAYMENTS_REQUEST_TIMEOUT", default_value = "10", global = true)]
    pub request_timeout_secs: u64,

    /// Quiet period after the last keystroke before a patient lookup is sent
    #[arg(long, default_value = "300", global = true)]
    pub debounce_ms: u64,

    /// Delay before suggestions are hidden once the search box loses focus
    #[arg(long, default_value = "200", global = true)]
    pub blur_grace_ms: u64,

    /// How long a success notice stays visible
    #[arg(long, default_value = "3", global = true)]
    pub notice_ttl_secs: u64,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn timings(&self) -> Timings {
        Timings {
            debounce: Duration::from_millis(self.debounce_ms),
            blur_grace: Duration::from_millis(self.blur_grace_ms),
            notice_ttl: Duration::from_secs(self.notice_ttl_secs),
        }
    }
}

/// Timer durations shared by the controllers and forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub debounce: Duration,
    pub blur_grace: Duration,
    pub notice_ttl: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            blur_grace: Duration::from_millis(200),
            notice_ttl: Duration::from_secs(3),
        }
    }
}
