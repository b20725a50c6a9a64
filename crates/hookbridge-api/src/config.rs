// Service configuration
//
// Built once in main from the environment and passed explicitly into the
// handlers via axum state. No ambient globals, no CLI flags.

/// Immutable service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listening port (PORT, default 3000)
    pub port: u16,
    /// Shared secret for signature verification (GITHUB_WEBHOOK_SECRET).
    /// Unset or empty disables verification entirely.
    pub webhook_secret: Option<String>,
    /// Downstream collector URL (FORWARD_URL). Unset or empty selects
    /// log-only delivery.
    pub forward_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            webhook_secret: env_non_empty("GITHUB_WEBHOOK_SECRET"),
            forward_url: env_non_empty("FORWARD_URL"),
        }
    }

    /// Whether inbound deliveries must carry a valid signature
    pub fn signature_required(&self) -> bool {
        self.webhook_secret.is_some()
    }
}

/// Read an environment variable, treating empty values as unset
fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the process-wide environment is only touched once
    #[test]
    fn test_from_env_defaults_and_overrides() {
        std::env::remove_var("PORT");
        std::env::remove_var("GITHUB_WEBHOOK_SECRET");
        std::env::remove_var("FORWARD_URL");

        let config = Config::from_env();
        assert_eq!(config.port, 3000);
        assert_eq!(config.webhook_secret, None);
        assert_eq!(config.forward_url, None);
        assert!(!config.signature_required());

        std::env::set_var("PORT", "8080");
        std::env::set_var("GITHUB_WEBHOOK_SECRET", "s3cret");
        // Empty string counts as unset
        std::env::set_var("FORWARD_URL", "");

        let config = Config::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.webhook_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.forward_url, None);
        assert!(config.signature_required());

        std::env::remove_var("PORT");
        std::env::remove_var("GITHUB_WEBHOOK_SECRET");
        std::env::remove_var("FORWARD_URL");
    }
}
