//! Configuration management for the relay.
//!
//! All configuration comes from environment variables, resolved once at
//! startup into an immutable [`ProxyConfig`] shared read-only for the life
//! of the process.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::time::Duration;

const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// The upstream credential. Wrapped so it cannot leak through `Debug`
/// formatting or structured logs.
#[derive(Clone)]
pub struct UpstreamKey(String);

impl UpstreamKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building the outbound credential header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UpstreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UpstreamKey(***)")
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL of the upstream provider, trailing '/' trimmed
    pub upstream_base_url: String,

    /// Credential substituted into every outbound request
    pub upstream_api_key: UpstreamKey,

    /// Local listen port
    pub listen_port: u16,

    /// Cap on in-flight upstream calls; `None` means unbounded.
    /// A cap of 1 reproduces strict one-at-a-time forwarding.
    pub max_concurrent_upstream: Option<usize>,

    /// Maximum time without receiving any bytes from the upstream before
    /// the relay is aborted
    pub idle_timeout: Duration,

    /// Bound on establishing the outbound connection
    pub connect_timeout: Duration,
}

impl ProxyConfig {
    /// Load configuration from the process environment.
    ///
    /// `API_ENDPOINT`, `API_KEY` and `PORT` are required; the rest fall back
    /// to defaults. Errors here are fatal and abort startup.
    pub fn from_env() -> Result<Self> {
        let upstream_base_url = std::env::var("API_ENDPOINT")
            .context("API_ENDPOINT environment variable is required")?
            .trim_end_matches('/')
            .to_string();
        if upstream_base_url.is_empty() {
            bail!("API_ENDPOINT must not be empty");
        }

        let key = std::env::var("API_KEY").context("API_KEY environment variable is required")?;
        if key.is_empty() {
            bail!("API_KEY must not be empty");
        }
        // The key is placed verbatim into a header value later.
        if key.chars().any(|c| c.is_ascii_control() || !c.is_ascii()) {
            bail!("API_KEY contains characters not representable in a header value");
        }

        let listen_port = std::env::var("PORT")
            .context("PORT environment variable is required")?
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let max_concurrent_upstream = match std::env::var("MAX_CONCURRENT_UPSTREAM") {
            Ok(raw) => {
                let cap = raw
                    .parse::<usize>()
                    .context("MAX_CONCURRENT_UPSTREAM must be a positive integer")?;
                if cap == 0 {
                    bail!("MAX_CONCURRENT_UPSTREAM must be at least 1");
                }
                Some(cap)
            }
            Err(_) => None,
        };

        let idle_timeout = duration_from_env("IDLE_TIMEOUT_SECONDS", DEFAULT_IDLE_TIMEOUT_SECS)?;
        let connect_timeout =
            duration_from_env("CONNECT_TIMEOUT_SECONDS", DEFAULT_CONNECT_TIMEOUT_SECS)?;

        Ok(Self {
            upstream_base_url,
            upstream_api_key: UpstreamKey::new(key),
            listen_port,
            max_concurrent_upstream,
            idle_timeout,
            connect_timeout,
        })
    }
}

fn duration_from_env(name: &str, default_secs: u64) -> Result<Duration> {
    let secs = match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{} must be a whole number of seconds", name))?,
        Err(_) => default_secs,
    };
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: &[&str] = &[
        "API_ENDPOINT",
        "API_KEY",
        "PORT",
        "MAX_CONCURRENT_UPSTREAM",
        "IDLE_TIMEOUT_SECONDS",
        "CONNECT_TIMEOUT_SECONDS",
    ];

    fn clear_env() {
        for var in ALL_VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    fn set_required() {
        unsafe {
            std::env::set_var("API_ENDPOINT", "https://openrouter.ai/api/v1");
            std::env::set_var("API_KEY", "sk-test-key");
            std::env::set_var("PORT", "5000");
        }
    }

    #[test]
    #[serial]
    fn test_load_minimal_config() {
        clear_env();
        set_required();

        let config = ProxyConfig::from_env().unwrap();
        assert_eq!(config.upstream_base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.upstream_api_key.expose(), "sk-test-key");
        assert_eq!(config.listen_port, 5000);
        assert_eq!(config.max_concurrent_upstream, None);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn test_missing_required_vars() {
        clear_env();
        assert!(ProxyConfig::from_env().is_err());

        set_required();
        unsafe {
            std::env::remove_var("API_KEY");
        }
        let err = ProxyConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("API_KEY"));

        set_required();
        unsafe {
            std::env::remove_var("PORT");
        }
        let err = ProxyConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    #[serial]
    fn test_trailing_slash_trimmed() {
        clear_env();
        set_required();
        unsafe {
            std::env::set_var("API_ENDPOINT", "http://localhost:8000/");
        }

        let config = ProxyConfig::from_env().unwrap();
        assert_eq!(config.upstream_base_url, "http://localhost:8000");
    }

    #[test]
    #[serial]
    fn test_invalid_port() {
        clear_env();
        set_required();
        unsafe {
            std::env::set_var("PORT", "not-a-port");
        }
        assert!(ProxyConfig::from_env().is_err());

        unsafe {
            std::env::set_var("PORT", "70000");
        }
        assert!(ProxyConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_concurrency_cap() {
        clear_env();
        set_required();
        unsafe {
            std::env::set_var("MAX_CONCURRENT_UPSTREAM", "1");
        }

        let config = ProxyConfig::from_env().unwrap();
        assert_eq!(config.max_concurrent_upstream, Some(1));

        unsafe {
            std::env::set_var("MAX_CONCURRENT_UPSTREAM", "0");
        }
        assert!(ProxyConfig::from_env().is_err());

        unsafe {
            std::env::set_var("MAX_CONCURRENT_UPSTREAM", "many");
        }
        assert!(ProxyConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_timeout_overrides() {
        clear_env();
        set_required();
        unsafe {
            std::env::set_var("IDLE_TIMEOUT_SECONDS", "120");
            std::env::set_var("CONNECT_TIMEOUT_SECONDS", "3");
        }

        let config = ProxyConfig::from_env().unwrap();
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    #[serial]
    fn test_key_never_in_debug_output() {
        clear_env();
        set_required();

        let config = ProxyConfig::from_env().unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-test-key"));
        assert!(rendered.contains("UpstreamKey(***)"));
    }

    #[test]
    #[serial]
    fn test_key_with_control_characters_rejected() {
        clear_env();
        set_required();
        unsafe {
            std::env::set_var("API_KEY", "bad\nkey");
        }
        assert!(ProxyConfig::from_env().is_err());
    }
}
