use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    pub upstream: UpstreamSettings,
    pub cache: CacheSettings,
    pub breaker: BreakerSettings,
    #[serde(default)]
    pub server: ServerSettings,
    /// Measurement-standard name -> reference signal names it expands to.
    #[serde(default)]
    pub measurement_standards: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamSettings {
    pub endpoint: String,
    pub scope: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl UpstreamSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    pub max_size: usize,
    pub ttl_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl BreakerSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_max_attempts() -> u32 {
    5
}

fn default_retry_backoff_secs() -> u64 {
    2
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

pub fn load_resolver_config() -> anyhow::Result<ResolverConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/resolver"))
        .add_source(config::Environment::with_prefix("RESOLVER").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_parse_config_with_defaults() {
        let raw = r#"
            [upstream]
            endpoint = "https://dgraph.example/storm/meta"
            scope = "api://00000000-0000-0000-0000-000000000000"

            [cache]
            max_size = 500
            ttl_secs = 300

            [breaker]
            failure_threshold = 5
            cooldown_secs = 60

            [measurement_standards]
            wind_speed = ["WindSpeed", "NacelleWindSpeed"]
        "#;

        let cfg: ResolverConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.upstream.retry_max_attempts, 5);
        assert_eq!(cfg.upstream.retry_backoff(), Duration::from_secs(2));
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(300));
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(
            cfg.measurement_standards["wind_speed"],
            vec!["WindSpeed", "NacelleWindSpeed"]
        );
    }
}
