//! warmpool.toml configuration parser.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::pattern::EventPattern;
use crate::policy::{PolicyStatement, group_arn_for};
use crate::types::{Location, PoolState};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8480";
pub const DEFAULT_CREDENTIAL_ENV: &str = "WARMPOOL_FLEET_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmPoolConfig {
    pub pool: PoolConfig,
    pub rule: Option<RuleConfig>,
    pub fleet: Option<FleetConfig>,
    pub reactor: Option<ReactorConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub group_name: String,
    pub group_arn: Option<String>,
    /// RUNNING, STOPPED or HIBERNATED. Resolved leniently.
    pub state: Option<String>,
    pub min_size: Option<u32>,
    pub max_prepared_capacity: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub sources: Option<Vec<String>>,
    pub detail_types: Option<Vec<String>>,
    pub origins: Option<Vec<String>>,
    pub destinations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    pub endpoint: Option<String>,
    pub credential_env: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactorConfig {
    pub max_attempts: Option<u32>,
    pub base_backoff: Option<String>,
    pub max_backoff: Option<String>,
    pub invocation_timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: Option<String>,
}

/// Retry and deadline settings with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactorSettings {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub invocation_timeout: Duration,
}

impl Default for ReactorSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            invocation_timeout: Duration::from_secs(30),
        }
    }
}

impl WarmPoolConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a config document.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: WarmPoolConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check everything that can be checked without touching the network.
    ///
    /// Pool state is deliberately not checked here; see [`Self::pool_state_strict`].
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pool.group_name.trim().is_empty() {
            return Err(ConfigError::Invalid("pool.group_name must not be empty".into()));
        }
        if let (Some(min), Some(max)) = (self.pool.min_size, self.pool.max_prepared_capacity)
            && min > max
        {
            return Err(ConfigError::Invalid(format!(
                "pool.min_size ({min}) exceeds pool.max_prepared_capacity ({max})"
            )));
        }

        let pattern = self.event_pattern();
        for (field, empty) in [
            ("rule.sources", pattern.sources.is_empty()),
            ("rule.detail_types", pattern.detail_types.is_empty()),
            ("rule.origins", pattern.origins.is_empty()),
            ("rule.destinations", pattern.destinations.is_empty()),
        ] {
            if empty {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }

        let settings = self.reactor_settings()?;
        if settings.max_attempts == 0 {
            return Err(ConfigError::Invalid("reactor.max_attempts must be at least 1".into()));
        }
        self.fleet_timeout()?;
        self.listen_addr()?;
        Ok(())
    }

    /// Pool state with the lenient RUNNING fallback.
    pub fn pool_state(&self) -> PoolState {
        PoolState::resolve(self.pool.state.as_deref())
    }

    /// Pool state, failing on unrecognized values. Unset still means RUNNING.
    pub fn pool_state_strict(&self) -> ConfigResult<PoolState> {
        match self.pool.state.as_deref() {
            None => Ok(PoolState::Running),
            Some(raw) => raw.parse(),
        }
    }

    pub fn group_arn(&self) -> String {
        self.pool
            .group_arn
            .clone()
            .unwrap_or_else(|| group_arn_for(&self.pool.group_name))
    }

    pub fn completion_grant(&self) -> PolicyStatement {
        PolicyStatement::completion_grant(&self.group_arn())
    }

    /// Event pattern with unset rule fields taken from the default promotion pattern.
    pub fn event_pattern(&self) -> EventPattern {
        let mut pattern = EventPattern::default();
        let Some(rule) = &self.rule else {
            return pattern;
        };
        if let Some(sources) = &rule.sources {
            pattern.sources = sources.clone();
        }
        if let Some(detail_types) = &rule.detail_types {
            pattern.detail_types = detail_types.clone();
        }
        if let Some(origins) = &rule.origins {
            pattern.origins = origins.iter().map(|o| Location::from(o.as_str())).collect();
        }
        if let Some(destinations) = &rule.destinations {
            pattern.destinations = destinations
                .iter()
                .map(|d| Location::from(d.as_str()))
                .collect();
        }
        pattern
    }

    pub fn reactor_settings(&self) -> ConfigResult<ReactorSettings> {
        let mut settings = ReactorSettings::default();
        let Some(reactor) = &self.reactor else {
            return Ok(settings);
        };
        if let Some(n) = reactor.max_attempts {
            settings.max_attempts = n;
        }
        if let Some(s) = &reactor.base_backoff {
            settings.base_backoff = duration_field("reactor.base_backoff", s)?;
        }
        if let Some(s) = &reactor.max_backoff {
            settings.max_backoff = duration_field("reactor.max_backoff", s)?;
        }
        if let Some(s) = &reactor.invocation_timeout {
            settings.invocation_timeout = duration_field("reactor.invocation_timeout", s)?;
        }
        Ok(settings)
    }

    pub fn fleet_endpoint(&self) -> Option<&str> {
        self.fleet.as_ref().and_then(|f| f.endpoint.as_deref())
    }

    pub fn credential_env(&self) -> &str {
        self.fleet
            .as_ref()
            .and_then(|f| f.credential_env.as_deref())
            .unwrap_or(DEFAULT_CREDENTIAL_ENV)
    }

    pub fn fleet_timeout(&self) -> ConfigResult<Duration> {
        match self.fleet.as_ref().and_then(|f| f.timeout.as_deref()) {
            Some(s) => duration_field("fleet.timeout", s),
            None => Ok(Duration::from_secs(5)),
        }
    }

    pub fn listen_addr(&self) -> ConfigResult<SocketAddr> {
        let raw = self
            .server
            .as_ref()
            .and_then(|s| s.listen.as_deref())
            .unwrap_or(DEFAULT_LISTEN);
        raw.parse()
            .map_err(|_| ConfigError::Invalid(format!("server.listen is not an address: {raw:?}")))
    }

    /// Scaffold a minimal warmpool.toml for a group.
    pub fn scaffold(group_name: &str) -> Self {
        WarmPoolConfig {
            pool: PoolConfig {
                group_name: group_name.to_string(),
                group_arn: None,
                state: Some(PoolState::Running.to_string()),
                min_size: Some(1),
                max_prepared_capacity: None,
            },
            rule: None,
            fleet: Some(FleetConfig {
                endpoint: Some("http://127.0.0.1:8481/".to_string()),
                credential_env: None,
                timeout: Some("5s".to_string()),
            }),
            reactor: Some(ReactorConfig {
                max_attempts: Some(3),
                base_backoff: Some("200ms".to_string()),
                max_backoff: Some("5s".to_string()),
                invocation_timeout: Some("30s".to_string()),
            }),
            server: None,
        }
    }
}

fn duration_field(field: &'static str, value: &str) -> ConfigResult<Duration> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[pool]
group_name = "web"
"#;

    #[test]
    fn parse_minimal_applies_defaults() {
        let config = WarmPoolConfig::parse(MINIMAL).unwrap();
        assert_eq!(config.pool_state(), PoolState::Running);
        assert_eq!(config.event_pattern(), EventPattern::default());
        assert_eq!(config.reactor_settings().unwrap(), ReactorSettings::default());
        assert_eq!(config.credential_env(), DEFAULT_CREDENTIAL_ENV);
        assert_eq!(config.listen_addr().unwrap().port(), 8480);
        assert!(config.group_arn().ends_with("autoScalingGroupName/web"));
    }

    #[test]
    fn parse_full() {
        let toml_str = r#"
[pool]
group_name = "web"
group_arn = "arn:aws:autoscaling:eu-west-1:123:autoScalingGroup:abc:autoScalingGroupName/web"
state = "HIBERNATED"
min_size = 2
max_prepared_capacity = 8

[rule]
sources = ["fleet.autoscaling"]

[fleet]
endpoint = "http://fleet.internal:9000/"
credential_env = "FLEET_TOKEN"
timeout = "750ms"

[reactor]
max_attempts = 5
base_backoff = "100ms"
max_backoff = "2s"
invocation_timeout = "1m"

[server]
listen = "127.0.0.1:9999"
"#;
        let config = WarmPoolConfig::parse(toml_str).unwrap();
        assert_eq!(config.pool_state(), PoolState::Hibernated);
        assert!(config.group_arn().starts_with("arn:aws:autoscaling:eu-west-1"));
        assert_eq!(config.event_pattern().sources, vec!["fleet.autoscaling"]);
        assert_eq!(config.event_pattern().origins, vec![Location::WarmPool]);
        assert_eq!(config.fleet_endpoint(), Some("http://fleet.internal:9000/"));
        assert_eq!(config.credential_env(), "FLEET_TOKEN");
        assert_eq!(config.fleet_timeout().unwrap(), Duration::from_millis(750));

        let settings = config.reactor_settings().unwrap();
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.base_backoff, Duration::from_millis(100));
        assert_eq!(settings.max_backoff, Duration::from_secs(2));
        assert_eq!(settings.invocation_timeout, Duration::from_secs(60));
    }

    #[test]
    fn unknown_pool_state_is_lenient_but_strict_fails() {
        let config = WarmPoolConfig::parse(
            r#"
[pool]
group_name = "web"
state = "FROZEN"
"#,
        )
        .unwrap();
        assert_eq!(config.pool_state(), PoolState::Running);
        assert!(matches!(
            config.pool_state_strict(),
            Err(ConfigError::UnknownPoolState(_))
        ));
    }

    #[test]
    fn rejects_empty_group() {
        let err = WarmPoolConfig::parse("[pool]\ngroup_name = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_pattern_list() {
        let err = WarmPoolConfig::parse(
            r#"
[pool]
group_name = "web"

[rule]
origins = []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("rule.origins"));
    }

    #[test]
    fn rejects_bad_duration() {
        let err = WarmPoolConfig::parse(
            r#"
[pool]
group_name = "web"

[reactor]
base_backoff = "soon"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration { field: "reactor.base_backoff", .. }
        ));
    }

    #[test]
    fn rejects_zero_attempts() {
        let err = WarmPoolConfig::parse(
            r#"
[pool]
group_name = "web"

[reactor]
max_attempts = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_min_above_max() {
        let err = WarmPoolConfig::parse(
            r#"
[pool]
group_name = "web"
min_size = 5
max_prepared_capacity = 2
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_size"));
    }

    #[test]
    fn scaffold_round_trips_through_toml() {
        let config = WarmPoolConfig::scaffold("web");
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("group_name = \"web\""));
        assert!(WarmPoolConfig::parse(&toml_str).is_ok());
    }

    #[test]
    fn from_file_reads_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = WarmPoolConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pool.group_name, "web");
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("307445734561825861m"), None);
    }

    #[test]
    fn overflowing_minutes_are_invalid() {
        let err = WarmPoolConfig::parse(
            "[pool]\ngroup_name = \"web\"\n[reactor]\nmax_backoff = \"307445734561825861m\"\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration { field: "reactor.max_backoff", .. }
        ));
    }
}
