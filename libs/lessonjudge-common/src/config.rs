// Application configuration, read from the environment
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Encoding the deployed judge instance expects on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JudgeTransport {
    /// Fields travel as plain UTF-8 text
    Plain,
    /// source/stdin/expected and every output field travel base64-encoded
    #[default]
    Base64,
}

impl JudgeTransport {
    pub fn is_base64(self) -> bool {
        matches!(self, JudgeTransport::Base64)
    }
}

impl FromStr for JudgeTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" => Ok(JudgeTransport::Plain),
            "base64" => Ok(JudgeTransport::Base64),
            other => Err(format!("unknown judge transport '{}' (expected plain or base64)", other)),
        }
    }
}

impl fmt::Display for JudgeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JudgeTransport::Plain => write!(f, "plain"),
            JudgeTransport::Base64 => write!(f, "base64"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}

pub struct Config {
    pub bind_addr: String,
    pub redis_url: String,
    pub judge_url: String,
    pub judge_auth_token: Option<String>,
    pub judge_transport: JudgeTransport,
    pub poll_interval: Duration,
    /// None keeps polling until the judge reports a terminal status
    pub max_poll_attempts: Option<u32>,
    pub judge_call_timeout: Option<Duration>,
    pub submission_deadline: Option<Duration>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            judge_url: "http://127.0.0.1:2358".to_string(),
            judge_auth_token: None,
            judge_transport: JudgeTransport::Base64,
            poll_interval: Duration::from_millis(2000),
            max_poll_attempts: None,
            judge_call_timeout: None,
            submission_deadline: None,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    /// Unset or blank variables keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let poll_interval = match get("JUDGE_POLL_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(parse_var("JUDGE_POLL_INTERVAL_MS", &raw)?),
            None => defaults.poll_interval,
        };

        let max_poll_attempts = get("JUDGE_MAX_POLL_ATTEMPTS")
            .map(|raw| parse_var::<u32>("JUDGE_MAX_POLL_ATTEMPTS", &raw))
            .transpose()?;
        if max_poll_attempts == Some(0) {
            return Err("JUDGE_MAX_POLL_ATTEMPTS must be at least 1".to_string());
        }

        let judge_call_timeout = get("JUDGE_CALL_TIMEOUT_MS")
            .map(|raw| parse_var("JUDGE_CALL_TIMEOUT_MS", &raw).map(Duration::from_millis))
            .transpose()?;

        let submission_deadline = get("SUBMISSION_DEADLINE_MS")
            .map(|raw| parse_var("SUBMISSION_DEADLINE_MS", &raw).map(Duration::from_millis))
            .transpose()?;

        let judge_transport = get("JUDGE_TRANSPORT")
            .map(|raw| parse_var("JUDGE_TRANSPORT", &raw))
            .transpose()?
            .unwrap_or(defaults.judge_transport);

        let log_format = get("LOG_FORMAT")
            .map(|raw| parse_var("LOG_FORMAT", &raw))
            .transpose()?
            .unwrap_or(defaults.log_format);

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            judge_url: get("JUDGE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.judge_url),
            judge_auth_token: get("JUDGE_AUTH_TOKEN"),
            judge_transport,
            poll_interval,
            max_poll_attempts,
            judge_call_timeout,
            submission_deadline,
            log_format,
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("Invalid value for {}: '{}' ({})", key, raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_match_unbounded_polling() {
        let config = load(&[]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.judge_transport, JudgeTransport::Base64);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_poll_attempts, None);
        assert_eq!(config.judge_call_timeout, None);
        assert_eq!(config.submission_deadline, None);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("JUDGE_URL", "http://judge0:2358/"),
            ("JUDGE_TRANSPORT", "Plain"),
            ("JUDGE_POLL_INTERVAL_MS", "250"),
            ("JUDGE_MAX_POLL_ATTEMPTS", "40"),
            ("JUDGE_CALL_TIMEOUT_MS", "15000"),
            ("SUBMISSION_DEADLINE_MS", "30000"),
            ("JUDGE_AUTH_TOKEN", "secret"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.judge_url, "http://judge0:2358");
        assert_eq!(config.judge_transport, JudgeTransport::Plain);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.max_poll_attempts, Some(40));
        assert_eq!(config.judge_call_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.submission_deadline, Some(Duration::from_secs(30)));
        assert_eq!(config.judge_auth_token.as_deref(), Some("secret"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = load(&[("JUDGE_MAX_POLL_ATTEMPTS", "  "), ("REDIS_URL", "")]).unwrap();
        assert_eq!(config.max_poll_attempts, None);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = load(&[("JUDGE_POLL_INTERVAL_MS", "soon")]).err().unwrap();
        assert!(err.contains("JUDGE_POLL_INTERVAL_MS"));

        let err = load(&[("JUDGE_TRANSPORT", "gzip")]).err().unwrap();
        assert!(err.contains("JUDGE_TRANSPORT"));

        assert!(load(&[("JUDGE_MAX_POLL_ATTEMPTS", "0")]).is_err());
    }
}
