//! Configuration management
//!
//! Everything comes from the environment, read once at startup. Required
//! variables fail startup with a named error; optional ones degrade the
//! specific feature they configure.

use std::time::Duration;

use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RESPONSE_DEADLINE_SECS: u64 = 180;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Live audio source fed into calls as hold audio.
    pub stream_url: String,
    pub twilio: TwilioConfig,
    pub slack: SlackConfig,
    /// Public hostname, used to build callback and media-socket URLs.
    pub public_host: String,
    /// SMS alert destination. `None` disables SMS alerts.
    pub alert_sms_to: Option<String>,
    /// Greeting audio asset. `None` falls back to a spoken greeting.
    pub greeting_url: Option<String>,
    pub port: u16,
    /// How long a call waits for a responder before voicemail.
    pub response_deadline: Duration,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender/caller id for outbound legs and SMS.
    pub number: String,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: String,
    pub channel_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &'static str| lookup(name).filter(|v| !v.is_empty());

        let port = match optional("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            None => DEFAULT_PORT,
        };
        let deadline_secs = match optional("RESPONSE_DEADLINE_SECS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("RESPONSE_DEADLINE_SECS", raw))?,
            None => DEFAULT_RESPONSE_DEADLINE_SECS,
        };

        Ok(Self {
            stream_url: require("STREAM_URL")?,
            twilio: TwilioConfig {
                account_sid: require("TWILIO_ACCOUNT_SID")?,
                auth_token: require("TWILIO_AUTH_TOKEN")?,
                number: require("TWILIO_NUMBER")?,
            },
            slack: SlackConfig {
                bot_token: require("SLACK_BOT_TOKEN")?,
                channel_id: require("SLACK_CHANNEL_ID")?,
            },
            public_host: require("PUBLIC_HOST")?,
            alert_sms_to: optional("ALERT_SMS_TO"),
            greeting_url: optional("GREETING_URL"),
            port,
            response_deadline: Duration::from_secs(deadline_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("STREAM_URL", "https://stream.example.org/live"),
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_NUMBER", "+15550009999"),
            ("SLACK_BOT_TOKEN", "xoxb-test"),
            ("SLACK_CHANNEL_ID", "C042"),
            ("PUBLIC_HOST", "relay.example.org"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn full_environment_loads_with_defaults() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.response_deadline, Duration::from_secs(180));
        assert!(config.alert_sms_to.is_none());
        assert!(config.greeting_url.is_none());
    }

    #[test]
    fn missing_required_variable_names_it() {
        let mut env = full_env();
        env.remove("SLACK_BOT_TOKEN");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SLACK_BOT_TOKEN")));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert("STREAM_URL", "");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("STREAM_URL")));
    }

    #[test]
    fn optional_values_are_picked_up() {
        let mut env = full_env();
        env.insert("ALERT_SMS_TO", "+15551230000");
        env.insert("PORT", "8080");
        env.insert("RESPONSE_DEADLINE_SECS", "60");
        let config = load(&env).unwrap();
        assert_eq!(config.alert_sms_to.as_deref(), Some("+15551230000"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.response_deadline, Duration::from_secs(60));
    }

    #[test]
    fn unparseable_port_is_rejected() {
        let mut env = full_env();
        env.insert("PORT", "not-a-port");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PORT", _)));
    }
}
