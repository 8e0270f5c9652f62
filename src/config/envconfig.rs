use std::path::Path;

use ::config as config_rs;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Loads a config struct from `APP_`-prefixed variables, where `__` separates
/// nested sections (`APP_MAIL__SMTP_HOST` -> `mail.smtp_host`).
pub trait EnvConfig: Sized + DeserializeOwned {
    const PREFIX: &'static str = "APP";
    const SEPARATOR: &'static str = "__";

    fn load_dotenv() {
        // crate root first, then the working directory
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        let _ = dotenvy::from_filename(manifest_dir.join(".env")).or_else(|_| dotenvy::dotenv());
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn from_env() -> Result<Self> {
        Self::load_dotenv();
        Self::from_source(None)
    }

    /// Same as `from_env` but reads `vars` instead of the process
    /// environment, and skips `.env`.
    fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::from_source(Some(map))
    }

    fn from_source(vars: Option<config_rs::Map<String, String>>) -> Result<Self> {
        let environment = config_rs::Environment::with_prefix(Self::PREFIX)
            .prefix_separator("_")
            .separator(Self::SEPARATOR)
            .try_parsing(true)
            .source(vars);

        let cfg = config_rs::Config::builder()
            .add_source(environment)
            .build()
            .context("failed to read environment variables for config")?
            .try_deserialize::<Self>()
            .context("failed to deserialize environment into config")?;

        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::EnvConfig;
    use crate::config::{AppConfig, LogFormat, MailTransport};

    #[test]
    fn nested_sections_come_from_double_underscore_keys() {
        let cfg = AppConfig::from_vars([
            ("APP_GENERAL__PORT", "9090"),
            ("APP_LOGGING__FORMAT", "json"),
            ("APP_AUTH__SECURE_COOKIES", "false"),
            ("APP_MAIL__PUBLIC_URL", "https://cards.example.com"),
        ])
        .expect("config should load");

        assert_eq!(cfg.general.port, 9090);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert!(!cfg.auth.secure_cookies);
        assert_eq!(cfg.mail.public_url, "https://cards.example.com");
        assert_eq!(cfg.mail.transport, MailTransport::Log);
    }

    #[test]
    fn validation_runs_after_loading() {
        let err = AppConfig::from_vars([("APP_MAIL__TRANSPORT", "smtp")])
            .expect_err("smtp without host should fail");
        assert!(format!("{err:#}").contains("mail.smtp_host"));
    }
}
