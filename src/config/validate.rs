use anyhow::{Result, bail};

use super::{AppConfig, MailTransport, defaults};

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.host.trim().is_empty() {
        errors.push("general.host must not be empty".to_string());
    }

    if cfg.database.url.trim().is_empty() {
        errors.push("database.url must not be empty".to_string());
    }

    if cfg.database.min_idle > cfg.database.max_connections {
        errors.push(format!(
            "database.min_idle ({}) must be <= database.max_connections ({})",
            cfg.database.min_idle, cfg.database.max_connections
        ));
    }

    let secret = cfg.auth.jwt_secret.trim();
    if secret.is_empty() {
        errors.push("auth.jwt_secret must not be empty".to_string());
    } else if !cfg!(debug_assertions) {
        if secret == defaults::DEV_JWT_SECRET {
            errors.push("auth.jwt_secret must be changed from the development default".to_string());
        } else if secret.len() < defaults::MIN_RELEASE_SECRET_LEN {
            errors.push(format!(
                "auth.jwt_secret must be at least {} bytes",
                defaults::MIN_RELEASE_SECRET_LEN
            ));
        }
    }

    if cfg.mail.transport == MailTransport::Smtp {
        let missing = [
            ("mail.smtp_host", &cfg.mail.smtp_host),
            ("mail.smtp_user", &cfg.mail.smtp_user),
            ("mail.smtp_pass", &cfg.mail.smtp_pass),
        ];
        for (name, value) in missing {
            if value.as_deref().map(str::trim).unwrap_or("").is_empty() {
                errors.push(format!("{name} is required when mail.transport = smtp"));
            }
        }
    }

    if cfg.mail.from.trim().is_empty() {
        errors.push("mail.from must not be empty".to_string());
    }

    if cfg.mail.max_attempts == 0 {
        errors.push("mail.max_attempts must be > 0".to_string());
    }

    if cfg.mail.queue_size == 0 {
        errors.push("mail.queue_size must be > 0".to_string());
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}
