use std::path::PathBuf;

use anyhow::{Context, bail};

/// JWT secrets copied from sample `.env` files that must never reach
/// a running server.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub token_ttl_hours: i64,
    pub secure_cookies: bool,
    /// Single allowed browser origin. Unset means permissive CORS.
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("MURMUR_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("MURMUR_JWT_SECRET is unset or still a placeholder");
        }

        let port = match lookup("MURMUR_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("MURMUR_PORT '{raw}' is not a port number"))?,
            None => 3000,
        };

        let token_ttl_hours = match lookup("MURMUR_TOKEN_TTL_HOURS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("MURMUR_TOKEN_TTL_HOURS '{raw}' is not a number"))?,
            None => 7,
        };
        if token_ttl_hours <= 0 {
            bail!("MURMUR_TOKEN_TTL_HOURS must be positive");
        }

        let secure_cookies = match lookup("MURMUR_SECURE_COOKIES").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => bail!("MURMUR_SECURE_COOKIES '{other}' is not a boolean"),
        };

        Ok(Self {
            jwt_secret,
            db_path: lookup("MURMUR_DB_PATH")
                .unwrap_or_else(|| "murmur.db".into())
                .into(),
            host: lookup("MURMUR_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            token_ttl_hours,
            secure_cookies,
            cors_origin: lookup("MURMUR_CORS_ORIGIN").filter(|o| !o.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = load(&[("MURMUR_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("murmur.db"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.token_ttl_hours, 7);
        assert!(!config.secure_cookies);
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn missing_or_placeholder_secret_is_refused() {
        assert!(load(&[]).is_err());
        assert!(load(&[("MURMUR_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("MURMUR_JWT_SECRET", "a-real-secret"),
            ("MURMUR_PORT", "8080"),
            ("MURMUR_TOKEN_TTL_HOURS", "24"),
            ("MURMUR_SECURE_COOKIES", "true"),
            ("MURMUR_CORS_ORIGIN", "https://murmur.example"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.token_ttl_hours, 24);
        assert!(config.secure_cookies);
        assert_eq!(config.cors_origin.as_deref(), Some("https://murmur.example"));
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(load(&[("MURMUR_JWT_SECRET", "s3"), ("MURMUR_PORT", "http")]).is_err());
        assert!(load(&[("MURMUR_JWT_SECRET", "s3"), ("MURMUR_TOKEN_TTL_HOURS", "0")]).is_err());
        assert!(load(&[("MURMUR_JWT_SECRET", "s3"), ("MURMUR_SECURE_COOKIES", "maybe")]).is_err());
    }
}
