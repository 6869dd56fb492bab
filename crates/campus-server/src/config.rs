use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("CAMPUS_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CAMPUS_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let db_path = var("CAMPUS_DB_PATH").unwrap_or_else(|| "campus.db".into()).into();
        let host = var("CAMPUS_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("CAMPUS_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("CAMPUS_PORT must be a port number")?;
        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;
        let seed_demo = var("CAMPUS_SEED_DEMO").is_some_and(|v| v == "1");

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            seed_demo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("CAMPUS_JWT_SECRET", "s3cr3t-for-tests")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("campus.db"));
        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert!(!config.seed_demo);
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(load(&[]).is_err());
        assert!(load(&[("CAMPUS_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("CAMPUS_JWT_SECRET", "s3cr3t-for-tests"),
            ("CAMPUS_HOST", "127.0.0.1"),
            ("CAMPUS_PORT", "8080"),
            ("CAMPUS_SEED_DEMO", "1"),
        ])
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert!(config.seed_demo);
        assert!(load(&[("CAMPUS_JWT_SECRET", "x"), ("CAMPUS_PORT", "http")]).is_err());
    }
}
