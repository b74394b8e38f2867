use std::{env, net::SocketAddr};

use tracing::warn;

use crate::error::AppError;

const DEV_SECRET_KEY: &str = "dev-key";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub secret_key: String,
    pub debug: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .map(|url| normalize_database_url(&url))
            .unwrap_or_else(|_| "sqlite://folio.db".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid PORT: {err}")))?;
        let listen_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let secret_key = env::var("SECRET_KEY").unwrap_or_else(|_| {
            warn!("SECRET_KEY is not set, sessions are signed with an insecure development key");
            DEV_SECRET_KEY.to_string()
        });

        let debug = env::var("DEBUG").map(|v| is_truthy(&v)).unwrap_or(false);

        Ok(Self {
            database_url,
            listen_addr,
            secret_key,
            debug,
        })
    }
}

/// Hosting providers hand out `postgres://` connection strings; the drivers
/// only accept the `postgresql://` scheme.
pub fn normalize_database_url(url: &str) -> String {
    match url.strip_prefix("postgres://") {
        Some(rest) => format!("postgresql://{rest}"),
        None => url.to_string(),
    }
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_bare_postgres_scheme() {
        assert_eq!(
            normalize_database_url("postgres://user:pw@host/db"),
            "postgresql://user:pw@host/db"
        );
    }

    #[test]
    fn leaves_other_schemes_alone() {
        assert_eq!(
            normalize_database_url("sqlite://folio.db"),
            "sqlite://folio.db"
        );
        assert_eq!(
            normalize_database_url("postgresql://host/db"),
            "postgresql://host/db"
        );
    }

    #[test]
    fn recognizes_truthy_strings() {
        assert!(is_truthy("1"));
        assert!(is_truthy("True"));
        assert!(is_truthy(" yes "));
        assert!(is_truthy("ON"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }
}
