// config.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    // minutes
    pub jwt_maxage: i64,
    pub port: u16,
    pub public_url: String,
    pub storage_dir: String,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET_KEY")?;
        let jwt_maxage = required("JWT_MAXAGE")?
            .parse::<i64>()
            .map_err(|e| ConfigError::Invalid { name: "JWT_MAXAGE", reason: e.to_string() })?;

        let port = match std::env::var("PORT") {
            Ok(port) => port
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid { name: "PORT", reason: e.to_string() })?,
            Err(_) => 8000,
        };

        let redis_url = std::env::var("REDIS_URL").ok().filter(|url| !url.is_empty());

        let public_url = std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));
        let storage_dir = std::env::var("STORAGE_DIR")
            .unwrap_or_else(|_| "./storage".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Config {
            database_url,
            redis_url,
            jwt_secret,
            jwt_maxage,
            port,
            public_url: public_url.trim_end_matches('/').to_string(),
            storage_dir,
            allowed_origins,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Config {
        Config {
            database_url: "postgres://localhost/manpower_test".to_string(),
            redis_url: None,
            jwt_secret: "test-secret".to_string(),
            jwt_maxage: 60,
            port: 8000,
            public_url: "http://localhost:8000".to_string(),
            storage_dir: "./storage".to_string(),
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}
