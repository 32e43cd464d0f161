use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub yandex_api_key: String,
    pub yandex_folder_id: String,
    pub poll_interval_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a number")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            yandex_api_key: require_env("YANDEX_API_KEY")?,
            yandex_folder_id: require_env("YANDEX_FOLDER_ID")?,
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u64>()
                .context("POLL_INTERVAL_SECS must be a number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_reads_pool_size_and_defaults() {
        for (key, value) in [
            ("DATABASE_URL", "postgres://localhost/prospect"),
            ("S3_BUCKET", "prospect"),
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("AWS_ACCESS_KEY_ID", "minio"),
            ("AWS_SECRET_ACCESS_KEY", "minio123"),
            ("YANDEX_API_KEY", "key"),
            ("YANDEX_FOLDER_ID", "b1gexample"),
            ("DB_MAX_CONNECTIONS", "4"),
        ] {
            std::env::set_var(key, value);
        }
        std::env::remove_var("POLL_INTERVAL_SECS");
        std::env::remove_var("PORT");

        let config = Config::from_env().unwrap();
        assert_eq!(config.db_max_connections, 4);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.port, 8080);
    }
}
