//! Server configuration read from the environment at startup.

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const PRODUCTION: &str = "production";

/// Runtime configuration for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Pool size.
    pub max_connections: u32,
    /// Deployment environment name (`development`, `staging`, `production`).
    pub environment: String,
    /// Master code accepted for every identifier; enables bypass mode.
    pub otp_master_code: Option<String>,
    /// OTLP collector endpoint; tracing export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing, a numeric
    /// variable does not parse, or `OTP_MASTER_CODE` is set while
    /// `APP_ENV` is `production`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = non_blank("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".to_owned())
        })?;
        let host = non_blank("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = match non_blank("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => DEFAULT_PORT,
        };
        let max_connections = match non_blank("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::Config(format!("DATABASE_MAX_CONNECTIONS must be a valid u32: {e}"))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let environment = non_blank("APP_ENV").unwrap_or_else(|| "development".to_owned());
        let otp_master_code = non_blank("OTP_MASTER_CODE").map(|code| code.trim().to_owned());

        if otp_master_code.is_some() && environment == PRODUCTION {
            return Err(AppError::Config(
                "OTP_MASTER_CODE must not be set when APP_ENV is production".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            max_connections,
            environment,
            otp_master_code,
            otlp_endpoint: non_blank("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// Returns the `host:port` bind string.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
