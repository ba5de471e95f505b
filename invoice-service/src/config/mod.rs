use rand::RngCore;
use secrecy::Secret;
use service_core::config::{self as core_config, get_env, get_optional_env};
use service_core::error::AppError;

const DEFAULT_STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

#[derive(Debug, Clone)]
pub struct InvoiceConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub admin: AdminConfig,
    pub session: SessionConfig,
    /// Directory served under `/static`.
    pub static_dir: String,
}

/// When `uri` is absent the service still starts; every data request then
/// fails with the store-unavailable error.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: Option<String>,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: Secret<String>,
    pub secure_cookie: bool,
}

impl InvoiceConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env, APP__ prefix and ENVIRONMENT)
        let common = core_config::Config::load()?;
        let is_prod = common.is_prod();

        let admin = if is_prod {
            AdminConfig {
                username: Some(get_env("ADMIN_USERNAME", None, true)?),
                password: Some(Secret::new(get_env("ADMIN_PASSWORD", None, true)?)),
            }
        } else {
            AdminConfig {
                username: get_optional_env("ADMIN_USERNAME"),
                password: get_optional_env("ADMIN_PASSWORD").map(Secret::new),
            }
        };

        let session_secret = match get_optional_env("SECRET_KEY") {
            Some(secret) => secret,
            None if is_prod => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "SECRET_KEY is required in production but not set"
                )))
            }
            None => {
                tracing::warn!("SECRET_KEY not set; sessions will not survive a restart");
                random_secret()
            }
        };

        Ok(InvoiceConfig {
            common,
            mongodb: MongoConfig {
                uri: get_optional_env("MONGO_URI"),
                database: get_env("DB_NAME", Some("invoice_db"), is_prod)?,
            },
            admin,
            session: SessionConfig {
                secret: Secret::new(session_secret),
                secure_cookie: get_env("SESSION_SECURE_COOKIE", Some("false"), false)?
                    .parse()
                    .map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!(
                            "SESSION_SECURE_COOKIE must be true or false: {}",
                            e
                        ))
                    })?,
            },
            static_dir: get_env("STATIC_DIR", Some(DEFAULT_STATIC_DIR), false)?,
        })
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
