use std::env;
use std::path::PathBuf;

use qrdine_application::{FetchFailurePolicy, ResolverOptions};
use qrdine_core::AppError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackendConfig {
    Rest {
        base_url: String,
        api_key: String,
        access_token: Option<String>,
    },
    Postgres {
        database_url: String,
    },
    Memory {
        fixture_path: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub backend: StoreBackendConfig,
    pub http_timeout_ms: u64,
    pub resolver_options: ResolverOptions,
    pub failure_policy: FetchFailurePolicy,
}

impl CliConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("AUTHZ_BACKEND")
            .unwrap_or_else(|| "rest".to_owned())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "rest" => StoreBackendConfig::Rest {
                base_url: required_non_empty(&lookup, "SUPABASE_URL")?,
                api_key: required_non_empty(&lookup, "SUPABASE_ANON_KEY")?,
                access_token: lookup("SUPABASE_ACCESS_TOKEN")
                    .filter(|value| !value.trim().is_empty()),
            },
            "postgres" => StoreBackendConfig::Postgres {
                database_url: required_non_empty(&lookup, "DATABASE_URL")?,
            },
            "memory" => StoreBackendConfig::Memory {
                fixture_path: PathBuf::from(required_non_empty(&lookup, "AUTHZ_FIXTURE_PATH")?),
            },
            other => {
                return Err(AppError::Validation(format!(
                    "AUTHZ_BACKEND must be one of 'rest', 'postgres' or 'memory', got '{other}'"
                )));
            }
        };

        let http_timeout_ms = parse_u64(&lookup, "AUTHZ_HTTP_TIMEOUT_MS", 10_000)?;
        if http_timeout_ms == 0 {
            return Err(AppError::Validation(
                "AUTHZ_HTTP_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        let enforce_assignment_expiry = lookup("AUTHZ_ENFORCE_ASSIGNMENT_EXPIRY")
            .unwrap_or_else(|| "false".to_owned())
            .trim()
            .eq_ignore_ascii_case("true");

        let failure_policy = match lookup("AUTHZ_FETCH_FAILURE_POLICY")
            .unwrap_or_else(|| "retain".to_owned())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "retain" => FetchFailurePolicy::RetainPrevious,
            "clear" => FetchFailurePolicy::ClearSnapshot,
            other => {
                return Err(AppError::Validation(format!(
                    "AUTHZ_FETCH_FAILURE_POLICY must be either 'retain' or 'clear', got '{other}'"
                )));
            }
        };

        Ok(Self {
            backend,
            http_timeout_ms,
            resolver_options: ResolverOptions {
                enforce_assignment_expiry,
            },
            failure_policy,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn required_non_empty<F>(lookup: &F, name: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_u64<F>(lookup: &F, name: &str, default: u64) -> Result<u64, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value.trim().parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
