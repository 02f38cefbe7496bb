//! Qrdine authorization inspector.

#![forbid(unsafe_code)]

mod cli_args;
mod cli_config;
mod report;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use qrdine_application::{AuthorizationContext, AuthorizationStore, PermissionResolver};
use qrdine_core::{AppError, AppResult, AuthenticatedUser};
use qrdine_infrastructure::{
    AuthorizationFixture, InMemoryAuthorizationStore, PostgresAuthorizationStore,
    RestAuthorizationStore,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::cli_args::CliCommand;
use crate::cli_config::{CliConfig, StoreBackendConfig, init_tracing};
use crate::report::AuthorizationReport;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = CliCommand::parse(env::args().skip(1))?;
    let config = CliConfig::load()?;
    let store = build_store(&config).await?;

    let resolver = Arc::new(PermissionResolver::new(store, config.resolver_options));
    let context = AuthorizationContext::new(resolver, config.failure_policy);

    info!(
        user_id = %command.user_id,
        backend = backend_label(&config.backend),
        guard = command.guard.is_some(),
        "resolving authorization"
    );

    context
        .set_identity(Some(&AuthenticatedUser::new(command.user_id)))
        .await;

    if let Some(error) = context.last_error() {
        warn!(user_id = %command.user_id, error = %error, "authorization resolution failed");
    }

    let report = AuthorizationReport::build(&context, command.guard.as_ref());
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|error| AppError::Internal(format!("failed to render report: {error}")))?;
    println!("{rendered}");

    Ok(())
}

async fn build_store(config: &CliConfig) -> AppResult<Arc<dyn AuthorizationStore>> {
    match &config.backend {
        StoreBackendConfig::Rest {
            base_url,
            api_key,
            access_token,
        } => {
            let http_client = reqwest::Client::builder()
                .timeout(Duration::from_millis(config.http_timeout_ms))
                .build()
                .map_err(|error| {
                    AppError::Internal(format!("failed to build HTTP client: {error}"))
                })?;

            Ok(Arc::new(RestAuthorizationStore::new(
                http_client,
                base_url.as_str(),
                api_key.clone(),
                access_token.clone(),
            )?))
        }
        StoreBackendConfig::Postgres { database_url } => {
            let pool = connect_pool(database_url.as_str()).await?;
            Ok(Arc::new(PostgresAuthorizationStore::new(pool)))
        }
        StoreBackendConfig::Memory { fixture_path } => {
            let contents = tokio::fs::read_to_string(fixture_path).await.map_err(|error| {
                AppError::Internal(format!(
                    "failed to read fixture '{}': {error}",
                    fixture_path.display()
                ))
            })?;
            let fixture: AuthorizationFixture =
                serde_json::from_str(contents.as_str()).map_err(|error| {
                    AppError::Validation(format!(
                        "invalid fixture '{}': {error}",
                        fixture_path.display()
                    ))
                })?;

            Ok(Arc::new(InMemoryAuthorizationStore::from_fixture(fixture).await?))
        }
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn backend_label(backend: &StoreBackendConfig) -> &'static str {
    match backend {
        StoreBackendConfig::Rest { .. } => "rest",
        StoreBackendConfig::Postgres { .. } => "postgres",
        StoreBackendConfig::Memory { .. } => "memory",
    }
}
