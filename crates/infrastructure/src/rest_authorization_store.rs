use async_trait::async_trait;
use qrdine_application::{AuthorizationStore, UserRoleAssignmentRecord};
use qrdine_core::{AppError, AppResult, UserId};
use reqwest::header;
use tracing::debug;
use url::Url;

/// Nested-join projection requested from the REST endpoint.
pub const ASSIGNMENT_SELECT: &str = "id,is_active,expires_at,role:roles(id,name,description,is_active,role_permissions(permission:permissions(id,name,description,resource,action)))";

/// Authorization store backed by a PostgREST-compatible REST endpoint.
#[derive(Clone)]
pub struct RestAuthorizationStore {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: String,
    access_token: String,
}

impl RestAuthorizationStore {
    /// Creates a store for the project at `base_url`.
    ///
    /// Requests authenticate with `access_token` when given, otherwise with
    /// the anonymous `api_key`.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
        access_token: Option<String>,
    ) -> AppResult<Self> {
        let mut normalized = base_url.trim().to_owned();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(normalized.as_str()).map_err(|error| {
            AppError::Validation(format!("invalid REST base url '{base_url}': {error}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "REST base url '{base_url}' cannot carry a path"
            )));
        }

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::Validation(
                "REST api key must not be empty".to_owned(),
            ));
        }
        let access_token = access_token
            .filter(|token| !token.trim().is_empty())
            .unwrap_or_else(|| api_key.clone());

        Ok(Self {
            http_client,
            base_url,
            api_key,
            access_token,
        })
    }

    /// Builds the assignment query URL for a user.
    pub fn assignments_url(&self, user_id: UserId) -> AppResult<Url> {
        let mut url = self.base_url.join("rest/v1/user_roles").map_err(|error| {
            AppError::Internal(format!("failed to build user_roles endpoint: {error}"))
        })?;
        url.query_pairs_mut()
            .append_pair("select", ASSIGNMENT_SELECT)
            .append_pair("user_id", format!("eq.{user_id}").as_str())
            .append_pair("is_active", "eq.true");
        Ok(url)
    }
}

#[async_trait]
impl AuthorizationStore for RestAuthorizationStore {
    async fn list_active_assignments(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleAssignmentRecord>> {
        let url = self.assignments_url(user_id)?;
        debug!(user_id = %user_id, "querying role assignments over REST");

        let response = self
            .http_client
            .get(url)
            .header("apikey", self.api_key.as_str())
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.access_token),
            )
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to query role assignments: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Internal(format!(
                "role assignment query returned status {}: {body}",
                status.as_u16()
            )));
        }

        response
            .json::<Vec<UserRoleAssignmentRecord>>()
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to decode role assignments for user '{user_id}': {error}"
                ))
            })
    }
}
