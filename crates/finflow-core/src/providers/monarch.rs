//! Monarch Money GraphQL client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::{AuthError, RefreshError};
use super::traits::Provider;
use crate::config::ProviderSettings;
use crate::logging::SharedLogger;
use crate::types::SessionHandle;
use crate::{log_debug, log_info};

const PROVIDER: &str = "monarch";

const LOGIN_MUTATION: &str = r#"
mutation Web_Login($email: String!, $password: String!, $mfaToken: String) {
  login(input: {email: $email, password: $password, mfaToken: $mfaToken}) {
    __typename
    ... on LoginSuccess { sessionToken }
    ... on LoginFailure { error { message } }
  }
}"#;

const ACCOUNT_IDS_QUERY: &str = r#"
query Web_GetAccountIds {
  accounts { id }
}"#;

const FORCE_REFRESH_MUTATION: &str = r#"
mutation Common_ForceRefreshAccountsMutation($input: ForceRefreshAccountsInput!) {
  forceRefreshAccounts(input: $input) {
    success
    errors { message }
  }
}"#;

const SYNC_STATUS_QUERY: &str = r#"
query ForceRefreshAccountsQuery {
  accounts { id hasSyncInProgress }
}"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest<'a> {
    operation_name: &'a str,
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

#[derive(Deserialize)]
struct LoginData {
    login: LoginPayload,
}

#[derive(Deserialize)]
#[serde(tag = "__typename")]
enum LoginPayload {
    LoginSuccess {
        #[serde(rename = "sessionToken")]
        session_token: String,
    },
    LoginFailure {
        error: Option<ErrorMessage>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
struct AccountsData {
    accounts: Vec<AccountStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountStatus {
    id: String,
    #[serde(default)]
    has_sync_in_progress: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForceRefreshData {
    force_refresh_accounts: ForceRefreshPayload,
}

#[derive(Deserialize)]
struct ForceRefreshPayload {
    success: bool,
    #[serde(default)]
    errors: Vec<ErrorMessage>,
}

/// Why a GraphQL call produced no data
#[derive(Debug)]
enum CallError {
    Transport(String),
    Status(u16, String),
    Graphql(String),
    Decode(String),
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Transport(m) => write!(f, "{}", m),
            CallError::Status(code, body) if body.is_empty() => write!(f, "HTTP {}", code),
            CallError::Status(code, body) => write!(f, "HTTP {}: {}", code, body),
            CallError::Graphql(m) => write!(f, "{}", m),
            CallError::Decode(m) => write!(f, "unexpected response: {}", m),
        }
    }
}

/// Failure messages that mean the one-time code was stale rather than wrong
fn is_expired_code_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("expired") || lowered.contains("stale")
}

fn join_messages(errors: &[ErrorMessage]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn rejected_login(message: String) -> AuthError {
    if is_expired_code_message(&message) {
        AuthError::expired_challenge(PROVIDER, message)
    } else {
        AuthError::invalid_credentials(PROVIDER, message)
    }
}

/// GraphQL errors on login are rejections, everything else is a network failure
fn login_error(err: CallError) -> AuthError {
    match err {
        CallError::Graphql(message) => rejected_login(message),
        other => AuthError::network(PROVIDER, other.to_string()),
    }
}

/// Client for Monarch Money's GraphQL API
pub struct MonarchProvider {
    client: reqwest::Client,
    endpoint: String,
    logger: SharedLogger,
}

impl MonarchProvider {
    pub fn new(settings: &ProviderSettings, logger: SharedLogger) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| AuthError::network(PROVIDER, e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/graphql", settings.base_url.trim_end_matches('/')),
            logger,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation_name: &str,
        query: &str,
        variables: serde_json::Value,
        session: Option<&SessionHandle>,
    ) -> Result<T, CallError> {
        let body = GraphqlRequest {
            operation_name,
            query,
            variables,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Client-Platform", "web")
            .json(&body);
        if let Some(session) = session {
            request = request.header("Authorization", format!("Token {}", session.token()));
        }

        log_debug!(self.logger, "POST {} ({})", self.endpoint, operation_name);
        let response = request
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CallError::Status(status.as_u16(), text.trim().to_string()));
        }

        let parsed: GraphqlResponse<T> = response
            .json()
            .await
            .map_err(|e| CallError::Decode(e.to_string()))?;

        match parsed.data {
            Some(data) if parsed.errors.is_empty() => Ok(data),
            _ if !parsed.errors.is_empty() => Err(CallError::Graphql(join_messages(&parsed.errors))),
            _ => Err(CallError::Decode("missing data".to_string())),
        }
    }
}

#[async_trait]
impl Provider for MonarchProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn login(&self, email: &str, password: &str, code: &str) -> Result<SessionHandle, AuthError> {
        let variables = json!({
            "email": email,
            "password": password,
            "mfaToken": code,
        });

        let data: LoginData = self
            .execute("Web_Login", LOGIN_MUTATION, variables, None)
            .await
            .map_err(login_error)?;

        match data.login {
            LoginPayload::LoginSuccess { session_token } => {
                log_info!(self.logger, "Logged in to {}", PROVIDER);
                Ok(SessionHandle::new(PROVIDER, session_token))
            }
            LoginPayload::LoginFailure { error } => {
                let message = error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "login failed".to_string());
                Err(rejected_login(message))
            }
            LoginPayload::Unknown => Err(AuthError::invalid_credentials(
                PROVIDER,
                "unexpected login result type",
            )),
        }
    }

    async fn request_refresh(&self, session: &SessionHandle) -> Result<(), RefreshError> {
        let accounts: AccountsData = self
            .execute("Web_GetAccountIds", ACCOUNT_IDS_QUERY, json!({}), Some(session))
            .await
            .map_err(|e| RefreshError::remote(PROVIDER, e.to_string()))?;

        let ids: Vec<&str> = accounts.accounts.iter().map(|a| a.id.as_str()).collect();
        log_debug!(self.logger, "Requesting refresh of {} accounts", ids.len());

        let data: ForceRefreshData = self
            .execute(
                "Common_ForceRefreshAccountsMutation",
                FORCE_REFRESH_MUTATION,
                json!({ "input": { "accountIds": ids } }),
                Some(session),
            )
            .await
            .map_err(|e| RefreshError::remote(PROVIDER, e.to_string()))?;

        let payload = data.force_refresh_accounts;
        if payload.success {
            Ok(())
        } else if payload.errors.is_empty() {
            Err(RefreshError::remote(PROVIDER, "refresh request was not accepted"))
        } else {
            Err(RefreshError::remote(PROVIDER, join_messages(&payload.errors)))
        }
    }

    async fn is_refresh_complete(&self, session: &SessionHandle) -> Result<bool, RefreshError> {
        let data: AccountsData = self
            .execute("ForceRefreshAccountsQuery", SYNC_STATUS_QUERY, json!({}), Some(session))
            .await
            .map_err(|e| RefreshError::remote(PROVIDER, e.to_string()))?;

        let pending = data.accounts.iter().filter(|a| a.has_sync_in_progress).count();
        log_debug!(self.logger, "{} accounts still syncing", pending);
        Ok(pending == 0)
    }
}
