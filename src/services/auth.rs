//! Login entry point and current-user lookup.

use std::sync::Arc;

use serde_json::{Value, json};

use super::unwrap_data;
use crate::gateway::{ApiError, RequestGateway};
use crate::session::User;

pub const LOGIN_ENDPOINT: &str = "/v2/auth/login";
pub const CURRENT_USER_ENDPOINT: &str = "/auth/me";

const INVALID_LOGIN_RESPONSE: &str = "Invalid response from server";

/// Token and user from a successful login response.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResult {
    pub token: String,
    pub user: User,
}

pub struct AuthService {
    gateway: Arc<RequestGateway>,
}

impl AuthService {
    #[must_use]
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    /// Authenticate and store the resulting session.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error for a rejected login, or
    /// [`ApiError::InvalidResponse`] when a 2xx body carries no token.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let response = self
            .gateway
            .post(LOGIN_ENDPOINT, json!({ "email": email, "password": password }))
            .await?;
        let LoginResult { token, user } = parse_login_response(&response)?;
        self.gateway.session().login(user.clone(), token)?;
        Ok(user)
    }

    /// Fetch the authenticated user from the server.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error; a 401 also clears the local session.
    pub async fn current_user(&self) -> Result<Option<User>, ApiError> {
        let response = self.gateway.get(CURRENT_USER_ENDPOINT).await?;
        Ok(User::from_value(unwrap_data(response)))
    }

    /// Drop the local session. The server is not contacted.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if session storage cannot be cleared.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.gateway.session().logout()?;
        Ok(())
    }
}

/// Read `data.token` and `data.user` from a login response. A missing user
/// becomes an empty record.
///
/// # Errors
///
/// Returns [`ApiError::InvalidResponse`] when no non-empty token is present.
pub fn parse_login_response(response: &Value) -> Result<LoginResult, ApiError> {
    let data = response.get("data").unwrap_or(&Value::Null);
    let token = data
        .get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::InvalidResponse(INVALID_LOGIN_RESPONSE.to_owned()))?;
    let user = data
        .get("user")
        .cloned()
        .and_then(User::from_value)
        .unwrap_or_default();
    Ok(LoginResult { token: token.to_owned(), user })
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
