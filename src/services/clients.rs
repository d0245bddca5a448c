//! Dashboard client listing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::unwrap_data;
use crate::gateway::{ApiError, RequestGateway};

pub const CLIENTS_ENDPOINT: &str = "/clients";

/// Open client record; `id` and `name` are conventional, everything else
/// is passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Client(Map<String, Value>);

impl Client {
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.str_field("email")
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.str_field("phone")
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

pub struct ClientService {
    gateway: Arc<RequestGateway>,
}

impl ClientService {
    #[must_use]
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    /// List the tenant's clients.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error; a 401 also clears the local session.
    pub async fn list(&self) -> Result<Vec<Client>, ApiError> {
        let response = self.gateway.get(CLIENTS_ENDPOINT).await?;
        Ok(parse_client_list(response))
    }
}

/// Accept `{ "data": [...] }` or a bare array; anything else is an empty
/// list. Non-object entries are skipped.
#[must_use]
pub fn parse_client_list(response: Value) -> Vec<Client> {
    match unwrap_data(response) {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(Client(map)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[path = "clients_test.rs"]
mod tests;
