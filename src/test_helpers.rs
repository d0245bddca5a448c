//! Shared fixtures for unit tests: a scripted transport and a wired gateway.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::gateway::RequestGateway;
use crate::session::SessionStore;
use crate::storage::{KeyValueStore, MemoryStore, StorageError};
use crate::transport::{HttpTransport, OutgoingRequest, TransportError, TransportResponse};

pub const TEST_BASE_URL: &str = "https://shop.test/api";
pub const TEST_TENANT: &str = "nextshop";

/// Scripted transport that records every request it sees.
///
/// Queued replies are returned in order; once empty it echoes the request
/// body back with status 200.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    pub sent: Mutex<Vec<OutgoingRequest>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, status: u16, body: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(TransportResponse { status, body: body.to_owned() }));
    }

    pub fn fail(&self, error: TransportError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    #[must_use]
    pub fn last(&self) -> OutgoingRequest {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(TransportResponse { status: 200, body: request.body.unwrap_or_default() }))
    }
}

/// Memory store whose removals always fail, like a session file on a
/// filesystem that went read-only after login.
#[derive(Default)]
pub struct ReadOnlyRemovals {
    pub inner: MemoryStore,
}

impl KeyValueStore for ReadOnlyRemovals {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        self.inner.set_all(entries)
    }

    fn remove_all(&self, _keys: &[&str]) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs")))
    }
}

/// Gateway wired to a fresh memory store and mock transport.
pub fn test_gateway() -> (RequestGateway, Arc<MockTransport>, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let session = Arc::new(SessionStore::new(storage.clone()));
    let transport = Arc::new(MockTransport::new());
    let gateway = RequestGateway::new(TEST_BASE_URL, TEST_TENANT, session, transport.clone()).unwrap();
    (gateway, transport, storage)
}
