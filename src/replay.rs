//! Transport answering from recorded responses.
//!
//! Fixtures are YAML documents holding the current user's fields and one
//! recorded response per operation:
//!
//! ```yaml
//! current_user:
//!   ID: 10
//!   Title: Test User
//! responses:
//!   GetGroupCollectionFromUser:
//!     response_xml: |
//!       <Groups><Group ID="1" Name="Administrators" /></Groups>
//! ```

use crate::error::SpResult;
use crate::transport::{
    Completion, CompletionStatus, Operation, OperationRequest, RawResponse, Transport, UserFields,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// A recorded response for one operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedResponse {
    pub response_xml: Option<String>,
    pub response_text: Option<String>,
    pub status: CompletionStatus,
}

impl RecordedResponse {
    fn to_raw(&self) -> RawResponse {
        // A single recorded body serves both views of the response.
        let xml = self.response_xml.clone().or_else(|| self.response_text.clone());
        let text = self.response_text.clone().or_else(|| self.response_xml.clone());
        RawResponse {
            response_xml: xml,
            response_text: text,
        }
    }
}

/// Fixture file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayFixture {
    /// Raw current-user fields, keyed by SharePoint field name
    pub current_user: HashMap<String, Value>,
    pub responses: HashMap<Operation, RecordedResponse>,
}

impl ReplayFixture {
    pub fn from_file(path: impl AsRef<Path>) -> SpResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Transport serving a [`ReplayFixture`].
///
/// Asynchronous requests complete on a spawned tokio task when
/// `async_completion` is set and a runtime is running; everything else
/// completes inline.
#[derive(Debug)]
pub struct ReplayTransport {
    fixture: ReplayFixture,
    async_completion: bool,
    requests: Mutex<Vec<OperationRequest>>,
}

impl ReplayTransport {
    pub fn new(fixture: ReplayFixture) -> Self {
        Self {
            fixture,
            async_completion: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> SpResult<Self> {
        let path = path.as_ref();
        let fixture = ReplayFixture::from_file(path)?;
        info!(
            fixture = %path.display(),
            operations = fixture.responses.len(),
            "Loaded replay fixture"
        );
        Ok(Self::new(fixture))
    }

    pub fn with_async_completion(mut self, enabled: bool) -> Self {
        self.async_completion = enabled;
        self
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<OperationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn response_for(&self, operation: Operation) -> (RawResponse, CompletionStatus) {
        match self.fixture.responses.get(&operation) {
            Some(recorded) => (recorded.to_raw(), recorded.status.clone()),
            None => {
                warn!(operation = %operation, "No recorded response");
                (RawResponse::default(), CompletionStatus::Error)
            }
        }
    }
}

impl Transport for ReplayTransport {
    fn current_user(&self, field_names: &[String]) -> SpResult<UserFields> {
        Ok(field_names
            .iter()
            .filter_map(|name| {
                self.fixture
                    .current_user
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect())
    }

    fn call(&self, request: OperationRequest, complete: Completion) -> SpResult<()> {
        let (response, status) = self.response_for(request.operation);
        let deferred = request.is_async && self.async_completion;

        debug!(
            operation = %request.operation,
            is_async = request.is_async,
            status = %status,
            "Replaying response"
        );

        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) if deferred => {
                handle.spawn(async move { complete(response, status) });
            }
            _ => complete(response, status),
        }
        Ok(())
    }
}
