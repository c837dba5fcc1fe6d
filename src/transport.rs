//! Transport boundary.
//!
//! The facade never speaks SOAP itself; it hands an [`OperationRequest`] to an
//! injected [`Transport`] and receives the raw response through a
//! [`Completion`].

use crate::error::SpResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

/// Remote operations issued by the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    GetGroupCollectionFromUser,
    GetVersionCollection,
}

impl Operation {
    /// Get the SOAP operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetGroupCollectionFromUser => "GetGroupCollectionFromUser",
            Self::GetVersionCollection => "GetVersionCollection",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for one remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub operation: Operation,
    /// When false the transport must complete before `call` returns
    pub is_async: bool,
    /// Operation parameters in the order they were added
    pub params: Vec<(&'static str, String)>,
}

impl OperationRequest {
    pub fn new(operation: Operation, is_async: bool) -> Self {
        Self {
            operation,
            is_async,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response handed to a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawResponse {
    /// Response body as an XML document
    pub response_xml: Option<String>,
    /// Response body as text
    pub response_text: Option<String>,
}

impl RawResponse {
    /// A response carrying the same body as both document and text.
    pub fn from_body(body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            response_xml: Some(body.clone()),
            response_text: Some(body),
        }
    }
}

/// Completion status reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CompletionStatus {
    #[default]
    Success,
    Error,
    Timeout,
    ParserError,
    NotModified,
    Abort,
    Other(String),
}

impl CompletionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::ParserError => "parsererror",
            Self::NotModified => "notmodified",
            Self::Abort => "abort",
            Self::Other(status) => status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::NotModified)
    }
}

impl From<String> for CompletionStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            "timeout" => Self::Timeout,
            "parsererror" => Self::ParserError,
            "notmodified" => Self::NotModified,
            "abort" => Self::Abort,
            _ => Self::Other(status),
        }
    }
}

impl From<&str> for CompletionStatus {
    fn from(status: &str) -> Self {
        Self::from(status.to_string())
    }
}

impl From<CompletionStatus> for String {
    fn from(status: CompletionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current-user fields in the order the transport returned them.
pub type UserFields = Vec<(String, Value)>;

/// Invoked exactly once with the raw response and its status.
pub type Completion = Box<dyn FnOnce(RawResponse, CompletionStatus) + Send + 'static>;

/// The injected remote-call capability.
pub trait Transport: Send + Sync {
    /// Look up the current user's fields (synchronous).
    ///
    /// Returns raw field names with their values, in response order.
    fn current_user(&self, field_names: &[String]) -> SpResult<UserFields>;

    /// Issue a remote operation.
    ///
    /// `complete` must be invoked exactly once. For requests with
    /// `is_async == false` it must be invoked before this returns.
    fn call(&self, request: OperationRequest, complete: Completion) -> SpResult<()>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn current_user(&self, field_names: &[String]) -> SpResult<UserFields> {
        (**self).current_user(field_names)
    }

    fn call(&self, request: OperationRequest, complete: Completion) -> SpResult<()> {
        (**self).call(request, complete)
    }
}

/// Shared list that completions append records to.
#[derive(Debug)]
pub struct Collection<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn push(&self, item: T) {
        self.lock().push(item);
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.lock().extend(items);
    }

    /// Take every item out, leaving the collection empty.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.lock())
    }

    // Poisoning is ignored; items pushed before a panic stay valid.
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone> Collection<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.lock().clone()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.lock().get(index).cloned()
    }
}

/// Where a collection operation delivers its results.
pub enum Results<T> {
    /// Parse the response and append records
    Collect(Collection<T>),
    /// Hand the raw response and status to a callback
    Callback(Completion),
}

impl<T> Results<T> {
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(RawResponse, CompletionStatus) + Send + 'static,
    {
        Self::Callback(Box::new(f))
    }
}

impl<T> From<Collection<T>> for Results<T> {
    fn from(collection: Collection<T>) -> Self {
        Self::Collect(collection)
    }
}

impl<T> From<&Collection<T>> for Results<T> {
    fn from(collection: &Collection<T>) -> Self {
        Self::Collect(collection.clone())
    }
}

impl<T> std::fmt::Debug for Results<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collect(_) => f.write_str("Results::Collect"),
            Self::Callback(_) => f.write_str("Results::Callback"),
        }
    }
}
