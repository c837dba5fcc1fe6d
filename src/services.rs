//! Query facade over the SharePoint web services.
//!
//! Builds request parameters for the remote operations, hands them to the
//! injected transport and maps the raw responses into records.

use crate::config::SpServicesConfig;
use crate::error::{SkipReason, SpResult};
use crate::parser::detect_soap_fault;
use crate::records::{CurrentUser, FieldVersion, Group};
use crate::transport::{
    Collection, Completion, CompletionStatus, Operation, OperationRequest, RawResponse, Results,
    Transport,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a dispatching facade call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The request was handed to the transport
    Sent,
    /// Nothing was sent and the sink was left untouched
    Skipped(SkipReason),
}

impl Dispatch {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Facade over the SharePoint user, group and version services.
#[derive(Clone)]
pub struct SpServices {
    config: SpServicesConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl SpServices {
    /// Create a facade using the given transport and default configuration.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(SpServicesConfig::default(), Some(transport))
    }

    /// Create a facade with explicit configuration; `transport` may be absent.
    pub fn with_config(config: SpServicesConfig, transport: Option<Arc<dyn Transport>>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &SpServicesConfig {
        &self.config
    }

    /// Direct access to the injected transport, for operations the facade
    /// does not wrap.
    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    /// Get the current user with camelized field names as keys.
    ///
    /// `ID` maps to `id`. Without `field_names` the configured default set
    /// (`ID`, `Name`, `Title`, `EMail`) is requested. Returns `Ok(None)` when
    /// no transport is configured.
    pub fn get_current_user(
        &self,
        field_names: Option<&[&str]>,
    ) -> SpResult<Option<CurrentUser>> {
        let Some(transport) = self.transport.as_ref() else {
            debug!(reason = SkipReason::MissingTransport.as_str(), "Skipping current user lookup");
            return Ok(None);
        };

        let field_names: Vec<String> = match field_names {
            Some(names) => names.iter().map(|name| name.to_string()).collect(),
            None => self.config.settings.default_user_fields.clone(),
        };

        debug!(fields = ?field_names, "Looking up current user");
        let fields = transport.current_user(&field_names)?;
        Ok(Some(CurrentUser::from_fields(fields)))
    }

    /// Call `GetGroupCollectionFromUser` synchronously.
    ///
    /// With a collection every `Group` element of the XML response is mapped
    /// and appended in document order; with a callback the raw response and
    /// status are handed over untouched.
    pub fn get_group_collection_from_user(
        &self,
        user_login_name: &str,
        results: impl Into<Results<Group>>,
    ) -> SpResult<Dispatch> {
        let Some(transport) = self.transport.as_ref() else {
            return Ok(skipped(Operation::GetGroupCollectionFromUser, SkipReason::MissingTransport));
        };

        let request = OperationRequest::new(Operation::GetGroupCollectionFromUser, false)
            .with_param("userLoginName", user_login_name);

        debug!(
            operation = %request.operation,
            user_login_name = %user_login_name,
            "Dispatching group lookup"
        );

        let complete = match results.into() {
            Results::Callback(callback) => callback,
            Results::Collect(groups) => collect_groups(groups),
        };
        transport.call(request, complete)?;
        Ok(Dispatch::Sent)
    }

    /// Call `GetVersionCollection` asynchronously.
    ///
    /// All of `list_id`, `item_id` and `field_name` must be non-empty and a
    /// transport must be configured, otherwise nothing is sent. With a
    /// collection each `Version` element becomes a [`FieldVersion`] whose
    /// value is the attribute named `field_name`, appended when the transport
    /// completes.
    pub fn get_version_collection(
        &self,
        list_id: &str,
        item_id: &str,
        field_name: &str,
        results: impl Into<Results<FieldVersion>>,
    ) -> SpResult<Dispatch> {
        let Some(transport) = self.transport.as_ref() else {
            return Ok(skipped(Operation::GetVersionCollection, SkipReason::MissingTransport));
        };

        for (name, value) in [
            ("strlistID", list_id),
            ("strlistItemID", item_id),
            ("strFieldName", field_name),
        ] {
            if value.is_empty() {
                return Ok(skipped(
                    Operation::GetVersionCollection,
                    SkipReason::MissingRequiredParameter(name),
                ));
            }
        }

        let request = OperationRequest::new(Operation::GetVersionCollection, true)
            .with_param("strlistID", list_id)
            .with_param("strlistItemID", item_id)
            .with_param("strFieldName", field_name);

        debug!(
            operation = %request.operation,
            list_id = %list_id,
            item_id = %item_id,
            field_name = %field_name,
            "Dispatching version lookup"
        );

        let complete = match results.into() {
            Results::Callback(callback) => callback,
            Results::Collect(versions) => collect_versions(versions, field_name.to_string()),
        };
        transport.call(request, complete)?;
        Ok(Dispatch::Sent)
    }
}

impl std::fmt::Debug for SpServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpServices")
            .field("config", &self.config)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

fn skipped(operation: Operation, reason: SkipReason) -> Dispatch {
    debug!(
        operation = %operation,
        reason = reason.as_str(),
        detail = %reason,
        "Skipping remote operation"
    );
    Dispatch::Skipped(reason)
}

fn collect_groups(groups: Collection<Group>) -> Completion {
    Box::new(move |response: RawResponse, status: CompletionStatus| {
        log_completion(Operation::GetGroupCollectionFromUser, &response, &status);
        match Group::collect_from(&response) {
            Ok(parsed) => {
                debug!(count = parsed.len(), "Collected groups");
                groups.extend(parsed);
            }
            Err(e) => warn!(error = %e, "Failed to parse group collection response"),
        }
    })
}

fn collect_versions(versions: Collection<FieldVersion>, field_name: String) -> Completion {
    Box::new(move |response: RawResponse, status: CompletionStatus| {
        log_completion(Operation::GetVersionCollection, &response, &status);
        match FieldVersion::collect_from(&response, &field_name) {
            Ok(parsed) => {
                debug!(count = parsed.len(), field_name = %field_name, "Collected field versions");
                versions.extend(parsed);
            }
            Err(e) => warn!(error = %e, "Failed to parse version collection response"),
        }
    })
}

fn log_completion(operation: Operation, response: &RawResponse, status: &CompletionStatus) {
    if !status.is_success() {
        warn!(operation = %operation, status = %status, "Remote operation did not succeed");
    }
    let body = response
        .response_xml
        .as_deref()
        .or(response.response_text.as_deref());
    if let Some(fault) = body.and_then(detect_soap_fault) {
        warn!(operation = %operation, fault = %fault, "SOAP fault in response");
    }
}
