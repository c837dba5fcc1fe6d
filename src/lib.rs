//! SharePoint SOAP services facade
//!
//! Exposes a handful of SharePoint web-service operations through a small
//! facade and converts their XML responses into plain records.
//!
//! # Features
//!
//! - Current user lookup with camelized field names (`ID` becomes `id`)
//! - Group membership lookup (`GetGroupCollectionFromUser`)
//! - Field version history lookup (`GetVersionCollection`) with derived
//!   editor id and modification time
//! - Pluggable transport, plus a replay transport for recorded responses
//!
//! # Example
//!
//! ```ignore
//! use sp_services::{Collection, ReplayTransport, SpServices};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(ReplayTransport::from_file("fixture.yaml")?);
//! let services = SpServices::new(transport);
//!
//! let user = services.get_current_user(None)?;
//! let groups = Collection::new();
//! services.get_group_collection_from_user("DOMAIN\\test.user", &groups)?;
//! ```

pub mod config;
pub mod error;
pub mod parser;
pub mod records;
pub mod replay;
pub mod services;
pub mod transport;

pub use config::SpServicesConfig;
pub use error::{SkipReason, SoapFault, SpError, SpResult};
pub use records::{CurrentUser, EditorDescriptor, FieldVersion, Group};
pub use replay::{ReplayFixture, ReplayTransport};
pub use services::{Dispatch, SpServices};
pub use transport::{
    Collection, Completion, CompletionStatus, Operation, OperationRequest, RawResponse, Results,
    Transport,
};
