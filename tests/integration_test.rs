//! Integration tests for the sp-services crate.
//!
//! These tests exercise the public API surface end-to-end: the facade, its
//! transport boundary, record mapping and the replay transport together.

use serde_json::{json, Value};
use sp_services::config::SpServicesConfig;
use sp_services::error::{SkipReason, SpResult};
use sp_services::records::{FieldVersion, Group};
use sp_services::replay::{RecordedResponse, ReplayFixture, ReplayTransport};
use sp_services::services::{Dispatch, SpServices};
use sp_services::transport::{
    Collection, Completion, CompletionStatus, Operation, OperationRequest, RawResponse, Results,
    Transport, UserFields,
};
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper: a scripted transport that records what it was asked
// ============================================================================

#[derive(Default)]
struct ScriptedTransport {
    user: UserFields,
    response: RawResponse,
    status: Option<CompletionStatus>,
    user_requests: Mutex<Vec<Vec<String>>>,
    requests: Mutex<Vec<OperationRequest>>,
}

impl ScriptedTransport {
    fn with_user(fields: &[(&str, Value)]) -> Arc<Self> {
        Arc::new(Self {
            user: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            ..Default::default()
        })
    }

    fn with_response(response: RawResponse, status: Option<CompletionStatus>) -> Arc<Self> {
        Arc::new(Self {
            response,
            status,
            ..Default::default()
        })
    }

    fn requests(&self) -> Vec<OperationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn current_user(&self, field_names: &[String]) -> SpResult<UserFields> {
        self.user_requests.lock().unwrap().push(field_names.to_vec());
        Ok(self.user.clone())
    }

    fn call(&self, request: OperationRequest, complete: Completion) -> SpResult<()> {
        self.requests.lock().unwrap().push(request);
        complete(
            self.response.clone(),
            self.status.clone().unwrap_or_default(),
        );
        Ok(())
    }
}

/// Holds completions until `flush` is called, like a host event loop.
#[derive(Default)]
struct DeferredTransport {
    response: RawResponse,
    pending: Mutex<Vec<Completion>>,
}

impl DeferredTransport {
    fn flush(&self) {
        let pending: Vec<Completion> = std::mem::take(&mut *self.pending.lock().unwrap());
        for complete in pending {
            complete(self.response.clone(), CompletionStatus::Success);
        }
    }
}

impl Transport for DeferredTransport {
    fn current_user(&self, _field_names: &[String]) -> SpResult<UserFields> {
        Ok(Vec::new())
    }

    fn call(&self, request: OperationRequest, complete: Completion) -> SpResult<()> {
        if request.is_async {
            self.pending.lock().unwrap().push(complete);
        } else {
            complete(self.response.clone(), CompletionStatus::Success);
        }
        Ok(())
    }
}

const GROUPS_XML: &str = r#"<Groups>
    <Group
      ID="1"
      Name="Administrators"
      Description="Admin Group"
      OwnerID="2"
      OwnerIsUser="False" />
    <Group
      ID="3"
      Name="IT Support Staff"
      Description="Group for IT Support staff"
      OwnerID="4"
      OwnerIsUser="True" />
  </Groups>"#;

const VERSIONS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <GetVersionCollectionResponse xmlns="http://schemas.microsoft.com/sharepoint/soap/">
      <GetVersionCollectionResult>
        <Versions>
          <Version Description="first draft" Modified="2015-11-13T10:20:02Z" Editor="11;#Test User,#DOMAIN\testuser,#test.user@example.com,#,#Test User" />
          <Version Description="second draft" Modified="2015-11-13T10:21:02Z" Editor="12;#Other User,#DOMAIN\other,#other@example.com,#,#Other User" />
          <Version Modified="2015-11-14T08:00:00Z" Editor="11;#Test User,#DOMAIN\testuser,#test.user@example.com,#,#Test User" />
        </Versions>
      </GetVersionCollectionResult>
    </GetVersionCollectionResponse>
  </soap:Body>
</soap:Envelope>"#;

// ============================================================================
// Current user
// ============================================================================

#[test]
fn test_current_user_default_field_set() {
    let transport = ScriptedTransport::with_user(&[
        ("ID", json!(10)),
        ("Name", json!(r"Domain\Test.User")),
        ("Title", json!("Test User")),
        ("EMail", json!("test.user@example.com")),
    ]);
    let services = SpServices::new(transport.clone());

    let user = services.get_current_user(None).unwrap().unwrap();

    let requested = transport.user_requests.lock().unwrap().clone();
    assert_eq!(requested, vec![vec!["ID", "Name", "Title", "EMail"]]);
    assert_eq!(user.get("id"), Some(&json!(10)));
    assert_eq!(user.get("name"), Some(&json!(r"Domain\Test.User")));
    assert_eq!(user.get("title"), Some(&json!("Test User")));
    assert_eq!(user.get("eMail"), Some(&json!("test.user@example.com")));
}

#[test]
fn test_current_user_explicit_fields() {
    let transport =
        ScriptedTransport::with_user(&[("ID", json!(10)), ("Name", json!("Test User"))]);
    let services = SpServices::new(transport.clone());

    let user = services.get_current_user(Some(&["ID", "Name"])).unwrap().unwrap();

    let requested = transport.user_requests.lock().unwrap().clone();
    assert_eq!(requested, vec![vec!["ID", "Name"]]);
    assert_eq!(user.len(), 2);
    assert_eq!(user.id(), Some(&json!(10)));
    assert_eq!(user.get("name"), Some(&json!("Test User")));
}

#[test]
fn test_current_user_colliding_fields_keep_last() {
    let transport = ScriptedTransport::with_user(&[("ID", json!(1)), ("Id", json!(2))]);
    let services = SpServices::new(transport);

    let user = services.get_current_user(Some(&["ID", "Id"])).unwrap().unwrap();

    assert_eq!(user.len(), 1);
    assert_eq!(user.id(), Some(&json!(2)));
}

// ============================================================================
// Group collection
// ============================================================================

#[test]
fn test_group_collection_into_collection() {
    let transport = ScriptedTransport::with_response(
        RawResponse {
            response_xml: Some(GROUPS_XML.to_string()),
            response_text: None,
        },
        None,
    );
    let services = SpServices::new(transport.clone());
    let groups: Collection<Group> = Collection::new();

    let dispatch = services
        .get_group_collection_from_user("test.user", &groups)
        .unwrap();

    assert_eq!(dispatch, Dispatch::Sent);
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].operation, Operation::GetGroupCollectionFromUser);
    assert!(!requests[0].is_async);
    assert_eq!(requests[0].param("userLoginName"), Some("test.user"));

    let groups = groups.to_vec();
    assert_eq!(groups.len(), 2, "should be 2 groups");

    assert_eq!(groups[0].id.as_deref(), Some("1"));
    assert_eq!(groups[0].name.as_deref(), Some("Administrators"));
    assert_eq!(groups[0].description.as_deref(), Some("Admin Group"));
    assert_eq!(groups[0].owner_id.as_deref(), Some("2"));
    assert_eq!(groups[0].owner_is_user.as_deref(), Some("False"));

    assert_eq!(groups[1].id.as_deref(), Some("3"));
    assert_eq!(groups[1].name.as_deref(), Some("IT Support Staff"));
    assert_eq!(groups[1].description.as_deref(), Some("Group for IT Support staff"));
    assert_eq!(groups[1].owner_id.as_deref(), Some("4"));
    assert_eq!(groups[1].owner_is_user.as_deref(), Some("True"));
}

#[test]
fn test_group_collection_appends_to_existing_items() {
    let transport = ScriptedTransport::with_response(RawResponse::from_body(GROUPS_XML), None);
    let services = SpServices::new(transport);
    let groups: Collection<Group> = Collection::new();
    groups.push(Group {
        id: Some("99".to_string()),
        ..Default::default()
    });

    services.get_group_collection_from_user("test.user", &groups).unwrap();

    let ids: Vec<_> = groups.to_vec().into_iter().map(|g| g.id.unwrap()).collect();
    assert_eq!(ids, vec!["99", "1", "3"]);
}

#[test]
fn test_group_collection_without_response_xml() {
    let transport = ScriptedTransport::with_response(RawResponse::default(), None);
    let services = SpServices::new(transport);
    let groups: Collection<Group> = Collection::new();

    services.get_group_collection_from_user("test.user", &groups).unwrap();

    assert!(groups.is_empty());
}

#[test]
fn test_group_collection_into_callback() {
    let transport = ScriptedTransport::with_response(
        RawResponse {
            response_xml: Some(GROUPS_XML.to_string()),
            response_text: None,
        },
        Some(CompletionStatus::Success),
    );
    let services = SpServices::new(transport.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    services
        .get_group_collection_from_user(
            "test.user",
            Results::<Group>::callback(move |response: RawResponse, status| {
                sink.lock().unwrap().push((response, status));
            }),
        )
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.response_xml.as_deref(), Some(GROUPS_XML));
    assert_eq!(seen[0].1, CompletionStatus::Success);
    assert_eq!(transport.requests()[0].operation, Operation::GetGroupCollectionFromUser);
}

// ============================================================================
// Version collection
// ============================================================================

#[test]
fn test_version_collection_into_collection() {
    let transport = ScriptedTransport::with_response(
        RawResponse {
            response_xml: None,
            response_text: Some(VERSIONS_XML.to_string()),
        },
        None,
    );
    let services = SpServices::new(transport.clone());
    let versions: Collection<FieldVersion> = Collection::new();

    let dispatch = services
        .get_version_collection("testList", "1", "Description", &versions)
        .unwrap();

    assert!(dispatch.is_sent());
    let requests = transport.requests();
    assert_eq!(requests[0].operation, Operation::GetVersionCollection);
    assert!(requests[0].is_async);
    assert_eq!(requests[0].param("strlistID"), Some("testList"));
    assert_eq!(requests[0].param("strlistItemID"), Some("1"));
    assert_eq!(requests[0].param("strFieldName"), Some("Description"));

    let versions = versions.to_vec();
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[0].value.as_deref(), Some("first draft"));
    assert_eq!(versions[0].modified.as_deref(), Some("2015-11-13T10:20:02Z"));
    assert_eq!(
        versions[0].editor.as_deref(),
        Some(r"11;#Test User,#DOMAIN\testuser,#test.user@example.com,#,#Test User")
    );
    assert_eq!(versions[0].editor_id(), Some("11"));
    assert_eq!(versions[0].modified_epoch_millis(), Some(1_447_410_002_000));

    assert_eq!(versions[1].value.as_deref(), Some("second draft"));
    assert_eq!(versions[1].editor_id(), Some("12"));

    assert_eq!(versions[2].value, None);
    assert_eq!(versions[2].modified.as_deref(), Some("2015-11-14T08:00:00Z"));
}

#[test]
fn test_version_collection_element_without_attributes() {
    let xml = r#"<Version>
    <Comment>Abc</Comment>
    <Modified>2015-11-13T10:21:02Z</Modified>
    <Editor>11;#Test User,#DOMAIN\test.user,#test.user@example.com,#,#Test User</Editor>
  </Version>"#;
    let transport = ScriptedTransport::with_response(
        RawResponse {
            response_xml: None,
            response_text: Some(xml.to_string()),
        },
        None,
    );
    let services = SpServices::new(transport);
    let versions: Collection<FieldVersion> = Collection::new();

    services
        .get_version_collection("testList", "1", "fieldName", &versions)
        .unwrap();

    assert_eq!(versions.len(), 1, "should be 1 version");
    assert_eq!(versions.get(0), Some(FieldVersion::default()));
}

#[test]
fn test_version_collection_into_callback() {
    let transport = ScriptedTransport::with_response(
        RawResponse {
            response_xml: None,
            response_text: Some("data".to_string()),
        },
        Some(CompletionStatus::from("status")),
    );
    let services = SpServices::new(transport.clone());
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);

    services
        .get_version_collection(
            "testList",
            "1",
            "fieldName",
            Results::<FieldVersion>::callback(move |response: RawResponse, status| {
                *sink.lock().unwrap() = Some((response, status));
            }),
        )
        .unwrap();

    let (response, status) = seen.lock().unwrap().take().unwrap();
    assert_eq!(response.response_text.as_deref(), Some("data"));
    assert_eq!(status.as_str(), "status");
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn test_version_collection_missing_inputs_sends_nothing() {
    let transport = ScriptedTransport::with_response(RawResponse::from_body(VERSIONS_XML), None);
    let services = SpServices::new(transport.clone());
    let versions: Collection<FieldVersion> = Collection::new();

    for (list, item, field) in [("", "1", "Title"), ("l", "", "Title"), ("l", "1", "")] {
        let dispatch = services
            .get_version_collection(list, item, field, &versions)
            .unwrap();
        assert!(matches!(
            dispatch,
            Dispatch::Skipped(SkipReason::MissingRequiredParameter(_))
        ));
    }

    assert!(versions.is_empty());
    assert!(transport.requests().is_empty());
}

#[test]
fn test_version_collection_fills_on_later_turn() {
    let transport = Arc::new(DeferredTransport {
        response: RawResponse::from_body(VERSIONS_XML),
        ..Default::default()
    });
    let services = SpServices::new(transport.clone());
    let versions: Collection<FieldVersion> = Collection::new();

    services
        .get_version_collection("testList", "1", "Description", &versions)
        .unwrap();
    assert!(versions.is_empty());

    transport.flush();
    assert_eq!(versions.len(), 3);
}

#[test]
fn test_no_transport_everything_is_a_no_op() {
    let services = SpServices::with_config(SpServicesConfig::default(), None);
    let versions: Collection<FieldVersion> = Collection::new();
    let groups: Collection<Group> = Collection::new();

    assert!(services.get_current_user(None).unwrap().is_none());
    assert_eq!(
        services.get_group_collection_from_user("u", &groups).unwrap(),
        Dispatch::Skipped(SkipReason::MissingTransport)
    );
    assert_eq!(
        services.get_version_collection("l", "1", "f", &versions).unwrap(),
        Dispatch::Skipped(SkipReason::MissingTransport)
    );
}

// ============================================================================
// End-to-end with the replay transport
// ============================================================================

fn replay_fixture() -> ReplayFixture {
    let mut fixture = ReplayFixture::default();
    fixture.current_user.insert("ID".to_string(), json!("10"));
    fixture.current_user.insert("Title".to_string(), json!("Test User"));
    fixture.current_user.insert("EMail".to_string(), json!("test.user@example.com"));
    fixture.responses.insert(
        Operation::GetGroupCollectionFromUser,
        RecordedResponse {
            response_xml: Some(GROUPS_XML.to_string()),
            ..Default::default()
        },
    );
    fixture.responses.insert(
        Operation::GetVersionCollection,
        RecordedResponse {
            response_text: Some(VERSIONS_XML.to_string()),
            ..Default::default()
        },
    );
    fixture
}

#[test]
fn test_replay_end_to_end_sync() {
    let transport = Arc::new(ReplayTransport::new(replay_fixture()).with_async_completion(false));
    let services = SpServices::new(transport.clone());

    let user = services.get_current_user(None).unwrap().unwrap();
    assert_eq!(user.len(), 3);
    assert_eq!(user.id(), Some(&json!("10")));

    let groups: Collection<Group> = Collection::new();
    services.get_group_collection_from_user("test.user", &groups).unwrap();
    assert_eq!(groups.len(), 2);

    let versions: Collection<FieldVersion> = Collection::new();
    services
        .get_version_collection("testList", "1", "Description", &versions)
        .unwrap();
    assert_eq!(versions.len(), 3);

    let operations: Vec<_> = transport.requests().iter().map(|r| r.operation).collect();
    assert_eq!(
        operations,
        vec![Operation::GetGroupCollectionFromUser, Operation::GetVersionCollection]
    );
}

#[tokio::test]
async fn test_replay_end_to_end_async() {
    let transport = Arc::new(ReplayTransport::new(replay_fixture()));
    let services = SpServices::new(transport);
    let (tx, rx) = tokio::sync::oneshot::channel();

    let dispatch = services
        .get_version_collection(
            "testList",
            "1",
            "Description",
            Results::<FieldVersion>::callback(move |response, status| {
                let _ = tx.send((response, status));
            }),
        )
        .unwrap();
    assert!(dispatch.is_sent());

    let (response, status) = rx.await.unwrap();
    assert!(status.is_success());
    let versions = FieldVersion::collect_from(&response, "Description").unwrap();
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[1].value.as_deref(), Some("second draft"));
}
