//! Blocking client for the Jira Cloud REST API v3 issue endpoint.

use crate::credentials::Credentials;
use hoist_core::config::ImportTarget;
use hoist_core::{ChildItemSpec, ParentItemSpec, RemoteCreationError, RemoteId, RemoteIssueClient};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue, json};
use tracing::debug;

const CREATED: u16 = 201;

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
    id: String,
}

pub struct JiraClient {
    agent: ureq::Agent,
    endpoint: String,
    auth_header: String,
    target: ImportTarget,
    requests: usize,
}

impl JiraClient {
    pub fn new(target: ImportTarget, credentials: &Credentials) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(target.timeout)
            .user_agent(concat!("hoist/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent,
            endpoint: format!("{}/rest/api/3/issue", target.base_url),
            auth_header: credentials.basic_auth_header(),
            target,
            requests: 0,
        }
    }

    pub const fn request_count(&self) -> usize {
        self.requests
    }

    fn epic_payload(&self, spec: &ParentItemSpec) -> JsonValue {
        let mut fields =
            self.base_fields(&spec.summary, &spec.description, &self.target.epic_type_id);
        if !spec.labels.is_empty() {
            fields.insert("labels".to_string(), json!(spec.labels));
        }
        json!({ "fields": fields })
    }

    fn story_payload(&self, spec: &ChildItemSpec, parent: &RemoteId) -> JsonValue {
        let mut fields =
            self.base_fields(&spec.summary, &spec.description, &self.target.story_type_id);
        fields.insert("parent".to_string(), json!({ "key": parent.key }));
        if let Some(points_field) = &self.target.points_field {
            fields.insert(points_field.clone(), json!(spec.weight));
        }
        json!({ "fields": fields })
    }

    fn base_fields(
        &self,
        summary: &str,
        description: &str,
        type_id: &str,
    ) -> Map<String, JsonValue> {
        let mut fields = Map::new();
        fields.insert(
            "project".to_string(),
            json!({ "key": self.target.project_key }),
        );
        fields.insert("summary".to_string(), json!(summary));
        fields.insert("description".to_string(), description_doc(description));
        fields.insert("issuetype".to_string(), json!({ "id": type_id }));
        fields
    }

    fn post_issue(&mut self, payload: &JsonValue) -> Result<RemoteId, RemoteCreationError> {
        self.requests += 1;
        debug!(endpoint = %self.endpoint, request = self.requests, "POST issue");

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &self.auth_header)
            .set("Accept", "application/json")
            .send_json(payload);

        match response {
            Ok(response) if response.status() == CREATED => {
                let created: CreatedIssue = response.into_json().map_err(|err| {
                    RemoteCreationError::status(CREATED, &format!("invalid response body: {err}"))
                })?;
                Ok(RemoteId::new(created.key, created.id))
            }
            Ok(response) => {
                let status = response.status();
                let body = response.into_string().unwrap_or_default();
                Err(RemoteCreationError::status(status, &body))
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(RemoteCreationError::status(status, &body))
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(RemoteCreationError::transport(transport.to_string()))
            }
        }
    }
}

impl RemoteIssueClient for JiraClient {
    fn create_parent(&mut self, spec: &ParentItemSpec) -> Result<RemoteId, RemoteCreationError> {
        let payload = self.epic_payload(spec);
        self.post_issue(&payload)
    }

    fn create_child(
        &mut self,
        spec: &ChildItemSpec,
        parent: &RemoteId,
    ) -> Result<RemoteId, RemoteCreationError> {
        let payload = self.story_payload(spec, parent);
        self.post_issue(&payload)
    }
}

/// Wrap plain text in an Atlassian document with a single paragraph.
///
/// Jira rejects empty text nodes, so an empty description becomes an
/// empty paragraph.
fn description_doc(text: &str) -> JsonValue {
    let content = if text.is_empty() {
        json!([])
    } else {
        json!([{ "type": "text", "text": text }])
    };

    json!({
        "type": "doc",
        "version": 1,
        "content": [{ "type": "paragraph", "content": content }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    fn target(points_field: Option<&str>) -> ImportTarget {
        ImportTarget {
            base_url: "https://acme.atlassian.net".to_string(),
            project_key: "CP".to_string(),
            epic_type_id: "10197".to_string(),
            story_type_id: "10196".to_string(),
            points_field: points_field.map(ToOwned::to_owned),
            timeout: Duration::from_secs(5),
        }
    }

    fn client(points_field: Option<&str>) -> JiraClient {
        JiraClient::new(target(points_field), &Credentials::new("dev@example.com", "t0ken"))
    }

    #[test]
    fn endpoint_targets_issue_api() {
        assert_eq!(
            client(None).endpoint,
            "https://acme.atlassian.net/rest/api/3/issue"
        );
    }

    #[test]
    fn epic_payload_carries_type_and_labels() {
        let spec = ParentItemSpec::new("Auth", "[P0] Authentication")
            .with_description("Permission-based access control.")
            .with_label("dashboard")
            .with_label("auth");
        let payload = client(None).epic_payload(&spec);
        let fields = &payload["fields"];

        assert_eq!(fields["project"]["key"], "CP");
        assert_eq!(fields["summary"], "[P0] Authentication");
        assert_eq!(fields["issuetype"]["id"], "10197");
        assert_eq!(fields["labels"], json!(["dashboard", "auth"]));
        assert_eq!(
            fields["description"]["content"][0]["content"][0]["text"],
            "Permission-based access control."
        );
        assert!(fields.get("parent").is_none());
    }

    #[test]
    fn epic_payload_omits_empty_labels() {
        let spec = ParentItemSpec::new("Ops", "Ops");
        let payload = client(None).epic_payload(&spec);
        assert!(payload["fields"].get("labels").is_none());
    }

    #[test]
    fn story_payload_links_parent_and_points() {
        let spec = ChildItemSpec::new("Configure Vite", "Library build output.", 3);
        let parent = RemoteId::new("CP-7", "10007");
        let payload = client(Some("customfield_10016")).story_payload(&spec, &parent);
        let fields = &payload["fields"];

        assert_eq!(fields["issuetype"]["id"], "10196");
        assert_eq!(fields["parent"]["key"], "CP-7");
        assert_eq!(fields["customfield_10016"], 3);
    }

    #[test]
    fn story_payload_without_points_field() {
        let spec = ChildItemSpec::new("Configure Vite", "", 3);
        let parent = RemoteId::new("CP-7", "10007");
        let payload = client(None).story_payload(&spec, &parent);
        let fields = payload["fields"].as_object().expect("object");
        assert!(!fields.keys().any(|k| k.starts_with("customfield")));
    }

    #[test]
    fn empty_description_has_no_text_node() {
        let doc = description_doc("");
        assert_eq!(doc["type"], "doc");
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["content"][0]["type"], "paragraph");
        assert_eq!(doc["content"][0]["content"], json!([]));
    }

    /// What the fake endpoint saw for one request.
    struct Captured {
        url: String,
        authorization: Option<String>,
        content_type: Option<String>,
        body: JsonValue,
    }

    fn header(request: &tiny_http::Request, name: &'static str) -> Option<String> {
        request
            .headers()
            .iter()
            .find(|h| h.field.equiv(name))
            .map(|h| h.value.as_str().to_string())
    }

    /// Answer one request per scripted `(status, body)` pair.
    fn serve(script: &[(u16, &str)]) -> (String, thread::JoinHandle<Vec<Captured>>) {
        let script: Vec<(u16, String)> = script
            .iter()
            .map(|(status, body)| (*status, (*body).to_string()))
            .collect();
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind fake jira");
        let addr = server.server_addr().to_ip().expect("ip listener");
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, reply) in script {
                let mut request = server.recv().expect("request");
                let mut raw = String::new();
                request
                    .as_reader()
                    .read_to_string(&mut raw)
                    .expect("read body");
                seen.push(Captured {
                    url: request.url().to_string(),
                    authorization: header(&request, "Authorization"),
                    content_type: header(&request, "Content-Type"),
                    body: serde_json::from_str(&raw).expect("json body"),
                });
                let response = tiny_http::Response::from_string(reply).with_status_code(status);
                request.respond(response).expect("respond");
            }
            seen
        });
        (format!("http://{addr}"), handle)
    }

    fn live_client(base_url: String) -> JiraClient {
        let target = ImportTarget {
            base_url,
            ..target(Some("customfield_10016"))
        };
        JiraClient::new(target, &Credentials::new("user", "pass"))
    }

    #[test]
    fn created_issue_returns_key_and_id() {
        let (base_url, server) = serve(&[
            (201, r#"{"id":"10001","key":"CP-1","self":"x"}"#),
            (201, r#"{"id":"10002","key":"CP-2"}"#),
        ]);
        let mut client = live_client(base_url);

        let epic = ParentItemSpec::new("Auth", "[P0] Authentication").with_label("auth");
        let parent = client.create_parent(&epic).expect("epic created");
        assert_eq!(parent, RemoteId::new("CP-1", "10001"));

        let story = ChildItemSpec::new("Login form", "", 5);
        let child = client.create_child(&story, &parent).expect("story created");
        assert_eq!(child.key, "CP-2");
        assert_eq!(client.request_count(), 2);

        let seen = server.join().expect("server thread");
        assert_eq!(seen[0].url, "/rest/api/3/issue");
        assert_eq!(seen[0].authorization.as_deref(), Some("Basic dXNlcjpwYXNz"));
        assert!(
            seen[0]
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("application/json"))
        );
        assert_eq!(seen[0].body["fields"]["labels"], json!(["auth"]));
        assert_eq!(seen[1].body["fields"]["parent"]["key"], "CP-1");
        assert_eq!(seen[1].body["fields"]["customfield_10016"], 5);
    }

    #[test]
    fn rejected_request_keeps_status_and_truncated_body() {
        let long_body = "x".repeat(500);
        let (base_url, server) = serve(&[(400, long_body.as_str())]);
        let mut client = live_client(base_url);

        let err = client
            .create_parent(&ParentItemSpec::new("Auth", "Auth"))
            .expect_err("rejected");
        assert_eq!(err.status, Some(400));
        assert!(err.body.len() < 500);
        assert!(err.body.ends_with("..."));
        server.join().expect("server thread");
    }

    #[test]
    fn non_created_success_status_is_a_failure() {
        let (base_url, server) = serve(&[(200, r#"{"id":"1","key":"CP-1"}"#)]);
        let mut client = live_client(base_url);

        let err = client
            .create_parent(&ParentItemSpec::new("Auth", "Auth"))
            .expect_err("only 201 counts");
        assert_eq!(err.status, Some(200));
        server.join().expect("server thread");
    }

    #[test]
    fn undecodable_created_body_is_a_failure() {
        let (base_url, server) = serve(&[(201, "not json")]);
        let mut client = live_client(base_url);

        let err = client
            .create_parent(&ParentItemSpec::new("Auth", "Auth"))
            .expect_err("bad body");
        assert_eq!(err.status, Some(201));
        assert!(err.body.starts_with("invalid response body"));
        server.join().expect("server thread");
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let mut client = live_client(format!("http://{addr}"));
        let err = client
            .create_parent(&ParentItemSpec::new("Auth", "Auth"))
            .expect_err("nothing listening");
        assert_eq!(err.status, None);
        assert!(err.to_string().starts_with("transport error"));
    }
}
