//! Facade over the Openfire REST API plugin.
//!
//! # Design
//! Every administrative operation is one method: build the endpoint path
//! (and the payload, when the operation has one) from an entity, hand it to
//! the single `dispatch` chokepoint, and normalize the
//! JSON that comes back. The plugin collapses logically-plural fields to a
//! bare object when exactly one element exists and omits them entirely when
//! empty; `as_list` undoes that at every collection-consuming call site.
//!
//! Each method is one blocking round trip. The client holds no mutable
//! state, so sharing one instance across threads is safe.

use serde_json::Value;

use crate::config::Settings;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::types::{Group, User};

const ENDPOINT_USERS: &str = "/users";
const ENDPOINT_GROUPS: &str = "/groups";
const ENDPOINT_LOCKOUTS: &str = "/lockouts";

/// Blocking client for Openfire's user, group and lockout administration.
pub struct OpenfireClient {
    settings: Settings,
    transport: Box<dyn Transport>,
}

impl OpenfireClient {
    /// Client with the default `ureq` transport.
    pub fn new(settings: Settings) -> Self {
        Self::with_transport(settings, Box::new(UreqTransport::new()))
    }

    /// Client with a caller-provided transport.
    pub fn with_transport(settings: Settings, transport: Box<dyn Transport>) -> Self {
        Self { settings, transport }
    }

    // ----- users -----

    /// All registered users.
    pub fn get_users(&self) -> Result<Vec<User>, ApiError> {
        let payload = self.dispatch(HttpMethod::Get, ENDPOINT_USERS, None)?;
        as_list(payload.get("user")).into_iter().map(User::from_value).collect()
    }

    /// The user registered under `username`.
    pub fn get_user(&self, username: &str) -> Result<User, ApiError> {
        let payload =
            self.dispatch(HttpMethod::Get, &format!("{ENDPOINT_USERS}/{username}"), None)?;
        User::from_value(&payload)
    }

    /// Users whose username matches `query`. Empty when nothing matches.
    pub fn search_users(&self, query: &str) -> Result<Vec<User>, ApiError> {
        let payload =
            self.dispatch(HttpMethod::Get, &format!("{ENDPOINT_USERS}?search={query}"), None)?;
        as_list(payload.get("user")).into_iter().map(User::from_value).collect()
    }

    /// Register a new user. The payload carries the password.
    pub fn create_user(&self, user: &User) -> Result<(), ApiError> {
        self.dispatch(
            HttpMethod::Post,
            ENDPOINT_USERS,
            Some(Value::Object(user.to_params(false))),
        )?;
        Ok(())
    }

    /// Update an existing user. Passwords cannot be changed this way, so
    /// the payload omits the key.
    pub fn update_user(&self, user: &User) -> Result<(), ApiError> {
        self.dispatch(
            HttpMethod::Put,
            &format!("{ENDPOINT_USERS}/{}", user.username),
            Some(Value::Object(user.to_params(true))),
        )?;
        Ok(())
    }

    /// Remove a user from the server.
    pub fn delete_user(&self, username: &str) -> Result<(), ApiError> {
        self.dispatch(HttpMethod::Delete, &format!("{ENDPOINT_USERS}/{username}"), None)?;
        Ok(())
    }

    // ----- lockouts -----

    /// Disable the user's account.
    pub fn lock_user(&self, user: &User) -> Result<(), ApiError> {
        self.dispatch(HttpMethod::Post, &format!("{ENDPOINT_LOCKOUTS}/{}", user.username), None)?;
        Ok(())
    }

    pub fn lock_user_by_username(&self, username: &str) -> Result<(), ApiError> {
        self.lock_user(&User::new(username, ""))
    }

    /// Re-enable a locked account.
    pub fn unlock_user(&self, user: &User) -> Result<(), ApiError> {
        self.dispatch(
            HttpMethod::Delete,
            &format!("{ENDPOINT_LOCKOUTS}/{}", user.username),
            None,
        )?;
        Ok(())
    }

    pub fn unlock_user_by_username(&self, username: &str) -> Result<(), ApiError> {
        self.unlock_user(&User::new(username, ""))
    }

    // ----- groups -----

    /// All groups on the server. Empty when none exist.
    pub fn get_groups(&self) -> Result<Vec<Group>, ApiError> {
        let payload = self.dispatch(HttpMethod::Get, ENDPOINT_GROUPS, None)?;
        as_list(payload.get("group")).into_iter().map(Group::from_value).collect()
    }

    /// A single group with its description.
    pub fn get_group(&self, group: &Group) -> Result<Group, ApiError> {
        let payload = self.dispatch(
            HttpMethod::Get,
            &format!("{ENDPOINT_GROUPS}/{}", group.groupname),
            None,
        )?;
        Group::from_value(&payload)
    }

    pub fn get_group_by_name(&self, groupname: &str) -> Result<Group, ApiError> {
        self.get_group(&Group::new(groupname))
    }

    pub fn create_group(&self, group: &Group) -> Result<(), ApiError> {
        self.dispatch(HttpMethod::Post, ENDPOINT_GROUPS, Some(Value::Object(group.to_params())))?;
        Ok(())
    }

    pub fn create_group_by_name(&self, groupname: &str, description: &str) -> Result<(), ApiError> {
        self.create_group(&Group::new(groupname).with_description(description))
    }

    pub fn update_group(&self, group: &Group) -> Result<(), ApiError> {
        self.dispatch(
            HttpMethod::Put,
            &format!("{ENDPOINT_GROUPS}/{}", group.groupname),
            Some(Value::Object(group.to_params())),
        )?;
        Ok(())
    }

    pub fn update_group_by_name(&self, groupname: &str, description: &str) -> Result<(), ApiError> {
        self.update_group(&Group::new(groupname).with_description(description))
    }

    pub fn delete_group(&self, group: &Group) -> Result<(), ApiError> {
        self.dispatch(
            HttpMethod::Delete,
            &format!("{ENDPOINT_GROUPS}/{}", group.groupname),
            None,
        )?;
        Ok(())
    }

    pub fn delete_group_by_name(&self, groupname: &str) -> Result<(), ApiError> {
        self.delete_group(&Group::new(groupname))
    }

    // ----- membership -----

    /// Groups the user belongs to. The listing carries names only, so the
    /// returned groups have empty descriptions.
    pub fn get_user_groups(&self, user: &User) -> Result<Vec<Group>, ApiError> {
        let payload = self.dispatch(
            HttpMethod::Get,
            &format!("{ENDPOINT_USERS}/{}{ENDPOINT_GROUPS}", user.username),
            None,
        )?;
        Ok(as_list(payload.get("groupname"))
            .into_iter()
            .filter_map(Value::as_str)
            .map(Group::new)
            .collect())
    }

    /// Add the user to every group in `groups`.
    pub fn add_user_to_groups(&self, user: &User, groups: &[Group]) -> Result<(), ApiError> {
        self.dispatch(
            HttpMethod::Post,
            &format!("{ENDPOINT_USERS}/{}{ENDPOINT_GROUPS}", user.username),
            Some(membership_params(groups)),
        )?;
        Ok(())
    }

    pub fn add_user_to_group(&self, user: &User, group: &Group) -> Result<(), ApiError> {
        self.add_user_to_groups(user, std::slice::from_ref(group))
    }

    pub fn add_user_to_group_by_name(&self, user: &User, groupname: &str) -> Result<(), ApiError> {
        self.add_user_to_group(user, &Group::new(groupname))
    }

    /// Remove the user from every group in `groups`.
    pub fn remove_user_from_groups(&self, user: &User, groups: &[Group]) -> Result<(), ApiError> {
        self.dispatch(
            HttpMethod::Delete,
            &format!("{ENDPOINT_USERS}/{}{ENDPOINT_GROUPS}", user.username),
            Some(membership_params(groups)),
        )?;
        Ok(())
    }

    pub fn remove_user_from_group(&self, user: &User, group: &Group) -> Result<(), ApiError> {
        self.remove_user_from_groups(user, std::slice::from_ref(group))
    }

    pub fn remove_user_from_group_by_name(
        &self,
        user: &User,
        groupname: &str,
    ) -> Result<(), ApiError> {
        self.remove_user_from_group(user, &Group::new(groupname))
    }

    // ----- dispatch -----

    /// Single chokepoint for every remote call.
    ///
    /// Builds the full URL and headers, runs the request on the transport,
    /// and classifies the outcome: 200/201 yield the decoded body
    /// (`Value::Null` when the body is empty), 404 yields
    /// [`ApiError::NotFound`], anything else [`ApiError::HttpError`] with
    /// the raw body.
    fn dispatch(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.settings.base_url(), endpoint);
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), self.settings.authorization()),
        ];

        // GET relies purely on path and query; everything else may carry a
        // JSON body.
        let body = if method == HttpMethod::Get {
            None
        } else {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
            match params {
                Some(params) => Some(
                    serde_json::to_string(&params)
                        .map_err(|e| ApiError::SerializationError(e.to_string()))?,
                ),
                None => None,
            }
        };

        log::debug!("{} {}", method.as_str(), url);
        let response = self.transport.execute(HttpRequest { method, url, headers, body })?;
        classify(response)
    }
}

/// Map a transport response to the dispatch result.
fn classify(response: HttpResponse) -> Result<Value, ApiError> {
    match response.status {
        200 | 201 => {
            if response.body.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&response.body)
                .map_err(|e| ApiError::DeserializationError(e.to_string()))
        }
        404 => Err(ApiError::NotFound),
        status => {
            log::warn!("request failed with HTTP {status}");
            Err(ApiError::HttpError { status, body: response.body })
        }
    }
}

/// Undo the plugin's single-result collapse: an absent or null field is an
/// empty collection, a bare value is a one-element collection, an array is
/// taken as-is, in order.
fn as_list(field: Option<&Value>) -> Vec<&Value> {
    match field {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

/// `{"groupname": [names]}` payload shared by the membership operations.
fn membership_params(groups: &[Group]) -> Value {
    let names = groups.iter().map(|group| Value::String(group.groupname.clone())).collect();
    let mut params = serde_json::Map::new();
    params.insert("groupname".to_string(), Value::Array(names));
    Value::Object(params)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    /// Transport that records every request and replays one canned response.
    struct MockTransport {
        status: u16,
        body: String,
        requests: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl Transport for MockTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.lock().unwrap().push(request);
            Ok(HttpResponse { status: self.status, body: self.body.clone() })
        }
    }

    type Requests = Arc<Mutex<Vec<HttpRequest>>>;

    fn mock_client(settings: Settings, status: u16, body: &str) -> (OpenfireClient, Requests) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let transport = MockTransport {
            status,
            body: body.to_string(),
            requests: Arc::clone(&requests),
        };
        (OpenfireClient::with_transport(settings, Box::new(transport)), requests)
    }

    fn sent(requests: &Requests) -> HttpRequest {
        requests.lock().unwrap().last().cloned().expect("no request sent")
    }

    fn header(request: &HttpRequest, name: &str) -> Option<String> {
        request.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
    }

    fn body_json(request: &HttpRequest) -> serde_json::Value {
        serde_json::from_str(request.body.as_deref().expect("request has no body")).unwrap()
    }

    fn example_settings() -> Settings {
        Settings {
            host: "example.com".to_string(),
            secret: "s3cret".to_string(),
            ..Settings::default()
        }
    }

    // ----- request building -----

    #[test]
    fn get_users_targets_the_configured_base_url() {
        let (client, requests) = mock_client(example_settings(), 200, "{}");
        client.get_users().unwrap();

        let request = sent(&requests);
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url, "https://example.com:9090/plugins/restapi/v1/users");
        assert!(request.body.is_none());
    }

    #[test]
    fn every_request_accepts_json_and_carries_the_secret() {
        let (client, requests) = mock_client(example_settings(), 200, "{}");
        client.get_users().unwrap();

        let request = sent(&requests);
        assert_eq!(header(&request, "Accept").as_deref(), Some("application/json"));
        assert_eq!(header(&request, "Authorization").as_deref(), Some("s3cret"));
        // GET carries no Content-Type because it carries no body
        assert_eq!(header(&request, "Content-Type"), None);
    }

    #[test]
    fn basic_auth_replaces_the_shared_secret() {
        let settings = Settings {
            use_basic_auth: true,
            basic_user: "admin".to_string(),
            basic_pwd: "pass".to_string(),
            ..example_settings()
        };
        let (client, requests) = mock_client(settings, 200, "{}");
        client.get_users().unwrap();

        let request = sent(&requests);
        assert_eq!(
            header(&request, "Authorization").as_deref(),
            Some("Basic YWRtaW46cGFzcw==")
        );
    }

    #[test]
    fn non_get_requests_declare_a_json_content_type() {
        let (client, requests) = mock_client(example_settings(), 201, "");
        client.create_group(&Group::new("staff").with_description("Everyone")).unwrap();

        let request = sent(&requests);
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(header(&request, "Content-Type").as_deref(), Some("application/json"));
        assert_eq!(body_json(&request), json!({"name": "staff", "description": "Everyone"}));
    }

    #[test]
    fn search_query_lands_in_the_path() {
        let (client, requests) = mock_client(example_settings(), 200, "{}");
        client.search_users("ali").unwrap();

        assert!(sent(&requests).url.ends_with("/users?search=ali"));
    }

    #[test]
    fn create_sends_the_password_and_update_does_not() {
        let user = User::new("alice", "pw").with_name("Alice");

        let (client, requests) = mock_client(example_settings(), 201, "");
        client.create_user(&user).unwrap();
        assert_eq!(body_json(&sent(&requests))["password"], "pw");

        let (client, requests) = mock_client(example_settings(), 200, "");
        client.update_user(&user).unwrap();
        let request = sent(&requests);
        assert_eq!(request.method, HttpMethod::Put);
        assert!(request.url.ends_with("/users/alice"));
        assert!(body_json(&request).get("password").is_none());
    }

    #[test]
    fn lockouts_use_their_own_endpoint() {
        let (client, requests) = mock_client(example_settings(), 201, "");
        client.lock_user_by_username("alice").unwrap();
        let request = sent(&requests);
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.url.ends_with("/lockouts/alice"));
        assert!(request.body.is_none());

        let (client, requests) = mock_client(example_settings(), 200, "");
        client.unlock_user_by_username("alice").unwrap();
        let request = sent(&requests);
        assert_eq!(request.method, HttpMethod::Delete);
        assert!(request.url.ends_with("/lockouts/alice"));
    }

    #[test]
    fn membership_changes_carry_a_groupname_list() {
        let alice = User::new("alice", "");
        let groups = [Group::new("staff"), Group::new("ops")];

        let (client, requests) = mock_client(example_settings(), 201, "");
        client.add_user_to_groups(&alice, &groups).unwrap();
        let request = sent(&requests);
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.url.ends_with("/users/alice/groups"));
        assert_eq!(body_json(&request), json!({"groupname": ["staff", "ops"]}));

        let (client, requests) = mock_client(example_settings(), 200, "");
        client.remove_user_from_group_by_name(&alice, "staff").unwrap();
        let request = sent(&requests);
        assert_eq!(request.method, HttpMethod::Delete);
        assert_eq!(body_json(&request), json!({"groupname": ["staff"]}));
    }

    // ----- response normalization -----

    #[test]
    fn single_user_arrives_bare_or_wrapped_with_the_same_result() {
        let bare = r#"{"user": {"username": "alice", "name": "Alice"}}"#;
        let wrapped = r#"{"user": [{"username": "alice", "name": "Alice"}]}"#;

        let (client, _) = mock_client(example_settings(), 200, bare);
        let from_bare = client.get_users().unwrap();

        let (client, _) = mock_client(example_settings(), 200, wrapped);
        let from_wrapped = client.get_users().unwrap();

        assert_eq!(from_bare.len(), 1);
        assert_eq!(from_bare, from_wrapped);
        assert_eq!(from_bare[0].username, "alice");
    }

    #[test]
    fn group_listing_preserves_response_order() {
        let body = r#"{"group": [
            {"name": "a", "description": "d1"},
            {"name": "b", "description": "d2"}
        ]}"#;
        let (client, _) = mock_client(example_settings(), 200, body);

        let groups = client.get_groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].groupname, "a");
        assert_eq!(groups[0].description, "d1");
        assert_eq!(groups[1].groupname, "b");
        assert_eq!(groups[1].description, "d2");
    }

    #[test]
    fn absent_collection_fields_mean_empty_listings() {
        let (client, _) = mock_client(example_settings(), 200, "{}");
        assert!(client.get_users().unwrap().is_empty());
        assert!(client.get_groups().unwrap().is_empty());
        assert!(client.search_users("nobody").unwrap().is_empty());
        assert!(client.get_user_groups(&User::new("alice", "")).unwrap().is_empty());

        let (client, _) = mock_client(example_settings(), 200, r#"{"user": null}"#);
        assert!(client.get_users().unwrap().is_empty());
    }

    #[test]
    fn sole_membership_arrives_as_a_bare_string() {
        let (client, _) = mock_client(example_settings(), 200, r#"{"groupname": "solo"}"#);

        let groups = client.get_user_groups(&User::new("alice", "")).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].groupname, "solo");
        assert!(groups[0].description.is_empty());
    }

    #[test]
    fn single_fetch_parses_the_payload_directly() {
        let (client, _) =
            mock_client(example_settings(), 200, r#"{"username": "alice", "email": "a@b.c"}"#);
        let user = client.get_user("alice").unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "a@b.c");
        assert!(user.password.is_empty());

        let (client, _) =
            mock_client(example_settings(), 200, r#"{"name": "staff", "description": "d"}"#);
        let group = client.get_group_by_name("staff").unwrap();
        assert_eq!(group.groupname, "staff");
        assert_eq!(group.description, "d");
    }

    // ----- failure classification -----

    #[test]
    fn missing_resources_map_to_not_found() {
        let (client, _) = mock_client(example_settings(), 404, "");
        assert!(matches!(client.get_user("ghost").unwrap_err(), ApiError::NotFound));
        assert!(matches!(client.get_group_by_name("ghost").unwrap_err(), ApiError::NotFound));
        assert!(matches!(client.delete_user("ghost").unwrap_err(), ApiError::NotFound));
    }

    #[test]
    fn other_bad_statuses_surface_status_and_body() {
        let (client, _) = mock_client(example_settings(), 500, "boom");
        match client.get_groups().unwrap_err() {
            ApiError::HttpError { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected HttpError, got {other:?}"),
        }
    }

    #[test]
    fn empty_success_bodies_satisfy_boolean_operations() {
        let (client, _) = mock_client(example_settings(), 200, "");
        assert!(client.delete_user("alice").is_ok());

        let (client, _) = mock_client(example_settings(), 201, "");
        assert!(client.create_user(&User::new("alice", "pw")).is_ok());
    }

    #[test]
    fn malformed_success_bodies_are_deserialization_errors() {
        let (client, _) = mock_client(example_settings(), 200, "not json");
        assert!(matches!(
            client.get_users().unwrap_err(),
            ApiError::DeserializationError(_)
        ));
    }

    // ----- as_list -----

    #[test]
    fn as_list_covers_all_field_shapes() {
        assert!(as_list(None).is_empty());
        assert!(as_list(Some(&Value::Null)).is_empty());

        let bare = json!({"name": "a"});
        assert_eq!(as_list(Some(&bare)), vec![&bare]);

        let array = json!([{"name": "a"}, {"name": "b"}]);
        assert_eq!(as_list(Some(&array)).len(), 2);
        assert_eq!(as_list(Some(&array))[0], &json!({"name": "a"}));
    }
}
