//! User and group value objects for the Openfire admin API.
//!
//! # Design
//! Fields mirror the REST plugin's JSON. Optional attributes are plain
//! `String`s with the empty string meaning "unset", because the wire format
//! always carries every key. `password` is write-only: it goes out in
//! create payloads but the server never returns it, so deserialization
//! always leaves it empty.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Unique identifier; the node part of the user's JID.
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Required when creating a user, never populated from responses.
    #[serde(skip)]
    pub password: String,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            name: String::new(),
            email: String::new(),
            password: password.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Request payload for this user.
    ///
    /// Update payloads exclude the password key entirely — the API does not
    /// change passwords through the user endpoints.
    pub fn to_params(&self, exclude_password: bool) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("username".to_string(), Value::String(self.username.clone()));
        params.insert("name".to_string(), Value::String(self.name.clone()));
        params.insert("email".to_string(), Value::String(self.email.clone()));
        if !exclude_password {
            params.insert("password".to_string(), Value::String(self.password.clone()));
        }
        params
    }

    /// Build a `User` from one element of an API response.
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        serde_json::from_value(value.clone())
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}

/// A group, keyed by its name.
///
/// The wire key for the identifier is `name`; membership listings return
/// names only, so groups built from them carry an empty description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Group {
    #[serde(rename = "name")]
    pub groupname: String,
    #[serde(default)]
    pub description: String,
}

impl Group {
    pub fn new(groupname: impl Into<String>) -> Self {
        Self {
            groupname: groupname.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Request payload for this group.
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("name".to_string(), Value::String(self.groupname.clone()));
        params.insert("description".to_string(), Value::String(self.description.clone()));
        params
    }

    /// Build a `Group` from one element of an API response.
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        serde_json::from_value(value.clone())
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn user_params_include_the_password_on_create() {
        let user = User::new("alice", "s3cret").with_name("Alice").with_email("a@example.com");
        let params = user.to_params(false);
        assert_eq!(params["username"], "alice");
        assert_eq!(params["name"], "Alice");
        assert_eq!(params["email"], "a@example.com");
        assert_eq!(params["password"], "s3cret");
    }

    #[test]
    fn user_params_omit_the_password_key_on_update() {
        let user = User::new("alice", "s3cret");
        let params = user.to_params(true);
        assert!(!params.contains_key("password"));
        assert_eq!(params["username"], "alice");
    }

    #[test]
    fn user_round_trips_through_a_response_object() {
        let raw = json!({"username": "bob", "name": "Bob", "email": "bob@example.com"});
        let user = User::from_value(&raw).unwrap();
        assert_eq!(user.username, "bob");
        assert_eq!(user.name, "Bob");
        assert_eq!(user.email, "bob@example.com");

        let params = user.to_params(true);
        assert_eq!(params["username"], raw["username"]);
        assert_eq!(params["name"], raw["name"]);
        assert_eq!(params["email"], raw["email"]);
    }

    #[test]
    fn response_users_never_carry_a_password() {
        let raw = json!({"username": "bob", "password": "leaked"});
        let user = User::from_value(&raw).unwrap();
        assert!(user.password.is_empty());
    }

    #[test]
    fn user_without_a_username_is_rejected() {
        let err = User::from_value(&json!({"name": "nobody"})).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn group_identifier_travels_under_the_name_key() {
        let group = Group::new("staff").with_description("Everyone");
        let params = group.to_params();
        assert_eq!(params["name"], "staff");
        assert_eq!(params["description"], "Everyone");
        assert!(!params.contains_key("groupname"));
    }

    #[test]
    fn group_description_defaults_to_empty() {
        let group = Group::from_value(&json!({"name": "staff"})).unwrap();
        assert_eq!(group.groupname, "staff");
        assert!(group.description.is_empty());
    }
}
