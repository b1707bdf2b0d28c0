//! Request and response bodies.
//!
//! Bodies arrive as raw bytes and are parsed here into typed values, so
//! every malformed input becomes a 400 with a specific message.

use chrono::{DateTime, Utc};
use keygate_core::Role;
use keygate_core::validation::limits::{
    MAX_PASSWORD_LENGTH, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationErrors};
use zeroize::Zeroizing;

use crate::auth::{NewUser, Profile, PublicUser};
use crate::error::ApiError;

const MISSING_CREDENTIALS: &str = "Missing username or password";

// Length checks in `validator` compare as u64.
const USERNAME_MAX: u64 = MAX_USERNAME_LENGTH as u64;
const PASSWORD_MIN: u64 = MIN_PASSWORD_LENGTH as u64;
const PASSWORD_MAX: u64 = MAX_PASSWORD_LENGTH as u64;

/// Username and password from a login body.
pub struct Credentials {
    /// Presented username.
    pub username: String,
    /// Presented password, wiped on drop.
    pub password: Zeroizing<String>,
}

impl Credentials {
    /// Parse a `{"username": .., "password": ..}` body.
    ///
    /// Absent, null, non-string and empty fields all count as missing.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` for invalid JSON or missing fields.
    pub fn from_json(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| ApiError::BadRequest("Invalid JSON".to_string()))?;

        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        match (field("username"), field("password")) {
            (Some(username), Some(password)) => Ok(Self {
                username,
                password: Zeroizing::new(password),
            }),
            _ => Err(ApiError::BadRequest(MISSING_CREDENTIALS.to_string())),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Signed session token.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
}

/// Registration body for `POST /add_user`.
#[derive(Deserialize, Validate)]
pub struct AddUserRequest {
    /// Login name.
    #[validate(
        required(message = "Username is required"),
        length(min = 1, max = USERNAME_MAX, message = "Username must be 1-64 characters")
    )]
    pub username: Option<String>,

    /// Initial password.
    #[validate(
        required(message = "Password is required"),
        length(min = PASSWORD_MIN, max = PASSWORD_MAX, message = "Password must be at least 8 characters")
    )]
    pub password: Option<String>,

    /// Role to grant; defaults to `user`.
    #[serde(default)]
    pub role: Option<Role>,

    /// Display name.
    #[validate(length(max = 128, message = "Name is too long"))]
    pub name: Option<String>,

    /// Age in years.
    #[validate(range(max = 150, message = "Age must be at most 150"))]
    pub age: Option<u32>,

    /// City of residence.
    #[validate(length(max = 128, message = "City is too long"))]
    pub city: Option<String>,
}

impl std::fmt::Debug for AddUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddUserRequest")
            .field("username", &self.username)
            .field("role", &self.role)
            .field("name", &self.name)
            .field("age", &self.age)
            .field("city", &self.city)
            .finish_non_exhaustive()
    }
}

/// Fields reported in this order when several fail.
const ADD_USER_FIELDS: [&str; 5] = ["username", "password", "name", "age", "city"];

impl AddUserRequest {
    /// Parse and validate a registration body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` naming the first invalid field.
    pub fn from_json(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| ApiError::BadRequest("Invalid JSON".to_string()))?;
        if !value.is_object() {
            return Err(ApiError::BadRequest("Invalid JSON".to_string()));
        }

        let request: Self = serde_json::from_value(value)
            .map_err(|e| ApiError::BadRequest(format!("Invalid field: {e}")))?;
        request
            .validate()
            .map_err(|e| ApiError::BadRequest(first_message(&e)))?;
        Ok(request)
    }

    /// Convert into a store registration.
    #[must_use]
    pub fn into_new_user(self) -> NewUser {
        NewUser {
            username: self.username.unwrap_or_default(),
            password: Zeroizing::new(self.password.unwrap_or_default()),
            role: self.role.unwrap_or_default(),
            profile: Profile {
                name: self.name,
                age: self.age,
                city: self.city,
            },
        }
    }
}

fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    ADD_USER_FIELDS
        .iter()
        .find_map(|field| {
            let first = fields.get(*field)?.first()?;
            Some(
                first
                    .message
                    .as_ref()
                    .map_or_else(|| format!("Invalid {field}"), ToString::to_string),
            )
        })
        .unwrap_or_else(|| "Invalid request".to_string())
}

/// Successful registration.
#[derive(Debug, Serialize)]
pub struct AddUserResponse {
    /// Always `User added`.
    pub message: &'static str,
    /// The created account.
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bad_request_message(err: ApiError) -> String {
        match err {
            ApiError::BadRequest(m) => m,
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_credentials() {
        let creds = Credentials::from_json(br#"{"username":"user1","password":"password"}"#).unwrap();
        assert_eq!(creds.username, "user1");
        assert_eq!(creds.password.as_str(), "password");
        assert!(!format!("{creds:?}").contains("password\""));
    }

    #[test]
    fn test_credentials_missing_fields() {
        for body in [
            r#"{"username":"user1"}"#,
            r#"{"password":"password"}"#,
            r#"{"username":"user1","password":null}"#,
            r#"{"username":"user1","password":42}"#,
            r#"{"username":"","password":"password"}"#,
            "[]",
            "null",
        ] {
            let err = Credentials::from_json(body.as_bytes()).unwrap_err();
            assert_eq!(bad_request_message(err), MISSING_CREDENTIALS, "body: {body}");
        }
    }

    #[test]
    fn test_credentials_invalid_json() {
        let err = Credentials::from_json(b"not json").unwrap_err();
        assert_eq!(bad_request_message(err), "Invalid JSON");
    }

    #[test]
    fn test_add_user_valid() {
        let request = AddUserRequest::from_json(
            br#"{"username":"alice","password":"longenough","name":"Alice","age":30,"city":"Paris"}"#,
        )
        .unwrap();
        let new_user = request.into_new_user();
        assert_eq!(new_user.username, "alice");
        assert_eq!(new_user.role, Role::User);
        assert_eq!(new_user.profile.age, Some(30));
        assert_eq!(new_user.profile.city.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_add_user_role() {
        let request =
            AddUserRequest::from_json(br#"{"username":"bob","password":"longenough","role":"admin"}"#)
                .unwrap();
        assert_eq!(request.into_new_user().role, Role::Admin);

        let err =
            AddUserRequest::from_json(br#"{"username":"bob","password":"longenough","role":"root"}"#)
                .unwrap_err();
        assert!(bad_request_message(err).starts_with("Invalid field"));
    }

    #[test]
    fn test_add_user_validation_messages() {
        let cases = [
            (r#"{"password":"longenough"}"#, "Username is required"),
            (r#"{"username":"","password":"longenough"}"#, "Username must be 1-64 characters"),
            (r#"{"username":"bob"}"#, "Password is required"),
            (r#"{"username":"bob","password":"short"}"#, "Password must be at least 8 characters"),
            (r#"{"username":"bob","password":"longenough","age":200}"#, "Age must be at most 150"),
            (r#"{}"#, "Username is required"),
        ];
        for (body, expected) in cases {
            let err = AddUserRequest::from_json(body.as_bytes()).unwrap_err();
            assert_eq!(bad_request_message(err), expected, "body: {body}");
        }
    }

    #[test]
    fn test_add_user_debug_hides_password() {
        let request =
            AddUserRequest::from_json(br#"{"username":"bob","password":"hunter2hunter2"}"#).unwrap();
        let debug = format!("{request:?}");
        assert!(debug.contains("bob"));
        assert!(!debug.contains("hunter2hunter2"));
    }

    #[test]
    fn test_add_user_length_limits() {
        let body = |username: String, password: String| {
            serde_json::json!({ "username": username, "password": password }).to_string()
        };
        let ok_password = "p".repeat(MIN_PASSWORD_LENGTH);

        let longest = body("u".repeat(MAX_USERNAME_LENGTH), ok_password.clone());
        assert!(AddUserRequest::from_json(longest.as_bytes()).is_ok());

        let too_long = body("u".repeat(MAX_USERNAME_LENGTH + 1), ok_password.clone());
        let err = AddUserRequest::from_json(too_long.as_bytes()).unwrap_err();
        assert_eq!(bad_request_message(err), "Username must be 1-64 characters");

        let too_short = body("bob".to_string(), "p".repeat(MIN_PASSWORD_LENGTH - 1));
        assert!(AddUserRequest::from_json(too_short.as_bytes()).is_err());

        let huge = body("bob".to_string(), "p".repeat(MAX_PASSWORD_LENGTH + 1));
        assert!(AddUserRequest::from_json(huge.as_bytes()).is_err());
    }

    #[test]
    fn test_add_user_invalid_json() {
        for body in ["nope", "null", "[1,2]"] {
            let err = AddUserRequest::from_json(body.as_bytes()).unwrap_err();
            assert_eq!(bad_request_message(err), "Invalid JSON");
        }
    }
}
