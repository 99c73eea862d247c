//! Authentication service seam and login response classification
//!
//! The transport (HTTP in `edublog-api`, scripted fakes in tests) only
//! reports what came back over the wire; deciding whether that is a usable
//! grant, a rejection, or garbage happens here so every transport shares
//! the same taxonomy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::error::GENERIC_LOGIN_FAILURE;
use crate::user::UserRecord;
use crate::{Error, Result};

/// Body of `POST /users/login`
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Status code and body exactly as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A successful login: bearer token plus the authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub user: UserRecord,
}

/// Remote authentication endpoint
///
/// Implementations return `Error::Network` when the service cannot be
/// reached and a [`RawResponse`] for anything the service answered.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<RawResponse>;
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<serde_json::Value>,
}

/// Markers of a serverless platform crash page instead of an API answer
const UNAVAILABLE_MARKERS: &[&str] = &["FUNCTION_INVOCATION_FAILED", "server error"];

/// Turn a login response into a grant or a classified failure.
pub fn classify_login_response(response: &RawResponse) -> Result<LoginGrant> {
    debug!("Classifying login response: status={}", response.status);

    let envelope: Envelope<LoginPayload> = match serde_json::from_str(&response.body) {
        Ok(envelope) => envelope,
        Err(e) => {
            if UNAVAILABLE_MARKERS
                .iter()
                .any(|marker| response.body.contains(marker))
            {
                warn!("Login endpoint returned a platform error page");
                return Err(Error::Protocol(
                    "Server error. The API may be temporarily unavailable.".to_string(),
                ));
            }
            warn!("Login response is not valid JSON: {}", e);
            return Err(Error::Protocol(format!("Malformed response: {}", e)));
        }
    };

    if !response.is_success() || !envelope.success {
        let message = envelope
            .server_message()
            .unwrap_or(GENERIC_LOGIN_FAILURE)
            .to_string();
        debug!("Login rejected by server: status={}", response.status);
        return Err(Error::Credential { message });
    }

    let payload = envelope
        .data
        .ok_or_else(|| Error::Protocol("Incomplete response: missing data".to_string()))?;

    let token = payload
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::Protocol("Incomplete response: missing token".to_string()))?;

    let user = payload
        .user
        .filter(|u| !u.is_null())
        .ok_or_else(|| Error::Protocol("Incomplete response: missing user".to_string()))?;

    let user: UserRecord = serde_json::from_value(user)
        .map_err(|e| Error::Protocol(format!("Incomplete response: invalid user record: {}", e)))?;

    Ok(LoginGrant { token, user })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Role;
    use serde_json::json;

    fn professor_body(token: &str) -> String {
        json!({
            "success": true,
            "data": {
                "token": token,
                "user": {
                    "_id": "1",
                    "email": "p@x.com",
                    "name": "Paulo",
                    "userType": "professor",
                    "subjects": ["Math"]
                }
            }
        })
        .to_string()
    }

    #[test]
    fn test_successful_grant() {
        let grant = classify_login_response(&RawResponse::new(200, professor_body("abc"))).unwrap();
        assert_eq!(grant.token, "abc");
        assert_eq!(grant.user.role(), Role::Professor);
    }

    #[test]
    fn test_rejection_carries_server_message() {
        let body = json!({"success": false, "message": "Invalid credentials"}).to_string();
        let err = classify_login_response(&RawResponse::new(401, body)).unwrap_err();
        match err {
            Error::Credential { message } => assert_eq!(message, "Invalid credentials"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejection_without_message_uses_fallback() {
        let body = json!({"success": false}).to_string();
        let err = classify_login_response(&RawResponse::new(200, body)).unwrap_err();
        assert_eq!(err.user_message(), GENERIC_LOGIN_FAILURE);
    }

    #[test]
    fn test_non_2xx_with_success_flag_is_rejected() {
        let err = classify_login_response(&RawResponse::new(500, professor_body("abc"))).unwrap_err();
        assert!(matches!(err, Error::Credential { .. }));
    }

    #[test]
    fn test_malformed_body_is_protocol_error() {
        let err = classify_login_response(&RawResponse::new(200, "<html>oops</html>")).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));

        let err = classify_login_response(&RawResponse::new(
            500,
            "A server error has occurred\n\nFUNCTION_INVOCATION_FAILED",
        ))
        .unwrap_err();
        match err {
            Error::Protocol(msg) => assert!(msg.contains("temporarily unavailable")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_incomplete_success_is_protocol_error() {
        let cases = [
            json!({"success": true}),
            json!({"success": true, "data": {"user": {"_id": "1"}}}),
            json!({"success": true, "data": {"token": "", "user": null}}),
            json!({"success": true, "data": {"token": "abc"}}),
            json!({"success": true, "data": {"token": "abc", "user": {"name": "no id"}}}),
        ];

        for body in cases {
            let err = classify_login_response(&RawResponse::new(200, body.to_string())).unwrap_err();
            assert!(matches!(err, Error::Protocol(_)), "body {body} gave {err:?}");
        }
    }

    #[test]
    fn test_request_debug_hides_password() {
        let request = LoginRequest::new("p@x.com", "secret");
        let printed = format!("{:?}", request);
        assert!(printed.contains("p@x.com"));
        assert!(!printed.contains("secret"));
    }
}
