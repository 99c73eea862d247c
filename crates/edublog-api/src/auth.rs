//! HTTP transport for the login exchange

use async_trait::async_trait;
use edublog_core::{ApiConfig, AuthService, Error, LoginRequest, RawResponse};
use reqwest::Client;
use tracing::{debug, warn};

use crate::client::http_client;

/// `AuthService` backed by `POST {base_url}/users/login`
#[derive(Clone)]
pub struct HttpAuthService {
    client: Client,
    base_url: String,
}

impl HttpAuthService {
    pub fn new(config: &ApiConfig) -> crate::Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn login(&self, request: &LoginRequest) -> edublog_core::Result<RawResponse> {
        let url = format!("{}/users/login", self.base_url);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!("Login request failed: {}", e);
                Error::Network(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read login response: {}", e)))?;

        Ok(RawResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            timeout_ms: 2_000,
        }
    }

    #[tokio::test]
    async fn test_login_passes_status_and_body_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .and(body_json(json!({"email": "x@y.com", "password": "bad"})))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "message": "Invalid credentials"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = HttpAuthService::new(&config(&format!("{}/api/", server.uri()))).unwrap();
        let response = auth
            .login(&LoginRequest::new("x@y.com", "bad"))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert!(response.body.contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // nothing listens on the discard port
        let auth = HttpAuthService::new(&config("http://127.0.0.1:9")).unwrap();
        let err = auth
            .login(&LoginRequest::new("x@y.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
