//! HTTP client construction with the authorizer installed.

use std::time::Duration;

use reqwest_middleware::ClientWithMiddleware;

use crate::authorizer::RequestAuthorizer;

/// Builds a `reqwest` client with `authorizer` in its middleware stack.
///
/// # Arguments
///
/// * `authorizer` - The authorizer to install
/// * `request_timeout` - Per-request timeout; `None` means no timeout
///
/// # Errors
///
/// Returns an error if the underlying HTTP client cannot be created.
pub fn build_client(
    authorizer: RequestAuthorizer,
    request_timeout: Option<Duration>,
) -> Result<ClientWithMiddleware, reqwest::Error> {
    let reqwest_client = match request_timeout {
        Some(timeout) => reqwest::Client::builder().timeout(timeout).build()?,
        None => reqwest::Client::builder().build()?,
    };

    Ok(wrap_client(reqwest_client, authorizer))
}

/// Installs `authorizer` on an existing `reqwest` client.
#[must_use]
pub fn wrap_client(client: reqwest::Client, authorizer: RequestAuthorizer) -> ClientWithMiddleware {
    reqwest_middleware::ClientBuilder::new(client)
        .with(authorizer)
        .build()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::Response;
    use tokengate_common::{AuthorizerConfig, ResourceServerConfig, SharedTokenStore};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::TransportError;
    use crate::error_handler::ResourceServerErrorHandler;

    fn config_for(server: &MockServer, send_access_token: bool) -> AuthorizerConfig {
        AuthorizerConfig::ResourceServer(ResourceServerConfig {
            allowed_urls: Some(vec![format!("{}/api", server.uri())]),
            send_access_token,
        })
    }

    async fn authorization_headers(server: &MockServer) -> Vec<Option<String>> {
        server
            .received_requests()
            .await
            .expect("request recording is enabled")
            .iter()
            .map(|request| {
                request
                    .headers
                    .get("authorization")
                    .map(|value| value.to_str().unwrap().to_string())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_attaches_held_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/flights"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let tokens = SharedTokenStore::new();
        tokens.set_access_token("test-token");
        let authorizer = RequestAuthorizer::new(config_for(&mock_server, true), Arc::new(tokens));
        let client = build_client(authorizer, Some(Duration::from_secs(5))).unwrap();

        let response = client
            .get(format!("{}/api/flights", mock_server.uri()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_waits_for_token_received() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/flights"))
            .and(header("authorization", "Bearer late-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let tokens = SharedTokenStore::new();
        let authorizer =
            RequestAuthorizer::new(config_for(&mock_server, true), Arc::new(tokens.clone()));
        let client = build_client(authorizer, None).unwrap();

        let publisher = tokens.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            publisher.set_access_token("late-token");
        });

        let response = client
            .get(format!("{}/api/flights", mock_server.uri()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(tokens.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_sends_without_token_after_wait() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/flights"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let authorizer = RequestAuthorizer::new(
            config_for(&mock_server, true),
            Arc::new(SharedTokenStore::new()),
        )
        .with_token_wait(Duration::from_millis(20));
        let client = build_client(authorizer, None).unwrap();

        let response = client
            .get(format!("{}/api/flights", mock_server.uri()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(authorization_headers(&mock_server).await, vec![None]);
    }

    #[tokio::test]
    async fn test_leaves_other_urls_alone() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/public/status"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let tokens = SharedTokenStore::new();
        tokens.set_access_token("test-token");
        let authorizer = RequestAuthorizer::new(config_for(&mock_server, true), Arc::new(tokens));
        let client = build_client(authorizer, None).unwrap();

        client
            .get(format!("{}/public/status", mock_server.uri()))
            .send()
            .await
            .unwrap();

        assert_eq!(authorization_headers(&mock_server).await, vec![None]);
    }

    #[tokio::test]
    async fn test_unauthorized_goes_to_error_handler() {
        struct RecordingHandler {
            unauthorized: AtomicUsize,
        }

        #[async_trait]
        impl ResourceServerErrorHandler for RecordingHandler {
            async fn handle_error(
                &self,
                error: TransportError,
            ) -> reqwest_middleware::Result<Response> {
                if error.is_unauthorized() {
                    self.unauthorized.fetch_add(1, Ordering::SeqCst);
                }
                error.into_result()
            }
        }

        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/flights"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let handler = Arc::new(RecordingHandler {
            unauthorized: AtomicUsize::new(0),
        });
        let tokens = SharedTokenStore::new();
        tokens.set_access_token("revoked");
        let authorizer = RequestAuthorizer::new(config_for(&mock_server, true), Arc::new(tokens))
            .with_error_handler(handler.clone());
        let client = build_client(authorizer, None).unwrap();

        let response = client
            .get(format!("{}/api/flights", mock_server.uri()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 401);
        assert_eq!(handler.unauthorized.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_failure_reaches_caller_through_noop_handler() {
        let tokens = SharedTokenStore::new();
        tokens.set_access_token("test-token");
        let authorizer = RequestAuthorizer::new(
            ResourceServerConfig {
                allowed_urls: None,
                send_access_token: false,
            },
            Arc::new(tokens),
        );
        let client = build_client(authorizer, Some(Duration::from_secs(2))).unwrap();

        // Reserve a free port, then release it so nothing is listening there.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client.get(format!("http://{addr}/api")).send().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_wrap_client_uses_given_client() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/bookings"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let tokens = SharedTokenStore::new();
        tokens.set_access_token("test-token");
        let authorizer = RequestAuthorizer::new(config_for(&mock_server, true), Arc::new(tokens));
        let client = wrap_client(reqwest::Client::new(), authorizer);

        let response = client
            .post(format!("{}/api/bookings", mock_server.uri()))
            .body("{}")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 201);
    }
}
