//! `reqwest`-backed [`Transport`].

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, warn};

use tern_core::{
    ApiRequest, ApiResponse, HttpMethod, ResponseBody, Transport, TransportError, TransportResult,
};

use crate::config::HttpTransportConfig;

/// HTTP transport.
///
/// GET requests carry their parameters in the query string, POST requests
/// as a form body. Non-success statuses are returned as responses, not
/// errors; classifying them is the client's job.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Creates a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfig`] if the underlying client
    /// cannot be built.
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> TransportResult<ApiResponse> {
        let url = self.config.endpoint(&request.method);
        let params = request.flat_params();

        let builder = match request.http_method {
            HttpMethod::Get => self.client.get(&url).query(&params),
            HttpMethod::Post => self.client.post(&url).form(&params),
        };

        debug!(url = %url, http_method = %request.http_method, "Sending request");
        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { url: url.clone() }
            } else {
                TransportError::RequestFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Non-success HTTP status");
        }
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let text = resp
            .text()
            .await
            .map_err(|e| TransportError::BodyRead(e.to_string()))?;

        Ok(ApiResponse {
            status: status.as_u16(),
            headers,
            body: ResponseBody::parse(&text),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Map, Value, json};
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    async fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(HttpTransportConfig::new(format!("{}/method", server.uri()))).unwrap()
    }

    #[tokio::test]
    async fn test_get_sends_params_in_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/method/users.get"))
            .and(query_param("user_ids", "1,2"))
            .and(query_param("extended", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": [1, 2]})))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::new("users.get").with_params(params(json!({
            "user_ids": [1, 2],
            "extended": true,
            "fields": null,
        })));
        let response = transport(&server).await.send(&request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, ResponseBody::Json(json!({"response": [1, 2]})));
    }

    #[tokio::test]
    async fn test_post_sends_params_as_form_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/method/wall.post"))
            .and(body_string_contains("message=hello+there"))
            .and(body_string_contains("owner_id=-5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": {"post_id": 9}})))
            .expect(1)
            .mount(&server)
            .await;

        let request = ApiRequest::new("wall.post")
            .with_http_method(HttpMethod::Post)
            .with_params(params(json!({"message": "hello there", "owner_id": -5})));
        let response = transport(&server).await.send(&request).await.unwrap();

        assert_eq!(
            response.body,
            ResponseBody::Json(json!({"response": {"post_id": 9}}))
        );
    }

    #[tokio::test]
    async fn test_error_status_is_returned_as_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(503)
                    .insert_header("Retry-After", "2")
                    .set_body_string("service unavailable"),
            )
            .mount(&server)
            .await;

        let response = transport(&server)
            .await
            .send(&ApiRequest::new("users.get"))
            .await
            .unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.body, ResponseBody::Text("service unavailable".into()));
        assert!(
            response
                .headers
                .iter()
                .any(|(name, value)| name == "retry-after" && value == "2")
        );
    }

    #[tokio::test]
    async fn test_slow_server_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = HttpTransportConfig::new(format!("{}/method", server.uri()))
            .with_timeout(Duration::from_secs(1));
        let err = HttpTransport::new(config)
            .unwrap()
            .send(&ApiRequest::new("users.get"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Timeout { ref url } if url.ends_with("/method/users.get")));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_failure() {
        let server = MockServer::start().await;
        let base_url = format!("{}/method", server.uri());
        drop(server);

        let err = HttpTransport::new(HttpTransportConfig::new(base_url))
            .unwrap()
            .send(&ApiRequest::new("users.get"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::RequestFailed { .. }));
    }
}
