use super::RoutePolicy;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Response, StatusCode};
use http_body_util::Full;

const JSON: &str = "application/json";

/// A complete response, converted to a hyper response at the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, String)>,
    body: Bytes,
}

impl MockResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn from_policy(policy: &RoutePolicy) -> Self {
        Self::new(policy.status())
            .header(CONTENT_TYPE, JSON)
            .body(policy.body().clone())
    }

    /// The response `from_policy` would send, minus the body. The
    /// `Content-Length` still reports the payload size.
    pub fn head_from_policy(policy: &RoutePolicy) -> Self {
        Self::new(policy.status())
            .header(CONTENT_TYPE, JSON)
            .header(CONTENT_LENGTH, policy.body().len().to_string())
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED).header(http::header::ALLOW, "GET, HEAD")
    }

    pub fn header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// hyper fills in `Content-Length` from the body unless a header
    /// already carries one.
    pub fn into_http(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            if let Ok(value) = HeaderValue::try_from(value) {
                headers.insert(name, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::time::Duration;

    fn pong() -> RoutePolicy {
        let payload = json!({ "message": "pong" }).as_object().cloned().unwrap();
        RoutePolicy::new("/ping", Duration::ZERO, payload, 200).unwrap()
    }

    #[tokio::test]
    async fn test_policy_response_into_http() {
        let response = MockResponse::from_policy(&pong()).into_http();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"message":"pong"}"#);
    }

    #[tokio::test]
    async fn test_head_keeps_payload_length() {
        let policy = pong();
        let response = MockResponse::head_from_policy(&policy);

        assert!(response.body_bytes().is_empty());
        assert_eq!(response.header_value("content-length"), Some("18"));

        let response = response.into_http();
        assert_eq!(response.headers()[CONTENT_LENGTH], "18");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[test]
    fn test_not_found_has_empty_body() {
        let response = MockResponse::not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.body_bytes().is_empty());
    }

    #[test]
    fn test_method_not_allowed_advertises_get_and_head() {
        let response = MockResponse::method_not_allowed();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header_value("allow"), Some("GET, HEAD"));
    }
}
