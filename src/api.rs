use crate::error::ApiError;
use crate::models::{Candidate, MatchEntry, MatchResponse, Page, Response};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::{ParseError, Url};

/// Remote matching backend. Every call is authenticated with a bearer token
/// obtained by the caller.
#[async_trait]
pub trait MatchApi: Send + Sync {
    /// `GET /match/recommendation?take=..&page=..`
    async fn fetch_recommendations(&self, token: &str, page: Page)
        -> Result<Vec<Candidate>, ApiError>;

    /// `POST /match/{candidate_id}?response=..`
    async fn submit_response(
        &self,
        token: &str,
        candidate_id: &str,
        response: Response,
    ) -> Result<MatchResponse, ApiError>;

    /// `GET /match?take=..&page=..`
    async fn fetch_matches(&self, token: &str, page: Page) -> Result<Vec<MatchEntry>, ApiError>;
}

pub struct HttpMatchApi {
    client: Client,
    base_url: Url,
}

impl HttpMatchApi {
    pub fn new(base_url: &str, timeout_seconds: u64, user_agent: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path relative to the base URL, keeping any base path prefix
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn page_url(&self, path: &str, page: Page) -> Result<Url, ApiError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("take", &page.size.to_string())
            .append_pair("page", &page.number.to_string());
        Ok(url)
    }

    /// `match/{candidate_id}?response=..` with the id encoded as one path segment
    fn decision_url(&self, candidate_id: &str, response: Response) -> Result<Url, ApiError> {
        let mut url = self.endpoint("match/")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(candidate_id);
        url.query_pairs_mut()
            .append_pair("response", response.as_query_value());
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &str, url: Url) -> Result<T, ApiError> {
        log::debug!("GET {url}");
        let resp = self
            .client
            .get(url)
            .headers(bearer_headers(token)?)
            .send()
            .await?;
        read_json(resp).await
    }
}

#[async_trait]
impl MatchApi for HttpMatchApi {
    async fn fetch_recommendations(
        &self,
        token: &str,
        page: Page,
    ) -> Result<Vec<Candidate>, ApiError> {
        let url = self.page_url("match/recommendation", page)?;
        self.get_json(token, url).await
    }

    async fn submit_response(
        &self,
        token: &str,
        candidate_id: &str,
        response: Response,
    ) -> Result<MatchResponse, ApiError> {
        let url = self.decision_url(candidate_id, response)?;
        log::debug!("POST {url}");
        let resp = self
            .client
            .post(url)
            .headers(bearer_headers(token)?)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        read_json(resp).await
    }

    async fn fetch_matches(&self, token: &str, page: Page) -> Result<Vec<MatchEntry>, ApiError> {
        let url = self.page_url("match", page)?;
        self.get_json(token, url).await
    }
}

/// Base URLs are treated as directories so relative joins keep their path
fn normalize_base_url(base_url: &str) -> Result<Url, ApiError> {
    let trimmed = base_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Ok(Url::parse(&with_slash)?)
}

fn bearer_headers(token: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let auth_value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ApiError::InvalidCredential)?;
    headers.insert(AUTHORIZATION, auth_value);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

/// Prefer the backend's `{"message": ...}` envelope over the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| match value.get("message") {
            Some(serde_json::Value::String(message)) => Some(message.clone()),
            Some(serde_json::Value::Array(messages)) => Some(
                messages
                    .iter()
                    .filter_map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn api(base: &str) -> HttpMatchApi {
        HttpMatchApi::new(base, 5, "banp-feed-test").unwrap()
    }

    /// Accept one connection, answer with `body` and return the raw request
    async fn serve_once(listener: TcpListener, body: &'static str) -> String {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }

        let reply = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(reply.as_bytes()).await.unwrap();
        String::from_utf8(request).unwrap()
    }

    #[test]
    fn test_decision_url_encodes_candidate_id() {
        let api = api("https://api.example.com/v1");
        let url = api.decision_url("a b/c", Response::Reject).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/match/a%20b%2Fc?response=unlike"
        );

        let url = api.decision_url("42", Response::Accept).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/match/42?response=like");
    }

    #[tokio::test]
    async fn test_submit_response_request_on_the_wire() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(listener, r#"{"is_match":true}"#));

        let api = HttpMatchApi {
            client: Client::builder().no_proxy().build().unwrap(),
            base_url: normalize_base_url(&format!("http://{addr}/v1")).unwrap(),
        };
        let reply = api
            .submit_response("abc123", "a b/c", Response::Reject)
            .await
            .unwrap();
        assert!(reply.is_match);

        let request = server.await.unwrap();
        assert!(
            request.starts_with("POST /v1/match/a%20b%2Fc?response=unlike HTTP/1.1\r\n"),
            "unexpected request line: {request}"
        );
        let lowered = request.to_ascii_lowercase();
        assert!(lowered.contains("authorization: bearer abc123\r\n"));
        assert!(lowered.contains("content-type: application/json\r\n"));
        assert!(request.ends_with("\r\n\r\n{}"));
    }

    #[test]
    fn test_recommendation_url() {
        let api = api("http://localhost:3333");
        let url = api
            .page_url("match/recommendation", Page { number: 3, size: 5 })
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3333/match/recommendation?take=5&page=3"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let api = api("https://api.example.com/v1");
        let url = api.page_url("match", Page { number: 1, size: 10 }).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/match?take=10&page=1");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpMatchApi::new("not a url", 5, "test"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_bearer_headers() {
        let headers = bearer_headers("abc123").unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc123");
        assert!(matches!(
            bearer_headers("bad\ntoken"),
            Err(ApiError::InvalidCredential)
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"statusCode":401,"message":"Unauthorized"}"#),
            "Unauthorized"
        );
        assert_eq!(
            error_message(r#"{"message":["take must be positive","page must be positive"]}"#),
            "take must be positive; page must be positive"
        );
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }
}
