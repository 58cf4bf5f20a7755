//! VK-style method API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::ApiConfig;
use crate::metrics;
use crate::payload::Payload;

use super::{PhotoApiError, PhotoService, Session, UploadDestination, UploadReceipt};

/// Longest slice of a response body quoted in error messages.
const BODY_EXCERPT_LEN: usize = 200;

/// Photo service client speaking the VK method API.
pub struct VkClient {
    client: Client,
    config: ApiConfig,
}

impl VkClient {
    /// Create a new client.
    pub fn new(config: ApiConfig) -> Result<Self, PhotoApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| PhotoApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Full URL of a method endpoint.
    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), method)
    }

    /// Call a method with the session's token and API version plus `params`.
    ///
    /// Returns the raw body once it is known not to carry an error envelope.
    async fn call_method(
        &self,
        method: &str,
        session: &Session,
        params: &[(&str, String)],
    ) -> Result<String, PhotoApiError> {
        let start = Instant::now();
        debug!(method = method, "Calling remote method");

        let result = async {
            let response = self
                .client
                .get(self.method_url(method))
                .query(&[("access_token", session.token()), ("v", session.version())])
                .query(params)
                .send()
                .await
                .map_err(map_transport_error)?;
            read_checked_body(response).await
        }
        .await;

        metrics::record_remote_call(method, result.is_ok(), start.elapsed().as_secs_f64());
        result
    }
}

#[async_trait]
impl PhotoService for VkClient {
    fn name(&self) -> &str {
        "vk"
    }

    async fn validate(&self, session: &Session) -> Result<(), PhotoApiError> {
        let params = [
            ("owner_id", format!("-{}", session.group_id())),
            ("album_id", session.album_id().to_string()),
            ("count", "1".to_string()),
        ];
        self.call_method("photos.get", session, &params).await?;
        Ok(())
    }

    async fn upload_destination(
        &self,
        session: &Session,
    ) -> Result<UploadDestination, PhotoApiError> {
        let params = [
            ("group_id", session.group_id().to_string()),
            ("album_id", session.album_id().to_string()),
        ];
        let body = self
            .call_method("photos.getUploadServer", session, &params)
            .await?;
        parse_upload_destination(&body)
    }

    async fn upload_binary(
        &self,
        destination: &UploadDestination,
        payload: Payload,
    ) -> Result<UploadReceipt, PhotoApiError> {
        let start = Instant::now();
        debug!(
            url = %destination,
            attachments = payload.len(),
            bytes = payload.total_bytes(),
            "Uploading payload"
        );

        let form = payload.into_form()?;
        let result = async {
            let response = self
                .client
                .post(destination.as_str())
                .multipart(form)
                .send()
                .await
                .map_err(map_transport_error)?;
            let body = read_checked_body(response).await?;
            parse_upload_receipt(&body)
        }
        .await;

        metrics::record_remote_call("upload", result.is_ok(), start.elapsed().as_secs_f64());
        result
    }

    async fn commit_upload(
        &self,
        session: &Session,
        receipt: &UploadReceipt,
        caption: Option<&str>,
    ) -> Result<usize, PhotoApiError> {
        let params = commit_params(session, receipt, caption);
        let body = self.call_method("photos.save", session, &params).await?;
        Ok(parse_saved_count(&body))
    }
}

/// Read the body, check for an error envelope, then check the HTTP status.
async fn read_checked_body(response: Response) -> Result<String, PhotoApiError> {
    let status = response.status();
    let body = response.text().await.map_err(map_transport_error)?;

    check_error_envelope(&body)?;

    if !status.is_success() {
        return Err(PhotoApiError::UnexpectedResponse(format!(
            "HTTP {}: {}",
            status,
            excerpt(&body)
        )));
    }

    Ok(body)
}

fn map_transport_error(e: reqwest::Error) -> PhotoApiError {
    if e.is_timeout() {
        PhotoApiError::Timeout
    } else {
        PhotoApiError::Transport(e.to_string())
    }
}

/// Parameters of `photos.save`. `caption` is only sent when present.
fn commit_params(
    session: &Session,
    receipt: &UploadReceipt,
    caption: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("group_id", session.group_id().to_string()),
        ("album_id", session.album_id().to_string()),
        ("server", receipt.server.to_string()),
        ("photos_list", receipt.photos_list.clone()),
        ("hash", receipt.hash.clone()),
    ];
    if let Some(caption) = caption {
        params.push(("caption", caption.to_string()));
    }
    params
}

/// Fail with `RemoteRejected` when the body is an error envelope with a non-zero code.
///
/// Bodies that are not JSON or carry no envelope pass; callers still check shape.
fn check_error_envelope(body: &str) -> Result<(), PhotoApiError> {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return Ok(());
    };
    match envelope.error {
        Some(error) if error.error_code != 0 => Err(PhotoApiError::RemoteRejected {
            code: error.error_code,
            message: error.error_msg,
        }),
        _ => Ok(()),
    }
}

fn parse_upload_destination(body: &str) -> Result<UploadDestination, PhotoApiError> {
    let parsed: GetUploadServerResponse = serde_json::from_str(body).map_err(|_| {
        PhotoApiError::UnexpectedResponse(format!(
            "photos.getUploadServer: malformed response: {}",
            excerpt(body)
        ))
    })?;

    match parsed.response {
        Some(info) if !info.upload_url.is_empty() => Ok(UploadDestination::new(info.upload_url)),
        _ => Err(PhotoApiError::UnexpectedResponse(
            "photos.getUploadServer: no upload_url in response".to_string(),
        )),
    }
}

fn parse_upload_receipt(body: &str) -> Result<UploadReceipt, PhotoApiError> {
    let unexpected = || {
        PhotoApiError::UnexpectedResponse(format!(
            "upload server returned unexpected response: {}",
            excerpt(body)
        ))
    };

    let parsed: UploadServerResponse = serde_json::from_str(body).map_err(|_| unexpected())?;
    if parsed.photos_list.is_empty() {
        return Err(unexpected());
    }

    Ok(UploadReceipt {
        server: parsed.server,
        photos_list: parsed.photos_list,
        hash: parsed.hash,
        aid: parsed.aid,
    })
}

/// Number of photos listed in a `photos.save` response (0 if absent).
fn parse_saved_count(body: &str) -> usize {
    serde_json::from_str::<SaveResponse>(body)
        .map(|r| r.response.len())
        .unwrap_or(0)
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

// Method API response types
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct GetUploadServerResponse {
    response: Option<UploadServerInfo>,
}

#[derive(Debug, Deserialize)]
struct UploadServerInfo {
    #[serde(default)]
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadServerResponse {
    #[serde(default)]
    server: i64,
    #[serde(default)]
    photos_list: String,
    #[serde(default)]
    aid: Option<i64>,
    #[serde(default)]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    #[serde(default)]
    response: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaPool, Picture};
    use crate::payload::PayloadBuilder;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn session() -> Session {
        Session::new("token", "123", "456", "5.131")
    }

    fn receipt() -> UploadReceipt {
        UploadReceipt {
            server: 777,
            photos_list: "[{\"photo\":\"x\"}]".to_string(),
            hash: "abc".to_string(),
            aid: Some(456),
        }
    }

    #[test]
    fn test_method_url() {
        let client = VkClient::new(ApiConfig {
            base_url: "http://localhost:9000/method/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.method_url("photos.get"),
            "http://localhost:9000/method/photos.get"
        );

        let client = VkClient::new(ApiConfig {
            base_url: "http://localhost:9000/method".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.method_url("photos.save"),
            "http://localhost:9000/method/photos.save"
        );
    }

    #[test]
    fn test_error_envelope_detected() {
        let body = r#"{"error": {"error_code": 5, "error_msg": "User authorization failed"}}"#;
        match check_error_envelope(body) {
            Err(PhotoApiError::RemoteRejected { code, message }) => {
                assert_eq!(code, 5);
                assert_eq!(message, "User authorization failed");
            }
            other => panic!("expected RemoteRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_error_envelope_zero_code_passes() {
        let body = r#"{"error": {"error_code": 0, "error_msg": ""}}"#;
        assert!(check_error_envelope(body).is_ok());
    }

    #[test]
    fn test_error_envelope_absent_passes() {
        assert!(check_error_envelope(r#"{"response": {"count": 1}}"#).is_ok());
        assert!(check_error_envelope("not json at all").is_ok());
    }

    #[test]
    fn test_parse_upload_destination() {
        let body = r#"{"response": {"upload_url": "https://pu.vk.com/c1/upload", "album_id": 456, "user_id": 1}}"#;
        let dest = parse_upload_destination(body).unwrap();
        assert_eq!(dest.as_str(), "https://pu.vk.com/c1/upload");
    }

    #[test]
    fn test_parse_upload_destination_empty_url() {
        let body = r#"{"response": {"upload_url": ""}}"#;
        assert!(matches!(
            parse_upload_destination(body),
            Err(PhotoApiError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_parse_upload_destination_malformed() {
        assert!(matches!(
            parse_upload_destination("<html>"),
            Err(PhotoApiError::UnexpectedResponse(_))
        ));
        assert!(matches!(
            parse_upload_destination("{}"),
            Err(PhotoApiError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_parse_upload_receipt() {
        let body = r#"{"server": 777, "photos_list": "[{\"photo\":\"x\"}]", "aid": 456, "hash": "abc"}"#;
        let parsed = parse_upload_receipt(body).unwrap();
        assert_eq!(parsed, receipt());
    }

    #[test]
    fn test_parse_upload_receipt_empty_photos_list() {
        let body = r#"{"server": 777, "photos_list": "", "aid": 456, "hash": "abc"}"#;
        match parse_upload_receipt(body) {
            Err(PhotoApiError::UnexpectedResponse(msg)) => assert!(msg.contains("777")),
            other => panic!("expected UnexpectedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_upload_receipt_not_json() {
        assert!(matches!(
            parse_upload_receipt("Bad Gateway"),
            Err(PhotoApiError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_parse_saved_count() {
        let body = r#"{"response": [{"id": 1}, {"id": 2}, {"id": 3}]}"#;
        assert_eq!(parse_saved_count(body), 3);
        assert_eq!(parse_saved_count(r#"{"response": []}"#), 0);
        assert_eq!(parse_saved_count("garbage"), 0);
    }

    #[test]
    fn test_commit_params_with_caption() {
        let params = commit_params(&session(), &receipt(), Some("hello"));
        assert!(params.contains(&("caption", "hello".to_string())));
        assert!(params.contains(&("server", "777".to_string())));
        assert!(params.contains(&("hash", "abc".to_string())));
        assert!(params.contains(&("group_id", "123".to_string())));
    }

    #[test]
    fn test_commit_params_without_caption() {
        let params = commit_params(&session(), &receipt(), None);
        assert!(params.iter().all(|(k, _)| *k != "caption"));
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(1000);
        assert_eq!(excerpt(&long).len(), BODY_EXCERPT_LEN);
    }

    // Wire-level tests against a one-shot local HTTP server.

    /// Accept a single connection, answer with `status` and `body`, and
    /// hand back the raw request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        while !request_complete(&buf) {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn request_complete(buf: &[u8]) -> bool {
        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let body = &buf[header_end + 4..];

        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok());
        match content_length {
            Some(len) => body.len() >= len,
            None if headers.contains("transfer-encoding: chunked") => body.ends_with(b"0\r\n\r\n"),
            None => true,
        }
    }

    fn client_for(base: &str) -> VkClient {
        VkClient::new(ApiConfig {
            base_url: format!("{}/method/", base),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    fn request_line(request: &str) -> &str {
        request.lines().next().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_validate_sends_token_and_version() {
        let (base, server) = serve_once("200 OK", r#"{"response": {"count": 0, "items": []}}"#).await;

        client_for(&base).validate(&session()).await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(
            request_line(&request),
            "GET /method/photos.get?access_token=token&v=5.131&owner_id=-123&album_id=456&count=1 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_error_envelope_on_success_status() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"error": {"error_code": 5, "error_msg": "User authorization failed"}}"#,
        )
        .await;

        let err = client_for(&base).validate(&session()).await.unwrap_err();
        assert!(matches!(err, PhotoApiError::RemoteRejected { code: 5, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_envelope_wins_over_http_status() {
        let (base, server) = serve_once(
            "500 Internal Server Error",
            r#"{"error": {"error_code": 10, "error_msg": "Internal server error"}}"#,
        )
        .await;

        let err = client_for(&base)
            .upload_destination(&session())
            .await
            .unwrap_err();
        match err {
            PhotoApiError::RemoteRejected { code, message } => {
                assert_eq!(code, 10);
                assert_eq!(message, "Internal server error");
            }
            other => panic!("expected RemoteRejected, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_error_without_envelope() {
        let (base, server) = serve_once("502 Bad Gateway", "<html>bad gateway</html>").await;

        let err = client_for(&base).validate(&session()).await.unwrap_err();
        match err {
            PhotoApiError::UnexpectedResponse(msg) => assert!(msg.contains("502")),
            other => panic!("expected UnexpectedResponse, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_destination_over_http() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"response": {"upload_url": "https://pu.vk.com/c1/upload", "album_id": 456}}"#,
        )
        .await;

        let dest = client_for(&base).upload_destination(&session()).await.unwrap();
        assert_eq!(dest.as_str(), "https://pu.vk.com/c1/upload");

        let request = server.await.unwrap();
        let line = request_line(&request);
        assert!(line.starts_with("GET /method/photos.getUploadServer?access_token=token&v=5.131&"));
        assert!(line.contains("group_id=123"));
        assert!(line.contains("album_id=456"));
    }

    #[tokio::test]
    async fn test_upload_destination_empty_url_over_http() {
        let (base, server) = serve_once("200 OK", r#"{"response": {"upload_url": ""}}"#).await;

        let err = client_for(&base)
            .upload_destination(&session())
            .await
            .unwrap_err();
        assert!(matches!(err, PhotoApiError::UnexpectedResponse(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_binary_sends_multipart_fields() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"server": 777, "photos_list": "[{\"photo\":\"x\"}]", "aid": 456, "hash": "abc"}"#,
        )
        .await;
        let pool = MediaPool::new(vec![Picture::new("a.jpg", b"jpeg-bytes".to_vec())], vec![]);
        let payload = PayloadBuilder::default().build(&pool).unwrap();
        let destination = UploadDestination::new(format!("{}/upload.php?act=do_add", base));

        let parsed = client_for(&base)
            .upload_binary(&destination, payload)
            .await
            .unwrap();
        assert_eq!(parsed, receipt());

        let request = server.await.unwrap();
        assert!(request_line(&request).starts_with("POST /upload.php?act=do_add "));
        assert!(request
            .to_ascii_lowercase()
            .contains("content-type: multipart/form-data; boundary="));
        for i in 0..5 {
            assert!(
                request.contains(&format!("name=\"file{}\"; filename=\"a.jpg\"", i)),
                "missing field file{}",
                i
            );
        }
        assert!(!request.contains("name=\"file5\""));
        assert_eq!(request.matches("jpeg-bytes").count(), 5);
        assert!(request.contains("image/jpeg"));
    }

    #[tokio::test]
    async fn test_upload_binary_empty_photos_list() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"server": 1, "photos_list": "", "aid": 456, "hash": "abc"}"#,
        )
        .await;
        let pool = MediaPool::new(vec![Picture::new("a.png", b"png".to_vec())], vec![]);
        let payload = PayloadBuilder::default().build(&pool).unwrap();
        let destination = UploadDestination::new(format!("{}/upload.php", base));

        let err = client_for(&base)
            .upload_binary(&destination, payload)
            .await
            .unwrap_err();
        assert!(matches!(err, PhotoApiError::UnexpectedResponse(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_upload_over_http() {
        let (base, server) = serve_once("200 OK", r#"{"response": [{"id": 1}, {"id": 2}]}"#).await;

        let saved = client_for(&base)
            .commit_upload(&session(), &receipt(), Some("hello"))
            .await
            .unwrap();
        assert_eq!(saved, 2);

        let request = server.await.unwrap();
        let line = request_line(&request);
        assert!(line.starts_with("GET /method/photos.save?access_token=token&v=5.131&"));
        assert!(line.contains("server=777"));
        assert!(line.contains("hash=abc"));
        assert!(line.contains("caption=hello"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(&format!("http://{}", addr))
            .validate(&session())
            .await
            .unwrap_err();
        assert!(matches!(err, PhotoApiError::Transport(_)));
    }
}
