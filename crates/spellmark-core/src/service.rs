//! The external spell-checking service.
//!
//! Failures never reach the user: a transport failure means "no new
//! information" ([`CheckOutcome::Unavailable`]) and an undecodable body means
//! "no errors this cycle".

use std::future::Future;

use thiserror::Error;

use crate::types::DetectedError;

/// Result of one check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The full, replacing error list for the checked text.
    Errors(Vec<DetectedError>),
    /// Transport failure or cancellation. Leave the current list alone.
    Unavailable,
}

/// Internal failures of a check request.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CheckError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("undecodable response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can check text for a language.
pub trait SpellCheckService: Send + Sync {
    fn check<'a>(
        &'a self,
        text: &'a str,
        lang: &'a str,
    ) -> impl Future<Output = CheckOutcome> + Send + 'a;
}

/// Checks text by POSTing `text` and `lang` as multipart form fields.
#[derive(Clone, Debug)]
pub struct HttpSpellChecker {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSpellChecker {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, text: &str, lang: &str) -> Result<Vec<DetectedError>, CheckError> {
        let form = reqwest::multipart::Form::new()
            .text("text", text.to_owned())
            .text("lang", lang.to_owned());
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        decode_response(&body)
    }
}

impl SpellCheckService for HttpSpellChecker {
    fn check<'a>(
        &'a self,
        text: &'a str,
        lang: &'a str,
    ) -> impl Future<Output = CheckOutcome> + Send + 'a {
        async move {
            match self.request(text, lang).await {
                Ok(errors) => CheckOutcome::Errors(errors),
                Err(CheckError::Decode(e)) => {
                    tracing::warn!(error = %e, "malformed check response, treating as no errors");
                    CheckOutcome::Errors(Vec::new())
                }
                Err(e) => {
                    tracing::warn!(error = %e, endpoint = %self.endpoint, "spell check unavailable");
                    CheckOutcome::Unavailable
                }
            }
        }
    }
}

/// Decode the service's JSON array of errors. An empty body means no errors.
pub fn decode_response(body: &[u8]) -> Result<Vec<DetectedError>, CheckError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;

    /// Answer one request with `status` and `body`; the task yields the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/v1/spell", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (url, server)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let head = text[..head_end].to_ascii_lowercase();
            let body_len = buf.len() - head_end - 4;
            let complete = match head.lines().find_map(|l| l.strip_prefix("content-length:")) {
                Some(len) => body_len >= len.trim().parse::<usize>().unwrap(),
                None => text.ends_with("0\r\n\r\n"),
            };
            if complete {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_check_posts_multipart_and_decodes_reply() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"original": "problim", "suggestions": ["problem", "prelim"]}]"#,
        )
        .await;
        let checker = HttpSpellChecker::new(url);

        let outcome = checker.check("I have a problim", "en").await;
        assert_eq!(
            outcome,
            CheckOutcome::Errors(vec![DetectedError::new("problim", ["problem", "prelim"])])
        );

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/v1/spell "));
        assert!(
            request
                .to_ascii_lowercase()
                .contains("content-type: multipart/form-data; boundary=")
        );
        assert!(request.contains(r#"name="text""#));
        assert!(request.contains("\r\n\r\nI have a problim\r\n"));
        assert!(request.contains(r#"name="lang""#));
        assert!(request.contains("\r\n\r\nen\r\n"));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let (url, server) = serve_once("500 Internal Server Error", r#"{"error": "boom"}"#).await;
        let checker = HttpSpellChecker::new(url);
        assert_eq!(
            checker.check("I have a problim", "en").await,
            CheckOutcome::Unavailable
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_html_reply_means_no_errors() {
        let (url, server) = serve_once("200 OK", "<html>maintenance</html>").await;
        let checker = HttpSpellChecker::new(url);
        assert_eq!(
            checker.check("I have a problim", "en").await,
            CheckOutcome::Errors(Vec::new())
        );
        server.await.unwrap();
    }

    #[test]
    fn test_decode_error_list() {
        let body = br#"[
            {"original": "problim", "suggestions": ["problem", "prelim"]},
            {"original": "teh", "suggestions": []}
        ]"#;
        let errors = decode_response(body).unwrap();
        assert_eq!(
            errors,
            vec![
                DetectedError::new("problim", ["problem", "prelim"]),
                DetectedError::new("teh", Vec::<&str>::new()),
            ]
        );
    }

    #[test]
    fn test_decode_empty_body() {
        assert!(decode_response(b"").unwrap().is_empty());
        assert!(decode_response(b"  \n").unwrap().is_empty());
        assert!(decode_response(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            decode_response(b"<html>oops</html>"),
            Err(CheckError::Decode(_))
        ));
        assert!(matches!(
            decode_response(br#"{"original": "x"}"#),
            Err(CheckError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let checker = HttpSpellChecker::new("http://127.0.0.1:9/api/v1/spell");
        assert_eq!(
            checker.check("I have a problim", "en").await,
            CheckOutcome::Unavailable
        );
    }
}
