//! Booking document fetched over HTTP

use std::time::Duration;

use reqwest::{Client, StatusCode};

use super::{Booking, SourceError, UpstreamSource};

/// Per-request timeout for the default client
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Source that GETs a JSON booking document from a URL
#[derive(Debug, Clone)]
pub struct HttpSource {
    /// HTTP client for making requests
    http_client: Client,
    /// Location of the booking document
    url: String,
}

impl HttpSource {
    /// Creates a new HttpSource whose requests time out after 20 seconds
    pub fn new(url: impl Into<String>) -> Self {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(http_client, url)
    }

    /// Creates a new HttpSource sharing an existing client
    pub fn with_client(http_client: Client, url: impl Into<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl UpstreamSource for HttpSource {
    type Record = Booking;

    async fn fetch(&self) -> Result<Booking, SourceError> {
        let response = self.http_client.get(&self.url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(self.url.clone()));
        }

        let body = response.error_for_status()?.text().await?;
        Booking::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_booking;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one canned HTTP response on a local port
    async fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{}/booking.json", addr)
    }

    #[tokio::test]
    async fn test_fetch_decodes_successful_response() {
        let booking = sample_booking("BK-HTTP");
        let url = serve_once("200 OK", serde_json::to_string(&booking).unwrap()).await;

        let fetched = HttpSource::new(url).fetch().await.unwrap();
        assert_eq!(fetched, booking);
    }

    #[tokio::test]
    async fn test_fetch_maps_404_to_not_found() {
        let url = serve_once("404 Not Found", String::new()).await;

        let result = HttpSource::new(url.clone()).fetch().await;
        match result {
            Err(SourceError::NotFound(missing)) => assert_eq!(missing, url),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_maps_server_error_to_http() {
        let url = serve_once("503 Service Unavailable", String::new()).await;

        let result = HttpSource::new(url).fetch().await;
        assert!(matches!(result, Err(SourceError::Http(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_body() {
        let url = serve_once("200 OK", "[]".to_string()).await;

        let result = HttpSource::new(url).fetch().await;
        assert!(matches!(result, Err(SourceError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_fetch_from_stalled_server_fails_with_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the connection without ever answering
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let source = HttpSource::with_client(client, format!("http://{}/booking.json", addr));

        let result = tokio::time::timeout(Duration::from_secs(5), source.fetch())
            .await
            .expect("client timeout should end the request");
        match result {
            Err(SourceError::Http(e)) => assert!(e.is_timeout()),
            other => panic!("expected Http timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_url_is_kept() {
        let source = HttpSource::new("https://example.com/booking.json");
        assert_eq!(source.url(), "https://example.com/booking.json");
    }
}
