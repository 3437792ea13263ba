//! HTTP client for the lookbook sync server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use uuid::Uuid;

use super::protocol::PullResponse;
use super::remote::{RemoteApi, RemoteError};
use crate::models::{Garment, Outfit};

/// A remote call that has not resolved within this window counts as a
/// transient failure and lands in the ledger.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Transient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: serde::Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&T>,
    ) -> Result<reqwest::Response, RemoteError> {
        let mut request = self
            .client
            .request(method, self.endpoint(path))
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(transport_error)
    }

    async fn expect_ok(&self, response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        match classify_status(response.status()) {
            None => Ok(response),
            Some(err) => Err(err),
        }
    }
}

/// Transport-level failures (refused connection, DNS, timeout) are always
/// retryable.
fn transport_error(e: reqwest::Error) -> RemoteError {
    RemoteError::Transient(e.to_string())
}

/// Maps a response status to an error class, or `None` for success.
fn classify_status(status: StatusCode) -> Option<RemoteError> {
    if status.is_success() {
        None
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Some(RemoteError::Transient(format!("server returned {}", status)))
    } else {
        Some(RemoteError::Rejected(format!("server returned {}", status)))
    }
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn create_garment(&self, garment: &Garment) -> Result<(), RemoteError> {
        let path = format!("/garments/{}", garment.id);
        let response = self.send_json(reqwest::Method::PUT, &path, Some(garment)).await?;
        self.expect_ok(response).await.map(|_| ())
    }

    async fn delete_garment(&self, id: Uuid) -> Result<(), RemoteError> {
        let path = format!("/garments/{}", id);
        let response = self
            .send_json::<()>(reqwest::Method::DELETE, &path, None)
            .await?;
        // Already gone remotely is still a confirmed delete
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.expect_ok(response).await.map(|_| ())
    }

    async fn garments_by_owner(&self, owner_id: &str) -> Result<Vec<Garment>, RemoteError> {
        let path = format!("/owners/{}/garments", owner_id);
        let response = self.send_json::<()>(reqwest::Method::GET, &path, None).await?;
        let response = self.expect_ok(response).await?;
        response.json().await.map_err(transport_error)
    }

    async fn create_outfit(&self, outfit: &Outfit) -> Result<(), RemoteError> {
        let path = format!("/outfits/{}", outfit.id);
        let response = self.send_json(reqwest::Method::PUT, &path, Some(outfit)).await?;
        self.expect_ok(response).await.map(|_| ())
    }

    async fn update_outfit(&self, outfit: &Outfit) -> Result<(), RemoteError> {
        let path = format!("/outfits/{}", outfit.id);
        let response = self.send_json(reqwest::Method::PUT, &path, Some(outfit)).await?;
        self.expect_ok(response).await.map(|_| ())
    }

    async fn delete_outfit(&self, id: Uuid) -> Result<(), RemoteError> {
        let path = format!("/outfits/{}", id);
        let response = self
            .send_json::<()>(reqwest::Method::DELETE, &path, None)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.expect_ok(response).await.map(|_| ())
    }

    async fn outfits_by_owner(&self, owner_id: &str) -> Result<Vec<Outfit>, RemoteError> {
        let path = format!("/owners/{}/outfits", owner_id);
        let response = self.send_json::<()>(reqwest::Method::GET, &path, None).await?;
        let response = self.expect_ok(response).await?;
        response.json().await.map_err(transport_error)
    }

    async fn pull(
        &self,
        owner_id: &str,
        watermark: Option<&str>,
    ) -> Result<PullResponse, RemoteError> {
        let mut path = format!("/owners/{}/changes", owner_id);
        if let Some(watermark) = watermark {
            path = format!("{}?since={}", path, watermark);
        }
        let response = self.send_json::<()>(reqwest::Method::GET, &path, None).await?;
        let response = self.expect_ok(response).await?;
        response.json().await.map_err(transport_error)
    }
}

/// Quick reachability probe against the server's health endpoint.
pub async fn check_server(base_url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    let url = format!("{}/health", base_url.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let remote = HttpRemote::new("https://sync.example.com/", "key").unwrap();
        assert_eq!(
            remote.endpoint("/garments/abc"),
            "https://sync.example.com/garments/abc"
        );
    }

    #[test]
    fn test_classify_status_success() {
        assert!(classify_status(StatusCode::OK).is_none());
        assert!(classify_status(StatusCode::CREATED).is_none());
        assert!(classify_status(StatusCode::NO_CONTENT).is_none());
    }

    #[test]
    fn test_classify_status_transient() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            let err = classify_status(status).unwrap();
            assert!(err.is_transient(), "{} should be transient", status);
        }
    }

    #[test]
    fn test_classify_status_rejected() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::CONFLICT,
            StatusCode::UNPROCESSABLE_ENTITY,
        ] {
            let err = classify_status(status).unwrap();
            assert!(!err.is_transient(), "{} should be permanent", status);
        }
    }

    #[tokio::test]
    async fn test_check_server_unreachable() {
        assert!(!check_server("http://127.0.0.1:1").await);
    }
}
