//! HTTP relay client
//!
//! Speaks the relay's JSON-array protocol:
//!
//! | Operation          | Request                          |
//! |--------------------|----------------------------------|
//! | create / join      | `POST {relay}/{sid}` `[ids]`     |
//! | list members       | `GET {relay}/{sid}`              |
//! | start              | `POST {relay}/start/{sid}` `[ids]` |
//! | signal completion  | `POST {relay}/complete/{sid}` `[id]` |
//! | completion status  | `GET {relay}/complete/{sid}`     |
//! | end                | `DELETE {relay}/{sid}`           |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use tracing::debug;

use tessera_core::{PartyId, SessionId};

use crate::client::SessionClient;
use crate::error::{RelayError, Result};

/// Per-request timeout; polling loops own the overall deadline
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// [`SessionClient`] backed by a relay server over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpSessionClient {
    relay_url: String,
    client: reqwest::Client,
}

impl HttpSessionClient {
    /// Create a client for the relay at `relay_url`
    pub fn new(relay_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Self::with_client(relay_url, client)
    }

    /// Use a preconfigured `reqwest` client (proxies, TLS roots, timeouts)
    pub fn with_client(relay_url: impl Into<String>, client: reqwest::Client) -> Result<Self> {
        let relay_url = relay_url.into().trim_end_matches('/').to_string();
        if relay_url.is_empty() {
            return Err(RelayError::Config("Relay URL is empty".to_string()));
        }
        Ok(Self { relay_url, client })
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    fn session_url(&self, session_id: &SessionId) -> String {
        format!("{}/{}", self.relay_url, session_id)
    }

    fn start_url(&self, session_id: &SessionId) -> String {
        format!("{}/start/{}", self.relay_url, session_id)
    }

    fn complete_url(&self, session_id: &SessionId) -> String {
        format!("{}/complete/{}", self.relay_url, session_id)
    }

    async fn post_parties(&self, url: String, parties: &[PartyId]) -> Result<()> {
        debug!("POST {} {:?}", url, parties);
        let response = self.client.post(&url).json(parties).send().await?;
        ensure_success(response, url).await.map(|_| ())
    }

    async fn get_parties(&self, url: String) -> Result<Vec<PartyId>> {
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;

        // Sessions that were not created yet read as empty
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let response = ensure_success(response, url).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

async fn ensure_success(response: Response, url: String) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RelayError::Status {
            status: status.as_u16(),
            url,
        })
    }
}

#[async_trait]
impl SessionClient for HttpSessionClient {
    async fn create_session(&self, session_id: &SessionId, members: &[PartyId]) -> Result<()> {
        self.post_parties(self.session_url(session_id), members).await
    }

    async fn join_session(&self, session_id: &SessionId, party_id: &PartyId) -> Result<()> {
        self.post_parties(self.session_url(session_id), std::slice::from_ref(party_id))
            .await
    }

    async fn list_members(&self, session_id: &SessionId) -> Result<Vec<PartyId>> {
        self.get_parties(self.session_url(session_id)).await
    }

    async fn start_session(&self, session_id: &SessionId, members: &[PartyId]) -> Result<()> {
        self.post_parties(self.start_url(session_id), members).await
    }

    async fn signal_complete(&self, session_id: &SessionId, party_id: &PartyId) -> Result<()> {
        self.post_parties(self.complete_url(session_id), std::slice::from_ref(party_id))
            .await
    }

    async fn completed_parties(&self, session_id: &SessionId) -> Result<Vec<PartyId>> {
        self.get_parties(self.complete_url(session_id)).await
    }

    async fn end_session(&self, session_id: &SessionId) -> Result<()> {
        let url = self.session_url(session_id);
        debug!("DELETE {}", url);
        let response = self.client.delete(&url).send().await?;
        ensure_success(response, url).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_strip_trailing_slash() {
        let client = HttpSessionClient::new("https://relay.example/router/").unwrap();
        let sid = SessionId::from("abc");
        assert_eq!(client.relay_url(), "https://relay.example/router");
        assert_eq!(client.session_url(&sid), "https://relay.example/router/abc");
        assert_eq!(client.start_url(&sid), "https://relay.example/router/start/abc");
        assert_eq!(
            client.complete_url(&sid),
            "https://relay.example/router/complete/abc"
        );
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(matches!(
            HttpSessionClient::new("/"),
            Err(RelayError::Config(_))
        ));
    }
}
