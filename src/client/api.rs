/// Backend API client that attaches the stored session token
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ClientError;
use super::session::SessionManager;

pub struct ApiClient {
    base_url: String,
    http_client: reqwest::Client,
    session: SessionManager,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionManager, http_client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a JSON resource; the bearer header is sent only when a token is stored
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        let mut request = self.http_client.get(&url);

        if let Some(token) = self.session.get_auth_token() {
            request = request.bearer_auth(token);
        }

        debug!("API request: GET {}", url);
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_url_join() {
        let client = ApiClient::new(
            "http://localhost:1337/",
            SessionManager::new(Arc::new(MemoryStore::new())),
            reqwest::Client::new(),
        );
        assert_eq!(client.url("/api/users/me"), "http://localhost:1337/api/users/me");
        assert_eq!(client.url("api/tiles"), "http://localhost:1337/api/tiles");
    }
}
