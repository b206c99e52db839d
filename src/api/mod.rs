//! Catalog service client.
//!
//! Thin transport layer over the remote catalog API: session authentication,
//! layer lookup/creation, and node upload. The node builder never touches
//! this module; it only produces the `Vec<Node>` handed over here.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nodeload::api::{CatalogClient, LayerSpec};
//!
//! let mut client = CatalogClient::new("https://catalog.example.org");
//! client.authenticate("importer@example.org", "secret").await?;
//! client.ensure_layer(&spec).await?;
//! client.create_nodes("bus.stops", &nodes).await?;
//! ```

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::Node;

/// Everything needed to create a missing layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Layer name, unique on the catalog.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Owning organization.
    pub organization: String,
    /// Layer category.
    pub category: String,
}

/// Client for the catalog HTTP API.
///
/// Holds the session key obtained by [`authenticate`](Self::authenticate);
/// mutating calls fail with [`ApiError::NotAuthenticated`] before it is set.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    session_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    results: Vec<String>,
}

impl CatalogClient {
    /// Create a client for a catalog base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Open a session; the returned key is sent with every later call.
    pub async fn authenticate(&mut self, email: &str, password: &str) -> ApiResult<()> {
        let response = self
            .client
            .get(format!("{}/get_session", self.base_url))
            .query(&[("e", email), ("p", password)])
            .send()
            .await
            .map_err(request)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthFailed("invalid credentials".to_string()));
        }
        let response = Self::check(response).await?;

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let key = session
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::AuthFailed("no session key returned".to_string()))?;

        self.session_key = Some(key);
        Ok(())
    }

    /// Whether a layer with this name exists on the catalog.
    pub async fn layer_exists(&self, name: &str) -> ApiResult<bool> {
        let response = self
            .client
            .get(format!("{}/layers/{}", self.base_url, name))
            .send()
            .await
            .map_err(request)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(response).await?;
        Ok(true)
    }

    /// Create a layer.
    pub async fn create_layer(&self, spec: &LayerSpec) -> ApiResult<()> {
        let response = self
            .authorized(reqwest::Method::PUT, "/layers")?
            .json(&serde_json::json!({ "data": spec }))
            .send()
            .await
            .map_err(request)?;
        Self::check(response).await?;
        Ok(())
    }

    /// Upload a batch of nodes into a layer, in one shot.
    pub async fn create_nodes(&self, layer: &str, nodes: &[Node]) -> ApiResult<()> {
        let response = self
            .authorized(reqwest::Method::PUT, &format!("/layers/{layer}/nodes"))?
            .json(&serde_json::json!({ "nodes": nodes }))
            .send()
            .await
            .map_err(request)?;
        Self::check(response).await?;
        Ok(())
    }

    /// Layer gatekeeper: create the layer when it is absent.
    ///
    /// Returns `true` when the layer was created, `false` when it already
    /// existed.
    pub async fn ensure_layer(&self, spec: &LayerSpec) -> ApiResult<bool> {
        if self.layer_exists(&spec.name).await? {
            return Ok(false);
        }
        self.create_layer(spec).await?;
        Ok(true)
    }

    /// A request builder carrying the session key.
    fn authorized(&self, method: reqwest::Method, path: &str) -> ApiResult<reqwest::RequestBuilder> {
        let key = self.session_key.as_ref().ok_or(ApiError::NotAuthenticated)?;
        Ok(self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("X-Auth", key))
    }

    /// Turn an error status into an [`ApiError`] with the server's message.
    async fn check(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ApiError::Api {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }
}

fn request(e: reqwest::Error) -> ApiError {
    ApiError::RequestFailed(e.to_string())
}
