use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::ApiError;
use super::types::{
    ActiveSessionPayload, BlueprintStatus, BlueprintStatusPayload, DispatchReply,
    DispatchRequest, RequirementsForm,
};
use super::SpaceBackend;
use crate::config::ClientConfig;
use crate::ids::SpaceId;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// [`SpaceBackend`] over the backend's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(config.request_timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self::with_client(client, config.api_base_url.as_str()))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_ack(&self, path: &str, body: serde_json::Value) -> Result<(), ApiError> {
        let url = self.endpoint(path);
        debug!(target: "devspace::api", %url, "POST");
        let response = self.client.post(&url).json(&body).send().await?;
        ensure_success(response).await.map(|_| ())
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.error)
        .or_else(|| status.canonical_reason().map(str::to_string));
    warn!(target: "devspace::api", status = status.as_u16(), ?message, "Backend returned error status");
    Err(ApiError::status(status.as_u16(), message))
}

async fn read_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, ApiError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|err| ApiError::parsing(endpoint, err))
}

#[async_trait]
impl SpaceBackend for HttpBackend {
    async fn check_blueprint(&self, space_id: &SpaceId) -> Result<BlueprintStatus, ApiError> {
        let url = self.endpoint(&format!("spaces/{space_id}/blueprint"));
        debug!(target: "devspace::api", %url, "GET");
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(BlueprintStatus::Absent);
        }
        let response = ensure_success(response).await?;
        let payload: BlueprintStatusPayload = read_json("blueprint", response).await?;
        Ok(payload.into())
    }

    async fn fetch_active_session(
        &self,
        space_id: &SpaceId,
    ) -> Result<ActiveSessionPayload, ApiError> {
        let url = self.endpoint(&format!("sessions/space/{space_id}/active-chat"));
        debug!(target: "devspace::api", %url, "GET");
        let response = self.client.get(&url).send().await?;
        let response = ensure_success(response).await?;
        read_json("active-chat", response).await
    }

    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReply, ApiError> {
        let url = self.endpoint("chat/");
        debug!(
            target: "devspace::api",
            %url,
            session_id = %request.session_id,
            "POST chat message"
        );
        let response = self.client.post(&url).json(request).send().await?;
        let response = ensure_success(response).await?;
        read_json("chat", response).await
    }

    async fn initiate_blueprint_from_repo(
        &self,
        space_id: &SpaceId,
        repo_url: &str,
    ) -> Result<(), ApiError> {
        self.post_ack(
            "blueprint/initiate-from-repo",
            json!({ "spaceId": space_id, "repoUrl": repo_url }),
        )
        .await
    }

    async fn initiate_blueprint_from_form(
        &self,
        space_id: &SpaceId,
        form: &RequirementsForm,
    ) -> Result<(), ApiError> {
        let mut body = serde_json::to_value(form)
            .map_err(|err| ApiError::InvalidRequest(err.to_string()))?;
        if let Some(object) = body.as_object_mut() {
            object.insert("spaceId".to_string(), json!(space_id));
        }
        self.post_ack("blueprint/initiate-from-form", body).await
    }

    async fn initiate_blueprint_from_json(
        &self,
        space_id: &SpaceId,
        json_content: &str,
    ) -> Result<(), ApiError> {
        self.post_ack(
            "blueprint/initiate-from-json",
            json!({ "spaceId": space_id, "jsonContent": json_content }),
        )
        .await
    }
}
