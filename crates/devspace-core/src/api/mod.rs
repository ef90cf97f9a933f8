pub mod error;
pub mod http;
pub mod types;

use async_trait::async_trait;

pub use error::ApiError;
pub use http::HttpBackend;
pub use types::{
    ActiveSessionPayload, BlueprintCompleteness, BlueprintStatus, DispatchReply, DispatchRequest,
    HistoryRecord, RecordMetadata, RequirementsForm, UsageSummary, WireToolExecution,
};

use crate::ids::SpaceId;

/// Remote operations the chat core depends on.
///
/// Implementations do not apply timeouts; callers bound every call.
#[async_trait]
pub trait SpaceBackend: Send + Sync + 'static {
    async fn check_blueprint(&self, space_id: &SpaceId) -> Result<BlueprintStatus, ApiError>;

    /// Returns the space's active session, creating one lazily on the backend if needed.
    async fn fetch_active_session(
        &self,
        space_id: &SpaceId,
    ) -> Result<ActiveSessionPayload, ApiError>;

    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReply, ApiError>;

    async fn initiate_blueprint_from_repo(
        &self,
        space_id: &SpaceId,
        repo_url: &str,
    ) -> Result<(), ApiError>;

    async fn initiate_blueprint_from_form(
        &self,
        space_id: &SpaceId,
        form: &RequirementsForm,
    ) -> Result<(), ApiError>;

    async fn initiate_blueprint_from_json(
        &self,
        space_id: &SpaceId,
        json_content: &str,
    ) -> Result<(), ApiError>;
}
