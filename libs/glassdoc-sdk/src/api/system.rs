use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::types::HealthStatus;

/// Backend liveness
#[derive(Debug, Clone)]
pub struct SystemApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> SystemApi<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// `GET /health`
    ///
    /// The body is returned as sent. An unhealthy backend answers 500, which
    /// surfaces as `SERVER_ERROR` with the body in [`ApiError::data`].
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.gateway.get_json("/health", &()).await
    }
}
