use std::sync::Arc;

use fleetgate_transport::{HttpRequest, HttpResponse, HttpTransport};

use crate::{ApiError, RequestStage, ResponseStage};

/// An ordered chain of stages in front of a transport.
///
/// ```text
/// request ─▶ [request stages] ─▶ transport ─▶ [response stages] ─▶ caller
/// ```
///
/// Stages run in the order they were added. A transport failure skips the
/// response stages entirely: no response means nothing to inspect.
pub struct Pipeline<T> {
    transport: Arc<T>,
    request_stages: Vec<Box<dyn RequestStage>>,
    response_stages: Vec<Box<dyn ResponseStage>>,
}

impl<T: HttpTransport> Pipeline<T> {
    /// Creates a pipeline with no stages.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            request_stages: Vec::new(),
            response_stages: Vec::new(),
        }
    }

    pub fn with_request_stage(mut self, stage: impl RequestStage) -> Self {
        self.request_stages.push(Box::new(stage));
        self
    }

    pub fn with_response_stage(mut self, stage: impl ResponseStage) -> Self {
        self.response_stages.push(Box::new(stage));
        self
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Runs `request` through every stage and the transport.
    ///
    /// Returns the response whatever its status, unless a response stage
    /// turned it into an error.
    pub async fn execute(
        &self,
        mut request: HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        for stage in &self.request_stages {
            stage.on_request(&mut request)?;
        }

        tracing::trace!(method = %request.method, path = %request.path, "dispatch");
        let response = self.transport.send(request.clone()).await?;

        self.response_stages
            .iter()
            .try_fold(response, |response, stage| {
                stage.on_response(&request, response)
            })
    }
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("request_stages", &self.request_stages.len())
            .field("response_stages", &self.response_stages.len())
            .finish_non_exhaustive()
    }
}
