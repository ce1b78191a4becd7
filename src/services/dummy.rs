use async_trait::async_trait;

use crate::{CompletionRequest, CompletionService, ServiceError};

/// Offline backend that echoes the prompt it was given.
#[non_exhaustive]
#[derive(Default)]
pub struct DummyService;

impl DummyService {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompletionService for DummyService {
    #[inline]
    fn name(&self) -> &'static str {
        "Dummy"
    }

    #[inline]
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<String, ServiceError> {
        Ok(format!("Dummy response to: \"{}\".", request.prompt))
    }
}
