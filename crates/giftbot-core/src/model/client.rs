use async_trait::async_trait;

use crate::Result;

use super::types::GenerationRequest;

/// A text-generation backend (local model server, hosted API, ...).
///
/// Implementations return the raw assistant text; cleanup and validation are
/// the caller's job. Calls may take seconds and may fail.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short backend label for logs.
    fn name(&self) -> &str;

    async fn generate(&self, req: GenerationRequest) -> Result<String>;
}
