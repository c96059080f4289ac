//! The seam between scoring logic and the judgment transport.

use async_trait::async_trait;
use tdwatch_judge::{JudgeClient, JudgeError};

/// Anything that can answer a system + user prompt with text content.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, JudgeError>;
}

#[async_trait]
impl CompletionBackend for JudgeClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, JudgeError> {
        JudgeClient::complete(self, system, user).await
    }
}
