use async_trait::async_trait;

use crate::error::PipelineError;
use crate::types::PageAnalysis;

/// Scores a fetched page's content for inclusion and ordering.
///
/// Implementations decide how much machinery to spend: the HTML
/// scorer is pure heuristics, the OpenAI scorer layers a model call
/// over the same baseline and degrades back to it on any API failure.
#[async_trait]
pub trait PageScorer: Send + Sync {
    /// Analyze one page.
    ///
    /// `enhanced` requests the expensive path when the implementation
    /// has one; implementations without a cheap/expensive split may
    /// ignore it.
    async fn score(
        &self,
        url: &str,
        raw_content: &str,
        enhanced: bool,
    ) -> Result<PageAnalysis, PipelineError>;

    /// Whether `enhanced` scoring consumes an AI call against the
    /// caller's budget.
    fn uses_ai(&self) -> bool {
        false
    }
}
