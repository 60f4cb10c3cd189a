//! Model-backed scorer layered over the HTML baseline.

use async_trait::async_trait;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::scorers::html::{analyze_html, truncate_at_word};
use crate::traits::PageScorer;
use crate::types::PageAnalysis;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONTENT_SAMPLE_CHARS: usize = 2000;

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|nav|header|footer|aside)[^>]*>.*?</(script|style|nav|header|footer|aside)>")
        .expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Scorer that asks a chat model to refine the heuristic baseline.
///
/// Plain mode never touches the network. Enhanced mode sends a
/// JSON-mode completion request and merges the answer over the
/// baseline; any API failure degrades to the baseline rather than
/// erroring, so a flaky model never fails an analysis run.
pub struct OpenAiScorer {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
}

impl OpenAiScorer {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at a compatible endpoint (proxy or test server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn enhance(
        &self,
        url: &str,
        html: &str,
        baseline: &PageAnalysis,
    ) -> Result<PageAnalysis, PipelineError> {
        let sample = content_sample(html);
        let prompt = format!(
            "Analyze this webpage content for AI/LLM accessibility and value.\n\n\
             URL: {url}\n\
             Title: {title}\n\
             Meta Description: {description}\n\
             Content Sample: {sample}\n\n\
             Provide a JSON response with:\n\
             1. Enhanced description optimized for AI understanding (150-300 chars), key \"description\"\n\
             2. Quality score (1-10) based on content value for AI systems, key \"quality_score\"\n\
             3. Category (Documentation, Tutorial, API Reference, Blog, Product, About, General), key \"category\"\n\
             4. Relevance score (1-10) for AI training/reference, key \"relevance\"\n\n\
             Focus on technical accuracy, information density, and AI utility.",
            title = baseline.title,
            description = baseline.description,
        );

        let request = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert content analyst specializing in AI/LLM accessibility. Respond only with valid JSON."
                },
                { "role": "user", "content": prompt }
            ],
            "response_format": { "type": "json_object" },
            "max_tokens": 500,
            "temperature": 0.3
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Scorer(e.into()))?
            .error_for_status()
            .map_err(|e| PipelineError::Scorer(e.into()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Scorer(e.into()))?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| PipelineError::Scorer("completion had no content".into()))?;
        let answer: Value = serde_json::from_str(content)?;

        Ok(merge_answer(&answer, baseline))
    }
}

#[async_trait]
impl PageScorer for OpenAiScorer {
    async fn score(
        &self,
        url: &str,
        raw_content: &str,
        enhanced: bool,
    ) -> Result<PageAnalysis, PipelineError> {
        let baseline = analyze_html(url, raw_content);
        if !enhanced {
            return Ok(baseline);
        }

        match self.enhance(url, raw_content, &baseline).await {
            Ok(analysis) => {
                debug!(url = %url, "AI analysis merged over baseline");
                Ok(analysis)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "AI analysis failed, using HTML baseline");
                Ok(baseline)
            }
        }
    }

    fn uses_ai(&self) -> bool {
        true
    }
}

/// Main content sample for the prompt: boilerplate blocks removed,
/// tags stripped, capped.
fn content_sample(html: &str) -> String {
    let stripped = BOILERPLATE.replace_all(html, " ");
    let text = TAG.replace_all(&stripped, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().chars().take(CONTENT_SAMPLE_CHARS).collect()
}

/// Merge the model's answer over the baseline. The baseline fills any
/// field the model omitted or mangled; numbers are clamped to 1..=10.
fn merge_answer(answer: &Value, baseline: &PageAnalysis) -> PageAnalysis {
    let description = answer["description"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| truncate_at_word(s, 300))
        .unwrap_or_else(|| baseline.description.clone());
    let quality_score = numeric_field(&answer["quality_score"])
        .unwrap_or(baseline.quality_score)
        .clamp(1.0, 10.0);
    let relevance = numeric_field(&answer["relevance"])
        .unwrap_or(baseline.quality_score)
        .clamp(1.0, 10.0);
    let category = answer["category"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| baseline.category.clone());

    PageAnalysis {
        title: baseline.title.clone(),
        description,
        quality_score,
        category,
        relevance,
    }
}

/// Models sometimes return scores as strings.
fn numeric_field(value: &Value) -> Option<f32> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .map(|n| n as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> PageAnalysis {
        PageAnalysis {
            title: "Widget Docs".to_string(),
            description: "Heuristic description of the widget docs.".to_string(),
            quality_score: 6.0,
            category: "Documentation".to_string(),
            relevance: 6.0,
        }
    }

    #[test]
    fn test_merge_answer_overrides_fields() {
        let answer = json!({
            "description": "Model-written description of the widget documentation.",
            "quality_score": 9,
            "category": "Tutorial",
            "relevance": 8
        });
        let merged = merge_answer(&answer, &baseline());
        assert_eq!(merged.title, "Widget Docs");
        assert_eq!(merged.description, "Model-written description of the widget documentation.");
        assert_eq!(merged.quality_score, 9.0);
        assert_eq!(merged.category, "Tutorial");
        assert_eq!(merged.relevance, 8.0);
    }

    #[test]
    fn test_merge_answer_falls_back_per_field() {
        let answer = json!({ "quality_score": "not a number", "category": "" });
        let merged = merge_answer(&answer, &baseline());
        assert_eq!(merged.description, baseline().description);
        assert_eq!(merged.quality_score, 6.0);
        assert_eq!(merged.category, "Documentation");
        assert_eq!(merged.relevance, 6.0);
    }

    #[test]
    fn test_merge_answer_clamps_scores() {
        let answer = json!({ "quality_score": 42, "relevance": -3 });
        let merged = merge_answer(&answer, &baseline());
        assert_eq!(merged.quality_score, 10.0);
        assert_eq!(merged.relevance, 1.0);
    }

    #[test]
    fn test_numeric_field_accepts_strings() {
        assert_eq!(numeric_field(&json!("7.5")), Some(7.5));
        assert_eq!(numeric_field(&json!(7)), Some(7.0));
        assert_eq!(numeric_field(&json!(null)), None);
    }

    #[test]
    fn test_content_sample_strips_boilerplate() {
        let html = r#"<html><body>
            <nav><a href="/">Home</a></nav>
            <main><p>The real content.</p></main>
            <script>console.log("noise")</script>
            <footer>Footer text</footer>
            </body></html>"#;
        let sample = content_sample(html);
        assert!(sample.contains("The real content."));
        assert!(!sample.contains("Home"));
        assert!(!sample.contains("noise"));
        assert!(!sample.contains("Footer text"));
    }
}
