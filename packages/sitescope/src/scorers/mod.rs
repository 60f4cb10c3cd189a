mod html;
mod openai;

pub use html::{analyze_html, HtmlScorer};
pub use openai::OpenAiScorer;
