//! Wire types for the generate endpoint and model-output parsing.

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};

/// Apology shown in place of content when the model call fails.
pub const FALLBACK_HTML: &str = "<div class='container mx-auto p-4'>An error occurred while processing your request. Please try again.</div>";

/// What the model is told about the exploration so far.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateContext {
    #[serde(default)]
    pub previous_nodes_titles: String,
    #[serde(default)]
    pub previous_node_content: String,
    #[serde(default)]
    pub initial_query: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub query: String,
    #[serde(default)]
    pub context: GenerateContext,
}

impl GenerateRequest {
    pub fn new(query: impl Into<String>, context: GenerateContext) -> Self {
        Self {
            query: query.into(),
            context,
        }
    }

    /// Initial query, falling back to the current one for a fresh session.
    pub fn initial_query(&self) -> &str {
        if self.context.initial_query.is_empty() {
            &self.query
        } else {
            &self.context.initial_query
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub html_content: String,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    #[serde(default)]
    pub image_queries: Vec<String>,
}

impl GenerateResponse {
    /// The fixed payload served when the model fails.
    pub fn fallback() -> Self {
        Self {
            html_content: FALLBACK_HTML.to_string(),
            follow_up_questions: Vec::new(),
            image_queries: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.html_content == FALLBACK_HTML
    }

    /// Query to hand to the image lookup: the model's first image query,
    /// or the user's query when the model gave none.
    pub fn image_query<'a>(&'a self, user_query: &'a str) -> &'a str {
        self.image_queries
            .iter()
            .map(|q| q.trim())
            .find(|q| !q.is_empty())
            .unwrap_or(user_query)
    }
}

/// Parse the model's reply text into a [`GenerateResponse`].
///
/// Models sometimes wrap the object in prose or a fenced block, so the
/// outermost `{ ... }` span is decoded rather than the whole text.
pub fn parse_model_output(text: &str) -> Result<GenerateResponse> {
    let start = text.find('{').ok_or(ParseError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(ParseError::NoJsonObject)?;
    if end < start {
        return Err(ParseError::NoJsonObject);
    }
    Ok(serde_json::from_str(&text[start..=end])?)
}
