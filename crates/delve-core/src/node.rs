use serde::{Deserialize, Serialize};

use crate::generate::GenerateResponse;

/// Sequential id within one session, starting at 1.
pub type NodeId = usize;

/// One resolved query: model content, follow-ups and an optional image.
/// Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationNode {
    pub id: NodeId,
    pub title: String,
    pub content: String,
    pub follow_up_questions: Vec<String>,
    pub image_url: Option<String>,
}

impl ExplorationNode {
    /// Build a node from a generate response. `title` is the query the user
    /// asked, not anything the model produced.
    pub fn from_response(
        id: NodeId,
        title: &str,
        response: GenerateResponse,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id,
            title: title.to_string(),
            content: response.html_content,
            follow_up_questions: response.follow_up_questions,
            image_url,
        }
    }

    /// Follow-up question by 1-based position, as shown to the user.
    pub fn follow_up(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.follow_up_questions.get(i))
            .map(String::as_str)
    }
}
