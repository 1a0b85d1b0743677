//! Exploration session: nodes in creation order plus navigation history.
//!
//! History records every node the user landed on, in order. New nodes and
//! explicit selections are appended at the end; back/forward only move a
//! cursor over the recorded entries.

use crate::generate::{GenerateContext, GenerateResponse};
use crate::node::{ExplorationNode, NodeId};

#[derive(Clone, Debug, Default)]
pub struct Session {
    nodes: Vec<ExplorationNode>,
    history: Vec<NodeId>,
    cursor: Option<usize>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[ExplorationNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn history(&self) -> &[NodeId] {
        &self.history
    }

    pub fn get(&self, id: NodeId) -> Option<&ExplorationNode> {
        // ids are sequential from 1
        id.checked_sub(1).and_then(|i| self.nodes.get(i))
    }

    pub fn selected(&self) -> Option<&ExplorationNode> {
        self.cursor
            .and_then(|c| self.history.get(c))
            .and_then(|&id| self.get(id))
    }

    /// Id the next appended node will receive.
    pub fn next_id(&self) -> NodeId {
        self.nodes.len() + 1
    }

    /// Context for the model when the user asks `query` next.
    pub fn context_for(&self, query: &str) -> GenerateContext {
        GenerateContext {
            previous_nodes_titles: self
                .nodes
                .iter()
                .map(|n| n.title.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            previous_node_content: self
                .selected()
                .map(|n| n.content.clone())
                .unwrap_or_default(),
            initial_query: self
                .nodes
                .first()
                .map(|n| n.title.clone())
                .unwrap_or_else(|| query.to_string()),
        }
    }

    /// Append a node for `title`, select it and record it in history.
    pub fn append(
        &mut self,
        title: &str,
        response: GenerateResponse,
        image_url: Option<String>,
    ) -> &ExplorationNode {
        let node = ExplorationNode::from_response(self.next_id(), title, response, image_url);
        let id = node.id;
        self.nodes.push(node);
        self.visit(id);
        &self.nodes[id - 1]
    }

    /// Jump to an existing node. Unknown ids leave the session untouched.
    pub fn select(&mut self, id: NodeId) -> Option<&ExplorationNode> {
        self.get(id)?;
        self.visit(id);
        self.get(id)
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.history.len())
    }

    pub fn back(&mut self) -> Option<&ExplorationNode> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor = self.cursor.map(|c| c - 1);
        self.selected()
    }

    pub fn forward(&mut self) -> Option<&ExplorationNode> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor = self.cursor.map(|c| c + 1);
        self.selected()
    }

    fn visit(&mut self, id: NodeId) {
        self.history.push(id);
        self.cursor = Some(self.history.len() - 1);
    }
}
