//! Exploration sessions and the generate protocol.
//!
//! A session is an append-only list of exploration nodes plus a navigation
//! history over them. Each node comes from one language-model round trip
//! (HTML content, follow-up questions, an image query) and an optional
//! illustrative image URL.
//!
//! Zero I/O: transports live in `delve-net`, surfaces in `delve-cli`.

pub mod error;
pub mod generate;
pub mod node;
pub mod prompt;
pub mod session;

pub use error::{ParseError, Result};
pub use generate::{
    FALLBACK_HTML, GenerateContext, GenerateRequest, GenerateResponse, parse_model_output,
};
pub use node::{ExplorationNode, NodeId};
pub use prompt::build_prompt;
pub use session::Session;
