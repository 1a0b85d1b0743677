//! Network layer for delve.
//!
//! - [`Throttle`]: spaces the starts of wrapped async operations by a
//!   minimum interval, FIFO, never dropping a call.
//! - [`ImageLookup`]: two-stage encyclopedia lookup (title search, then
//!   original-image metadata) that always resolves to a [`LookupOutcome`].
//! - [`LanguageModel`] / [`AnthropicModel`]: the hosted model behind the
//!   generate endpoint.
//! - [`Explorer`]: composes the two into one exploration step.

pub mod error;
pub mod explorer;
pub mod lookup;
pub mod model;
pub mod throttle;

pub use error::{NetError, Result};
pub use explorer::Explorer;
pub use lookup::{ImageLookup, LookupConfig, LookupOutcome, Stage};
pub use model::{AnthropicModel, LanguageModel, ModelConfig, generate};
pub use throttle::Throttle;
