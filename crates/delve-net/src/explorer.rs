use std::sync::Arc;

use delve_core::{ExplorationNode, GenerateRequest, GenerateResponse, Session};
use tracing::{error, instrument};

use crate::lookup::{ImageLookup, LookupOutcome};
use crate::model::{LanguageModel, generate};

/// One exploration step: ask the model, look up an image for its image
/// query, append the result to the session.
#[derive(Clone)]
pub struct Explorer {
    model: Arc<dyn LanguageModel>,
    images: Arc<ImageLookup>,
}

impl Explorer {
    pub fn new(model: Arc<dyn LanguageModel>, images: Arc<ImageLookup>) -> Self {
        Self { model, images }
    }

    pub fn model(&self) -> &dyn LanguageModel {
        self.model.as_ref()
    }

    pub fn images(&self) -> &ImageLookup {
        &self.images
    }

    /// Generate content, substituting the fixed fallback on any failure.
    pub async fn generate_or_fallback(&self, req: &GenerateRequest) -> GenerateResponse {
        match generate(self.model.as_ref(), req).await {
            Ok(resp) => resp,
            Err(e) => {
                error!(query = req.query.as_str(), "error calling language model: {e}");
                GenerateResponse::fallback()
            }
        }
    }

    /// Resolve `query` against the session and append the new node.
    #[instrument(skip(self, session))]
    pub async fn explore<'s>(
        &self,
        session: &'s mut Session,
        query: &str,
    ) -> (&'s ExplorationNode, LookupOutcome) {
        let req = GenerateRequest::new(query, session.context_for(query));
        let response = self.generate_or_fallback(&req).await;
        let image = self.images.lookup(response.image_query(query)).await;
        let node = session.append(query, response, image.url().map(str::to_string));
        (node, image)
    }
}
