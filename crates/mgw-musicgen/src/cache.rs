use std::sync::Arc;

use mgw_core::MusicGenModel;
use tokio::sync::OnceCell;
use tracing::info;

use crate::model::{MelodyModel, ModelLoader};
use crate::Result;

/// Process-wide handle to the loaded model.
///
/// The first caller loads the checkpoint; concurrent callers wait on the same
/// initialization. A failed load leaves the cache empty so a later request
/// can try again. Once loaded, the model is never replaced.
pub struct ModelCache {
    model: MusicGenModel,
    loader: Arc<dyn ModelLoader>,
    cell: OnceCell<Arc<dyn MelodyModel>>,
}

impl ModelCache {
    pub fn new(model: MusicGenModel, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            model,
            loader,
            cell: OnceCell::new(),
        }
    }

    pub fn model(&self) -> &MusicGenModel {
        &self.model
    }

    pub async fn get(&self) -> Result<Arc<dyn MelodyModel>> {
        let model = self
            .cell
            .get_or_try_init(|| async {
                info!("Loading {} ({})", self.model.name(), self.model.id());
                let loaded = self.loader.load(&self.model).await?;
                info!("Loaded {} at {} Hz", self.model.id(), loaded.sample_rate());
                Ok::<_, crate::GenerationError>(loaded)
            })
            .await?;

        Ok(model.clone())
    }
}
