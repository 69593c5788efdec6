use crate::models::FittedModel;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Single-slot holder for the current model. Replacement is a whole-value
/// swap; readers get an `Arc` snapshot and never observe a partial model.
/// Last writer wins when trainings race.
#[derive(Default)]
pub struct ModelStore {
    current: RwLock<Option<Arc<FittedModel>>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Arc<FittedModel>> {
        self.current.read().await.clone()
    }

    pub async fn set(&self, model: Option<Arc<FittedModel>>) {
        *self.current.write().await = model;
    }
}
