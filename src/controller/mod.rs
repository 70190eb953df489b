//! Controller module - User input and coordinator dispatch
//!
//! - `input`: Key event handling
//! - `navigation`: Genre/rank selection, theme and retry actions

mod input;
mod navigation;

use std::sync::Arc;

use crate::coordinator::Coordinator;
use crate::model::{AppModel, ThemeStore};

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<AppModel>,
    pub(crate) coordinator: Coordinator,
    theme_store: ThemeStore,
}

impl AppController {
    pub fn new(model: Arc<AppModel>, coordinator: Coordinator, theme_store: ThemeStore) -> Self {
        Self {
            model,
            coordinator,
            theme_store,
        }
    }
}
