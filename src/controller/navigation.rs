//! Genre and rank selection, theme and retry actions
//!
//! Selections drive whole load sessions, so they run in the background and
//! the input loop never waits on the network.

use crate::error::CoordinatorError;
use crate::model::SortField;
use super::AppController;

/// Remote failures already show a banner or an empty panel; bugs get logged loudly
fn log_failure(action: &str, err: &CoordinatorError) {
    if err.is_programmer_error() {
        tracing::error!(action, error = %err, "Navigation failed");
    } else {
        tracing::warn!(action, error = %err, "Navigation failed");
    }
}

impl AppController {
    pub fn cycle_genre(&self, step: isize) {
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.cycle_genre(step).await {
                log_failure("cycle_genre", &e);
            }
        });
    }

    pub fn cycle_rank(&self, step: isize) {
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.cycle_sort(step).await {
                log_failure("cycle_rank", &e);
            }
        });
    }

    /// Select the rank tab at `index` (0-based), if there is one
    pub async fn select_rank_at(&self, index: usize) {
        let Some(sort_field) = self.model.rank_at(index).await else {
            tracing::debug!(index, "No rank tab at index");
            return;
        };
        self.select_rank(sort_field);
    }

    fn select_rank(&self, sort_field: SortField) {
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.select_sort(&sort_field).await {
                log_failure("select_rank", &e);
            }
        });
    }

    pub async fn toggle_theme(&self) {
        let theme = self.model.toggle_theme().await;
        tracing::info!(theme = ?theme, "Theme toggled");
        if let Err(e) = self.theme_store.save(theme) {
            tracing::warn!(error = %e, "Could not persist theme preference");
        }
    }

    /// Fire the banner's retry, if a banner is showing
    pub async fn retry(&self) {
        match self.model.retry_handle().await {
            Some(retry) => {
                tracing::info!("Retry requested");
                retry.fire();
            }
            None => tracing::debug!("Nothing to retry"),
        }
    }
}
