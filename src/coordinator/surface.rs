//! The seam between the coordinator and whatever draws the screen

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoordinatorError;
use crate::model::{
    Genre, LayoutType, RankConfig, RenderTarget, ServiceId, ServicePlaylistInfo, SortField,
    SurfaceSet, Track,
};

/// Which placeholders to show
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkeletonPlan {
    pub surfaces: SurfaceSet,
    pub layout: LayoutType,
    /// Header and control placeholders are only shown on the first load
    pub is_initial_load: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorBanner {
    pub message: String,
    pub technical_detail: String,
}

impl From<&CoordinatorError> for ErrorBanner {
    fn from(err: &CoordinatorError) -> Self {
        Self {
            message: err.user_message(),
            technical_detail: err.technical_detail(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceHeader {
    pub service: ServiceId,
    pub info: ServicePlaylistInfo,
}

/// User-triggered retry attached to an error banner
#[derive(Clone)]
pub struct RetryHandle(Arc<dyn Fn() + Send + Sync>);

impl RetryHandle {
    pub fn new(retry: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(retry))
    }

    pub fn fire(&self) {
        (self.0)()
    }
}

impl fmt::Debug for RetryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryHandle")
    }
}

/// Everything the coordinator may do to the screen.
///
/// Staleness is checked before any of these are called; implementations
/// just apply what they are given.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    async fn show_skeleton(&self, plan: SkeletonPlan);

    /// Dim every placeholder ahead of removal
    async fn fade_skeleton(&self);

    /// Remove placeholders and restore real controls.
    /// Controls that are already correct must be left as they are.
    async fn clear_skeleton(&self);

    async fn render_genre_controls(&self, genres: &[Genre], active: &str);

    /// Returns false when the mounted buttons already match and nothing was rebuilt
    async fn render_rank_controls(&self, ranks: &[RankConfig], active: &SortField) -> bool;

    /// Mount one empty panel per service, in display order
    async fn mount_service_panels(&self, services: &[ServiceId]);

    async fn render_rows(
        &self,
        target: RenderTarget,
        tracks: &[Track],
        layout: LayoutType,
    ) -> Result<(), CoordinatorError>;

    async fn render_service_header(&self, header: ServiceHeader) -> Result<(), CoordinatorError>;

    async fn show_error(&self, banner: ErrorBanner, retry: RetryHandle);

    async fn clear_error(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn banner_carries_message_and_detail() {
        let err = CoordinatorError::MetadataUnavailable {
            genre: "rap".into(),
            source: FetchError::Timeout {
                operation: "GetPlaylistMetadata",
                elapsed_ms: 15000,
            },
        };
        let banner = ErrorBanner::from(&err);
        assert!(banner.message.contains("try again"));
        assert!(banner.technical_detail.ends_with("timed out after 15000ms"));
    }

    #[test]
    fn retry_handle_is_reusable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let retry = RetryHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        retry.clone().fire();
        retry.fire();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
