//! Main application model with state management

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::content::{ContentState, ControlsState, ScreenSnapshot, UiState};
use super::theme::ThemePreference;
use super::types::{Genre, LayoutType, RankConfig, RenderTarget, ServiceId, SortField, Track};
use crate::coordinator::{ErrorBanner, RenderSurface, RetryHandle, ServiceHeader, SkeletonPlan};
use crate::error::CoordinatorError;

/// Main application model containing all state.
///
/// The coordinator writes to it through [`RenderSurface`]; the view reads a
/// [`ScreenSnapshot`] once per frame.
pub struct AppModel {
    content_state: Arc<Mutex<ContentState>>,
    controls_state: Arc<Mutex<ControlsState>>,
    pub ui_state: Arc<Mutex<UiState>>,
    pub should_quit: Arc<Mutex<bool>>,
}

impl AppModel {
    pub fn new(theme: ThemePreference) -> Self {
        Self {
            content_state: Arc::new(Mutex::new(ContentState::default())),
            controls_state: Arc::new(Mutex::new(ControlsState::default())),
            ui_state: Arc::new(Mutex::new(UiState {
                theme,
                ..Default::default()
            })),
            should_quit: Arc::new(Mutex::new(false)),
        }
    }

    pub async fn snapshot(&self) -> ScreenSnapshot {
        ScreenSnapshot {
            content: self.content_state.lock().await.clone(),
            controls: self.controls_state.lock().await.clone(),
            ui: self.ui_state.lock().await.clone(),
        }
    }

    pub async fn should_quit(&self) -> bool {
        *self.should_quit.lock().await
    }

    pub async fn set_should_quit(&self, quit: bool) {
        *self.should_quit.lock().await = quit;
    }

    // ========================================================================
    // UI State
    // ========================================================================

    pub async fn has_error(&self) -> bool {
        self.ui_state.lock().await.error.is_some()
    }

    pub async fn retry_handle(&self) -> Option<RetryHandle> {
        self.ui_state.lock().await.retry.clone()
    }

    /// Hide the banner without retrying
    pub async fn dismiss_error(&self) {
        let mut state = self.ui_state.lock().await;
        state.error = None;
        state.retry = None;
    }

    pub async fn theme(&self) -> ThemePreference {
        self.ui_state.lock().await.theme
    }

    pub async fn toggle_theme(&self) -> ThemePreference {
        let mut state = self.ui_state.lock().await;
        state.theme = state.theme.toggled();
        state.theme
    }

    pub async fn is_help_popup_open(&self) -> bool {
        self.ui_state.lock().await.show_help_popup
    }

    pub async fn toggle_help_popup(&self) {
        let mut state = self.ui_state.lock().await;
        state.show_help_popup = !state.show_help_popup;
    }

    pub async fn hide_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = false;
    }

    pub async fn move_selection_up(&self) {
        let mut state = self.ui_state.lock().await;
        state.selected_row = state.selected_row.saturating_sub(1);
    }

    pub async fn move_selection_down(&self) {
        let rows = self.content_state.lock().await.main_rows.len();
        let mut state = self.ui_state.lock().await;
        if state.selected_row + 1 < rows {
            state.selected_row += 1;
        }
    }

    // ========================================================================
    // Controls
    // ========================================================================

    pub async fn rank_at(&self, index: usize) -> Option<SortField> {
        self.controls_state
            .lock()
            .await
            .ranks
            .get(index)
            .map(|r| r.sort_field.clone())
    }
}

#[async_trait]
impl RenderSurface for AppModel {
    async fn show_skeleton(&self, plan: SkeletonPlan) {
        let mut state = self.ui_state.lock().await;
        state.skeleton = Some(plan);
        state.skeleton_fading = false;
    }

    async fn fade_skeleton(&self) {
        self.ui_state.lock().await.skeleton_fading = true;
    }

    async fn clear_skeleton(&self) {
        let mut state = self.ui_state.lock().await;
        state.skeleton = None;
        state.skeleton_fading = false;
    }

    async fn render_genre_controls(&self, genres: &[Genre], active: &str) {
        let mut controls = self.controls_state.lock().await;
        controls.genres = genres.to_vec();
        controls.active_genre = Some(active.to_string());
    }

    async fn render_rank_controls(&self, ranks: &[RankConfig], active: &SortField) -> bool {
        let mut controls = self.controls_state.lock().await;
        let rebuilt = controls.ranks.len() != ranks.len()
            || controls
                .ranks
                .iter()
                .zip(ranks)
                .any(|(mounted, wanted)| mounted.name != wanted.name);
        if rebuilt {
            controls.ranks = ranks.to_vec();
        }
        controls.active_sort = active.clone();
        rebuilt
    }

    async fn mount_service_panels(&self, services: &[ServiceId]) {
        let mut content = self.content_state.lock().await;
        content.panel_rows.retain(|service, _| services.contains(service));
        content
            .headers
            .retain(|service, _| *service == ServiceId::Aggregate || services.contains(service));
        content.mounted_panels = services.to_vec();
    }

    async fn render_rows(
        &self,
        target: RenderTarget,
        tracks: &[Track],
        layout: LayoutType,
    ) -> Result<(), CoordinatorError> {
        let mut content = self.content_state.lock().await;
        match target {
            RenderTarget::MainPlaylist => {
                content.main_rows = tracks.to_vec();
                content.main_layout = layout;
                drop(content);

                let mut state = self.ui_state.lock().await;
                state.selected_row = state.selected_row.min(tracks.len().saturating_sub(1));
                Ok(())
            }
            RenderTarget::ServicePanel(service) if content.is_mounted(service) => {
                content.panel_rows.insert(service, tracks.to_vec());
                Ok(())
            }
            _ => Err(CoordinatorError::MissingRenderTarget(target)),
        }
    }

    async fn render_service_header(&self, header: ServiceHeader) -> Result<(), CoordinatorError> {
        let mut content = self.content_state.lock().await;
        if !content.has_header_slot(header.service) {
            return Err(CoordinatorError::MissingRenderTarget(RenderTarget::ServiceHeader(
                header.service,
            )));
        }
        content.headers.insert(header.service, header.info);
        Ok(())
    }

    async fn show_error(&self, banner: ErrorBanner, retry: RetryHandle) {
        let mut state = self.ui_state.lock().await;
        state.error = Some(banner);
        state.retry = Some(retry);
    }

    async fn clear_error(&self) {
        self.dismiss_error().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataField, SortOrder, SurfaceSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rank(name: &str) -> RankConfig {
        RankConfig {
            name: name.to_string(),
            display_name: name.to_string(),
            sort_field: SortField::from(name),
            sort_order: SortOrder::Desc,
            is_default: false,
            data_field: DataField::TotalPlays,
        }
    }

    #[tokio::test]
    async fn rows_for_unmounted_panel_are_rejected() {
        let model = AppModel::new(ThemePreference::Light);
        model.mount_service_panels(&[ServiceId::Spotify]).await;

        let tracks = vec![Track::new("A", 1)];
        assert!(model
            .render_rows(RenderTarget::ServicePanel(ServiceId::Spotify), &tracks, LayoutType::PrimaryRank)
            .await
            .is_ok());
        let err = model
            .render_rows(RenderTarget::ServicePanel(ServiceId::YouTube), &tracks, LayoutType::PrimaryRank)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::MissingRenderTarget(RenderTarget::ServicePanel(ServiceId::YouTube))
        ));
    }

    #[tokio::test]
    async fn remount_keeps_rows_of_surviving_panels() {
        let model = AppModel::new(ThemePreference::Light);
        model
            .mount_service_panels(&[ServiceId::Spotify, ServiceId::AppleMusic])
            .await;
        for service in [ServiceId::Spotify, ServiceId::AppleMusic] {
            model
                .render_rows(RenderTarget::ServicePanel(service), &[Track::new("A", 1)], LayoutType::PrimaryRank)
                .await
                .unwrap();
        }

        model.mount_service_panels(&[ServiceId::Spotify]).await;
        let content = model.snapshot().await.content;
        assert!(content.panel_rows.contains_key(&ServiceId::Spotify));
        assert!(!content.panel_rows.contains_key(&ServiceId::AppleMusic));
    }

    #[tokio::test]
    async fn rank_controls_rebuild_only_when_set_changes() {
        let model = AppModel::new(ThemePreference::Light);
        let ranks = vec![rank("tunemeld-rank"), rank("total-plays")];

        assert!(model.render_rank_controls(&ranks, &SortField::rank_preserving()).await);
        assert!(!model.render_rank_controls(&ranks, &SortField::from("total-plays")).await);
        assert_eq!(
            model.snapshot().await.controls.active_rank_index(),
            Some(1)
        );
        assert!(model.render_rank_controls(&ranks[..1], &SortField::rank_preserving()).await);
    }

    #[tokio::test]
    async fn previous_rows_stay_mounted_under_skeleton() {
        let model = AppModel::new(ThemePreference::Dark);
        model
            .render_rows(RenderTarget::MainPlaylist, &[Track::new("A", 1)], LayoutType::PrimaryRank)
            .await
            .unwrap();
        model
            .show_skeleton(SkeletonPlan {
                surfaces: SurfaceSet::Both,
                layout: LayoutType::PrimaryRank,
                is_initial_load: false,
            })
            .await;

        let snapshot = model.snapshot().await;
        assert!(snapshot.ui.playlist_skeleton().is_some());
        assert_eq!(snapshot.content.main_rows.len(), 1);

        model.fade_skeleton().await;
        assert!(model.snapshot().await.ui.skeleton_fading);
        model.clear_skeleton().await;
        let ui = model.snapshot().await.ui;
        assert!(ui.skeleton.is_none());
        assert!(!ui.skeleton_fading);
    }

    #[tokio::test]
    async fn error_banner_carries_retry() {
        let model = AppModel::new(ThemePreference::Light);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        model
            .show_error(
                ErrorBanner {
                    message: "Failed to load playlist data. Please try again.".to_string(),
                    technical_detail: "GetPlaylistMetadata returned HTTP 503".to_string(),
                },
                RetryHandle::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await;

        assert!(model.has_error().await);
        model.retry_handle().await.unwrap().fire();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        model.clear_error().await;
        assert!(!model.has_error().await);
        assert!(model.retry_handle().await.is_none());
    }

    #[tokio::test]
    async fn selection_stays_within_rows() {
        let model = AppModel::new(ThemePreference::Light);
        let tracks: Vec<Track> = (1..=3).map(|n| Track::new(format!("T{n}"), n)).collect();
        model
            .render_rows(RenderTarget::MainPlaylist, &tracks, LayoutType::PrimaryRank)
            .await
            .unwrap();

        for _ in 0..5 {
            model.move_selection_down().await;
        }
        assert_eq!(model.snapshot().await.ui.selected_row, 2);

        model
            .render_rows(RenderTarget::MainPlaylist, &tracks[..1], LayoutType::PrimaryRank)
            .await
            .unwrap();
        assert_eq!(model.snapshot().await.ui.selected_row, 0);
    }
}
