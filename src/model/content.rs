//! Screen state mounted by the render surface

use std::collections::BTreeMap;

use crate::coordinator::{ErrorBanner, RetryHandle, SkeletonPlan};

use super::theme::ThemePreference;
use super::types::{
    Genre, LayoutType, RankConfig, ServiceId, ServicePlaylistInfo, SortField, Track,
};

/// Committed rows and headers
#[derive(Clone, Debug, Default)]
pub struct ContentState {
    pub main_rows: Vec<Track>,
    pub main_layout: LayoutType,
    /// Panels in display order; rows only land in a mounted panel
    pub mounted_panels: Vec<ServiceId>,
    pub panel_rows: BTreeMap<ServiceId, Vec<Track>>,
    pub headers: BTreeMap<ServiceId, ServicePlaylistInfo>,
}

impl ContentState {
    pub fn is_mounted(&self, service: ServiceId) -> bool {
        self.mounted_panels.contains(&service)
    }

    /// Header slots exist for the aggregate table and every mounted panel
    pub fn has_header_slot(&self, service: ServiceId) -> bool {
        service == ServiceId::Aggregate || self.is_mounted(service)
    }
}

/// Genre and rank tabs
#[derive(Clone, Debug)]
pub struct ControlsState {
    pub genres: Vec<Genre>,
    pub active_genre: Option<String>,
    pub ranks: Vec<RankConfig>,
    pub active_sort: SortField,
}

impl Default for ControlsState {
    fn default() -> Self {
        Self {
            genres: Vec::new(),
            active_genre: None,
            ranks: Vec::new(),
            active_sort: SortField::rank_preserving(),
        }
    }
}

impl ControlsState {
    pub fn active_rank_index(&self) -> Option<usize> {
        self.ranks.iter().position(|r| r.sort_field == self.active_sort)
    }
}

#[derive(Clone, Debug)]
pub struct UiState {
    pub skeleton: Option<SkeletonPlan>,
    pub skeleton_fading: bool,
    pub error: Option<ErrorBanner>,
    pub retry: Option<RetryHandle>,
    pub theme: ThemePreference,
    pub show_help_popup: bool,
    pub selected_row: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            skeleton: None,
            skeleton_fading: false,
            error: None,
            retry: None,
            theme: ThemePreference::Light,
            show_help_popup: false,
            selected_row: 0,
        }
    }
}

impl UiState {
    /// Column layout of the table placeholder, if the table is shimmering
    pub fn playlist_skeleton(&self) -> Option<LayoutType> {
        self.skeleton
            .filter(|plan| plan.surfaces.includes_playlist())
            .map(|plan| plan.layout)
    }

    pub fn services_skeleton(&self) -> bool {
        self.skeleton.is_some_and(|plan| plan.surfaces.includes_services())
    }

    /// Control placeholders only cover the very first load
    pub fn controls_skeleton(&self) -> bool {
        self.skeleton.is_some_and(|plan| plan.is_initial_load)
    }
}

/// Everything the view needs for one frame
#[derive(Clone, Debug, Default)]
pub struct ScreenSnapshot {
    pub content: ContentState,
    pub controls: ControlsState,
    pub ui: UiState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SurfaceSet;

    #[test]
    fn skeleton_flags_follow_plan() {
        let mut ui = UiState::default();
        assert_eq!(ui.playlist_skeleton(), None);

        ui.skeleton = Some(SkeletonPlan {
            surfaces: SurfaceSet::Playlist,
            layout: LayoutType::SecondaryMetric,
            is_initial_load: false,
        });
        assert_eq!(ui.playlist_skeleton(), Some(LayoutType::SecondaryMetric));
        assert!(!ui.services_skeleton());
        assert!(!ui.controls_skeleton());
    }

    #[test]
    fn aggregate_header_always_has_a_slot() {
        let content = ContentState {
            mounted_panels: vec![ServiceId::Spotify],
            ..Default::default()
        };
        assert!(content.has_header_slot(ServiceId::Aggregate));
        assert!(content.has_header_slot(ServiceId::Spotify));
        assert!(!content.has_header_slot(ServiceId::YouTube));
    }
}
