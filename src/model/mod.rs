//! Model module - Domain types, data access and screen state
//!
//! - `types`: Core type definitions (services, tracks, ranks, render targets)
//! - `cache`: Per-service playlist cache and table sorting
//! - `query_client`: GraphQL backend client
//! - `theme`: Persisted light/dark preference
//! - `content`: Screen state mounted by the render surface
//! - `app_model`: Main application model, the terminal's render surface

mod types;
mod cache;
mod query_client;
mod theme;
mod content;
mod app_model;

// Re-export all public types for convenient access
pub use types::{
    DataField, Genre, GenreCatalog, LayoutType, PlayCounts, Playlist, PlaylistMetadata,
    RankConfig, RenderTarget, ServiceId, ServicePlaylistInfo, ServiceSlot, SortField, SortOrder,
    SurfaceSet, Track,
};

pub use cache::PlaylistCache;

pub use query_client::{GraphqlClient, QueryClient};

pub use theme::{ThemePreference, ThemeStore};

pub use content::{ContentState, ControlsState, ScreenSnapshot, UiState};

pub use app_model::AppModel;
