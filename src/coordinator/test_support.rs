//! Scripted collaborators for coordinator tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::preload::AssetLoader;
use super::surface::{ErrorBanner, RenderSurface, RetryHandle, ServiceHeader, SkeletonPlan};
use crate::error::{CoordinatorError, FetchError};
use crate::model::{
    DataField, Genre, GenreCatalog, LayoutType, PlayCounts, Playlist, PlaylistMetadata,
    QueryClient, RankConfig, RenderTarget, ServiceId, ServicePlaylistInfo, SortField, SortOrder,
    Track,
};

pub fn track(isrc: &str, rank: u32) -> Track {
    let mut track = Track::new(isrc, rank);
    track.name = format!("Song {isrc}");
    track.artist = "Artist".to_string();
    track.album_cover_url = Some(format!("https://img/{isrc}"));
    track
}

/// `count` tracks named `{genre}-{n}` ranked 1..=count
pub fn tracks_for(genre: &str, count: u32) -> Vec<Track> {
    (1..=count).map(|n| track(&format!("{genre}-{n}"), n)).collect()
}

pub fn default_ranks() -> Vec<RankConfig> {
    vec![
        RankConfig {
            name: "tunemeld-rank".to_string(),
            display_name: "Rank".to_string(),
            sort_field: SortField::rank_preserving(),
            sort_order: SortOrder::Asc,
            is_default: true,
            data_field: DataField::AggregateRank,
        },
        RankConfig {
            name: "total-plays".to_string(),
            display_name: "Total Plays".to_string(),
            sort_field: SortField::from("total-plays"),
            sort_order: SortOrder::Desc,
            is_default: false,
            data_field: DataField::TotalPlays,
        },
    ]
}

pub fn catalog(genres: &[&str]) -> GenreCatalog {
    GenreCatalog {
        genres: genres
            .iter()
            .map(|name| Genre {
                name: name.to_string(),
                display_name: name.to_uppercase(),
                icon_url: Some(format!("https://img/genre-{name}")),
            })
            .collect(),
        default_genre: genres.first().map(|g| g.to_string()),
    }
}

pub fn metadata(services: &[ServiceId]) -> PlaylistMetadata {
    let mut service_order = vec![ServiceId::Aggregate];
    service_order.extend_from_slice(services);
    PlaylistMetadata {
        playlists: service_order
            .iter()
            .map(|s| {
                (
                    *s,
                    ServicePlaylistInfo {
                        playlist_name: Some(format!("{} playlist", s.display_name())),
                        cover_url: Some(format!("https://img/cover-{s}")),
                        ..Default::default()
                    },
                )
            })
            .collect(),
        service_order,
    }
}

fn unavailable(operation: &'static str) -> FetchError {
    FetchError::Status {
        operation,
        status: 503,
        body: String::new(),
    }
}

#[derive(Default)]
struct Script {
    catalog: Option<GenreCatalog>,
    metadata: HashMap<String, PlaylistMetadata>,
    playlists: HashMap<(String, ServiceId), Vec<Track>>,
    failing_playlists: HashSet<(String, ServiceId)>,
    ranks: Vec<RankConfig>,
    play_counts: HashMap<String, PlayCounts>,
    holds: HashMap<String, Arc<Notify>>,
    calls: Vec<String>,
}

/// Backend double. Anything not scripted fails with HTTP 503.
#[derive(Clone, Default)]
pub struct ScriptedQueries {
    script: Arc<Mutex<Script>>,
}

impl ScriptedQueries {
    pub fn new() -> Self {
        let queries = Self::default();
        queries.script.lock().unwrap().ranks = default_ranks();
        queries
    }

    /// A genre with an aggregate playlist of `count` tracks and the given secondaries
    pub fn with_genre(self, genre: &str, count: u32, services: &[ServiceId]) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            script.metadata.insert(genre.to_string(), metadata(services));
            script
                .playlists
                .insert((genre.to_string(), ServiceId::Aggregate), tracks_for(genre, count));
            for service in services {
                let tracks = tracks_for(&format!("{genre}-{service}"), 3);
                script.playlists.insert((genre.to_string(), *service), tracks);
            }
        }
        self
    }

    pub fn set_catalog(&self, catalog: GenreCatalog) {
        self.script.lock().unwrap().catalog = Some(catalog);
    }

    pub fn clear_catalog(&self) {
        self.script.lock().unwrap().catalog = None;
    }

    pub fn set_playlist(&self, genre: &str, service: ServiceId, tracks: Vec<Track>) {
        self.script
            .lock()
            .unwrap()
            .playlists
            .insert((genre.to_string(), service), tracks);
    }

    pub fn fail_playlist(&self, genre: &str, service: ServiceId) {
        self.script
            .lock()
            .unwrap()
            .failing_playlists
            .insert((genre.to_string(), service));
    }

    pub fn fail_metadata(&self, genre: &str) {
        self.script.lock().unwrap().metadata.remove(genre);
    }

    pub fn restore_metadata(&self, genre: &str, services: &[ServiceId]) {
        self.script
            .lock()
            .unwrap()
            .metadata
            .insert(genre.to_string(), metadata(services));
    }

    pub fn set_play_count(&self, isrc: &str, total: u64) {
        self.script.lock().unwrap().play_counts.insert(
            isrc.to_string(),
            PlayCounts {
                total: Some(total),
                ..Default::default()
            },
        );
    }

    /// Hold the named call open until the returned gate is notified.
    /// Keys look like `playlist:pop:tunemeld` or `metadata:pop`.
    pub fn hold(&self, key: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script
            .lock()
            .unwrap()
            .holds
            .insert(key.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    async fn enter(&self, key: String) {
        let gate = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(key.clone());
            script.holds.get(&key).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl QueryClient for ScriptedQueries {
    async fn fetch_genres(&self) -> Result<GenreCatalog, FetchError> {
        self.enter("genres".to_string()).await;
        self.script
            .lock()
            .unwrap()
            .catalog
            .clone()
            .ok_or_else(|| unavailable("GetAvailableGenres"))
    }

    async fn playlist_metadata(&self, genre: &str) -> Result<PlaylistMetadata, FetchError> {
        self.enter(format!("metadata:{genre}")).await;
        self.script
            .lock()
            .unwrap()
            .metadata
            .get(genre)
            .cloned()
            .ok_or_else(|| unavailable("GetPlaylistMetadata"))
    }

    async fn playlist(
        &self,
        genre: &str,
        service: ServiceId,
    ) -> Result<Option<Playlist>, FetchError> {
        self.enter(format!("playlist:{genre}:{service}")).await;
        let script = self.script.lock().unwrap();
        let key = (genre.to_string(), service);
        if script.failing_playlists.contains(&key) {
            return Err(unavailable("GetPlaylistTracks"));
        }
        Ok(script.playlists.get(&key).map(|tracks| Playlist {
            genre: genre.to_string(),
            service,
            tracks: tracks.clone(),
        }))
    }

    async fn rank_config(&self) -> Result<Vec<RankConfig>, FetchError> {
        self.enter("ranks".to_string()).await;
        Ok(self.script.lock().unwrap().ranks.clone())
    }

    async fn play_counts(&self, isrcs: &[String]) -> Result<HashMap<String, PlayCounts>, FetchError> {
        self.enter("play_counts".to_string()).await;
        let script = self.script.lock().unwrap();
        Ok(isrcs
            .iter()
            .filter_map(|isrc| script.play_counts.get(isrc).map(|c| (isrc.clone(), c.clone())))
            .collect())
    }
}

#[derive(Default)]
struct AssetScript {
    failing: HashSet<String>,
    holds: HashMap<String, Arc<Notify>>,
}

/// Image loader double: everything loads unless told to fail or hold
#[derive(Clone, Default)]
pub struct ScriptedAssets {
    script: Arc<Mutex<AssetScript>>,
}

impl ScriptedAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, url: &str) {
        self.script.lock().unwrap().failing.insert(url.to_string());
    }

    pub fn hold(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script
            .lock()
            .unwrap()
            .holds
            .insert(url.to_string(), gate.clone());
        gate
    }
}

#[async_trait]
impl AssetLoader for ScriptedAssets {
    async fn load(&self, url: &str) -> Result<(), FetchError> {
        let gate = self.script.lock().unwrap().holds.get(url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.script.lock().unwrap().failing.contains(url) {
            Err(unavailable("asset"))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
    Skeleton(SkeletonPlan),
    Fade,
    Clear,
    GenreControls { active: String },
    RankControls { active: SortField, rebuilt: bool },
    Panels(Vec<ServiceId>),
    Rows {
        target: RenderTarget,
        isrcs: Vec<String>,
        ranks: Vec<u32>,
        layout: LayoutType,
    },
    Header(ServiceId),
    Error(ErrorBanner),
    ClearError,
}

#[derive(Default)]
struct Recorded {
    events: Vec<SurfaceEvent>,
    panels: Vec<ServiceId>,
    rank_buttons: Vec<String>,
    rejected: Vec<RenderTarget>,
    retry: Option<RetryHandle>,
}

/// Surface double that records every call in order
#[derive(Default)]
pub struct RecordingSurface {
    recorded: Mutex<Recorded>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.recorded.lock().unwrap().events.clone()
    }

    pub fn skeleton_events(&self) -> Vec<SurfaceEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, SurfaceEvent::Skeleton(_) | SurfaceEvent::Fade | SurfaceEvent::Clear))
            .collect()
    }

    /// Every row batch committed to `target`, oldest first
    pub fn rows(&self, target: RenderTarget) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SurfaceEvent::Rows { target: t, isrcs, .. } if t == target => Some(isrcs),
                _ => None,
            })
            .collect()
    }

    pub fn last_rows(&self, target: RenderTarget) -> Option<Vec<String>> {
        self.rows(target).pop()
    }

    pub fn last_ranks(&self, target: RenderTarget) -> Option<Vec<u32>> {
        self.events().into_iter().rev().find_map(|e| match e {
            SurfaceEvent::Rows { target: t, ranks, .. } if t == target => Some(ranks),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<ErrorBanner> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SurfaceEvent::Error(banner) => Some(banner),
                _ => None,
            })
            .collect()
    }

    /// Make every later row commit to `target` fail as if it were unmounted
    pub fn reject_rows(&self, target: RenderTarget) {
        self.recorded.lock().unwrap().rejected.push(target);
    }

    pub fn retry(&self) -> Option<RetryHandle> {
        self.recorded.lock().unwrap().retry.clone()
    }

    fn push(&self, event: SurfaceEvent) {
        self.recorded.lock().unwrap().events.push(event);
    }
}

#[async_trait]
impl RenderSurface for RecordingSurface {
    async fn show_skeleton(&self, plan: SkeletonPlan) {
        self.push(SurfaceEvent::Skeleton(plan));
    }

    async fn fade_skeleton(&self) {
        self.push(SurfaceEvent::Fade);
    }

    async fn clear_skeleton(&self) {
        self.push(SurfaceEvent::Clear);
    }

    async fn render_genre_controls(&self, _genres: &[Genre], active: &str) {
        self.push(SurfaceEvent::GenreControls {
            active: active.to_string(),
        });
    }

    async fn render_rank_controls(&self, ranks: &[RankConfig], active: &SortField) -> bool {
        let names: Vec<String> = ranks.iter().map(|r| r.name.clone()).collect();
        let rebuilt = {
            let mut recorded = self.recorded.lock().unwrap();
            let rebuilt = recorded.rank_buttons != names;
            recorded.rank_buttons = names;
            rebuilt
        };
        self.push(SurfaceEvent::RankControls {
            active: active.clone(),
            rebuilt,
        });
        rebuilt
    }

    async fn mount_service_panels(&self, services: &[ServiceId]) {
        self.recorded.lock().unwrap().panels = services.to_vec();
        self.push(SurfaceEvent::Panels(services.to_vec()));
    }

    async fn render_rows(
        &self,
        target: RenderTarget,
        tracks: &[Track],
        layout: LayoutType,
    ) -> Result<(), CoordinatorError> {
        let mounted = {
            let recorded = self.recorded.lock().unwrap();
            let slot = match target {
                RenderTarget::MainPlaylist => true,
                RenderTarget::ServicePanel(service) => recorded.panels.contains(&service),
                _ => false,
            };
            slot && !recorded.rejected.contains(&target)
        };
        if !mounted {
            return Err(CoordinatorError::MissingRenderTarget(target));
        }
        self.push(SurfaceEvent::Rows {
            target,
            isrcs: tracks.iter().map(|t| t.isrc.clone()).collect(),
            ranks: tracks.iter().map(|t| t.display_rank).collect(),
            layout,
        });
        Ok(())
    }

    async fn render_service_header(&self, header: ServiceHeader) -> Result<(), CoordinatorError> {
        self.push(SurfaceEvent::Header(header.service));
        Ok(())
    }

    async fn show_error(&self, banner: ErrorBanner, retry: RetryHandle) {
        self.recorded.lock().unwrap().retry = Some(retry);
        self.push(SurfaceEvent::Error(banner));
    }

    async fn clear_error(&self) {
        self.recorded.lock().unwrap().retry = None;
        self.push(SurfaceEvent::ClearError);
    }
}
