//! Loading-state coordinator
//!
//! Owns the render token registry, loading barrier, preload gate, skeleton
//! controller and playlist cache for one screen. Construct one per surface and
//! clone it freely; clones share all state.
//!
//! - `token`: render tokens per target
//! - `barrier`: the six loading flags and the one-shot satisfied callback
//! - `preload`: image batches that gate row reveals
//! - `shimmer`: skeleton visibility state machine
//! - `surface`: the trait the screen implements
//! - `session`: one selection's load attempt
//! - `orchestrator`: the fetch sequence for a session

mod barrier;
mod orchestrator;
mod preload;
mod session;
mod shimmer;
mod surface;
mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use preload::{AssetLoader, HttpAssetLoader};
pub use session::LoadSession;
pub use surface::{ErrorBanner, RenderSurface, RetryHandle, ServiceHeader, SkeletonPlan};

use barrier::{LoadingBarrier, Satisfaction};
use preload::AssetPreloadGate;
use shimmer::ShimmerController;
use token::RenderTokenRegistry;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use crate::config::Config;
use crate::error::CoordinatorError;
use crate::model::{
    DataField, GenreCatalog, LayoutType, PlaylistCache, QueryClient, RankConfig, RenderTarget,
    SortField, SortOrder, SurfaceSet,
};

/// Timing knobs for the loading pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Pause between fading the skeleton and removing it
    pub settle_delay: Duration,
    /// Shortest time a sort-only skeleton stays up
    pub min_sort_shimmer: Duration,
    /// Force the barrier after this long; `None` waits forever
    pub barrier_deadline: Option<Duration>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            min_sort_shimmer: Duration::from_millis(150),
            barrier_deadline: Some(Duration::from_secs(20)),
        }
    }
}

impl From<&Config> for CoordinatorSettings {
    fn from(config: &Config) -> Self {
        let deadline = config.loading.barrier_deadline_secs;
        Self {
            settle_delay: Duration::from_millis(config.loading.settle_delay_ms),
            min_sort_shimmer: Duration::from_millis(config.loading.min_sort_shimmer_ms),
            barrier_deadline: (deadline > 0).then(|| Duration::from_secs(deadline)),
        }
    }
}

#[derive(Default)]
struct CoordinatorState {
    catalog: Option<GenreCatalog>,
    current: Option<LoadSession>,
    ranks: Vec<RankConfig>,
    /// Genre asked for on the command line, kept for bootstrap retries
    requested_genre: Option<String>,
    sessions_started: u64,
}

#[derive(Clone)]
pub struct Coordinator {
    queries: Arc<dyn QueryClient>,
    surface: Arc<dyn RenderSurface>,
    registry: Arc<RenderTokenRegistry>,
    barrier: Arc<LoadingBarrier>,
    gate: AssetPreloadGate,
    shimmer: ShimmerController,
    cache: PlaylistCache,
    settings: CoordinatorSettings,
    state: Arc<Mutex<CoordinatorState>>,
    start_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Coordinator {
    pub fn new(
        queries: Arc<dyn QueryClient>,
        assets: Arc<dyn AssetLoader>,
        surface: Arc<dyn RenderSurface>,
        settings: CoordinatorSettings,
    ) -> Self {
        let state = Arc::new(Mutex::new(CoordinatorState::default()));
        let shimmer = ShimmerController::new(surface.clone(), settings.settle_delay);
        let barrier = Arc::new(LoadingBarrier::new());

        {
            let state = state.clone();
            let shimmer = shimmer.clone();
            barrier.on_satisfied(move |epoch, satisfaction| {
                let generation = {
                    let state = state.lock().unwrap_or_else(PoisonError::into_inner);
                    match &state.current {
                        Some(session) if session.epoch == epoch => session.shimmer_generation,
                        _ => return,
                    }
                };
                let wait_for_reveal = satisfaction == Satisfaction::AllFlags;
                let shimmer = shimmer.clone();
                tokio::spawn(async move {
                    shimmer.hide_generation(generation, wait_for_reveal).await;
                });
            });
        }

        Self {
            queries,
            surface,
            registry: Arc::new(RenderTokenRegistry::new()),
            barrier,
            gate: AssetPreloadGate::new(assets),
            shimmer,
            cache: PlaylistCache::new(),
            settings,
            state,
            start_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Bootstrap the genre catalog, then load the first session
    pub async fn run(&self, requested_genre: Option<String>) -> Result<(), CoordinatorError> {
        let genre = self.bootstrap(requested_genre).await?;
        self.start_session(&genre, SortField::rank_preserving()).await
    }

    /// Fetch the genre catalog and resolve which genre to open with
    pub async fn bootstrap(&self, requested_genre: Option<String>) -> Result<String, CoordinatorError> {
        self.lock_state().requested_genre = requested_genre.clone();

        let catalog = match self.queries.fetch_genres().await {
            Ok(catalog) => catalog,
            Err(source) => {
                let err = CoordinatorError::CatalogUnavailable(source);
                tracing::error!(error = %err.technical_detail(), "Bootstrap failed");
                self.surface
                    .show_error(ErrorBanner::from(&err), self.retry_handle())
                    .await;
                return Err(err);
            }
        };

        let genre = match requested_genre {
            Some(genre) if catalog.contains(&genre) => genre,
            requested => {
                if let Some(genre) = &requested {
                    tracing::warn!(genre = %genre, "Requested genre is not available, using default");
                }
                catalog
                    .default_genre()
                    .map(str::to_string)
                    .ok_or_else(|| CoordinatorError::UnknownGenre(requested.unwrap_or_default()))?
            }
        };

        tracing::info!(genres = catalog.genres.len(), genre = %genre, "Genre catalog loaded");
        self.lock_state().catalog = Some(catalog);
        Ok(genre)
    }

    /// Start a new load session for `genre` sorted by `sort_field`, superseding
    /// any session in flight, and drive it to completion.
    pub async fn start_session(&self, genre: &str, sort_field: SortField) -> Result<(), CoordinatorError> {
        self.launch(genre, Some(sort_field)).await
    }

    /// `None` carries the active sort over, read under the start lock
    async fn launch(&self, genre: &str, sort_field: Option<SortField>) -> Result<(), CoordinatorError> {
        if let Some(catalog) = &self.lock_state().catalog {
            if !catalog.contains(genre) {
                tracing::warn!(genre, "Ignoring unknown genre");
                return Err(CoordinatorError::UnknownGenre(genre.to_string()));
            }
        }

        let session = self.begin_session(genre, sort_field).await;
        self.drive(session).await
    }

    async fn begin_session(&self, genre: &str, sort_field: Option<SortField>) -> LoadSession {
        // Reset, show and token issue must not interleave with another start or a sort change
        let _start = self.start_lock.lock().await;
        let sort_field = sort_field.unwrap_or_else(|| self.active_sort_field());

        let is_initial_load = self.lock_state().sessions_started == 0;
        let epoch = self.barrier.reset();
        let generation = self
            .shimmer
            .show(SurfaceSet::Both, &sort_field, is_initial_load)
            .await;

        let session = {
            let mut state = self.lock_state();
            let session = LoadSession::begin(&self.registry, genre, sort_field, epoch, generation);
            state.sessions_started += 1;
            state.current = Some(session.clone());
            session
        };

        tracing::info!(
            genre = %session.genre,
            sort = %session.sort_field,
            token = %session.token,
            epoch,
            is_initial_load,
            "Load session started"
        );
        self.arm_deadline(&session);
        session
    }

    fn arm_deadline(&self, session: &LoadSession) {
        let Some(deadline) = self.settings.barrier_deadline else {
            return;
        };
        let barrier = self.barrier.clone();
        let epoch = session.epoch;
        let genre = session.genre.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            if barrier.force_satisfy_in(epoch) {
                tracing::warn!(genre = %genre, epoch, "Skeleton hidden by deadline");
            }
        });
    }

    pub async fn select_genre(&self, genre: &str) -> Result<(), CoordinatorError> {
        if self.current_session().is_some_and(|s| s.genre == genre) {
            tracing::debug!(genre, "Genre already selected");
            return Ok(());
        }
        self.launch(genre, None).await
    }

    /// Move `step` genres from the current one, wrapping
    pub async fn cycle_genre(&self, step: isize) -> Result<(), CoordinatorError> {
        let next = {
            let state = self.lock_state();
            let current = state.current.as_ref().map(|s| s.genre.as_str()).unwrap_or_default();
            state
                .catalog
                .as_ref()
                .and_then(|c| c.neighbour(current, step))
                .map(str::to_string)
        };
        match next {
            Some(genre) => self.select_genre(&genre).await,
            None => Ok(()),
        }
    }

    /// Switch the active rank within the current genre without refetching
    pub async fn select_sort(&self, sort_field: &SortField) -> Result<(), CoordinatorError> {
        let rank = self.rank_for(sort_field)?;
        let session = {
            let _start = self.start_lock.lock().await;
            let Some(session) = self.current_session() else {
                tracing::debug!(sort = %sort_field, "No session to sort");
                return Ok(());
            };
            if session.sort_field == *sort_field {
                return Ok(());
            }
            self.set_active_sort_field(sort_field.clone());
            session
        };
        self.render_rank_controls(&session).await;

        if !self.barrier.is_satisfied() {
            // Reorder first; a primary commit that has not started yet reads the cache after this
            self.cache.sort(&rank, rank.sort_order).await;
            if !self.rows_committed() {
                tracing::debug!(sort = %sort_field, "Session still loading, sort deferred to first paint");
                return Ok(());
            }
            // Rows are already painted under the session's skeleton
            tracing::debug!(sort = %sort_field, "Repainting committed rows while the session loads");
            return self.sort_table(sort_field, rank.sort_order).await;
        }

        let generation = self.show_skeleton(SurfaceSet::Playlist).await;
        if let Err(e) = self.sort_table(sort_field, rank.sort_order).await {
            self.hide_skeleton(generation).await;
            return Err(e);
        }
        tokio::time::sleep(self.settings.min_sort_shimmer).await;
        self.hide_skeleton(generation).await;
        Ok(())
    }

    /// Select the rank `step` positions away from the active one, wrapping
    pub async fn cycle_sort(&self, step: isize) -> Result<(), CoordinatorError> {
        let ranks = self.ranks();
        if ranks.is_empty() {
            return Ok(());
        }
        let active = self.active_sort_field();
        let index = ranks.iter().position(|r| r.sort_field == active).unwrap_or(0) as isize;
        let next = (index + step).rem_euclid(ranks.len() as isize) as usize;
        self.select_sort(&ranks[next].sort_field).await
    }

    /// Re-sort the primary playlist in place and re-render it.
    ///
    /// This is a same-session user action, so it renders without a token check.
    pub async fn sort_table(&self, column: &SortField, order: SortOrder) -> Result<(), CoordinatorError> {
        let rank = self.rank_for(column)?;
        let Some(tracks) = self.cache.sort(&rank, order).await else {
            tracing::debug!(sort = %column, "Nothing cached to sort");
            return Ok(());
        };
        tracing::debug!(sort = %column, order = order.as_str(), tracks = tracks.len(), "Table sorted");
        self.surface
            .render_rows(RenderTarget::MainPlaylist, &tracks, LayoutType::for_sort_field(column))
            .await
    }

    /// Show skeletons for a partial refresh; returns the owning generation
    pub async fn show_skeleton(&self, surfaces: SurfaceSet) -> u64 {
        let sort_field = self.active_sort_field();
        self.shimmer.show(surfaces, &sort_field, false).await
    }

    /// Hide the skeleton shown as `generation` once the pending playlist reveal
    /// settles. A newer show keeps its skeleton.
    pub async fn hide_skeleton(&self, generation: u64) {
        self.shimmer.hide_generation(generation, true).await;
    }

    /// Clear the banner and repeat whatever failed last
    pub fn retry(&self) -> BoxFuture<'static, ()> {
        let this = self.clone();
        async move {
            this.surface.clear_error().await;
            let (catalog_loaded, requested, last) = {
                let state = this.lock_state();
                (
                    state.catalog.is_some(),
                    state.requested_genre.clone(),
                    state.current.as_ref().map(|s| (s.genre.clone(), s.sort_field.clone())),
                )
            };

            let result = match last {
                Some((genre, sort_field)) if catalog_loaded => {
                    tracing::info!(genre = %genre, sort = %sort_field, "Retrying session");
                    this.start_session(&genre, sort_field).await
                }
                _ => {
                    tracing::info!("Retrying bootstrap");
                    this.run(requested).await
                }
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, "Retry failed");
            }
        }
        .boxed()
    }

    fn retry_handle(&self) -> RetryHandle {
        let this = self.clone();
        RetryHandle::new(move || {
            tokio::spawn(this.retry());
        })
    }

    pub fn current_session(&self) -> Option<LoadSession> {
        self.lock_state().current.clone()
    }

    pub fn active_sort_field(&self) -> SortField {
        self.lock_state()
            .current
            .as_ref()
            .map(|s| s.sort_field.clone())
            .unwrap_or_else(SortField::rank_preserving)
    }

    pub fn ranks(&self) -> Vec<RankConfig> {
        self.lock_state().ranks.clone()
    }

    #[cfg(test)]
    pub fn barrier(&self) -> &LoadingBarrier {
        &self.barrier
    }

    /// Record that `session`'s primary rows are being painted
    pub(super) fn mark_rows_committed(&self, session: &LoadSession) {
        let mut state = self.lock_state();
        if let Some(current) = state.current.as_mut().filter(|c| c.token == session.token) {
            current.rows_committed = true;
        }
    }

    fn rows_committed(&self) -> bool {
        self.lock_state()
            .current
            .as_ref()
            .is_some_and(|s| s.rows_committed)
    }

    fn set_active_sort_field(&self, sort_field: SortField) {
        if let Some(session) = self.lock_state().current.as_mut() {
            session.sort_field = sort_field;
        }
    }

    /// Rank config for a sort column; the rank-preserving column always resolves
    fn rank_for(&self, column: &SortField) -> Result<RankConfig, CoordinatorError> {
        if let Some(rank) = self.lock_state().ranks.iter().find(|r| r.sort_field == *column) {
            return Ok(rank.clone());
        }
        if column.is_rank_preserving() {
            return Ok(RankConfig {
                name: column.to_string(),
                display_name: "Rank".to_string(),
                sort_field: column.clone(),
                sort_order: SortOrder::Asc,
                is_default: true,
                data_field: DataField::AggregateRank,
            });
        }
        tracing::error!(sort = %column, "Unknown sort column");
        Err(CoordinatorError::UnknownSortField(column.to_string()))
    }

    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
