//! Fetch sequence for one load session
//!
//! Metadata first (nothing can be laid out without the service order), then
//! the primary playlist, rank config and every secondary playlist in parallel.
//! Secondary panels render only after the primary rows are committed. Every
//! commit is checked against the session's render token first.

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::sync::watch;

use super::barrier::LoadingFlag;
use super::preload::RevealOutcome;
use super::session::LoadSession;
use super::surface::{ErrorBanner, ServiceHeader};
use super::Coordinator;
use crate::error::{CoordinatorError, FetchError};
use crate::model::{LayoutType, Playlist, PlaylistMetadata, RenderTarget, ServiceId, Track};

type Commit = Shared<BoxFuture<'static, RevealOutcome>>;

impl Coordinator {
    pub(super) async fn drive(&self, session: LoadSession) -> Result<(), CoordinatorError> {
        self.render_genre_controls(&session).await;

        let metadata = match self.queries.playlist_metadata(&session.genre).await {
            Ok(metadata) => metadata,
            Err(source) => {
                let err = CoordinatorError::MetadataUnavailable {
                    genre: session.genre.clone(),
                    source,
                };
                return self.fail_session(&session, err).await;
            }
        };

        if !session.is_current(&self.registry) {
            tracing::debug!(genre = %session.genre, token = %session.token, "Dropping stale metadata");
            return Ok(());
        }

        let services = metadata.secondary_services();
        self.surface.mount_service_panels(&services).await;
        self.reveal_service_headers(&session, &metadata);

        let (primary_done, primary_rx) = watch::channel(false);
        tokio::join!(
            self.load_primary(&session, primary_done),
            self.load_secondaries(&session, &services, primary_rx),
        );

        tracing::info!(genre = %session.genre, token = %session.token, "Load session fetches settled");
        Ok(())
    }

    /// Metadata failure: banner with retry, skeleton down without waiting on reveals
    async fn fail_session(
        &self,
        session: &LoadSession,
        err: CoordinatorError,
    ) -> Result<(), CoordinatorError> {
        if !session.is_current(&self.registry) {
            tracing::debug!(genre = %session.genre, error = %err, "Dropping failure from stale session");
            return Ok(());
        }

        tracing::error!(genre = %session.genre, error = %err.technical_detail(), "Load session failed");
        self.surface
            .show_error(ErrorBanner::from(&err), self.retry_handle())
            .await;
        self.shimmer
            .hide_generation(session.shimmer_generation, false)
            .await;
        Err(err)
    }

    async fn render_genre_controls(&self, session: &LoadSession) {
        let catalog = self.lock_state().catalog.clone();
        let epoch = session.epoch;

        let Some(catalog) = catalog else {
            // Nothing to draw without a catalog
            self.barrier.mark_loaded_in(epoch, LoadingFlag::GenreButtonsLoaded);
            self.barrier.mark_loaded_in(epoch, LoadingFlag::GenreImagesLoaded);
            return;
        };

        if session.owns(&self.registry, RenderTarget::Controls) {
            self.surface
                .render_genre_controls(&catalog.genres, &session.genre)
                .await;
        }
        self.barrier.mark_loaded_in(epoch, LoadingFlag::GenreButtonsLoaded);

        let icons = catalog
            .genres
            .iter()
            .filter_map(|g| g.icon_url.clone())
            .collect();
        let reveal = self.gate.register("genre-icons", icons);
        let barrier = self.barrier.clone();
        tokio::spawn(async move {
            reveal.await;
            barrier.mark_loaded_in(epoch, LoadingFlag::GenreImagesLoaded);
        });
    }

    pub(super) async fn render_rank_controls(&self, session: &LoadSession) {
        if !session.owns(&self.registry, RenderTarget::Controls) {
            return;
        }
        let ranks = self.ranks();
        let active = self.active_sort_field();
        if !self.surface.render_rank_controls(&ranks, &active).await {
            tracing::trace!(sort = %active, "Rank controls already mounted");
        }
    }

    /// Headers render together once their cover images settle
    fn reveal_service_headers(&self, session: &LoadSession, metadata: &PlaylistMetadata) {
        let headers: Vec<ServiceHeader> = metadata
            .service_order
            .iter()
            .filter_map(|service| {
                metadata.playlists.get(service).map(|info| ServiceHeader {
                    service: *service,
                    info: info.clone(),
                })
            })
            .collect();
        let covers = headers
            .iter()
            .filter_map(|h| h.info.cover_url.clone())
            .collect();
        let reveal = self.gate.register("service-headers", covers);

        let this = self.clone();
        let session = session.clone();
        tokio::spawn(async move {
            reveal.await;
            for header in headers {
                let target = RenderTarget::ServiceHeader(header.service);
                if !session.owns(&this.registry, target) {
                    tracing::debug!(target = %target, token = %session.token, "Dropping stale service header");
                    continue;
                }
                if let Err(e) = this.surface.render_service_header(header).await {
                    tracing::error!(target = %target, error = %e, "Service header has no place to render");
                }
            }
            this.barrier
                .mark_loaded_in(session.epoch, LoadingFlag::PlaylistDataLoaded);
        });
    }

    async fn load_primary(&self, session: &LoadSession, primary_done: watch::Sender<bool>) {
        let genre = session.genre.as_str();
        let (primary, ranks) = tokio::join!(
            self.queries.playlist(genre, ServiceId::Aggregate),
            self.queries.rank_config(),
        );

        if !session.owns(&self.registry, RenderTarget::MainPlaylist) {
            tracing::debug!(genre, token = %session.token, "Dropping stale primary playlist");
            return;
        }

        let tracks = isolated_tracks(genre, ServiceId::Aggregate, primary);
        let has_tracks = !tracks.is_empty();
        self.cache.set(ServiceId::Aggregate, tracks).await;

        if has_tracks {
            self.enrich_play_counts(session).await;
        }

        match ranks {
            Ok(ranks) => self.lock_state().ranks = ranks,
            Err(e) => tracing::warn!(genre, error = %e, "Rank config unavailable, keeping previous ranks"),
        }
        self.render_rank_controls(session).await;

        let sort_field = self.active_sort_field();
        if !sort_field.is_rank_preserving() {
            match self.ranks().into_iter().find(|r| r.sort_field == sort_field) {
                Some(rank) => {
                    self.cache.sort(&rank, rank.sort_order).await;
                }
                None => tracing::warn!(genre, sort = %sort_field, "Active sort is not in the rank config"),
            }
        }

        // The reveal must be registered before these flags can complete the barrier
        let commit = self.stage_rows(session).await;
        self.barrier.mark_loaded_in(session.epoch, LoadingFlag::TracksLoaded);
        self.barrier.mark_loaded_in(session.epoch, LoadingFlag::RankButtonsLoaded);
        commit.await;
        let _ = primary_done.send(true);
    }

    async fn enrich_play_counts(&self, session: &LoadSession) {
        let isrcs: Vec<String> = match self.cache.get(ServiceId::Aggregate).await {
            Some(entry) => entry.tracks.iter().map(|t| t.isrc.clone()).collect(),
            None => return,
        };

        match self.queries.play_counts(&isrcs).await {
            Ok(counts) => {
                if !session.owns(&self.registry, RenderTarget::MainPlaylist) {
                    return;
                }
                let merged = self.cache.merge_play_counts(ServiceId::Aggregate, &counts).await;
                tracing::debug!(genre = %session.genre, merged, requested = isrcs.len(), "Play counts merged");
            }
            Err(e) => {
                tracing::warn!(genre = %session.genre, error = %e, "Play counts unavailable");
            }
        }
    }

    /// Preload the primary rows' images and commit the rows once they settle.
    ///
    /// The returned future is already running and is registered with the
    /// skeleton so the fade waits for it. Rows are read from the cache at commit
    /// time so a sort applied in between is not lost.
    async fn stage_rows(&self, session: &LoadSession) -> Commit {
        let covers = self
            .cache
            .get(ServiceId::Aggregate)
            .await
            .map(|entry| {
                entry
                    .tracks
                    .iter()
                    .filter_map(|t| t.album_cover_url.clone())
                    .collect()
            })
            .unwrap_or_default();
        let reveal = self.gate.register("playlist-rows", covers);

        let this = self.clone();
        let committing = session.clone();
        let commit = async move {
            let outcome = reveal.await;
            let target = RenderTarget::MainPlaylist;
            if !committing.owns(&this.registry, target) {
                tracing::debug!(genre = %committing.genre, token = %committing.token, "Dropping stale playlist rows");
                return outcome;
            }

            // Flag before reading so a concurrent sort either lands in this read or repaints
            this.mark_rows_committed(&committing);
            let tracks = this
                .cache
                .get(ServiceId::Aggregate)
                .await
                .map(|entry| entry.tracks)
                .unwrap_or_default();
            let layout = LayoutType::for_sort_field(&this.active_sort_field());
            match this.surface.render_rows(target, &tracks, layout).await {
                Ok(()) => tracing::debug!(genre = %committing.genre, rows = tracks.len(), "Playlist rows committed"),
                Err(e) => tracing::error!(error = %e, "Playlist rows have no place to render"),
            }
            outcome
        }
        .boxed()
        .shared();

        tokio::spawn(commit.clone());
        self.shimmer
            .register_playlist_reveal(session.shimmer_generation, commit.clone())
            .await;
        commit
    }

    async fn load_secondaries(
        &self,
        session: &LoadSession,
        services: &[ServiceId],
        primary_done: watch::Receiver<bool>,
    ) {
        let loads = services.iter().map(|&service| {
            let mut primary_done = primary_done.clone();
            async move {
                let result = self.queries.playlist(&session.genre, service).await;
                // A dropped sender means the primary went stale; the token check below handles it
                let _ = primary_done.wait_for(|done| *done).await;
                self.commit_secondary(session, service, result).await;
            }
        });
        future::join_all(loads).await;

        self.barrier
            .mark_loaded_in(session.epoch, LoadingFlag::ServiceDataLoaded);
    }

    async fn commit_secondary(
        &self,
        session: &LoadSession,
        service: ServiceId,
        result: Result<Option<Playlist>, FetchError>,
    ) {
        let target = RenderTarget::ServicePanel(service);
        if !session.owns(&self.registry, target) {
            tracing::debug!(service = %service, token = %session.token, "Dropping stale service playlist");
            return;
        }

        let tracks = isolated_tracks(&session.genre, service, result);
        self.cache.set(service, tracks.clone()).await;
        if let Err(e) = self
            .surface
            .render_rows(target, &tracks, LayoutType::PrimaryRank)
            .await
        {
            tracing::error!(service = %service, error = %e, "Service panel has no place to render");
        }
    }
}

/// A failed or missing playlist leaves its panel empty rather than failing the session
fn isolated_tracks(
    genre: &str,
    service: ServiceId,
    result: Result<Option<Playlist>, FetchError>,
) -> Vec<Track> {
    match result {
        Ok(Some(playlist)) => playlist.tracks,
        Ok(None) => {
            tracing::info!(genre, service = %service, "No playlist for service");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(genre, service = %service, error = %e, "Playlist fetch failed, leaving panel empty");
            Vec::new()
        }
    }
}
