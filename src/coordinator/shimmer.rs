//! Skeleton visibility state machine
//!
//! `Idle -> Shimmering -> FadingOut -> Idle`. Every `show` bumps a generation
//! counter; a hide that started under an older generation stops as soon as it
//! notices, so an overlapping show is never torn down by a late hide.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::preload::RevealFuture;
use super::surface::{RenderSurface, SkeletonPlan};
use crate::model::{LayoutType, SortField, SurfaceSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShimmerPhase {
    #[default]
    Idle,
    Shimmering,
    FadingOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ShimmerState {
    pub services_active: bool,
    pub playlist_active: bool,
    pub is_initial_load: bool,
    pub layout_type: LayoutType,
}

impl ShimmerState {
    /// What the surface should draw; surfaces still shimmering from an earlier show stay up
    fn plan(&self) -> Option<SkeletonPlan> {
        let surfaces = match (self.services_active, self.playlist_active) {
            (true, true) => SurfaceSet::Both,
            (true, false) => SurfaceSet::Services,
            (false, true) => SurfaceSet::Playlist,
            (false, false) => return None,
        };
        Some(SkeletonPlan {
            surfaces,
            layout: self.layout_type,
            is_initial_load: self.is_initial_load,
        })
    }
}

#[derive(Default)]
struct Inner {
    state: ShimmerState,
    phase: ShimmerPhase,
    generation: u64,
    pending_reveal: Option<RevealFuture>,
}

#[derive(Clone)]
pub struct ShimmerController {
    inner: Arc<Mutex<Inner>>,
    surface: Arc<dyn RenderSurface>,
    settle_delay: Duration,
}

impl ShimmerController {
    pub fn new(surface: Arc<dyn RenderSurface>, settle_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            surface,
            settle_delay,
        }
    }

    /// Show placeholders and return the generation that owns them
    pub async fn show(
        &self,
        surfaces: SurfaceSet,
        sort_field: &SortField,
        is_initial_load: bool,
    ) -> u64 {
        let layout = LayoutType::for_sort_field(sort_field);
        let (generation, plan) = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.phase = ShimmerPhase::Shimmering;
            inner.state = ShimmerState {
                services_active: inner.state.services_active || surfaces.includes_services(),
                playlist_active: inner.state.playlist_active || surfaces.includes_playlist(),
                is_initial_load,
                layout_type: layout,
            };
            if surfaces.includes_playlist() {
                inner.pending_reveal = None;
            }
            (inner.generation, inner.state.plan())
        };

        tracing::debug!(generation, surfaces = ?surfaces, layout = ?layout, is_initial_load, "Showing skeleton");
        if let Some(plan) = plan {
            self.surface.show_skeleton(plan).await;
        }
        generation
    }

    /// Hold the fade until `reveal` settles. Ignored if `generation` was superseded.
    pub async fn register_playlist_reveal(&self, generation: u64, reveal: RevealFuture) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            tracing::debug!(generation, current = inner.generation, "Dropping reveal for superseded skeleton");
            return false;
        }
        inner.pending_reveal = Some(reveal);
        true
    }

    /// Hide only if `generation` still owns the skeleton. Deadline and fatal
    /// paths pass `wait_for_reveal = false`.
    pub async fn hide_generation(&self, generation: u64, wait_for_reveal: bool) {
        let pending = {
            let inner = self.inner.lock().await;
            if inner.generation != generation || inner.phase == ShimmerPhase::Idle {
                return;
            }
            inner.pending_reveal.clone()
        };

        if wait_for_reveal {
            if let Some(reveal) = pending {
                let outcome = reveal.await;
                tracing::debug!(generation, loaded = outcome.loaded, failed = outcome.failed, "Playlist reveal settled");
            }
        }

        if !self.enter_phase(generation, ShimmerPhase::FadingOut).await {
            return;
        }
        self.surface.fade_skeleton().await;

        tokio::time::sleep(self.settle_delay).await;

        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                tracing::debug!(generation, "Skeleton re-shown during fade");
                return;
            }
            inner.phase = ShimmerPhase::Idle;
            inner.state.services_active = false;
            inner.state.playlist_active = false;
            inner.pending_reveal = None;
        }
        self.surface.clear_skeleton().await;
        tracing::debug!(generation, "Skeleton hidden");
    }

    #[cfg(test)]
    pub async fn state(&self) -> ShimmerState {
        self.inner.lock().await.state
    }

    #[cfg(test)]
    pub async fn phase(&self) -> ShimmerPhase {
        self.inner.lock().await.phase
    }

    async fn enter_phase(&self, generation: u64, phase: ShimmerPhase) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation || inner.phase == ShimmerPhase::Idle {
            return false;
        }
        inner.phase = phase;
        true
    }
}
