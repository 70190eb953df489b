//! One genre/sort selection's load attempt

use std::collections::HashMap;

use super::token::{RenderToken, RenderTokenRegistry};
use crate::model::{RenderTarget, SortField};

#[derive(Clone, Debug)]
pub struct LoadSession {
    pub genre: String,
    pub sort_field: SortField,
    /// Page token; identifies the session itself
    pub token: RenderToken,
    /// Barrier epoch opened for this session
    pub epoch: u64,
    /// Skeleton generation shown for this session
    pub shimmer_generation: u64,
    /// Set once the primary commit starts reading the cache
    pub rows_committed: bool,
    tokens: HashMap<RenderTarget, RenderToken>,
}

impl LoadSession {
    /// Issue fresh tokens for every render target, superseding any earlier session
    pub fn begin(
        registry: &RenderTokenRegistry,
        genre: impl Into<String>,
        sort_field: SortField,
        epoch: u64,
        shimmer_generation: u64,
    ) -> Self {
        let token = registry.issue(RenderTarget::Page);
        let mut tokens = HashMap::from([(RenderTarget::Page, token)]);
        for target in RenderTarget::all().filter(|t| *t != RenderTarget::Page) {
            tokens.insert(target, registry.issue(target));
        }

        Self {
            genre: genre.into(),
            sort_field,
            token,
            epoch,
            shimmer_generation,
            rows_committed: false,
            tokens,
        }
    }

    pub fn token(&self, target: RenderTarget) -> Option<RenderToken> {
        self.tokens.get(&target).copied()
    }

    /// Whether this session may still mutate `target`
    pub fn owns(&self, registry: &RenderTokenRegistry, target: RenderTarget) -> bool {
        self.token(target)
            .is_some_and(|token| registry.is_current(target, token))
    }

    pub fn is_current(&self, registry: &RenderTokenRegistry) -> bool {
        self.owns(registry, RenderTarget::Page)
    }
}
