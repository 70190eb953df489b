//! Render tokens: the only thing standing between a late response and the screen

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::model::RenderTarget;

/// Opaque handle captured when async work starts and presented when it commits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderToken(u64);

impl fmt::Display for RenderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Current token per render target.
///
/// Tokens come from one monotonic counter, so a superseded token can never
/// compare equal to a later one.
#[derive(Debug, Default)]
pub struct RenderTokenRegistry {
    next: AtomicU64,
    current: Mutex<HashMap<RenderTarget, RenderToken>>,
}

impl RenderTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, target: RenderTarget) -> RenderToken {
        let token = RenderToken(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target, token);
        tracing::trace!(target = %target, token = %token, "Issued render token");
        token
    }

    pub fn is_current(&self, target: RenderTarget, token: RenderToken) -> bool {
        self.current(target) == Some(token)
    }

    pub fn current(&self, target: RenderTarget) -> Option<RenderToken> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&target)
            .copied()
    }
}
