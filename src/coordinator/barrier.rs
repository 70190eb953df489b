//! Multi-flag completion barrier with a one-shot "satisfied" callback

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::CoordinatorError;

/// Prerequisites that must all settle before the skeleton may hide
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadingFlag {
    TracksLoaded,
    GenreButtonsLoaded,
    RankButtonsLoaded,
    GenreImagesLoaded,
    ServiceDataLoaded,
    PlaylistDataLoaded,
}

impl LoadingFlag {
    pub const ALL: [LoadingFlag; 6] = [
        LoadingFlag::TracksLoaded,
        LoadingFlag::GenreButtonsLoaded,
        LoadingFlag::RankButtonsLoaded,
        LoadingFlag::GenreImagesLoaded,
        LoadingFlag::ServiceDataLoaded,
        LoadingFlag::PlaylistDataLoaded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TracksLoaded => "tracksLoaded",
            Self::GenreButtonsLoaded => "genreButtonsLoaded",
            Self::RankButtonsLoaded => "rankButtonsLoaded",
            Self::GenreImagesLoaded => "genreImagesLoaded",
            Self::ServiceDataLoaded => "serviceDataLoaded",
            Self::PlaylistDataLoaded => "playlistDataLoaded",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LoadingFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadingFlag {
    type Err = CoordinatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| CoordinatorError::UnknownFlag(s.to_string()))
    }
}

/// Why the barrier fired
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Satisfaction {
    AllFlags,
    /// Forced after the deadline; lists what never settled
    Deadline { missing: Vec<LoadingFlag> },
}

pub type SatisfiedCallback = Arc<dyn Fn(u64, Satisfaction) + Send + Sync>;

#[derive(Debug, Default)]
struct BarrierState {
    epoch: u64,
    flags: [bool; 6],
    fired: bool,
}

impl BarrierState {
    fn missing(&self) -> Vec<LoadingFlag> {
        LoadingFlag::ALL
            .into_iter()
            .filter(|flag| !self.flags[flag.index()])
            .collect()
    }
}

/// Each `reset` opens a new epoch; marks carrying an older epoch are ignored so
/// a superseded session can never satisfy its successor's barrier.
#[derive(Default)]
pub struct LoadingBarrier {
    state: Mutex<BarrierState>,
    callback: Mutex<Option<SatisfiedCallback>>,
}

impl LoadingBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_satisfied(&self, callback: impl Fn(u64, Satisfaction) + Send + Sync + 'static) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Clear every flag and the fired state; returns the new epoch
    pub fn reset(&self) -> u64 {
        let mut state = self.lock_state();
        state.epoch += 1;
        state.flags = [false; 6];
        state.fired = false;
        tracing::debug!(epoch = state.epoch, "Loading barrier reset");
        state.epoch
    }

    #[cfg(test)]
    pub fn epoch(&self) -> u64 {
        self.lock_state().epoch
    }

    /// Mark a flag in the current epoch. Returns true if this call fired the barrier.
    #[cfg(test)]
    pub fn mark_loaded(&self, flag: LoadingFlag) -> bool {
        let epoch = self.epoch();
        self.mark_loaded_in(epoch, flag)
    }

    pub fn mark_loaded_in(&self, epoch: u64, flag: LoadingFlag) -> bool {
        let fired = {
            let mut state = self.lock_state();
            if state.epoch != epoch {
                tracing::debug!(flag = %flag, epoch, current = state.epoch, "Ignoring flag from a superseded session");
                return false;
            }
            state.flags[flag.index()] = true;
            tracing::debug!(flag = %flag, epoch, "Loading flag set");

            if state.fired || !state.flags.iter().all(|set| *set) {
                false
            } else {
                state.fired = true;
                true
            }
        };

        if fired {
            tracing::info!(epoch, "All loading flags set");
            self.fire(epoch, Satisfaction::AllFlags);
        }
        fired
    }

    /// String entry point; unknown names are a programmer error
    #[cfg(test)]
    pub fn mark_loaded_named(&self, epoch: u64, name: &str) -> Result<bool, CoordinatorError> {
        match name.parse::<LoadingFlag>() {
            Ok(flag) => Ok(self.mark_loaded_in(epoch, flag)),
            Err(e) => {
                tracing::error!(flag = name, epoch, "Unknown loading flag");
                Err(e)
            }
        }
    }

    /// Fire for `epoch` even though some flags are still unset.
    /// Returns false if the epoch is stale or the barrier already fired.
    pub fn force_satisfy_in(&self, epoch: u64) -> bool {
        let missing = {
            let mut state = self.lock_state();
            if state.epoch != epoch || state.fired {
                return false;
            }
            state.fired = true;
            state.missing()
        };

        tracing::warn!(
            epoch,
            missing = ?missing.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            "Loading barrier forced past its deadline"
        );
        self.fire(epoch, Satisfaction::Deadline { missing });
        true
    }

    pub fn is_satisfied(&self) -> bool {
        self.lock_state().fired
    }

    #[cfg(test)]
    pub fn missing(&self) -> Vec<LoadingFlag> {
        self.lock_state().missing()
    }

    // The callback runs with no barrier lock held so it may call back in
    fn fire(&self, epoch: u64, satisfaction: Satisfaction) {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(epoch, satisfaction);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
