//! Per-service cache of the last known track lists
//!
//! The aggregate entry is the single source of truth for what the main table
//! shows; sorting rewrites it in place instead of refetching.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::types::{PlayCounts, RankConfig, ServiceId, SortOrder, Track};

#[derive(Clone, Debug)]
pub struct PlaylistCacheEntry {
    pub service: ServiceId,
    pub tracks: Vec<Track>,
    pub last_updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PlaylistCache {
    entries: Arc<RwLock<HashMap<ServiceId, PlaylistCacheEntry>>>,
}

impl PlaylistCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, service: ServiceId) -> Option<PlaylistCacheEntry> {
        self.entries.read().await.get(&service).cloned()
    }

    pub async fn set(&self, service: ServiceId, tracks: Vec<Track>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            service,
            PlaylistCacheEntry {
                service,
                tracks,
                last_updated_at: Utc::now(),
            },
        );
    }

    /// Merge play counts onto the cached tracks by ISRC. Returns how many tracks matched.
    pub async fn merge_play_counts(
        &self,
        service: ServiceId,
        counts: &HashMap<String, PlayCounts>,
    ) -> usize {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&service) else {
            return 0;
        };

        let mut merged = 0;
        for track in entry.tracks.iter_mut() {
            if let Some(c) = counts.get(&track.isrc) {
                track.play_counts = Some(c.clone());
                merged += 1;
            }
        }
        entry.last_updated_at = Utc::now();
        merged
    }

    /// Re-sort the aggregate entry and return the rewritten track list.
    ///
    /// The entry is fully rewritten before the write lock is released, so any
    /// reader after this call sees the new order.
    pub async fn sort(&self, rank: &RankConfig, order: SortOrder) -> Option<Vec<Track>> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&ServiceId::Aggregate)?;
        sort_tracks(&mut entry.tracks, rank, order);
        entry.last_updated_at = Utc::now();
        Some(entry.tracks.clone())
    }
}

impl Default for PlaylistCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable numeric sort by the rank's data field; missing values count as zero.
///
/// The rank-preserving field restores the upstream rank numbers, every other
/// field renumbers positions 1..N in the new order.
pub fn sort_tracks(tracks: &mut [Track], rank: &RankConfig, order: SortOrder) {
    let field = rank.data_field;
    tracks.sort_by(|a, b| {
        let a_value = field.read(a).unwrap_or(0.0);
        let b_value = field.read(b).unwrap_or(0.0);
        let ordering = a_value.total_cmp(&b_value);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    if rank.sort_field.is_rank_preserving() {
        for track in tracks.iter_mut() {
            track.display_rank = track.aggregate_rank;
        }
    } else {
        for (index, track) in tracks.iter_mut().enumerate() {
            track.display_rank = index as u32 + 1;
        }
    }
}
