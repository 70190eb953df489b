//! Core type definitions for the application

use std::collections::BTreeMap;
use std::fmt;

/// Sort field whose order is computed upstream and is never renumbered locally
pub const RANK_PRESERVING_FIELD: &str = "tunemeld-rank";

/// Services whose playlists are aggregated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceId {
    /// The aggregate ("tunemeld") ranking; authoritative for the main table
    Aggregate,
    Spotify,
    AppleMusic,
    SoundCloud,
    YouTube,
    Total,
}

impl ServiceId {
    pub const ALL: [ServiceId; 6] = [
        ServiceId::Aggregate,
        ServiceId::Spotify,
        ServiceId::AppleMusic,
        ServiceId::SoundCloud,
        ServiceId::YouTube,
        ServiceId::Total,
    ];

    /// Services that can rank a track, in badge order
    pub const RANKING: [ServiceId; 3] = [
        ServiceId::Spotify,
        ServiceId::AppleMusic,
        ServiceId::SoundCloud,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aggregate => "tunemeld",
            Self::Spotify => "spotify",
            Self::AppleMusic => "apple_music",
            Self::SoundCloud => "soundcloud",
            Self::YouTube => "youtube",
            Self::Total => "total",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Aggregate => "tunemeld",
            Self::Spotify => "Spotify",
            Self::AppleMusic => "Apple Music",
            Self::SoundCloud => "SoundCloud",
            Self::YouTube => "YouTube",
            Self::Total => "Total Plays",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A region of the surface that async completions may mutate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The whole page; its token identifies the load session
    Page,
    MainPlaylist,
    Controls,
    ServicePanel(ServiceId),
    ServiceHeader(ServiceId),
}

impl RenderTarget {
    /// Every target a session owns
    pub fn all() -> impl Iterator<Item = RenderTarget> {
        [Self::Page, Self::MainPlaylist, Self::Controls]
            .into_iter()
            .chain(ServiceId::ALL.into_iter().map(Self::ServicePanel))
            .chain(ServiceId::ALL.into_iter().map(Self::ServiceHeader))
    }
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => f.write_str("page"),
            Self::MainPlaylist => f.write_str("main-playlist"),
            Self::Controls => f.write_str("controls"),
            Self::ServicePanel(service) => write!(f, "{}-panel", service),
            Self::ServiceHeader(service) => write!(f, "{}-header", service),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SortField(String);

impl SortField {
    pub fn new(field: impl Into<String>) -> Self {
        Self(field.into())
    }

    pub fn rank_preserving() -> Self {
        Self(RANK_PRESERVING_FIELD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_rank_preserving(&self) -> bool {
        self.0 == RANK_PRESERVING_FIELD
    }
}

impl From<&str> for SortField {
    fn from(field: &str) -> Self {
        Self::new(field)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than "desc" sorts ascending
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Which track value a rank sorts by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataField {
    AggregateRank,
    TotalPlays,
    WeeklyChange,
    SpotifyPlays,
    YoutubePlays,
    /// Reads as missing for every track
    Unknown,
}

impl DataField {
    pub fn from_name(name: &str) -> Self {
        match name {
            "tunemeldRank" => Self::AggregateRank,
            "totalCurrentPlayCount" => Self::TotalPlays,
            "totalWeeklyChangePercentage" => Self::WeeklyChange,
            "spotifyCurrentPlayCount" | "spotifyCurrentViewCount" => Self::SpotifyPlays,
            "youtubeCurrentPlayCount" | "youtubeCurrentViewCount" => Self::YoutubePlays,
            _ => Self::Unknown,
        }
    }

    pub fn read(self, track: &Track) -> Option<f64> {
        let counts = track.play_counts.as_ref();
        match self {
            Self::AggregateRank => Some(f64::from(track.aggregate_rank)),
            Self::TotalPlays => counts.and_then(|c| c.total).map(|v| v as f64),
            Self::WeeklyChange => counts.and_then(|c| c.weekly_change_pct),
            Self::SpotifyPlays => counts.and_then(|c| c.spotify).map(|v| v as f64),
            Self::YoutubePlays => counts.and_then(|c| c.youtube).map(|v| v as f64),
            Self::Unknown => None,
        }
    }
}

/// One entry of the backend's rank/sort configuration
#[derive(Clone, Debug, PartialEq)]
pub struct RankConfig {
    pub name: String,
    pub display_name: String,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub is_default: bool,
    pub data_field: DataField,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayCounts {
    pub total: Option<u64>,
    pub spotify: Option<u64>,
    pub youtube: Option<u64>,
    pub weekly_change_pct: Option<f64>,
    pub total_abbreviated: Option<String>,
    pub weekly_change_formatted: Option<String>,
}

/// What one service knows about a track
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ServiceSlot {
    Present {
        rank: Option<u32>,
        link: Option<String>,
    },
    #[default]
    Absent,
}

impl ServiceSlot {
    pub fn rank(&self) -> Option<u32> {
        match self {
            Self::Present { rank, .. } => *rank,
            Self::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }
}

static ABSENT_SLOT: ServiceSlot = ServiceSlot::Absent;

/// A track in a ranked playlist. Identity is the ISRC.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub isrc: String,
    pub name: String,
    pub artist: String,
    pub album_cover_url: Option<String>,
    /// Upstream-computed aggregate rank; never rewritten locally
    pub aggregate_rank: u32,
    /// Rank number currently shown in the table
    pub display_rank: u32,
    pub slots: BTreeMap<ServiceId, ServiceSlot>,
    pub play_counts: Option<PlayCounts>,
}

impl Track {
    pub fn new(isrc: impl Into<String>, aggregate_rank: u32) -> Self {
        Self {
            isrc: isrc.into(),
            name: String::new(),
            artist: String::new(),
            album_cover_url: None,
            aggregate_rank,
            display_rank: aggregate_rank,
            slots: BTreeMap::new(),
            play_counts: None,
        }
    }

    pub fn slot(&self, service: ServiceId) -> &ServiceSlot {
        self.slots.get(&service).unwrap_or(&ABSENT_SLOT)
    }

    /// Ranking services that list this track, with their rank if known
    pub fn seen_on(&self) -> impl Iterator<Item = (ServiceId, Option<u32>)> + '_ {
        ServiceId::RANKING
            .into_iter()
            .filter(|s| self.slot(*s).is_present())
            .map(|s| (s, self.slot(s).rank()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Playlist {
    pub genre: String,
    pub service: ServiceId,
    pub tracks: Vec<Track>,
}

/// Descriptive information about one service's playlist for a genre
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServicePlaylistInfo {
    pub playlist_name: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub playlist_url: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaylistMetadata {
    pub service_order: Vec<ServiceId>,
    pub playlists: BTreeMap<ServiceId, ServicePlaylistInfo>,
}

impl PlaylistMetadata {
    /// Services to fetch after the aggregate, in display order
    pub fn secondary_services(&self) -> Vec<ServiceId> {
        self.service_order
            .iter()
            .copied()
            .filter(|s| *s != ServiceId::Aggregate)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Genre {
    pub name: String,
    pub display_name: String,
    pub icon_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenreCatalog {
    pub genres: Vec<Genre>,
    pub default_genre: Option<String>,
}

impl GenreCatalog {
    pub fn contains(&self, name: &str) -> bool {
        self.genres.iter().any(|g| g.name == name)
    }

    pub fn default_genre(&self) -> Option<&str> {
        self.default_genre
            .as_deref()
            .filter(|g| self.contains(g))
            .or_else(|| self.genres.first().map(|g| g.name.as_str()))
    }

    /// Genre `step` positions away from `current`, wrapping around
    pub fn neighbour(&self, current: &str, step: isize) -> Option<&str> {
        let len = self.genres.len() as isize;
        if len == 0 {
            return None;
        }
        let index = self.genres.iter().position(|g| g.name == current).unwrap_or(0) as isize;
        let next = (index + step).rem_euclid(len) as usize;
        Some(self.genres[next].name.as_str())
    }
}

/// Skeleton column layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LayoutType {
    #[default]
    PrimaryRank,
    SecondaryMetric,
}

impl LayoutType {
    pub fn for_sort_field(field: &SortField) -> Self {
        if field.is_rank_preserving() {
            Self::PrimaryRank
        } else {
            Self::SecondaryMetric
        }
    }
}

/// Which loading surfaces a skeleton covers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceSet {
    Services,
    Playlist,
    Both,
}

impl SurfaceSet {
    pub fn includes_services(self) -> bool {
        matches!(self, Self::Services | Self::Both)
    }

    pub fn includes_playlist(self) -> bool {
        matches!(self, Self::Playlist | Self::Both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names_round_trip() {
        for service in ServiceId::ALL {
            assert_eq!(ServiceId::from_name(service.as_str()), Some(service));
        }
        assert_eq!(ServiceId::from_name("napster"), None);
    }

    #[test]
    fn absent_slot_has_no_rank() {
        let mut track = Track::new("USRC1", 4);
        track.slots.insert(
            ServiceId::Spotify,
            ServiceSlot::Present { rank: Some(2), link: None },
        );

        assert_eq!(track.slot(ServiceId::Spotify).rank(), Some(2));
        assert_eq!(track.slot(ServiceId::SoundCloud), &ServiceSlot::Absent);
        let seen: Vec<_> = track.seen_on().collect();
        assert_eq!(seen, vec![(ServiceId::Spotify, Some(2))]);
    }

    #[test]
    fn missing_metrics_read_as_none() {
        let track = Track::new("USRC1", 7);
        assert_eq!(DataField::AggregateRank.read(&track), Some(7.0));
        assert_eq!(DataField::TotalPlays.read(&track), None);
        assert_eq!(DataField::from_name("somethingNew"), DataField::Unknown);
    }

    #[test]
    fn layout_follows_sort_field() {
        assert_eq!(
            LayoutType::for_sort_field(&SortField::rank_preserving()),
            LayoutType::PrimaryRank
        );
        assert_eq!(
            LayoutType::for_sort_field(&SortField::from("total-plays")),
            LayoutType::SecondaryMetric
        );
    }

    #[test]
    fn genre_neighbour_wraps() {
        let catalog = GenreCatalog {
            genres: ["pop", "dance", "rap"]
                .into_iter()
                .map(|name| Genre {
                    name: name.to_string(),
                    display_name: name.to_string(),
                    icon_url: None,
                })
                .collect(),
            default_genre: Some("missing".to_string()),
        };

        assert_eq!(catalog.default_genre(), Some("pop"));
        assert_eq!(catalog.neighbour("pop", -1), Some("rap"));
        assert_eq!(catalog.neighbour("rap", 1), Some("pop"));
    }
}
