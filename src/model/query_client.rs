//! Remote query collaborator and its GraphQL-over-HTTP implementation

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::types::{
    DataField, Genre, GenreCatalog, PlayCounts, Playlist, PlaylistMetadata, RankConfig,
    ServiceId, ServicePlaylistInfo, ServiceSlot, SortField, SortOrder, Track,
};
use crate::error::FetchError;
use crate::{log_api_request, log_api_result};

const USER_AGENT: &str = concat!("tunemeld-rs/", env!("CARGO_PKG_VERSION"));

/// Everything the coordinator needs from the backend
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Genre list plus the backend's default genre; fetched once at startup
    async fn fetch_genres(&self) -> Result<GenreCatalog, FetchError>;

    async fn playlist_metadata(&self, genre: &str) -> Result<PlaylistMetadata, FetchError>;

    /// `None` when the backend has no playlist for this genre and service
    async fn playlist(&self, genre: &str, service: ServiceId)
        -> Result<Option<Playlist>, FetchError>;

    async fn rank_config(&self) -> Result<Vec<RankConfig>, FetchError>;

    /// Play counts keyed by ISRC
    async fn play_counts(&self, isrcs: &[String]) -> Result<HashMap<String, PlayCounts>, FetchError>;
}

const GENRES_QUERY: &str = r#"
query GetAvailableGenres {
  genres { name displayName iconUrl }
  defaultGenre
}"#;

const METADATA_QUERY: &str = r#"
query GetPlaylistMetadata($genre: String!) {
  serviceOrder
  playlistsByGenre(genre: $genre) {
    playlistName playlistCoverUrl playlistCoverDescriptionText
    playlistUrl genreName serviceName serviceIconUrl
  }
}"#;

const TRACKS_QUERY: &str = r#"
query GetPlaylistTracks($genre: String!, $service: String!) {
  playlist(genre: $genre, service: $service) {
    genreName
    serviceName
    tracks {
      tunemeldRank spotifyRank appleMusicRank soundcloudRank
      isrc trackName artistName albumCoverUrl
      spotifyUrl appleMusicUrl soundcloudUrl youtubeUrl
    }
  }
}"#;

const RANKS_QUERY: &str = r#"
query GetPlaylistRanks {
  ranks { name displayName sortField sortOrder isDefault dataField }
}"#;

const PLAY_COUNTS_QUERY: &str = r#"
query GetPlayCounts($isrcs: [String!]!) {
  tracksPlayCounts(isrcs: $isrcs) {
    isrc youtubeCurrentPlayCount spotifyCurrentPlayCount totalCurrentPlayCount
    totalCurrentPlayCountAbbreviated totalWeeklyChangePercentage
    totalWeeklyChangePercentageFormatted
  }
}"#;

// ============================================================================
// Wire format
// ============================================================================

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<QueryErrorMessage>,
}

#[derive(Deserialize)]
struct QueryErrorMessage {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenresData {
    genres: Vec<GenreWire>,
    default_genre: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenreWire {
    name: String,
    display_name: Option<String>,
    icon_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataData {
    service_order: Vec<String>,
    #[serde(default)]
    playlists_by_genre: Vec<PlaylistInfoWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistInfoWire {
    service_name: String,
    playlist_name: Option<String>,
    playlist_cover_url: Option<String>,
    playlist_cover_description_text: Option<String>,
    playlist_url: Option<String>,
    service_icon_url: Option<String>,
}

#[derive(Deserialize)]
struct TracksData {
    playlist: Option<PlaylistWire>,
}

#[derive(Deserialize)]
struct PlaylistWire {
    #[serde(default)]
    tracks: Vec<TrackWire>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TrackWire {
    isrc: String,
    tunemeld_rank: Option<u32>,
    spotify_rank: Option<u32>,
    apple_music_rank: Option<u32>,
    soundcloud_rank: Option<u32>,
    track_name: Option<String>,
    artist_name: Option<String>,
    album_cover_url: Option<String>,
    spotify_url: Option<String>,
    apple_music_url: Option<String>,
    soundcloud_url: Option<String>,
    youtube_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RanksData {
    ranks: Vec<RankWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankWire {
    name: String,
    display_name: Option<String>,
    sort_field: String,
    sort_order: String,
    #[serde(default)]
    is_default: bool,
    data_field: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayCountsData {
    tracks_play_counts: Vec<PlayCountWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayCountWire {
    isrc: String,
    youtube_current_play_count: Option<u64>,
    spotify_current_play_count: Option<u64>,
    total_current_play_count: Option<u64>,
    total_current_play_count_abbreviated: Option<String>,
    total_weekly_change_percentage: Option<f64>,
    total_weekly_change_percentage_formatted: Option<String>,
}

// ============================================================================
// Wire -> domain
// ============================================================================

fn genre_catalog(data: GenresData) -> GenreCatalog {
    GenreCatalog {
        genres: data
            .genres
            .into_iter()
            .map(|g| Genre {
                display_name: g.display_name.unwrap_or_else(|| g.name.clone()),
                name: g.name,
                icon_url: g.icon_url.filter(|u| !u.is_empty()),
            })
            .collect(),
        default_genre: data.default_genre,
    }
}

/// Unknown service names are dropped with a warning rather than failing the whole metadata
fn playlist_metadata(genre: &str, data: MetadataData) -> PlaylistMetadata {
    let mut service_order = Vec::with_capacity(data.service_order.len());
    for name in &data.service_order {
        match ServiceId::from_name(name) {
            Some(service) => service_order.push(service),
            None => tracing::warn!(genre, service = %name, "Skipping unknown service in service order"),
        }
    }

    let mut playlists = BTreeMap::new();
    for info in data.playlists_by_genre {
        let Some(service) = ServiceId::from_name(&info.service_name) else {
            tracing::warn!(genre, service = %info.service_name, "Skipping playlist for unknown service");
            continue;
        };
        playlists.insert(
            service,
            ServicePlaylistInfo {
                playlist_name: info.playlist_name,
                cover_url: info.playlist_cover_url,
                description: info.playlist_cover_description_text,
                playlist_url: info.playlist_url,
                icon_url: info.service_icon_url,
            },
        );
    }

    PlaylistMetadata {
        service_order,
        playlists,
    }
}

fn slot(rank: Option<u32>, link: Option<String>) -> Option<ServiceSlot> {
    let link = link.filter(|l| !l.is_empty());
    if rank.is_none() && link.is_none() {
        None
    } else {
        Some(ServiceSlot::Present { rank, link })
    }
}

fn track(position: usize, service: ServiceId, wire: TrackWire) -> Track {
    let service_rank = match service {
        ServiceId::Spotify => wire.spotify_rank,
        ServiceId::AppleMusic => wire.apple_music_rank,
        ServiceId::SoundCloud => wire.soundcloud_rank,
        _ => None,
    };
    let aggregate_rank = wire
        .tunemeld_rank
        .or(service_rank)
        .unwrap_or(position as u32 + 1);

    let mut track = Track::new(wire.isrc, aggregate_rank);
    track.name = wire.track_name.unwrap_or_default();
    track.artist = wire.artist_name.unwrap_or_default();
    track.album_cover_url = wire.album_cover_url.filter(|u| !u.is_empty());

    let slots = [
        (ServiceId::Spotify, slot(wire.spotify_rank, wire.spotify_url)),
        (ServiceId::AppleMusic, slot(wire.apple_music_rank, wire.apple_music_url)),
        (ServiceId::SoundCloud, slot(wire.soundcloud_rank, wire.soundcloud_url)),
        (ServiceId::YouTube, slot(None, wire.youtube_url)),
    ];
    for (service, slot) in slots {
        if let Some(slot) = slot {
            track.slots.insert(service, slot);
        }
    }
    track
}

fn playlist(genre: &str, service: ServiceId, data: TracksData) -> Option<Playlist> {
    let wire = data.playlist?;
    Some(Playlist {
        genre: genre.to_string(),
        service,
        tracks: wire
            .tracks
            .into_iter()
            .enumerate()
            .map(|(position, t)| track(position, service, t))
            .collect(),
    })
}

fn rank_config(data: RanksData) -> Vec<RankConfig> {
    data.ranks
        .into_iter()
        .map(|r| {
            let data_field = DataField::from_name(&r.data_field);
            if data_field == DataField::Unknown {
                tracing::warn!(rank = %r.name, data_field = %r.data_field, "Rank uses an unknown data field");
            }
            RankConfig {
                display_name: r.display_name.unwrap_or_else(|| r.name.clone()),
                name: r.name,
                sort_field: SortField::new(r.sort_field),
                sort_order: SortOrder::from_name(&r.sort_order),
                is_default: r.is_default,
                data_field,
            }
        })
        .collect()
}

fn play_counts(data: PlayCountsData) -> HashMap<String, PlayCounts> {
    data.tracks_play_counts
        .into_iter()
        .map(|c| {
            (
                c.isrc,
                PlayCounts {
                    total: c.total_current_play_count,
                    spotify: c.spotify_current_play_count,
                    youtube: c.youtube_current_play_count,
                    weekly_change_pct: c.total_weekly_change_percentage,
                    total_abbreviated: c.total_current_play_count_abbreviated,
                    weekly_change_formatted: c.total_weekly_change_percentage_formatted,
                },
            )
        })
        .collect()
}

// ============================================================================
// Client
// ============================================================================

/// Posts named queries to `{base}/api/{QueryName}/`
#[derive(Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    base_url: String,
}

impl GraphqlClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|source| FetchError::Http {
                operation: "client setup",
                source,
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, operation: &str) -> String {
        format!("{}/api/{}/", self.base_url, operation)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, FetchError> {
        let started = Instant::now();
        let url = self.endpoint(operation);

        let response = self
            .http
            .post(&url)
            .json(&QueryBody { query, variables })
            .send()
            .await
            .map_err(|source| request_error(operation, started, source))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| request_error(operation, started, source))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        decode_envelope(operation, &body)
    }
}

fn request_error(operation: &'static str, started: Instant, source: reqwest::Error) -> FetchError {
    if source.is_timeout() {
        FetchError::Timeout {
            operation,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    } else {
        FetchError::Http { operation, source }
    }
}

fn decode_envelope<T: DeserializeOwned>(operation: &'static str, body: &str) -> Result<T, FetchError> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|source| FetchError::Decode { operation, source })?;

    if !envelope.errors.is_empty() {
        let messages = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(FetchError::GraphQl { operation, messages });
    }

    envelope.data.ok_or_else(|| FetchError::GraphQl {
        operation,
        messages: "response carried no data".to_string(),
    })
}

#[async_trait]
impl QueryClient for GraphqlClient {
    async fn fetch_genres(&self) -> Result<GenreCatalog, FetchError> {
        let operation = "GetAvailableGenres";
        tracing::debug!(operation, "Query started");
        let result = self
            .query::<GenresData>(operation, GENRES_QUERY, json!({}))
            .await
            .map(genre_catalog);
        log_api_result!(operation, result);
        result
    }

    async fn playlist_metadata(&self, genre: &str) -> Result<PlaylistMetadata, FetchError> {
        let operation = "GetPlaylistMetadata";
        log_api_request!(operation, genre);
        let result = self
            .query::<MetadataData>(operation, METADATA_QUERY, json!({ "genre": genre }))
            .await
            .map(|data| playlist_metadata(genre, data));
        log_api_result!(operation, result);
        result
    }

    async fn playlist(
        &self,
        genre: &str,
        service: ServiceId,
    ) -> Result<Option<Playlist>, FetchError> {
        let operation = "GetPlaylistTracks";
        log_api_request!(operation, genre, service = %service);
        let result = self
            .query::<TracksData>(
                operation,
                TRACKS_QUERY,
                json!({ "genre": genre, "service": service.as_str() }),
            )
            .await
            .map(|data| playlist(genre, service, data));
        log_api_result!(operation, result);
        result
    }

    async fn rank_config(&self) -> Result<Vec<RankConfig>, FetchError> {
        let operation = "GetPlaylistRanks";
        tracing::debug!(operation, "Query started");
        let result = self
            .query::<RanksData>(operation, RANKS_QUERY, json!({}))
            .await
            .map(rank_config);
        log_api_result!(operation, result);
        result
    }

    async fn play_counts(&self, isrcs: &[String]) -> Result<HashMap<String, PlayCounts>, FetchError> {
        let operation = "GetPlayCounts";
        if isrcs.is_empty() {
            return Ok(HashMap::new());
        }
        log_api_request!(operation, count = isrcs.len());
        let result = self
            .query::<PlayCountsData>(operation, PLAY_COUNTS_QUERY, json!({ "isrcs": isrcs }))
            .await
            .map(play_counts);
        log_api_result!(operation, result);
        result
    }
}
