//! # Mood Track Provider
//!
//! Finds tracks for an emotion by searching mood-tagged playlists.
//!
//! ## Lookup flow
//!
//! 1. Pick one search phrase at random from the emotion's keyword list
//!    ([`QueryTable`]); emotions without keywords search for `"music"`.
//! 2. Search the catalog for a handful of playlists matching the phrase.
//! 3. Walk the playlists in order, listing their tracks and keeping every
//!    real track object until the requested number is reached.
//!
//! The catalog answers with loosely-shaped JSON ([`serde_json::Value`]) in the
//! upstream service's layout. A playlist listing with no `items` key is
//! skipped; any other missing or null field along the way is a
//! [`ProviderError::Malformed`]. Callers using [`TrackProvider::get_tracks`]
//! just see an empty list.

use anyhow::{Context, Result};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::ProviderConfig;
use crate::emotion::EmotionLabel;
use crate::error::ProviderError;

/// Query used when an emotion has no keywords.
pub const DEFAULT_QUERY: &str = "music";

/// A playable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Track {
    pub id: Option<String>,
    pub uri: Option<String>,
    pub name: String,
    pub artists: Vec<String>,
}

impl Track {
    /// Reads a track object from an upstream response. Returns `None` for
    /// nulls, non-objects and empty objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object().filter(|o| !o.is_empty())?;
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        let artists = object
            .get("artists")
            .and_then(Value::as_array)
            .map(|artists| {
                artists
                    .iter()
                    .filter_map(|artist| artist.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id: text("id"),
            uri: text("uri"),
            name: text("name").unwrap_or_default(),
            artists,
        })
    }

    /// The reference a playback service can play, if there is one.
    pub fn playable_uri(&self) -> Option<&str> {
        self.uri.as_deref().filter(|uri| !uri.trim().is_empty())
    }
}

/// Source of tracks for an emotion.
pub trait TrackProvider {
    /// Up to `limit` tracks in provider order, or why there are none.
    fn fetch_tracks(&mut self, emotion: EmotionLabel, limit: usize) -> Result<Vec<Track>, ProviderError>;

    /// Like [`fetch_tracks`](Self::fetch_tracks) but never fails: errors are
    /// logged and come back as an empty list.
    fn get_tracks(&mut self, emotion: EmotionLabel, limit: usize) -> Vec<Track> {
        self.fetch_tracks(emotion, limit).unwrap_or_else(|e| {
            warn!("Track lookup for {emotion} failed: {e}");
            Vec::new()
        })
    }
}

/// The two catalog calls the provider needs, answering raw upstream JSON.
pub trait CatalogClient {
    /// Expected shape: `{"playlists": {"items": [{"id": .., "name": ..}, ..]}}`.
    fn search_playlists(&mut self, query: &str, limit: usize) -> Result<Value, ProviderError>;

    /// Expected shape: `{"items": [{"track": {..}}, ..]}`.
    fn list_tracks(&mut self, playlist_id: &str, limit: usize) -> Result<Value, ProviderError>;
}

/// Search phrases per emotion.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTable {
    queries: BTreeMap<EmotionLabel, Vec<String>>,
}

impl QueryTable {
    /// A table with no keywords at all: everything searches for `"music"`.
    pub fn empty() -> Self {
        Self {
            queries: BTreeMap::new(),
        }
    }

    /// Replaces (or, with an empty list, removes) one emotion's keywords.
    pub fn set(&mut self, emotion: EmotionLabel, queries: Vec<String>) {
        if queries.is_empty() {
            self.queries.remove(&emotion);
        } else {
            self.queries.insert(emotion, queries);
        }
    }

    pub fn queries_for(&self, emotion: EmotionLabel) -> &[String] {
        self.queries.get(&emotion).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Picks one phrase uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, emotion: EmotionLabel, rng: &mut R) -> String {
        self.queries_for(emotion)
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_QUERY.to_string())
    }
}

impl Default for QueryTable {
    fn default() -> Self {
        let table: [(EmotionLabel, &[&str]); 7] = [
            (EmotionLabel::Happy, &["happy hits", "feel good", "upbeat", "good vibes", "party"]),
            (EmotionLabel::Sad, &["sad songs", "melancholy", "heartbreak", "rage", "intense"]),
            (EmotionLabel::Angry, &["aggressive", "metal", "hard rock"]),
            (EmotionLabel::Neutral, &["chill", "ambient", "lofi"]),
            (EmotionLabel::Fear, &["dark", "horror", "suspense", "eerie", "ominous"]),
            (
                EmotionLabel::Surprise,
                &["unexpected", "eclectic", "quirky", "unique", "genre blend"],
            ),
            (EmotionLabel::Disgust, &["industrial", "noise", "experimental"]),
        ];

        Self {
            queries: table
                .into_iter()
                .map(|(emotion, queries)| {
                    (emotion, queries.iter().map(|q| q.to_string()).collect())
                })
                .collect(),
        }
    }
}

/// [`TrackProvider`] that searches playlists through a [`CatalogClient`].
#[derive(Debug)]
pub struct PlaylistTrackProvider<C> {
    client: C,
    queries: QueryTable,
    rng: StdRng,
    search_limit: usize,
    track_limit: usize,
}

impl<C: CatalogClient> PlaylistTrackProvider<C> {
    pub fn new(client: C) -> Self {
        Self::from_config(client, &ProviderConfig::default())
    }

    /// Applies limits, keyword overrides and the optional seed.
    pub fn from_config(client: C, config: &ProviderConfig) -> Self {
        let mut queries = QueryTable::default();
        for (emotion, overrides) in &config.queries {
            queries.set(*emotion, overrides.clone());
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            client,
            queries,
            rng,
            search_limit: config.playlist_search_limit,
            track_limit: config.playlist_track_limit,
        }
    }

    pub fn with_queries(mut self, queries: QueryTable) -> Self {
        self.queries = queries;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn queries(&self) -> &QueryTable {
        &self.queries
    }
}

impl<C: CatalogClient> TrackProvider for PlaylistTrackProvider<C> {
    fn fetch_tracks(&mut self, emotion: EmotionLabel, limit: usize) -> Result<Vec<Track>, ProviderError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = self.queries.choose(emotion, &mut self.rng);
        debug!("Searching playlists for {emotion} with query {query:?}");

        let results = self.client.search_playlists(&query, self.search_limit)?;
        let playlists = results
            .get("playlists")
            .filter(|p| !p.is_null())
            .ok_or_else(|| ProviderError::Malformed("search result has no playlists".into()))?
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::Malformed("playlists have no items".into()))?;

        let mut tracks = Vec::with_capacity(limit);
        for playlist in playlists.iter().filter(|p| !p.is_null()) {
            if tracks.len() >= limit {
                break;
            }

            let id = playlist
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| ProviderError::Malformed("playlist without id".into()))?;

            let listing = self.client.list_tracks(id, self.track_limit)?;
            let Some(items) = listing.get("items") else {
                debug!("Playlist {id} returned no items, skipping");
                continue;
            };
            let items = items
                .as_array()
                .ok_or_else(|| ProviderError::Malformed(format!("playlist {id} items are not a list")))?;

            tracks.extend(
                items
                    .iter()
                    .filter_map(|item| item.get("track").and_then(Track::from_value))
                    .take(limit - tracks.len()),
            );
        }

        debug!("Found {} tracks for {emotion}", tracks.len());
        Ok(tracks)
    }
}

/// One playlist in a [`LocalCatalog`] file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Track objects in upstream layout; nulls are kept as-is.
    #[serde(default)]
    pub tracks: Vec<Value>,
}

/// A catalog read from a JSON file, answering in upstream layout.
///
/// A playlist matches a query when its name or one of its tags contains the
/// query, ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalCatalog {
    pub playlists: Vec<CatalogPlaylist>,
}

impl LocalCatalog {
    pub fn new(playlists: Vec<CatalogPlaylist>) -> Self {
        Self { playlists }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid catalog file {}", path.display()))
    }
}

impl CatalogClient for LocalCatalog {
    fn search_playlists(&mut self, query: &str, limit: usize) -> Result<Value, ProviderError> {
        let needle = query.to_lowercase();
        let items: Vec<Value> = self
            .playlists
            .iter()
            .filter(|playlist| {
                playlist.name.to_lowercase().contains(&needle)
                    || playlist.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
            })
            .take(limit)
            .map(|playlist| json!({ "id": playlist.id, "name": playlist.name }))
            .collect();

        Ok(json!({ "playlists": { "items": items } }))
    }

    fn list_tracks(&mut self, playlist_id: &str, limit: usize) -> Result<Value, ProviderError> {
        let playlist = self
            .playlists
            .iter()
            .find(|playlist| playlist.id == playlist_id)
            .ok_or_else(|| ProviderError::NotFound(format!("playlist {playlist_id}")))?;

        let items: Vec<Value> = playlist
            .tracks
            .iter()
            .take(limit)
            .map(|track| json!({ "track": track }))
            .collect();

        Ok(json!({ "items": items }))
    }
}
