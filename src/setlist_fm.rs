use std::sync::OnceLock;

use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::model::{Track, TrackList};

const BASE_URL: &str = "https://api.setlist.fm/rest/1.0/";
pub const API_KEY_PAGE: &str = "https://www.setlist.fm/settings/api";

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_VENUE: &str = "Unknown Venue";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(
        "Could not extract a setlist ID from {0}\nExpected format: https://www.setlist.fm/setlist/artist/year/venue-id.html"
    )]
    InvalidUrl(String),
    #[error("setlist.fm rejected the API key (HTTP {0}). Get a key at {page}", page = API_KEY_PAGE)]
    Unauthorized(StatusCode),
    #[error("Setlist {0} was not found on setlist.fm")]
    NotFound(String),
    #[error("Failed to fetch setlist {id}: {source}")]
    Http {
        id: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to parse setlist {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: reqwest::Error,
    },
}

/* ---------- Raw API shapes ---------- */

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSetlist {
    #[serde(default)]
    pub artist: Option<RawArtist>,
    #[serde(rename = "eventDate", default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub venue: Option<RawVenue>,
    #[serde(default)]
    pub sets: Option<RawSets>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArtist {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVenue {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSets {
    #[serde(default)]
    pub set: Vec<RawSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSet {
    #[serde(default)]
    pub song: Vec<RawSong>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSong {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cover: Option<RawArtist>,
}

/* ---------- Parsed setlist ---------- */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setlist {
    pub tracks: TrackList,
    pub artist: String,
    pub event_date: String,
    pub venue: String,
}

impl Setlist {
    /// `Artist - Venue - Date`
    pub fn default_playlist_name(&self) -> String {
        format!("{} - {} - {}", self.artist, self.venue, self.event_date)
    }
}

fn setlist_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"setlist\.fm/setlist/[^/]+/\d+/([^/?#]+)\.html").expect("valid setlist regex")
    })
}

/// Extracts the setlist ID from a page URL such as
/// `https://www.setlist.fm/setlist/the-national/2024/venue-city-63d6b62f.html`.
///
/// The ID is the last dash-separated token of the page slug.
pub fn extract_setlist_id(url: &str) -> Result<String, CatalogError> {
    let slug = setlist_url_regex()
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| CatalogError::InvalidUrl(url.to_string()))?;

    let id = slug.rsplit('-').next().unwrap_or(slug);
    if id.is_empty() {
        return Err(CatalogError::InvalidUrl(url.to_string()));
    }
    Ok(id.to_string())
}

/// Flattens all sets into one performance-ordered track list.
///
/// Covers are attributed to the original artist. Songs without a name
/// (unidentified songs) are skipped.
pub fn parse_setlist(raw: RawSetlist) -> Setlist {
    let artist = raw
        .artist
        .and_then(|a| a.name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    let venue = raw
        .venue
        .and_then(|v| v.name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_VENUE.to_string());
    let event_date = raw.event_date.unwrap_or_default();

    let tracks = raw
        .sets
        .map(|sets| sets.set)
        .unwrap_or_default()
        .into_iter()
        .flat_map(|set| set.song)
        .filter_map(|song| {
            if song.name.trim().is_empty() {
                log::debug!("Skipping unnamed song in setlist");
                return None;
            }
            let performer = song
                .cover
                .and_then(|cover| cover.name)
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| artist.clone());
            Some(Track::new(song.name, performer))
        })
        .collect();

    Setlist {
        tracks,
        artist,
        event_date,
        venue,
    }
}

/// Docs: https://api.setlist.fm/docs/1.0/index.html
pub struct SetlistFmClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl SetlistFmClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: Url::parse(BASE_URL).expect("valid setlist.fm base URL"),
            api_key: api_key.into(),
        }
    }

    pub async fn fetch_setlist(&self, id: &str) -> Result<RawSetlist, CatalogError> {
        let url = self
            .base_url
            .join(&format!("setlist/{}", id))
            .map_err(|_| CatalogError::InvalidUrl(id.to_string()))?;

        log::debug!("Fetching setlist from {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|source| CatalogError::Http {
                id: id.to_string(),
                source,
            })?;

        match response.status() {
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                return Err(CatalogError::Unauthorized(status));
            }
            StatusCode::NOT_FOUND => return Err(CatalogError::NotFound(id.to_string())),
            _ => {}
        }

        let raw = response
            .error_for_status()
            .map_err(|source| CatalogError::Http {
                id: id.to_string(),
                source,
            })?
            .json::<RawSetlist>()
            .await
            .map_err(|source| CatalogError::Decode {
                id: id.to_string(),
                source,
            })?;

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "63d6b62f",
        "eventDate": "23-06-2024",
        "artist": { "mbid": "664c3e0e", "name": "The National" },
        "venue": { "id": "abc", "name": "Forest Hills Stadium", "city": { "name": "New York" } },
        "sets": {
            "set": [
                { "song": [
                    { "name": "Eucalyptus" },
                    { "name": "New Order T-Shirt" },
                    { "name": "Never Tear Us Apart", "cover": { "name": "INXS" } }
                ] },
                { "encore": 1, "song": [
                    { "name": "" },
                    { "name": "Eucalyptus" },
                    { "name": "About Today", "tape": false }
                ] }
            ]
        }
    }"#;

    #[test]
    fn test_extract_setlist_id() {
        let id = extract_setlist_id(
            "https://www.setlist.fm/setlist/the-national/2024/forest-hills-stadium-queens-ny-63d6b62f.html",
        )
        .unwrap();
        assert_eq!(id, "63d6b62f");
    }

    #[test]
    fn test_extract_setlist_id_with_query_string() {
        let id =
            extract_setlist_id("https://www.setlist.fm/setlist/a/2019/venue-4bd6a39e.html?ref=x")
                .unwrap();
        assert_eq!(id, "4bd6a39e");
    }

    #[test]
    fn test_extract_setlist_id_without_dash() {
        let id = extract_setlist_id("setlist.fm/setlist/artist/2020/13b5c9d1.html").unwrap();
        assert_eq!(id, "13b5c9d1");
    }

    #[test]
    fn test_extract_setlist_id_rejects_other_urls() {
        for url in [
            "https://www.setlist.fm/venue/forest-hills-stadium-63d6b62f.html",
            "https://example.com/setlist/a/2024/b.html",
            "not a url",
        ] {
            assert!(matches!(
                extract_setlist_id(url),
                Err(CatalogError::InvalidUrl(_))
            ));
        }
    }

    #[test]
    fn test_parse_setlist() {
        let raw: RawSetlist = serde_json::from_str(SAMPLE).unwrap();
        let setlist = parse_setlist(raw);

        assert_eq!(setlist.artist, "The National");
        assert_eq!(setlist.venue, "Forest Hills Stadium");
        assert_eq!(setlist.event_date, "23-06-2024");
        assert_eq!(
            setlist.tracks,
            vec![
                Track::new("Eucalyptus", "The National"),
                Track::new("New Order T-Shirt", "The National"),
                Track::new("Never Tear Us Apart", "INXS"),
                Track::new("Eucalyptus", "The National"),
                Track::new("About Today", "The National"),
            ]
        );
        assert_eq!(
            setlist.default_playlist_name(),
            "The National - Forest Hills Stadium - 23-06-2024"
        );
    }

    #[test]
    fn test_parse_setlist_defaults() {
        let raw: RawSetlist = serde_json::from_str(r#"{ "sets": { "set": [] } }"#).unwrap();
        let setlist = parse_setlist(raw);

        assert!(setlist.tracks.is_empty());
        assert_eq!(setlist.artist, "Unknown Artist");
        assert_eq!(setlist.venue, "Unknown Venue");
        assert_eq!(setlist.event_date, "");
    }

    #[test]
    fn test_parse_setlist_without_sets() {
        let raw: RawSetlist =
            serde_json::from_str(r#"{ "artist": { "name": "Band" }, "sets": {} }"#).unwrap();
        assert!(parse_setlist(raw).tracks.is_empty());
    }
}
