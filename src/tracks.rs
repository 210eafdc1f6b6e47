//! Listing-entry model and current-track correlation.
//!
//! Everything here is a pure function of values already read from the page;
//! callers re-read the document for every query because the host re-renders
//! the listing and replaces the audio element at will.

use url::Url;

use crate::page::{RawListingEntry, TRACK_ID_PARAM};

/// Whether a listing entry stands for a whole album or a standalone track.
///
/// The same classification doubles as the playback mode: an album entry's
/// audio is that album's featured track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Album,
    Track,
}

impl ItemKind {
    /// Parses the per-entry item-type attribute. Unknown values map to `None`.
    pub fn from_item_type(raw: &str) -> Option<ItemKind> {
        match raw {
            "album" => Some(ItemKind::Album),
            "track" => Some(ItemKind::Track),
            _ => None,
        }
    }

    /// Classifies the player control-region code by prefix: `a…` means an
    /// album id is loaded, `t…` a track id.
    pub fn from_collect_code(raw: &str) -> Option<ItemKind> {
        if raw.starts_with('a') {
            Some(ItemKind::Album)
        } else if raw.starts_with('t') {
            Some(ItemKind::Track)
        } else {
            None
        }
    }
}

/// One row of the on-page collection listing.
///
/// Every field is independently optional: a missing DOM fragment drops the
/// field, never the row.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackRef {
    pub track_id: Option<String>,
    pub item_id: Option<String>,
    pub item_kind: Option<ItemKind>,
    pub album_title: Option<String>,
    pub artist: Option<String>,
    pub track_title: Option<String>,
    pub album_url: Option<String>,
    pub cover_url: Option<String>,
}

impl TrackRef {
    /// Cleans one raw listing row into a `TrackRef`.
    ///
    /// The favorite-track link carries the title for album rows; plain track
    /// rows fall back to the listing title.
    pub fn from_raw(raw: &RawListingEntry) -> TrackRef {
        let title = non_empty(raw.title_text.as_deref());
        TrackRef {
            track_id: non_empty(raw.track_id.as_deref()),
            item_id: non_empty(raw.item_id.as_deref()),
            item_kind: raw.item_type.as_deref().and_then(ItemKind::from_item_type),
            album_title: title.clone(),
            artist: raw
                .artist_text
                .as_deref()
                .map(strip_credit_prefix)
                .and_then(|artist| non_empty(Some(artist))),
            track_title: non_empty(raw.fav_track_text.as_deref()).or(title),
            album_url: raw.album_link.clone(),
            cover_url: raw.cover_src.clone(),
        }
    }
}

/// Resolution of "which listing row is playing right now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackCursor {
    /// The audio source or the playback mode could not be read.
    Unavailable,
    /// Both were read but no listing row matches.
    NotFound,
    /// Zero-based position of the playing row.
    At(usize),
}

impl TrackCursor {
    pub fn position(self) -> Option<usize> {
        match self {
            TrackCursor::At(index) => Some(index),
            _ => None,
        }
    }

    /// Index the `next` command advances to. A missing cursor behaves like
    /// "before the first row", so `next` lands on index 0.
    pub fn next_position(self) -> usize {
        match self {
            TrackCursor::At(index) => index + 1,
            TrackCursor::Unavailable | TrackCursor::NotFound => 0,
        }
    }

    /// Index the `previous` command targets; `None` at the head or when the
    /// cursor is missing.
    pub fn previous_position(self) -> Option<usize> {
        match self {
            TrackCursor::At(index) if index > 0 => Some(index - 1),
            _ => None,
        }
    }
}

/// First listing position whose id and kind both match the playing audio.
pub fn find_current_position(
    entries: &[TrackRef],
    current_id: &str,
    mode: ItemKind,
) -> TrackCursor {
    entries
        .iter()
        .position(|entry| {
            entry.track_id.as_deref() == Some(current_id) && entry.item_kind == Some(mode)
        })
        .map_or(TrackCursor::NotFound, TrackCursor::At)
}

/// Track id embedded as a query parameter in the audio element's source url.
/// Malformed urls resolve to `None` rather than an error.
pub fn track_id_from_source(source: &str) -> Option<String> {
    let url = Url::parse(source).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == TRACK_ID_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Drops the source-tracking query parameters from an album link.
pub fn strip_source_params(link: &str) -> String {
    match Url::parse(link) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.into()
        }
        // Relative or otherwise unparseable links keep everything up to the
        // query separator.
        Err(_) => link.split('?').next().unwrap_or(link).to_string(),
    }
}

/// Strips a leading `by` credit from scraped artist text.
fn strip_credit_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("by") {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => trimmed,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
