//! Control protocol between remote surfaces and page controllers.
//!
//! Requests are addressed by page id; everything except `RequestTracks` is
//! fire-and-forget. Adding a command is a variant addition here plus an arm
//! in the controller's dispatcher.

use crate::tracks::{TrackCursor, TrackRef};

/// Identifies one controlled page instance for the lifetime of its session.
pub type PageId = String;

/// Transport commands a remote surface may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NextTrack,
    PrevTrack,
    PlayTrackIndex(usize),
    Play,
    Pause,
    OpenAlbum,
}

/// Requests addressed to a page controller.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// Query the listing with playback state. The only data-bearing request.
    RequestTracks { target: PageId },
    /// Execute a transport command.
    Execute { target: PageId, command: Command },
}

/// Messages published by page controllers.
#[derive(Debug, Clone)]
pub enum PageMessage {
    /// Response to [`ControlMessage::RequestTracks`].
    Tracks {
        source: PageId,
        snapshot: TracksSnapshot,
    },
    /// The audio element finished natural playback. Self-addressed: the
    /// completion handler publishes it and the owning service consumes it.
    PlaybackCompleted { source: PageId },
}

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Control(ControlMessage),
    Page(PageMessage),
}

/// Listing plus playback state returned by `RequestTracks`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TracksSnapshot {
    pub tracks: Vec<TrackRef>,
    pub current: TrackCursor,
    pub is_playing: bool,
}
