//! Host-page access contract.
//!
//! The streaming page owns the real player. Everything here treats its DOM
//! as an external document: adapters re-read state on every call and the
//! controller never keeps references across commands, because the host
//! replaces the audio element and re-renders the listing whenever the user
//! navigates between album and track views.
//!
//! The selector and attribute names below are the page schema this build
//! understands; they track the host markup and break when it changes.

/// The host player's audio element.
pub const AUDIO_SELECTOR: &str = "audio";
/// Track activation links, in listing order.
pub const TRACK_LINK_SELECTOR: &str = "a[data-trackid]";
/// Collection listing rows, in listing order.
pub const LISTING_SELECTOR: &str = "li[data-trackid]";
/// Player control region carrying the collect-item code.
pub const CONTROLS_SELECTOR: &str = "#carousel-player .item-collection-controls";

/// Control-region attribute whose value is `a<album_id>` or `t<track_id>`.
pub const COLLECT_ITEM_ATTR: &str = "data-collect-item";
pub const TRACK_ID_ATTR: &str = "data-trackid";
pub const ITEM_ID_ATTR: &str = "data-itemid";
pub const ITEM_TYPE_ATTR: &str = "data-itemtype";

/// Nested fragments inside one listing row.
pub const TITLE_SELECTOR: &str = ".collection-item-title";
pub const ARTIST_SELECTOR: &str = ".collection-item-artist";
pub const ALBUM_LINK_SELECTOR: &str = ".collection-title-details a.item-link";
pub const COVER_SELECTOR: &str = "img.collection-item-art";
pub const FAV_TRACK_SELECTOR: &str = ".fav-track-link";

/// Query parameter carrying the track id in audio source urls.
pub const TRACK_ID_PARAM: &str = "track_id";

/// Raw fragments lifted from one listing row, before any cleanup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawListingEntry {
    pub track_id: Option<String>,
    pub item_id: Option<String>,
    pub item_type: Option<String>,
    pub title_text: Option<String>,
    pub artist_text: Option<String>,
    pub fav_track_text: Option<String>,
    pub album_link: Option<String>,
    pub cover_src: Option<String>,
}

/// Completion-handler binding state of one audio element.
///
/// The marker lives on the element itself, not on the controller: the host
/// may create a fresh element that needs its own binding while an old
/// handle is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Bound,
}

/// Handle to the host page's audio element.
pub trait AudioElement {
    /// Active source url; `None` when no source is set.
    fn source_url(&self) -> Option<String>;
    fn is_paused(&self) -> bool;
    fn has_ended(&self) -> bool;
    /// Resumes native playback.
    fn play(&self);
    /// Pauses native playback.
    fn pause(&self);
    /// Per-element completion-handler marker.
    fn completion_binding(&self) -> BindingState;
    /// Attaches `handler` to the element's natural end-of-playback event and
    /// moves the element to [`BindingState::Bound`].
    fn attach_completion_handler(&self, handler: Box<dyn Fn() + Send + Sync>);
}

/// Live view of the streaming page consumed by the controller.
pub trait PageDocument: Send + Sync + 'static {
    type Audio: AudioElement;

    /// Current audio element, if the host has created one.
    fn audio(&self) -> Option<Self::Audio>;
    /// Raw collect-item code from the player control region.
    fn collect_item_code(&self) -> Option<String>;
    /// Listing rows in document order.
    fn listing_entries(&self) -> Vec<RawListingEntry>;
    /// Synthesizes an activation click on the `index`-th track link.
    /// Out-of-range indexes are ignored.
    fn click_track_link(&self, index: usize);
    /// Opens `url` in a new browsing context.
    fn open_in_new_context(&self, url: &str);
    /// Watches the document for mutations, invoking `callback` on each
    /// change until it returns `true`; observation is disconnected at that
    /// point. Used to catch late creation of the audio element.
    fn observe_mutations(&self, callback: Box<dyn FnMut() -> bool + Send>);
}
