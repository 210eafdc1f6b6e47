//! Page adapter backed by a saved HTML snapshot.
//!
//! Serves the read side of the page contract by re-parsing the markup on
//! every query, which is exactly the immutable-per-read model the
//! controller assumes. A snapshot has no live player, so transport
//! mutations degrade to logged no-ops; album links still open in a real
//! browsing context.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};

use crate::page::{
    AudioElement, BindingState, PageDocument, RawListingEntry, ALBUM_LINK_SELECTOR,
    ARTIST_SELECTOR, AUDIO_SELECTOR, COLLECT_ITEM_ATTR, CONTROLS_SELECTOR, COVER_SELECTOR,
    FAV_TRACK_SELECTOR, ITEM_ID_ATTR, ITEM_TYPE_ATTR, LISTING_SELECTOR, TITLE_SELECTOR,
    TRACK_ID_ATTR, TRACK_LINK_SELECTOR,
};

#[derive(Default)]
struct SharedAudioState {
    bound: AtomicBool,
}

/// Detached view of the snapshot's audio element. The snapshot never plays,
/// so the element always reads as paused.
pub struct SnapshotAudio {
    source: Option<String>,
    shared: Arc<SharedAudioState>,
}

impl AudioElement for SnapshotAudio {
    fn source_url(&self) -> Option<String> {
        self.source.clone()
    }

    fn is_paused(&self) -> bool {
        true
    }

    fn has_ended(&self) -> bool {
        false
    }

    fn play(&self) {
        debug!("SnapshotPage: cannot drive the host player from a snapshot");
    }

    fn pause(&self) {
        debug!("SnapshotPage: cannot drive the host player from a snapshot");
    }

    fn completion_binding(&self) -> BindingState {
        if self.shared.bound.load(Ordering::SeqCst) {
            BindingState::Bound
        } else {
            BindingState::Unbound
        }
    }

    fn attach_completion_handler(&self, _handler: Box<dyn Fn() + Send + Sync>) {
        // A snapshot never finishes playback; only the marker matters so
        // repeated binding attempts stay idempotent.
        self.shared.bound.store(true, Ordering::SeqCst);
    }
}

/// Read-side [`PageDocument`] over saved page markup.
pub struct SnapshotPage {
    html: String,
    // One conceptual audio element per snapshot; the binding marker must
    // survive re-reads the way a live element's marker does.
    audio_shared: Arc<SharedAudioState>,
}

impl SnapshotPage {
    pub fn from_html(html: String) -> SnapshotPage {
        SnapshotPage {
            html,
            audio_shared: Arc::new(SharedAudioState::default()),
        }
    }

    pub fn from_file(path: &Path) -> std::io::Result<SnapshotPage> {
        Ok(SnapshotPage::from_html(std::fs::read_to_string(path)?))
    }

    fn with_document<T>(&self, read: impl FnOnce(&Html) -> T) -> T {
        read(&Html::parse_document(&self.html))
    }
}

impl PageDocument for SnapshotPage {
    type Audio = SnapshotAudio;

    fn audio(&self) -> Option<SnapshotAudio> {
        self.with_document(|document| {
            let element = select_first(document, AUDIO_SELECTOR)?;
            Some(SnapshotAudio {
                source: element.value().attr("src").map(str::to_string),
                shared: Arc::clone(&self.audio_shared),
            })
        })
    }

    fn collect_item_code(&self) -> Option<String> {
        self.with_document(|document| {
            select_first(document, CONTROLS_SELECTOR)?
                .value()
                .attr(COLLECT_ITEM_ATTR)
                .map(str::to_string)
        })
    }

    fn listing_entries(&self) -> Vec<RawListingEntry> {
        self.with_document(|document| {
            let Ok(row_selector) = Selector::parse(LISTING_SELECTOR) else {
                return Vec::new();
            };
            document
                .select(&row_selector)
                .map(|row| RawListingEntry {
                    track_id: attr_of(&row, TRACK_ID_ATTR),
                    item_id: attr_of(&row, ITEM_ID_ATTR),
                    item_type: attr_of(&row, ITEM_TYPE_ATTR),
                    title_text: text_of(&row, TITLE_SELECTOR),
                    artist_text: text_of(&row, ARTIST_SELECTOR),
                    fav_track_text: text_of(&row, FAV_TRACK_SELECTOR),
                    album_link: nested_attr_of(&row, ALBUM_LINK_SELECTOR, "href"),
                    cover_src: nested_attr_of(&row, COVER_SELECTOR, "src"),
                })
                .collect()
        })
    }

    fn click_track_link(&self, index: usize) {
        let links = self.with_document(|document| {
            let Ok(selector) = Selector::parse(TRACK_LINK_SELECTOR) else {
                return 0;
            };
            document.select(&selector).count()
        });
        if index < links {
            debug!(
                "SnapshotPage: activation on link {} ignored, snapshot has no live player",
                index
            );
        }
    }

    fn open_in_new_context(&self, url: &str) {
        debug!("SnapshotPage: opening {}", url);
        if let Err(e) = webbrowser::open(url) {
            warn!("SnapshotPage: failed to open {}: {}", url, e);
        }
    }

    fn observe_mutations(&self, mut callback: Box<dyn FnMut() -> bool + Send>) {
        // A snapshot never mutates; give the callback its immediate check
        // and drop it.
        if !callback() {
            debug!("SnapshotPage: mutation watcher dropped, snapshots do not change");
        }
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn attr_of(element: &ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(str::to_string)
}

fn nested_attr_of(scope: &ElementRef<'_>, selector: &str, name: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    scope
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(name).map(str::to_string))
}

fn text_of(scope: &ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    scope
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>())
}
