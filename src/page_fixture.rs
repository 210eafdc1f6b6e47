//! In-memory stand-in for the streaming page used by unit tests.
//!
//! Implements the full host-page contract, including the host's reaction to
//! an activation click: the audio element is replaced with a fresh one for
//! the activated row, the control-region code is rewritten, and mutation
//! watchers are notified, exactly the churn the real page produces.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::page::{AudioElement, BindingState, PageDocument, RawListingEntry};

type Watcher = Box<dyn FnMut() -> bool + Send>;
type EndedHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Counters {
    play: AtomicUsize,
    pause: AtomicUsize,
}

struct AudioState {
    source: Option<String>,
    paused: AtomicBool,
    ended: AtomicBool,
    bound: AtomicBool,
    handlers: Mutex<Vec<EndedHandler>>,
    counters: Arc<Counters>,
}

impl AudioState {
    fn new(source: Option<String>, paused: bool, counters: Arc<Counters>) -> Arc<AudioState> {
        Arc::new(AudioState {
            source,
            paused: AtomicBool::new(paused),
            ended: AtomicBool::new(false),
            bound: AtomicBool::new(false),
            handlers: Mutex::new(Vec::new()),
            counters,
        })
    }
}

/// Handle to the fixture's current audio element.
#[derive(Clone)]
pub struct FixtureAudio {
    state: Arc<AudioState>,
}

impl AudioElement for FixtureAudio {
    fn source_url(&self) -> Option<String> {
        self.state.source.clone()
    }

    fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::SeqCst)
    }

    fn has_ended(&self) -> bool {
        self.state.ended.load(Ordering::SeqCst)
    }

    fn play(&self) {
        self.state.counters.play.fetch_add(1, Ordering::SeqCst);
        self.state.paused.store(false, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.state.counters.pause.fetch_add(1, Ordering::SeqCst);
        self.state.paused.store(true, Ordering::SeqCst);
    }

    fn completion_binding(&self) -> BindingState {
        if self.state.bound.load(Ordering::SeqCst) {
            BindingState::Bound
        } else {
            BindingState::Unbound
        }
    }

    fn attach_completion_handler(&self, handler: Box<dyn Fn() + Send + Sync>) {
        self.state.handlers.lock().unwrap().push(Arc::from(handler));
        self.state.bound.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct PageState {
    audio: Option<Arc<AudioState>>,
    collect_code: Option<String>,
    entries: Vec<RawListingEntry>,
    activations: Vec<usize>,
    opened: Vec<String>,
    watchers: Vec<Watcher>,
}

/// Scriptable page document.
#[derive(Default)]
pub struct FixturePage {
    state: Mutex<PageState>,
    counters: Arc<Counters>,
}

impl FixturePage {
    pub fn new() -> Arc<FixturePage> {
        Arc::new(FixturePage::default())
    }

    pub fn push_track_entry(&self, track_id: &str, title: &str, artist: &str) {
        self.push_entry(RawListingEntry {
            track_id: Some(track_id.to_string()),
            item_id: Some(track_id.to_string()),
            item_type: Some("track".to_string()),
            title_text: Some(title.to_string()),
            artist_text: Some(format!("by {}", artist)),
            ..RawListingEntry::default()
        });
    }

    pub fn push_album_entry(&self, featured_track_id: &str, item_id: &str, title: &str, artist: &str) {
        self.push_entry(RawListingEntry {
            track_id: Some(featured_track_id.to_string()),
            item_id: Some(item_id.to_string()),
            item_type: Some("album".to_string()),
            title_text: Some(title.to_string()),
            artist_text: Some(format!("by {}", artist)),
            fav_track_text: Some(format!("{} (featured)", title)),
            ..RawListingEntry::default()
        });
    }

    fn push_entry(&self, entry: RawListingEntry) {
        self.state.lock().unwrap().entries.push(entry);
        self.notify_watchers();
    }

    pub fn set_entry_album_link(&self, index: usize, url: &str) {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(entry) = state.entries.get_mut(index) {
                entry.album_link = Some(url.to_string());
            }
        }
        self.notify_watchers();
    }

    /// Host loads a standalone track: fresh audio element, `t…` collect code.
    pub fn load_track_audio(&self, track_id: &str) {
        self.load_audio(track_id, format!("t{}", track_id));
    }

    /// Host loads an album's featured track: fresh audio, `a…` collect code.
    pub fn load_album_audio(&self, featured_track_id: &str, item_id: &str) {
        self.load_audio(featured_track_id, format!("a{}", item_id));
    }

    fn load_audio(&self, track_id: &str, collect_code: String) {
        let source = format!(
            "https://streams.example.net/stream/mp3-128/{}?p=0&track_id={}",
            track_id, track_id
        );
        {
            let mut state = self.state.lock().unwrap();
            state.audio = Some(AudioState::new(
                Some(source),
                false,
                Arc::clone(&self.counters),
            ));
            state.collect_code = Some(collect_code);
        }
        self.notify_watchers();
    }

    /// Audio element present but with no source loaded.
    pub fn attach_sourceless_audio(&self) {
        self.state.lock().unwrap().audio =
            Some(AudioState::new(None, true, Arc::clone(&self.counters)));
        self.notify_watchers();
    }

    pub fn clear_collect_code(&self) {
        self.state.lock().unwrap().collect_code = None;
    }

    /// Fires the current element's natural end-of-playback event.
    pub fn fire_ended(&self) {
        let handlers: Vec<EndedHandler> = {
            let state = self.state.lock().unwrap();
            let Some(audio) = state.audio.as_ref() else {
                return;
            };
            audio.ended.store(true, Ordering::SeqCst);
            audio.paused.store(true, Ordering::SeqCst);
            let handlers = audio.handlers.lock().unwrap().clone();
            handlers
        };
        for handler in handlers {
            handler();
        }
    }

    pub fn pause_audio(&self) {
        if let Some(audio) = self.state.lock().unwrap().audio.as_ref() {
            audio.paused.store(true, Ordering::SeqCst);
        }
    }

    pub fn audio_element(&self) -> Option<FixtureAudio> {
        self.audio()
    }

    /// Activations that landed on an existing link, in order.
    pub fn activated_indexes(&self) -> Vec<usize> {
        self.state.lock().unwrap().activations.clone()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn play_calls(&self) -> usize {
        self.counters.play.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> usize {
        self.counters.pause.load(Ordering::SeqCst)
    }

    pub fn mutation_watcher_count(&self) -> usize {
        self.state.lock().unwrap().watchers.len()
    }

    /// Runs watchers outside the state lock; watchers returning `true` are
    /// disconnected.
    fn notify_watchers(&self) {
        let mut watchers = std::mem::take(&mut self.state.lock().unwrap().watchers);
        watchers.retain_mut(|watcher| !watcher());
        self.state.lock().unwrap().watchers.append(&mut watchers);
    }
}

impl PageDocument for FixturePage {
    type Audio = FixtureAudio;

    fn audio(&self) -> Option<FixtureAudio> {
        self.state
            .lock()
            .unwrap()
            .audio
            .as_ref()
            .map(|state| FixtureAudio {
                state: Arc::clone(state),
            })
    }

    fn collect_item_code(&self) -> Option<String> {
        self.state.lock().unwrap().collect_code.clone()
    }

    fn listing_entries(&self) -> Vec<RawListingEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    fn click_track_link(&self, index: usize) {
        let entry = {
            let mut state = self.state.lock().unwrap();
            let Some(entry) = state.entries.get(index).cloned() else {
                return;
            };
            state.activations.push(index);
            entry
        };
        // The host reacts to the activation by loading the row's audio.
        match (entry.track_id, entry.item_type.as_deref(), entry.item_id) {
            (Some(track_id), Some("album"), Some(item_id)) => {
                self.load_album_audio(&track_id, &item_id)
            }
            (Some(track_id), _, _) => self.load_track_audio(&track_id),
            _ => {}
        }
    }

    fn open_in_new_context(&self, url: &str) {
        self.state.lock().unwrap().opened.push(url.to_string());
    }

    fn observe_mutations(&self, callback: Box<dyn FnMut() -> bool + Send>) {
        self.state.lock().unwrap().watchers.push(callback);
    }
}
