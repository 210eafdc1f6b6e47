//! Page-side transport controller.
//!
//! Correlates the audio element's source with the rendered listing and
//! executes transport commands by synthesizing activations on listing
//! links. All reads go through the injected [`PageDocument`] at the moment
//! of each command; nothing derived from the page survives a command
//! boundary.

use std::sync::Arc;

use log::debug;

use crate::page::{AudioElement, BindingState, PageDocument};
use crate::prefs::PreferenceStore;
use crate::protocol::{Command, TracksSnapshot};
use crate::tracks::{
    find_current_position, strip_source_params, track_id_from_source, ItemKind, TrackCursor,
    TrackRef,
};

/// Callback invoked on natural end-of-playback, shared between the audio
/// element binding and the mutation watcher that waits for the element.
pub type CompletionHandler = Arc<dyn Fn() + Send + Sync>;

pub struct PageController<D: PageDocument> {
    document: Arc<D>,
    prefs: Arc<dyn PreferenceStore>,
}

impl<D: PageDocument> PageController<D> {
    pub fn new(document: Arc<D>, prefs: Arc<dyn PreferenceStore>) -> PageController<D> {
        PageController { document, prefs }
    }

    /// Listing rows in document order, cleaned into [`TrackRef`]s.
    pub fn list_tracks(&self) -> Vec<TrackRef> {
        self.document
            .listing_entries()
            .iter()
            .map(TrackRef::from_raw)
            .collect()
    }

    /// Playback mode derived from the control-region code.
    pub fn playback_mode(&self) -> Option<ItemKind> {
        self.document
            .collect_item_code()
            .as_deref()
            .and_then(ItemKind::from_collect_code)
    }

    /// Track id of the audio element's active source.
    pub fn current_track_id(&self) -> Option<String> {
        let audio = self.document.audio()?;
        let source = audio.source_url()?;
        track_id_from_source(&source)
    }

    /// Position of the playing row, recomputed from live document state.
    pub fn current_cursor(&self) -> TrackCursor {
        let (Some(track_id), Some(mode)) = (self.current_track_id(), self.playback_mode()) else {
            return TrackCursor::Unavailable;
        };
        find_current_position(&self.list_tracks(), &track_id, mode)
    }

    /// An audio element exists and is neither paused nor ended.
    pub fn is_playing(&self) -> bool {
        self.document
            .audio()
            .map_or(false, |audio| !audio.is_paused() && !audio.has_ended())
    }

    pub fn snapshot(&self) -> TracksSnapshot {
        TracksSnapshot {
            tracks: self.list_tracks(),
            current: self.current_cursor(),
            is_playing: self.is_playing(),
        }
    }

    /// Exhaustive transport-command dispatcher.
    pub fn execute(&self, command: Command, on_complete: &CompletionHandler) {
        debug!("PageController: executing {:?}", command);
        match command {
            Command::NextTrack => self.next_track(),
            Command::PrevTrack => self.previous_track(),
            Command::PlayTrackIndex(index) => {
                self.play_track_at(index);
                // Activation may make the host replace the audio element.
                self.arm_completion_watcher(Arc::clone(on_complete));
            }
            Command::Play => self.play(on_complete),
            Command::Pause => self.pause(),
            Command::OpenAlbum => self.open_current_album(),
        }
    }

    /// Synthesizes an activation on the `index`-th track link. Out of range
    /// is a no-op inside the document.
    pub fn play_track_at(&self, index: usize) {
        self.document.click_track_link(index);
    }

    /// Advances relative to the current cursor. A missing cursor starts from
    /// the top; past the last row the activation is a no-op, no wraparound.
    pub fn next_track(&self) {
        let target = self.current_cursor().next_position();
        debug!("PageController: advancing to listing index {}", target);
        self.play_track_at(target);
    }

    /// Steps back one row; a no-op at the head or without a cursor.
    pub fn previous_track(&self) {
        if let Some(target) = self.current_cursor().previous_position() {
            self.play_track_at(target);
        }
    }

    /// Resumes native playback when a source is loaded; otherwise starts the
    /// first row and re-arms the completion watcher for the element the host
    /// will create.
    pub fn play(&self, on_complete: &CompletionHandler) {
        match self.document.audio() {
            Some(audio) if has_active_source(&audio) => audio.play(),
            _ => {
                self.play_track_at(0);
                self.arm_completion_watcher(Arc::clone(on_complete));
            }
        }
    }

    /// Pauses native playback; a no-op without an element or a source.
    pub fn pause(&self) {
        if let Some(audio) = self.document.audio() {
            if has_active_source(&audio) {
                audio.pause();
            }
        }
    }

    /// Opens the playing row's album page, source parameters stripped, in a
    /// new browsing context.
    pub fn open_current_album(&self) {
        let Some(index) = self.current_cursor().position() else {
            return;
        };
        let tracks = self.list_tracks();
        let Some(album_url) = tracks.get(index).and_then(|track| track.album_url.as_deref())
        else {
            return;
        };
        self.document
            .open_in_new_context(&strip_source_params(album_url));
    }

    /// Attaches the end-of-playback handler exactly once per audio element.
    ///
    /// With no element present yet, a mutation watcher waits for the host to
    /// create one, binds it, and disconnects. Safe to call repeatedly: the
    /// per-element marker makes re-binding a no-op.
    pub fn arm_completion_watcher(&self, on_complete: CompletionHandler) {
        if let Some(audio) = self.document.audio() {
            bind_completion(&audio, &on_complete);
            return;
        }
        debug!("PageController: no audio element yet, watching for it");
        let document = Arc::clone(&self.document);
        self.document.observe_mutations(Box::new(move || {
            match document.audio() {
                Some(audio) => {
                    bind_completion(&audio, &on_complete);
                    // Done observing.
                    true
                }
                None => false,
            }
        }));
    }

    /// Autoplay decision on natural end-of-playback.
    pub fn handle_playback_completed(&self) {
        if !self.prefs.autoplay_enabled() {
            debug!("PageController: playback completed, autoplay disabled");
            return;
        }
        debug!("PageController: playback completed, autoplaying next track");
        self.next_track();
    }
}

fn bind_completion<A: AudioElement>(audio: &A, on_complete: &CompletionHandler) {
    if audio.completion_binding() == BindingState::Bound {
        return;
    }
    debug!("PageController: binding completion handler");
    let handler = Arc::clone(on_complete);
    audio.attach_completion_handler(Box::new(move || handler()));
}

fn has_active_source<A: AudioElement>(audio: &A) -> bool {
    audio.source_url().is_some_and(|source| !source.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::page_fixture::FixturePage;
    use crate::prefs::MemoryPrefs;
    use crate::tracks::ItemKind;

    fn controller_over(
        page: &Arc<FixturePage>,
        prefs: MemoryPrefs,
    ) -> PageController<FixturePage> {
        PageController::new(Arc::clone(page), Arc::new(prefs))
    }

    fn noop_completion() -> CompletionHandler {
        Arc::new(|| {})
    }

    fn counting_completion() -> (CompletionHandler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        (
            Arc::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            }),
            count,
        )
    }

    fn two_track_page() -> Arc<FixturePage> {
        let page = FixturePage::new();
        page.push_track_entry("1", "First Light", "Night Drive Collective");
        page.push_track_entry("2", "Afterglow", "Night Drive Collective");
        page
    }

    #[test]
    fn test_cursor_unavailable_without_mode() {
        let page = two_track_page();
        page.load_track_audio("1");
        page.clear_collect_code();
        let controller = controller_over(&page, MemoryPrefs::default());
        assert_eq!(controller.current_cursor(), TrackCursor::Unavailable);
    }

    #[test]
    fn test_cursor_unavailable_without_audio_source() {
        let page = two_track_page();
        let controller = controller_over(&page, MemoryPrefs::default());
        assert_eq!(controller.current_cursor(), TrackCursor::Unavailable);
    }

    #[test]
    fn test_unique_pair_resolves_position() {
        let page = two_track_page();
        page.load_track_audio("2");
        let controller = controller_over(&page, MemoryPrefs::default());
        assert_eq!(controller.current_cursor(), TrackCursor::At(1));
    }

    #[test]
    fn test_album_row_with_same_featured_id_does_not_shadow_track_row() {
        let page = FixturePage::new();
        page.push_album_entry("77", "900", "Slow Tides", "Harbor Lights");
        page.push_track_entry("77", "Slow Tides (single)", "Harbor Lights");
        page.load_track_audio("77");
        let controller = controller_over(&page, MemoryPrefs::default());
        assert_eq!(controller.current_cursor(), TrackCursor::At(1));
    }

    #[test]
    fn test_next_with_unavailable_cursor_plays_first() {
        let page = two_track_page();
        let controller = controller_over(&page, MemoryPrefs::default());
        controller.next_track();
        assert_eq!(page.activated_indexes(), vec![0]);
    }

    #[test]
    fn test_next_at_tail_is_a_noop() {
        let page = two_track_page();
        page.load_track_audio("2");
        let controller = controller_over(&page, MemoryPrefs::default());
        controller.next_track();
        assert_eq!(page.activated_indexes(), Vec::<usize>::new());
        // The playing row is untouched.
        assert_eq!(controller.current_cursor(), TrackCursor::At(1));
    }

    #[test]
    fn test_previous_at_head_is_a_noop() {
        let page = two_track_page();
        page.load_track_audio("1");
        let controller = controller_over(&page, MemoryPrefs::default());
        controller.previous_track();
        assert_eq!(page.activated_indexes(), Vec::<usize>::new());

        page.clear_collect_code();
        controller.previous_track();
        assert_eq!(page.activated_indexes(), Vec::<usize>::new());
    }

    #[test]
    fn test_previous_steps_back_one_row() {
        let page = two_track_page();
        page.load_track_audio("2");
        let controller = controller_over(&page, MemoryPrefs::default());
        controller.previous_track();
        assert_eq!(page.activated_indexes(), vec![0]);
        assert_eq!(controller.current_cursor(), TrackCursor::At(0));
    }

    #[test]
    fn test_duplicate_binding_fires_handler_once() {
        let page = two_track_page();
        page.load_track_audio("1");
        let controller = controller_over(&page, MemoryPrefs::default());
        let (handler, count) = counting_completion();
        controller.arm_completion_watcher(Arc::clone(&handler));
        controller.arm_completion_watcher(handler);
        page.fire_ended();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_play_with_active_source_resumes_natively() {
        let page = two_track_page();
        page.load_track_audio("1");
        page.pause_audio();
        let controller = controller_over(&page, MemoryPrefs::default());
        controller.play(&noop_completion());
        assert_eq!(page.play_calls(), 1);
        assert_eq!(page.activated_indexes(), Vec::<usize>::new());
    }

    #[test]
    fn test_play_without_audio_starts_first_and_binds_on_appearance() {
        let page = two_track_page();
        assert!(page.audio_element().is_none());
        let controller = controller_over(&page, MemoryPrefs::default());
        controller.play(&noop_completion());
        // The click made the host create the element; the watcher must have
        // bound it and stopped observing.
        assert_eq!(page.activated_indexes(), vec![0]);
        let audio = page.audio_element().expect("host created audio element");
        assert_eq!(audio.completion_binding(), BindingState::Bound);
        assert_eq!(page.mutation_watcher_count(), 0);
    }

    #[test]
    fn test_watcher_binds_when_element_appears_later() {
        let page = two_track_page();
        let controller = controller_over(&page, MemoryPrefs::default());
        let (handler, count) = counting_completion();
        controller.arm_completion_watcher(handler);
        assert_eq!(page.mutation_watcher_count(), 1);

        // Host creates the element on its own schedule.
        page.load_track_audio("1");
        let audio = page.audio_element().expect("audio element");
        assert_eq!(audio.completion_binding(), BindingState::Bound);
        assert_eq!(page.mutation_watcher_count(), 0);

        page.fire_ended();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pause_without_source_is_a_noop() {
        let page = two_track_page();
        let controller = controller_over(&page, MemoryPrefs::default());
        controller.pause();
        assert_eq!(page.pause_calls(), 0);

        page.attach_sourceless_audio();
        controller.pause();
        assert_eq!(page.pause_calls(), 0);
    }

    #[test]
    fn test_pause_with_active_source_pauses_natively() {
        let page = two_track_page();
        page.load_track_audio("1");
        let controller = controller_over(&page, MemoryPrefs::default());
        controller.pause();
        assert_eq!(page.pause_calls(), 1);
    }

    #[test]
    fn test_completion_with_autoplay_disabled_does_not_advance() {
        let page = two_track_page();
        page.load_track_audio("1");
        let controller = controller_over(&page, MemoryPrefs::with_autoplay(false));
        controller.handle_playback_completed();
        assert_eq!(page.activated_indexes(), Vec::<usize>::new());
    }

    #[test]
    fn test_completion_with_autoplay_enabled_advances() {
        let page = two_track_page();
        page.load_track_audio("1");
        let controller = controller_over(&page, MemoryPrefs::with_autoplay(true));
        controller.handle_playback_completed();
        assert_eq!(page.activated_indexes(), vec![1]);
        assert_eq!(controller.current_cursor(), TrackCursor::At(1));
    }

    #[test]
    fn test_open_album_strips_source_params() {
        let page = two_track_page();
        page.set_entry_album_link(0, "https://harborlights.example.com/album/slow-tides?from=collection");
        page.load_track_audio("1");
        let controller = controller_over(&page, MemoryPrefs::default());
        controller.open_current_album();
        assert_eq!(
            page.opened_urls(),
            vec!["https://harborlights.example.com/album/slow-tides".to_string()]
        );
    }

    #[test]
    fn test_open_album_without_cursor_or_link_is_a_noop() {
        let page = two_track_page();
        let controller = controller_over(&page, MemoryPrefs::default());
        controller.open_current_album();
        assert_eq!(page.opened_urls(), Vec::<String>::new());

        // Cursor resolves but the row has no album link.
        page.load_track_audio("1");
        controller.open_current_album();
        assert_eq!(page.opened_urls(), Vec::<String>::new());
    }

    #[test]
    fn test_is_playing_requires_live_audio() {
        let page = two_track_page();
        let controller = controller_over(&page, MemoryPrefs::default());
        assert!(!controller.is_playing());

        page.load_track_audio("1");
        assert!(controller.is_playing());

        page.pause_audio();
        assert!(!controller.is_playing());
    }

    #[test]
    fn test_snapshot_reflects_listing_and_cursor() {
        let page = two_track_page();
        page.load_track_audio("1");
        let controller = controller_over(&page, MemoryPrefs::default());
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.tracks.len(), 2);
        assert_eq!(snapshot.current, TrackCursor::At(0));
        assert!(snapshot.is_playing);
        assert_eq!(
            snapshot.tracks[0].track_title,
            Some("First Light".to_string())
        );
        assert_eq!(snapshot.tracks[1].item_kind, Some(ItemKind::Track));
    }

    #[test]
    fn test_listing_is_recomputed_per_query() {
        let page = two_track_page();
        page.load_track_audio("1");
        let controller = controller_over(&page, MemoryPrefs::default());
        assert_eq!(controller.current_cursor(), TrackCursor::At(0));

        // The host re-renders the listing between queries.
        page.push_track_entry("3", "Undertow", "Harbor Lights");
        assert_eq!(controller.list_tracks().len(), 3);
        page.load_track_audio("3");
        assert_eq!(controller.current_cursor(), TrackCursor::At(2));
    }
}
