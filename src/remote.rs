//! Remote-control client.
//!
//! Never touches the page document: resolves a target page instance, issues
//! typed requests over the bus, and renders whatever comes back. A missing
//! response is a rendered empty state, not an error.

use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::i18n::{labels, Lang};
use crate::prefs::PreferenceStore;
use crate::protocol::{Command, ControlMessage, Message, PageId, PageMessage, TracksSnapshot};
use crate::tracks::TrackCursor;

/// One controllable page instance known to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub id: PageId,
    pub url: String,
}

/// Registry of page instances currently reachable over the bus.
#[derive(Clone, Default)]
pub struct PageDirectory {
    pages: Arc<RwLock<Vec<PageEntry>>>,
}

impl PageDirectory {
    pub fn new() -> PageDirectory {
        PageDirectory::default()
    }

    pub fn register(&self, id: PageId, url: String) {
        let mut pages = self.pages.write().expect("page directory lock poisoned");
        pages.retain(|entry| entry.id != id);
        pages.push(PageEntry { id, url });
    }

    pub fn entries(&self) -> Vec<PageEntry> {
        self.pages
            .read()
            .expect("page directory lock poisoned")
            .clone()
    }
}

pub struct RemoteClient {
    bus_producer: Sender<Message>,
    bus_consumer: Receiver<Message>,
    directory: PageDirectory,
    prefs: Arc<dyn PreferenceStore>,
    response_timeout: Duration,
}

impl RemoteClient {
    pub fn new(
        bus_producer: Sender<Message>,
        bus_consumer: Receiver<Message>,
        directory: PageDirectory,
        prefs: Arc<dyn PreferenceStore>,
    ) -> RemoteClient {
        RemoteClient {
            bus_producer,
            bus_consumer,
            directory,
            prefs,
            response_timeout: Duration::from_millis(500),
        }
    }

    /// Selected-instance preference, falling back to the first available
    /// page. The fallback choice is persisted so later commands stay on the
    /// same instance.
    pub fn resolve_target(&self) -> Option<PageEntry> {
        let pages = self.directory.entries();
        if let Some(selected) = self.prefs.selected_page() {
            if let Some(entry) = pages.iter().find(|entry| entry.id == selected) {
                return Some(entry.clone());
            }
        }
        let first = pages.first()?.clone();
        debug!("RemoteClient: falling back to first page {}", first.id);
        self.prefs.set_selected_page(first.id.clone());
        Some(first)
    }

    /// Requests the track listing from the resolved target. `None` covers
    /// every failure: no page available, channel gone, or no answer in time.
    pub fn fetch_tracks(&mut self) -> Option<TracksSnapshot> {
        let target = self.resolve_target()?;
        self.bus_producer
            .send(Message::Control(ControlMessage::RequestTracks {
                target: target.id.clone(),
            }))
            .ok()?;
        self.wait_for_snapshot(&target.id)
    }

    /// Sends a transport command, then re-queries the listing so rendered
    /// state follows the page's own re-render.
    pub fn send_command(&mut self, command: Command) -> Option<TracksSnapshot> {
        let target = self.resolve_target()?;
        self.bus_producer
            .send(Message::Control(ControlMessage::Execute {
                target: target.id.clone(),
                command,
            }))
            .ok()?;
        self.wait_for_snapshot_after_request(&target.id)
    }

    fn wait_for_snapshot_after_request(&mut self, target: &PageId) -> Option<TracksSnapshot> {
        self.bus_producer
            .send(Message::Control(ControlMessage::RequestTracks {
                target: target.clone(),
            }))
            .ok()?;
        self.wait_for_snapshot(target)
    }

    fn wait_for_snapshot(&mut self, target: &PageId) -> Option<TracksSnapshot> {
        let deadline = Instant::now() + self.response_timeout;
        loop {
            match self.bus_consumer.try_recv() {
                Ok(Message::Page(PageMessage::Tracks { source, snapshot }))
                    if source == *target =>
                {
                    return Some(snapshot);
                }
                Ok(_) => continue,
                Err(TryRecvError::Empty) => {
                    if Instant::now() >= deadline {
                        warn!("RemoteClient: no answer from page {}", target);
                        return None;
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Closed) => return None,
            }
        }
    }

    #[cfg(test)]
    fn set_response_timeout(&mut self, timeout: Duration) {
        self.response_timeout = timeout;
    }
}

/// Renders a snapshot as display lines: numbered rows with a playing-row
/// marker, then the current-track line. An absent or empty snapshot renders
/// the localized empty state.
pub fn render_track_list(snapshot: Option<&TracksSnapshot>, lang: Lang) -> Vec<String> {
    let catalog = labels(lang);
    let Some(snapshot) = snapshot.filter(|snapshot| !snapshot.tracks.is_empty()) else {
        return vec![catalog.no_tracks.to_string()];
    };

    let mut lines = Vec::with_capacity(snapshot.tracks.len() + 1);
    for (index, track) in snapshot.tracks.iter().enumerate() {
        let title = track.track_title.as_deref().unwrap_or("?");
        let artist = track.artist.as_deref().unwrap_or("?");
        let marker = if snapshot.current == TrackCursor::At(index) {
            "*"
        } else {
            " "
        };
        lines.push(format!("{} {} {} by {}", marker, index + 1, title, artist));
    }
    if let Some(index) = snapshot.current.position() {
        let track = &snapshot.tracks[index];
        lines.push(format!(
            "{} {} by {}",
            catalog.current_track,
            track.track_title.as_deref().unwrap_or("?"),
            track.artist.as_deref().unwrap_or("?")
        ));
    }
    lines
}

/// Interactive console surface over the client, the popup analog.
pub fn run_console(client: &mut RemoteClient) {
    let catalog = labels(client.prefs.lang());
    println!("{}", catalog.loading);
    print_lines(render_track_list(client.fetch_tracks().as_ref(), client.prefs.lang()));
    print_help();

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let mut words = line.split_whitespace();
        let lang = client.prefs.lang();
        match (words.next(), words.next()) {
            (Some("tracks"), _) => {
                print_lines(render_track_list(client.fetch_tracks().as_ref(), lang));
            }
            (Some("play"), Some(number)) => match number.parse::<usize>() {
                Ok(number) if number > 0 => {
                    let snapshot = client.send_command(Command::PlayTrackIndex(number - 1));
                    print_lines(render_track_list(snapshot.as_ref(), lang));
                }
                _ => println!("play takes a 1-based track number"),
            },
            (Some("play"), None) => {
                let snapshot = client.send_command(Command::Play);
                print_lines(render_track_list(snapshot.as_ref(), lang));
            }
            (Some("pause"), _) => {
                let _ = client.send_command(Command::Pause);
            }
            (Some("next"), _) => {
                let snapshot = client.send_command(Command::NextTrack);
                print_lines(render_track_list(snapshot.as_ref(), lang));
            }
            (Some("prev"), _) => {
                let snapshot = client.send_command(Command::PrevTrack);
                print_lines(render_track_list(snapshot.as_ref(), lang));
            }
            (Some("open"), _) => {
                let _ = client.send_command(Command::OpenAlbum);
            }
            (Some("autoplay"), Some(state)) => match state {
                "on" => client.prefs.set_autoplay_enabled(true),
                "off" => client.prefs.set_autoplay_enabled(false),
                _ => println!("autoplay takes on|off"),
            },
            (Some("lang"), Some(tag)) => match Lang::from_tag(tag) {
                Some(lang) => client.prefs.set_lang(lang),
                None => println!("lang takes en|ru"),
            },
            (Some("pages"), _) => {
                let pages = client.directory.entries();
                if pages.is_empty() {
                    println!("{}", labels(lang).select_page_placeholder);
                }
                for (index, page) in pages.iter().enumerate() {
                    println!("{} {}", index + 1, page.url);
                }
            }
            (Some("use"), Some(number)) => match number.parse::<usize>() {
                Ok(number) if number > 0 => {
                    let pages = client.directory.entries();
                    match pages.get(number - 1) {
                        Some(page) => {
                            client.prefs.set_selected_page(page.id.clone());
                            info!("Selected page {}", page.url);
                        }
                        None => println!("{}", labels(lang).select_page_placeholder),
                    }
                }
                _ => println!("use takes a 1-based page number"),
            },
            (Some("quit"), _) | (Some("exit"), _) => break,
            (Some(other), _) => {
                println!("unknown command: {}", other);
                print_help();
            }
            (None, _) => {}
        }
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

fn print_help() {
    println!("commands: tracks | play [n] | pause | next | prev | open | autoplay on|off | lang en|ru | pages | use <n> | quit");
}
