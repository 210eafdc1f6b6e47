//! Durable user preferences shared by remote surfaces and page controllers.

use log::{error, info, warn};

use crate::i18n::Lang;
use crate::protocol::PageId;

/// Root preference model persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub autoplay_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_page: Option<PageId>,
    #[serde(default)]
    pub lang: Lang,
}

/// Injected preference storage.
///
/// Reads are synchronous: command handling must not yield between reading
/// the document and acting on it, and preference access sits on that path.
pub trait PreferenceStore: Send + Sync {
    fn autoplay_enabled(&self) -> bool;
    fn set_autoplay_enabled(&self, enabled: bool);
    fn selected_page(&self) -> Option<PageId>;
    fn set_selected_page(&self, id: PageId);
    fn lang(&self) -> Lang;
    fn set_lang(&self, lang: Lang);
}

#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FilePrefs;

#[cfg(not(target_arch = "wasm32"))]
mod file_store {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;

    /// Preference store backed by a flat toml file.
    pub struct FilePrefs {
        path: PathBuf,
        state: Mutex<Preferences>,
    }

    impl FilePrefs {
        /// Opens the store, creating the file with defaults when missing.
        /// Unreadable content falls back to defaults rather than failing.
        pub fn open(path: PathBuf) -> FilePrefs {
            let prefs = if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(content) => toml::from_str::<Preferences>(&content).unwrap_or_else(|e| {
                        warn!(
                            "Preference file unreadable, using defaults. path={} error={}",
                            path.display(),
                            e
                        );
                        Preferences::default()
                    }),
                    Err(e) => {
                        warn!(
                            "Failed to read preference file, using defaults. path={} error={}",
                            path.display(),
                            e
                        );
                        Preferences::default()
                    }
                }
            } else {
                info!(
                    "Preference file not found. Creating defaults. path={}",
                    path.display()
                );
                let defaults = Preferences::default();
                write_prefs(&path, &defaults);
                defaults
            };
            FilePrefs {
                path,
                state: Mutex::new(prefs),
            }
        }

        pub fn default_path() -> Option<PathBuf> {
            dirs::config_dir().map(|dir| dir.join("trackloop.toml"))
        }

        fn update(&self, apply: impl FnOnce(&mut Preferences)) {
            let mut state = self.state.lock().expect("preference lock poisoned");
            apply(&mut state);
            write_prefs(&self.path, &state);
        }

        fn read(&self) -> Preferences {
            self.state.lock().expect("preference lock poisoned").clone()
        }
    }

    fn write_prefs(path: &std::path::Path, prefs: &Preferences) {
        match toml::to_string(prefs) {
            Ok(content) => {
                if let Err(e) = std::fs::write(path, content) {
                    error!(
                        "Failed to write preference file. path={} error={}",
                        path.display(),
                        e
                    );
                }
            }
            Err(e) => error!("Failed to serialize preferences: {}", e),
        }
    }

    impl PreferenceStore for FilePrefs {
        fn autoplay_enabled(&self) -> bool {
            self.read().autoplay_enabled
        }

        fn set_autoplay_enabled(&self, enabled: bool) {
            self.update(|prefs| prefs.autoplay_enabled = enabled);
        }

        fn selected_page(&self) -> Option<PageId> {
            self.read().selected_page
        }

        fn set_selected_page(&self, id: PageId) {
            self.update(|prefs| prefs.selected_page = Some(id));
        }

        fn lang(&self) -> Lang {
            self.read().lang
        }

        fn set_lang(&self, lang: Lang) {
            self.update(|prefs| prefs.lang = lang);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web_store::WebPrefs;

#[cfg(target_arch = "wasm32")]
mod web_store {
    use gloo_storage::{LocalStorage, Storage};

    use super::*;

    const AUTOPLAY_KEY: &str = "autoplayEnabled";
    const SELECTED_PAGE_KEY: &str = "selectedPageId";
    const LANG_KEY: &str = "lang";

    /// Preference store backed by browser local storage, one key per
    /// preference as the original storage layout used.
    pub struct WebPrefs;

    impl PreferenceStore for WebPrefs {
        fn autoplay_enabled(&self) -> bool {
            LocalStorage::get(AUTOPLAY_KEY).unwrap_or(false)
        }

        fn set_autoplay_enabled(&self, enabled: bool) {
            if let Err(e) = LocalStorage::set(AUTOPLAY_KEY, enabled) {
                error!("Failed to store autoplay preference: {}", e);
            }
        }

        fn selected_page(&self) -> Option<PageId> {
            LocalStorage::get(SELECTED_PAGE_KEY).ok()
        }

        fn set_selected_page(&self, id: PageId) {
            if let Err(e) = LocalStorage::set(SELECTED_PAGE_KEY, id) {
                error!("Failed to store selected page: {}", e);
            }
        }

        fn lang(&self) -> Lang {
            LocalStorage::get::<String>(LANG_KEY)
                .ok()
                .and_then(|tag| Lang::from_tag(&tag))
                .unwrap_or_default()
        }

        fn set_lang(&self, lang: Lang) {
            if let Err(e) = LocalStorage::set(LANG_KEY, lang.tag()) {
                error!("Failed to store language preference: {}", e);
            }
        }
    }
}

#[cfg(test)]
pub use memory_store::MemoryPrefs;
