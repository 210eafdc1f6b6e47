//! Display-language catalog for remote surfaces.

/// Persisted display-language preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lang {
    #[default]
    En,
    Ru,
}

impl Lang {
    pub fn from_tag(tag: &str) -> Option<Lang> {
        match tag {
            "en" => Some(Lang::En),
            "ru" => Some(Lang::Ru),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ru => "ru",
        }
    }
}

/// Static labels rendered by remote surfaces.
pub struct Labels {
    pub autoplay: &'static str,
    pub current_track: &'static str,
    pub loading: &'static str,
    pub no_tracks: &'static str,
    pub prev: &'static str,
    pub pause: &'static str,
    pub play: &'static str,
    pub next: &'static str,
    pub select_page_placeholder: &'static str,
}

static EN: Labels = Labels {
    autoplay: "Autoplay next albums",
    current_track: "Current track:",
    loading: "Loading tracks...",
    no_tracks: "No tracks",
    prev: "Previous track",
    pause: "Pause",
    play: "Play",
    next: "Next track",
    select_page_placeholder: "Select a collection page",
};

static RU: Labels = Labels {
    autoplay: "Автоплей следующих альбомов",
    current_track: "Текущий трек:",
    loading: "Загрузка треков...",
    no_tracks: "Нет треков",
    prev: "Предыдущий трек",
    pause: "Пауза",
    play: "Старт",
    next: "Следующий трек",
    select_page_placeholder: "Выберите страницу коллекции",
};

pub fn labels(lang: Lang) -> &'static Labels {
    match lang {
        Lang::En => &EN,
        Lang::Ru => &RU,
    }
}
