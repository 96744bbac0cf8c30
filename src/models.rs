//! Session data model shared by the players, the phase machine and the backend.

use serde::{Deserialize, Serialize};

/// Voice persona used for speech synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Narrator {
    #[serde(rename = "커돌이")]
    Kkeodol,
    #[default]
    #[serde(rename = "커순이")]
    Kkeosun,
}

impl Narrator {
    /// Speaker id understood by the speech synthesis service.
    pub fn speaker_id(self) -> &'static str {
        match self {
            Self::Kkeodol => "nes_c_kihyo",
            Self::Kkeosun => "vhyeri",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Kkeodol => "커돌이",
            Self::Kkeosun => "커순이",
        }
    }
}

/// Per-session settings collected during onboarding. Immutable once a session starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub name: String,
    pub start_location: String,
    pub company_location: String,
    pub narrator: Narrator,
    /// News segments per cycle, also the maximum number of selectable topics.
    pub radio_ratio: u32,
    /// Songs per music cycle.
    pub music_ratio: u32,
    pub topics: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            start_location: String::new(),
            company_location: String::new(),
            narrator: Narrator::default(),
            radio_ratio: 2,
            music_ratio: 1,
            topics: vec![],
        }
    }
}

impl SessionConfig {
    /// Raise ratios to at least 1 and cap the topic set at `radio_ratio`.
    pub fn normalized(mut self) -> Self {
        self.radio_ratio = self.radio_ratio.max(1);
        self.music_ratio = self.music_ratio.max(1);
        self.topics.retain(|t| !t.trim().is_empty());
        self.topics.truncate(self.radio_ratio as usize);
        self
    }

    pub fn origin_label(&self) -> &str {
        non_empty_or(&self.start_location, "출발")
    }

    pub fn destination_label(&self) -> &str {
        non_empty_or(&self.company_location, "도착")
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Narration scripts for a session. News is replaced wholesale on refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadioScripts {
    pub greeting: String,
    pub news: Vec<String>,
    pub closing: Option<String>,
}

impl RadioScripts {
    pub fn new(greeting: String, news: Vec<String>) -> Self {
        Self {
            greeting,
            news: news.into_iter().filter(|s| !s.is_empty()).collect(),
            closing: None,
        }
    }

    pub fn replace_news(&mut self, news: Vec<String>) {
        self.news = news.into_iter().filter(|s| !s.is_empty()).collect();
    }

    /// Greeting and every news segment joined by blank lines.
    pub fn transcript(&self) -> String {
        let mut parts = vec![self.greeting.as_str()];
        parts.extend(self.news.iter().map(String::as_str));
        parts.join("\n\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicTrack {
    #[serde(rename = "videoId")]
    pub id: String,
    pub title: String,
    #[serde(rename = "channelTitle", default)]
    pub channel: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "publishedAt", default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Headline handed to news-segment synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
}

impl From<&NewsArticle> for NewsItem {
    fn from(article: &NewsArticle) -> Self {
        Self {
            title: article.title.clone(),
            summary: article.summary.clone(),
        }
    }
}

/// Transport mode of a route leg, encoded on the wire as 1 = rail, 2 = bus, 3 = walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum TransportMode {
    Rail,
    Bus,
    Walk,
    Other(u8),
}

impl From<u8> for TransportMode {
    fn from(code: u8) -> Self {
        match code {
            1 => Self::Rail,
            2 => Self::Bus,
            3 => Self::Walk,
            other => Self::Other(other),
        }
    }
}

impl From<TransportMode> for u8 {
    fn from(mode: TransportMode) -> Self {
        match mode {
            TransportMode::Rail => 1,
            TransportMode::Bus => 2,
            TransportMode::Walk => 3,
            TransportMode::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSummary {
    pub total_time_min: u32,
    pub payment_won: u32,
    pub bus_transit_count: u32,
    pub subway_transit_count: u32,
    pub total_walk_m: u32,
    pub total_distance_m: u32,
    pub first_start_station: String,
    pub last_end_station: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Station {
    #[serde(rename = "stationName", default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    #[serde(rename = "trafficType")]
    pub mode: TransportMode,
    #[serde(rename = "sectionTimeMin", default)]
    pub duration_min: u32,
    #[serde(rename = "distanceM", default)]
    pub distance_m: u32,
    #[serde(rename = "startName", default)]
    pub start_name: String,
    #[serde(rename = "endName", default)]
    pub end_name: String,
    #[serde(rename = "lineName", default, skip_serializing_if = "Option::is_none")]
    pub line_name: Option<String>,
    #[serde(default)]
    pub stations: Vec<Station>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteResult {
    #[serde(default)]
    pub summary: RouteSummary,
    #[serde(default)]
    pub legs: Vec<Leg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_coords: Option<Coords>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_coords: Option<Coords>,
}

impl RouteResult {
    /// Origin + every station of every leg + destination.
    pub fn full_length(&self) -> usize {
        2 + self.legs.iter().map(|l| l.stations.len()).sum::<usize>()
    }
}

/// Latest live-tracking answer. Replaced on every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackPosition {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "stationName", default)]
    pub station_name: Option<String>,
    #[serde(default)]
    pub arrival_minutes: Option<f64>,
    #[serde(default)]
    pub nearest_index: Option<i64>,
    #[serde(default)]
    pub total_points: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayPhase {
    Greeting,
    SongIntro,
    FirstTrack,
    News,
    Music,
}

impl PlayPhase {
    pub fn is_speech(self) -> bool {
        matches!(self, Self::Greeting | Self::SongIntro | Self::News)
    }
}

impl std::fmt::Display for PlayPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Greeting => write!(f, "GREETING"),
            Self::SongIntro => write!(f, "SONG_INTRO"),
            Self::FirstTrack => write!(f, "FIRST_TRACK"),
            Self::News => write!(f, "NEWS"),
            Self::Music => write!(f, "MUSIC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    PlayingRadio,
    PlayingMusic,
    Paused,
    Ended,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::PlayingRadio => write!(f, "PLAYING_RADIO"),
            Self::PlayingMusic => write!(f, "PLAYING_MUSIC"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Ended => write!(f, "ENDED"),
        }
    }
}
