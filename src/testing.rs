//! Scripted fakes for the backend and host media, shared by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::backend::CommuteBackend;
use crate::config::VoiceRequest;
use crate::error::{BackendError, LocateError, PlaybackError};
use crate::models::{MusicTrack, Narrator, NewsArticle, NewsItem, RouteResult, TrackPosition};
use crate::player::{AudioOutput, Completion, PlaybackOutcome, SpeechHandle, VideoHost, VideoInstance};
use crate::tracking::{Fix, Locator};

pub fn track(id: &str) -> MusicTrack {
    MusicTrack {
        id: id.to_string(),
        title: format!("{id} title"),
        channel: "test channel".to_string(),
    }
}

/// A 503 from `endpoint`.
pub fn unavailable(endpoint: &'static str) -> BackendError {
    BackendError::Status {
        endpoint,
        status: 503,
        detail: "service unavailable".into(),
    }
}

pub fn article(title: &str) -> NewsArticle {
    NewsArticle {
        title: title.to_string(),
        summary: format!("{title} summary"),
        ..NewsArticle::default()
    }
}

// --- Backend ---

struct BackendState {
    weather: String,
    articles: Vec<NewsArticle>,
    greeting: String,
    fail_news: bool,
    fail_tts: bool,
    search_results: HashMap<String, Vec<MusicTrack>>,
    searches: Vec<String>,
    news_requests: Vec<(Vec<String>, usize)>,
    synthesized: Vec<String>,
    position: Option<TrackPosition>,
    track_calls: usize,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            weather: "맑음".into(),
            articles: vec![],
            greeting: "안녕하세요".into(),
            fail_news: false,
            fail_tts: false,
            search_results: HashMap::new(),
            searches: vec![],
            news_requests: vec![],
            synthesized: vec![],
            position: None,
            track_calls: 0,
        }
    }
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    fn with<T>(&self, f: impl FnOnce(&mut BackendState) -> T) -> T {
        f(&mut *self.state.lock().unwrap())
    }

    pub fn set_weather(&self, weather: &str) {
        self.with(|s| s.weather = weather.to_string());
    }

    pub fn set_articles(&self, articles: Vec<NewsArticle>) {
        self.with(|s| s.articles = articles);
    }

    pub fn fail_news(&self, fail: bool) {
        self.with(|s| s.fail_news = fail);
    }

    pub fn fail_tts(&self, fail: bool) {
        self.with(|s| s.fail_tts = fail);
    }

    pub fn set_search_results(&self, query: &str, tracks: Vec<MusicTrack>) {
        self.with(|s| s.search_results.insert(query.to_string(), tracks));
    }

    pub fn set_position(&self, position: Option<TrackPosition>) {
        self.with(|s| s.position = position);
    }

    pub fn searches(&self) -> Vec<String> {
        self.with(|s| s.searches.clone())
    }

    pub fn news_requests(&self) -> Vec<(Vec<String>, usize)> {
        self.with(|s| s.news_requests.clone())
    }

    pub fn synthesized(&self) -> Vec<String> {
        self.with(|s| s.synthesized.clone())
    }

    pub fn track_calls(&self) -> usize {
        self.with(|s| s.track_calls)
    }
}

impl CommuteBackend for FakeBackend {
    async fn weather(&self) -> Result<String, BackendError> {
        Ok(self.with(|s| s.weather.clone()))
    }

    async fn news(&self, topics: &[String], page_size: usize) -> Result<Vec<NewsArticle>, BackendError> {
        self.with(|s| {
            s.news_requests.push((topics.to_vec(), page_size));
            if s.fail_news {
                Err(unavailable("news"))
            } else {
                Ok(s.articles.clone())
            }
        })
    }

    async fn greeting_script(&self, _name: &str, _narrator: Narrator) -> Result<String, BackendError> {
        Ok(self.with(|s| s.greeting.clone()))
    }

    async fn news_segments(&self, items: &[NewsItem], _narrator: Narrator) -> Result<Vec<String>, BackendError> {
        Ok(items.iter().map(|i| format!("멘트: {}", i.title)).collect())
    }

    async fn closing_script(&self, _previous: &str) -> Result<String, BackendError> {
        Ok("오늘도 수고하셨습니다".into())
    }

    async fn synthesize(&self, text: &str, _voice: &VoiceRequest) -> Result<Vec<u8>, BackendError> {
        self.with(|s| {
            s.synthesized.push(text.to_string());
            if s.fail_tts {
                Err(unavailable("tts"))
            } else {
                Ok(text.as_bytes().to_vec())
            }
        })
    }

    async fn search_music(&self, query: &str) -> Result<Vec<MusicTrack>, BackendError> {
        Ok(self.with(|s| {
            s.searches.push(query.to_string());
            s.search_results.get(query).cloned().unwrap_or_default()
        }))
    }

    async fn route(&self, _origin: &str, _destination: &str) -> Result<RouteResult, BackendError> {
        Ok(RouteResult::default())
    }

    async fn track_position(&self, _route: &RouteResult, _lat: f64, _lng: f64) -> Result<TrackPosition, BackendError> {
        self.with(|s| {
            s.track_calls += 1;
            s.position
                .clone()
                .ok_or_else(|| unavailable("nav/track"))
        })
    }
}

// --- Narration output ---

#[derive(Default)]
struct AudioState {
    auto_finish: bool,
    plays: usize,
    live: usize,
    paused: bool,
    pending: Option<Completion>,
    played: Vec<String>,
}

/// Audio output that records clips. `auto` clips finish as soon as they start.
#[derive(Clone, Default)]
pub struct FakeAudio {
    state: Arc<Mutex<AudioState>>,
}

impl FakeAudio {
    pub fn manual() -> Self {
        Self::default()
    }

    pub fn auto() -> Self {
        let audio = Self::default();
        audio.state.lock().unwrap().auto_finish = true;
        audio
    }

    pub fn plays(&self) -> usize {
        self.state.lock().unwrap().plays
    }

    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    /// Text of every clip played, assuming the fake backend's text-as-bytes audio.
    pub fn played(&self) -> Vec<String> {
        self.state.lock().unwrap().played.clone()
    }

    pub fn finish_current(&self, outcome: PlaybackOutcome) {
        let pending = self.state.lock().unwrap().pending.take();
        if let Some(done) = pending {
            done.finish(outcome);
        }
    }
}

pub struct FakeClip {
    state: Arc<Mutex<AudioState>>,
}

impl SpeechHandle for FakeClip {
    fn pause(&self) {
        self.state.lock().unwrap().paused = true;
    }

    fn resume(&self) {
        self.state.lock().unwrap().paused = false;
    }
}

impl Drop for FakeClip {
    fn drop(&mut self) {
        self.state.lock().unwrap().live -= 1;
    }
}

impl AudioOutput for FakeAudio {
    type Handle = FakeClip;

    fn play(&mut self, audio: Vec<u8>, done: Completion) -> Result<FakeClip, PlaybackError> {
        let mut state = self.state.lock().unwrap();
        state.plays += 1;
        state.live += 1;
        state.paused = false;
        state.played.push(String::from_utf8_lossy(&audio).into_owned());
        if state.auto_finish {
            done.finish(PlaybackOutcome::Ended);
        } else {
            state.pending = Some(done);
        }
        Ok(FakeClip {
            state: self.state.clone(),
        })
    }
}

// --- Video host ---

#[derive(Default)]
struct VideoState {
    auto_finish: bool,
    created: Vec<String>,
    live: usize,
    max_live: usize,
    paused: bool,
    pending: Option<Completion>,
}

#[derive(Clone, Default)]
pub struct FakeVideo {
    state: Arc<Mutex<VideoState>>,
}

impl FakeVideo {
    pub fn manual() -> Self {
        Self::default()
    }

    pub fn auto() -> Self {
        let video = Self::default();
        video.state.lock().unwrap().auto_finish = true;
        video
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    pub fn max_live(&self) -> usize {
        self.state.lock().unwrap().max_live
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    pub fn finish_current(&self) {
        let pending = self.state.lock().unwrap().pending.take();
        if let Some(done) = pending {
            done.finish(PlaybackOutcome::Ended);
        }
    }
}

pub struct FakePlayer {
    state: Arc<Mutex<VideoState>>,
}

impl VideoInstance for FakePlayer {
    fn pause(&self) {
        self.state.lock().unwrap().paused = true;
    }

    fn resume(&self) {
        self.state.lock().unwrap().paused = false;
    }
}

impl Drop for FakePlayer {
    fn drop(&mut self) {
        self.state.lock().unwrap().live -= 1;
    }
}

impl VideoHost for FakeVideo {
    type Instance = FakePlayer;

    fn create(&mut self, track: &MusicTrack, paused: bool, done: Completion) -> Result<FakePlayer, PlaybackError> {
        let mut state = self.state.lock().unwrap();
        state.created.push(track.id.clone());
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        state.paused = paused;
        if state.auto_finish {
            done.finish(PlaybackOutcome::Ended);
        } else {
            state.pending = Some(done);
        }
        Ok(FakePlayer {
            state: self.state.clone(),
        })
    }
}

// --- Location ---

/// Locator that always answers with the same result and counts reads.
pub struct FakeLocator {
    fix: Option<Fix>,
    reads: Mutex<usize>,
}

impl FakeLocator {
    pub fn denied() -> Self {
        Self {
            fix: None,
            reads: Mutex::new(0),
        }
    }

    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            fix: Some(Fix { lat, lng }),
            reads: Mutex::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        *self.reads.lock().unwrap()
    }
}

impl Locator for FakeLocator {
    async fn locate(&self) -> Result<Fix, LocateError> {
        *self.reads.lock().unwrap() += 1;
        self.fix.ok_or(LocateError::Denied)
    }
}
