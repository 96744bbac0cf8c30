//! Consumed services: weather, news, script and speech synthesis, music
//! search, routing and live position tracking.
//!
//! The orchestrator only sees the [`CommuteBackend`] trait; `http` talks to
//! the radio backend over HTTP.

pub mod http;

use std::future::Future;

use crate::config::VoiceRequest;
use crate::error::BackendError;
use crate::models::{MusicTrack, Narrator, NewsArticle, NewsItem, RouteResult, TrackPosition};

pub use http::HttpBackend;

pub trait CommuteBackend: Send + Sync + 'static {
    /// Free-text weather description.
    fn weather(&self) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Current headlines for `topics` (all sections when empty).
    fn news(
        &self,
        topics: &[String],
        page_size: usize,
    ) -> impl Future<Output = Result<Vec<NewsArticle>, BackendError>> + Send;

    fn greeting_script(
        &self,
        name: &str,
        narrator: Narrator,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// One narrated segment per item (roughly).
    fn news_segments(
        &self,
        items: &[NewsItem],
        narrator: Narrator,
    ) -> impl Future<Output = Result<Vec<String>, BackendError>> + Send;

    fn closing_script(&self, previous: &str) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Encoded audio for `text`.
    fn synthesize(
        &self,
        text: &str,
        voice: &VoiceRequest,
    ) -> impl Future<Output = Result<Vec<u8>, BackendError>> + Send;

    /// An empty list is a valid answer, not an error.
    fn search_music(&self, query: &str) -> impl Future<Output = Result<Vec<MusicTrack>, BackendError>> + Send;

    fn route(
        &self,
        origin: &str,
        destination: &str,
    ) -> impl Future<Output = Result<RouteResult, BackendError>> + Send;

    fn track_position(
        &self,
        route: &RouteResult,
        lat: f64,
        lng: f64,
    ) -> impl Future<Output = Result<TrackPosition, BackendError>> + Send;
}
