//! HTTP client for the radio backend API.
//!
//! Non-success responses carry a JSON body with a `detail` field; that text
//! becomes the error detail. The news-segments endpoint may still return
//! usable fallback `scripts` alongside an error status.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::CommuteBackend;
use crate::config::{BackendConfig, VoiceRequest};
use crate::error::BackendError;
use crate::models::{MusicTrack, Narrator, NewsArticle, NewsItem, RouteResult, TrackPosition};

const DEFAULT_NEWS_SEGMENT: &str = "오늘의 뉴스입니다.";

#[derive(Deserialize)]
struct WeatherResponse {
    weather_text: String,
}

#[derive(Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

#[derive(Deserialize)]
struct ScriptResponse {
    script: String,
}

#[derive(Deserialize)]
struct SegmentsResponse {
    scripts: Option<Vec<String>>,
    script: Option<String>,
}

#[derive(Deserialize)]
struct MusicSearchResponse {
    #[serde(default)]
    videos: Vec<MusicTrack>,
}

pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| BackendError::Http {
                endpoint: "client",
                source,
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let resp = self
            .client
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await
            .map_err(|source| BackendError::Http { endpoint, source })?;
        decode(endpoint, check_status(endpoint, resp).await?).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        body: serde_json::Value,
    ) -> Result<T, BackendError> {
        let resp = self.post(endpoint, body).await?;
        decode(endpoint, check_status(endpoint, resp).await?).await
    }

    async fn post(&self, endpoint: &'static str, body: serde_json::Value) -> Result<Response, BackendError> {
        self.client
            .post(self.url(endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Http { endpoint, source })
    }
}

async fn check_status(endpoint: &'static str, resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    Err(BackendError::Status {
        endpoint,
        status: status.as_u16(),
        detail: error_detail(&body, status.canonical_reason().unwrap_or("request failed")),
    })
}

async fn decode<T: DeserializeOwned>(endpoint: &'static str, resp: Response) -> Result<T, BackendError> {
    resp.json::<T>().await.map_err(|e| BackendError::Malformed {
        endpoint,
        detail: e.to_string(),
    })
}

fn error_detail(body: &serde_json::Value, fallback: &str) -> String {
    body["detail"].as_str().unwrap_or(fallback).to_string()
}

/// Query parameters for `/news`: one article per selected section, or a page of everything.
fn news_query(topics: &[String], page_size: usize) -> Vec<(&'static str, String)> {
    if topics.is_empty() {
        vec![("section", "all".into()), ("page_size", page_size.to_string())]
    } else {
        vec![("sections", topics.join(",")), ("per_section", "1".into())]
    }
}

impl CommuteBackend for HttpBackend {
    async fn weather(&self) -> Result<String, BackendError> {
        let resp: WeatherResponse = self.get_json("/weather", &[]).await?;
        Ok(resp.weather_text)
    }

    async fn news(&self, topics: &[String], page_size: usize) -> Result<Vec<NewsArticle>, BackendError> {
        let resp: NewsResponse = self.get_json("/news", &news_query(topics, page_size)).await?;
        debug!("Fetched {} articles", resp.articles.len());
        Ok(resp.articles)
    }

    async fn greeting_script(&self, name: &str, narrator: Narrator) -> Result<String, BackendError> {
        let body = json!({
            "user_name": name,
            "dj_name": narrator.display_name(),
        });
        let resp: ScriptResponse = self.post_json("/radio-script/greeting", body).await?;
        Ok(resp.script)
    }

    async fn news_segments(&self, items: &[NewsItem], narrator: Narrator) -> Result<Vec<String>, BackendError> {
        const ENDPOINT: &str = "/radio-script/news-segments";
        let mut body = json!({ "dj_name": narrator.display_name() });
        if !items.is_empty() {
            body["news_items"] = json!(items);
        }

        let resp = self.post(ENDPOINT, body).await?;
        let status = resp.status();
        if !status.is_success() {
            let err: serde_json::Value = resp.json().await.unwrap_or_default();
            if let Some(scripts) = err["scripts"].as_array().filter(|s| !s.is_empty()) {
                warn!("News segment synthesis failed ({status}), using fallback scripts");
                return Ok(scripts
                    .iter()
                    .filter_map(|s| s.as_str().map(str::to_string))
                    .collect());
            }
            return Err(BackendError::Status {
                endpoint: ENDPOINT,
                status: status.as_u16(),
                detail: error_detail(&err, "news segment synthesis failed"),
            });
        }

        let data: SegmentsResponse = decode(ENDPOINT, resp).await?;
        Ok(match (data.scripts, data.script) {
            (Some(scripts), _) => scripts,
            (None, script) => vec![script.unwrap_or_else(|| DEFAULT_NEWS_SEGMENT.to_string())],
        })
    }

    async fn closing_script(&self, previous: &str) -> Result<String, BackendError> {
        let body = json!({ "previous_script": previous });
        let resp: ScriptResponse = self.post_json("/radio-script/closing", body).await?;
        Ok(resp.script)
    }

    async fn synthesize(&self, text: &str, voice: &VoiceRequest) -> Result<Vec<u8>, BackendError> {
        const ENDPOINT: &str = "/tts";
        let body = json!({
            "text": text,
            "speaker": voice.speaker,
            "speed": voice.speed,
            "volume": voice.volume,
            "pitch": voice.pitch,
            "format": voice.format,
        });
        let resp = check_status(ENDPOINT, self.post(ENDPOINT, body).await?).await?;
        let bytes = resp.bytes().await.map_err(|source| BackendError::Http {
            endpoint: ENDPOINT,
            source,
        })?;
        debug!("Synthesized {} chars into {} bytes", text.chars().count(), bytes.len());
        Ok(bytes.to_vec())
    }

    async fn search_music(&self, query: &str) -> Result<Vec<MusicTrack>, BackendError> {
        let params = [("q", query.to_string()), ("source", "youtube".to_string())];
        let resp: MusicSearchResponse = self.get_json("/music/search", &params).await?;
        Ok(resp.videos)
    }

    async fn route(&self, origin: &str, destination: &str) -> Result<RouteResult, BackendError> {
        let body = json!({
            "start": origin.trim(),
            "end": destination.trim(),
            "opt": 0,
        });
        self.post_json("/nav/route", body).await
    }

    async fn track_position(&self, route: &RouteResult, lat: f64, lng: f64) -> Result<TrackPosition, BackendError> {
        let body = json!({
            "route": route,
            "lat": lat,
            "lng": lng,
        });
        self.post_json("/nav/track", body).await
    }
}
