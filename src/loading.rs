//! Session preparation: everything that has to exist before the first word is
//! spoken. Steps run in order with a fixed pacing delay after each.

use std::time::Duration;

use chrono::Weekday;
use tracing::{debug, error, info, warn};

use crate::backend::CommuteBackend;
use crate::error::{BackendError, LoadingError};
use crate::models::{MusicTrack, RadioScripts, SessionConfig};
use crate::player::queries::{mood_for, query_for_mood, query_for_weather};
use crate::session::news::{news_items, page_size};
use crate::session::Opening;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStep {
    Weather,
    News,
    Greeting,
    Segments,
    FirstTrack,
}

impl LoadingStep {
    pub fn message(self) -> &'static str {
        match self {
            Self::Weather => "회사 근처 날씨를 확인하는 중이에요",
            Self::News => "뉴스를 스캔하는 중이에요",
            Self::Greeting => "인사말 대본을 만드는 중이에요",
            Self::Segments => "뉴스 멘트를 만드는 중이에요",
            Self::FirstTrack => "첫 곡을 선곡하는 중이에요",
        }
    }
}

impl std::fmt::Display for LoadingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Scripts and opening context for a new session.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub scripts: RadioScripts,
    pub opening: Opening,
}

pub async fn prepare<B: CommuteBackend>(
    backend: &B,
    config: &SessionConfig,
    pacing: Duration,
    weekday: Weekday,
) -> Result<Prepared, LoadingError> {
    let weather = paced(LoadingStep::Weather, pacing, backend.weather()).await?;
    debug!("Weather: {weather}");

    let articles = paced(LoadingStep::News, pacing, backend.news(&config.topics, page_size(config))).await?;

    let greeting = paced(
        LoadingStep::Greeting,
        pacing,
        backend.greeting_script(&config.name, config.narrator),
    )
    .await?;

    let items = news_items(&articles, config.radio_ratio);
    let segments = paced(
        LoadingStep::Segments,
        pacing,
        backend.news_segments(&items, config.narrator),
    )
    .await?;

    info!("{}", LoadingStep::FirstTrack);
    let mood = mood_for(&weather, weekday);
    let track = preview_track(backend, &weather, mood, weekday).await;
    tokio::time::sleep(pacing).await;

    let scripts = RadioScripts::new(greeting, segments);
    info!(
        "Ready: {} news segments, opening track {}",
        scripts.news.len(),
        track.as_ref().map_or("to be searched", |t| t.title.as_str())
    );

    Ok(Prepared {
        scripts,
        opening: Opening {
            track,
            mood: Some(mood.to_string()),
            weather,
            news_count: articles.len(),
            weekday,
        },
    })
}

async fn paced<T>(
    step: LoadingStep,
    pacing: Duration,
    request: impl std::future::Future<Output = Result<T, BackendError>>,
) -> Result<T, LoadingError> {
    info!("{step}");
    let value = request.await.map_err(|source| {
        error!("Loading failed at {step:?}: {source}");
        LoadingError { step, source }
    })?;
    tokio::time::sleep(pacing).await;
    Ok(value)
}

/// First hit of the mood query, else first hit of the weather query.
async fn preview_track<B: CommuteBackend>(
    backend: &B,
    weather: &str,
    mood: &str,
    weekday: Weekday,
) -> Option<MusicTrack> {
    let mood_query = query_for_mood(mood);
    match backend.search_music(&mood_query).await {
        Ok(results) if !results.is_empty() => return results.into_iter().next(),
        Ok(_) => debug!("No preview results for \"{mood_query}\""),
        Err(e) => warn!("Preview search failed: {e}"),
    }

    let fallback = query_for_weather(weather, 0, weekday);
    match backend.search_music(fallback.query).await {
        Ok(results) => results.into_iter().next(),
        Err(e) => {
            warn!("Preview fallback search failed: {e}");
            None
        }
    }
}
