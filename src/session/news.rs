//! News refresh: fetch current headlines and narrate the first `radio_ratio`.

use tracing::{info, warn};

use crate::backend::CommuteBackend;
use crate::error::BackendError;
use crate::models::{NewsArticle, NewsItem, SessionConfig};

/// Page size used when no topics are selected.
const MIN_PAGE_SIZE: usize = 3;

pub fn page_size(config: &SessionConfig) -> usize {
    (config.radio_ratio as usize).max(MIN_PAGE_SIZE)
}

/// The headlines handed to segment synthesis.
pub fn news_items(articles: &[NewsArticle], radio_ratio: u32) -> Vec<NewsItem> {
    articles
        .iter()
        .take(radio_ratio as usize)
        .map(NewsItem::from)
        .collect()
}

pub async fn fetch_segments<B: CommuteBackend>(
    backend: &B,
    config: &SessionConfig,
) -> Result<Vec<String>, BackendError> {
    let articles = backend.news(&config.topics, page_size(config)).await?;
    let items = news_items(&articles, config.radio_ratio);
    backend.news_segments(&items, config.narrator).await
}

/// Fresh narrated segments, or `None` when anything along the way failed.
pub async fn refresh<B: CommuteBackend>(backend: &B, config: &SessionConfig) -> Option<Vec<String>> {
    match fetch_segments(backend, config).await {
        Ok(segments) => {
            info!("Refreshed news: {} segments", segments.len());
            Some(segments)
        }
        Err(e) => {
            warn!("News refresh failed, keeping previous segments: {e}");
            None
        }
    }
}
