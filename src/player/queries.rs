//! Music search phrases: the cyclic list, the fallback, and the weather/mood
//! heuristics used for the opening track.
//!
//! Phrases are short keyword queries ("genre + playlist/mix"), which search
//! far better than descriptive sentences.

use chrono::Weekday;

pub const MUSIC_SEARCH_PHRASES: [&str; 10] = [
    "morning pop playlist",
    "city pop mix",
    "chill indie morning",
    "wake up rock playlist",
    "rainy day jazz",
    "weekend morning jazz",
    "dance pop hits",
    "piano instrumental",
    "chill electronic music",
    "classical piano morning",
];

pub const FALLBACK_MUSIC_QUERY: &str = "chill pop music";

pub fn phrase_at(index: usize) -> &'static str {
    MUSIC_SEARCH_PHRASES[index % MUSIC_SEARCH_PHRASES.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicQuery {
    pub query: &'static str,
    pub concept: &'static str,
}

fn is_rainy(weather: &str) -> bool {
    weather.contains('비') || weather.contains('눈') || weather.contains("소나기")
}

fn is_clear(weather: &str) -> bool {
    weather.contains("맑음") || weather.contains("맑은")
}

/// Opening-track query from the weather text and how much news there is today.
pub fn query_for_weather(weather: &str, news_count: usize, weekday: Weekday) -> MusicQuery {
    let weather = weather.to_lowercase();

    if is_rainy(&weather) {
        return MusicQuery {
            query: "rainy day jazz playlist",
            concept: "창밖으로 흐르는 빗물과 딱 어울리는 촉촉한 목소리를 준비했습니다.",
        };
    }

    if is_clear(&weather) {
        return MusicQuery {
            query: "morning city pop playlist",
            concept: "오늘 날씨 정말 좋네요! 눈부신 햇살처럼 반짝이는 리듬입니다.",
        };
    }

    if news_count >= 3 {
        match weekday {
            Weekday::Sun => {
                return MusicQuery {
                    query: "upbeat pop morning playlist",
                    concept: "내일 월요일이지만, 이 노래라면 발걸음이 가벼워질 거예요.",
                }
            }
            Weekday::Fri => {
                return MusicQuery {
                    query: "friday dance pop mix",
                    concept: "벌써 금요일입니다! 오늘만 버티면 주말이라는 설렘을 담았습니다.",
                }
            }
            _ => {}
        }
    }

    MusicQuery {
        query: "morning pop playlist",
        concept: "눈이 번쩍 뜨일 만한 강력한 사운드로 아침을 시작해볼까요?",
    }
}

/// Mood phrase shown in the preview and used in the song intro.
pub fn mood_for(weather: &str, weekday: Weekday) -> &'static str {
    let weather = weather.to_lowercase();
    if is_clear(&weather) {
        if matches!(weekday, Weekday::Sat | Weekday::Sun) {
            "잔잔한 모닝 카페"
        } else {
            "상쾌한 아침 에너지"
        }
    } else if weather.contains('비') || weather.contains("소나기") {
        "비 오는 날의 따뜻함"
    } else if weather.contains('눈') {
        "겨울 아침의 고요함"
    } else {
        "편안한 출근길"
    }
}

pub fn query_for_mood(mood: &str) -> String {
    match mood {
        "잔잔한 모닝 카페" => "morning coffee jazz playlist".into(),
        "상쾌한 아침 에너지" => "morning pop playlist".into(),
        "비 오는 날의 따뜻함" => "rainy day jazz".into(),
        "겨울 아침의 고요함" => "calm winter piano".into(),
        "편안한 출근길" => "chill morning music".into(),
        other => format!("{other} music"),
    }
}

/// Narration played right before the opening track.
pub fn song_intro_text(title: Option<&str>, mood: Option<&str>) -> String {
    match (title.filter(|t| !t.is_empty()), mood.filter(|m| !m.is_empty())) {
        (Some(title), Some(mood)) => format!("{mood}에 어울리는 {title}, 듣고 오시죠~"),
        (Some(title), None) => format!("오늘 추천 곡, {title}. 듣고 오시죠~"),
        (None, _) => String::new(),
    }
}
