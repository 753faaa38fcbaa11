//! Best-match selection over a host's search results.
//!
//! Score = normalized-title word overlap in `[0, 1]`, plus a year-proximity
//! adjustment, plus a small media-type bonus. The highest score at or above
//! the threshold wins; otherwise a stricter containment match is tried.

use std::collections::HashSet;

use tracing::debug;

use crate::stream::{SearchHit, TitleInfo};

pub const DEFAULT_THRESHOLD: f64 = 0.3;

const EXACT_YEAR_BONUS: f64 = 0.2;
const NEAR_YEAR_BONUS: f64 = 0.1;
const DISTANT_YEAR_PENALTY: f64 = -0.3;
const MEDIA_TYPE_BONUS: f64 = 0.05;

/// Lowercase, turn punctuation into spaces, collapse whitespace.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else if c == '\'' {
                // "Ocean's" and "Oceans" should compare equal
                '\0'
            } else {
                ' '
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word overlap of two titles: 1.0 when equal after normalization,
/// otherwise distinct shared words divided by the larger distinct word count.
#[allow(clippy::cast_precision_loss)]
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_title(a);
    let b = normalize_title(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let a_words: HashSet<&str> = a.split(' ').collect();
    let b_words: HashSet<&str> = b.split(' ').collect();
    let shared = a_words.intersection(&b_words).count();
    let larger = a_words.len().max(b_words.len());

    shared as f64 / larger as f64
}

/// Year proximity adjustment. Unknown years are neutral.
pub fn year_adjustment(target: Option<i32>, candidate: Option<i32>) -> f64 {
    match (target, candidate) {
        (Some(t), Some(c)) => match (t - c).abs() {
            0 => EXACT_YEAR_BONUS,
            1 => NEAR_YEAR_BONUS,
            d if d > 5 => DISTANT_YEAR_PENALTY,
            _ => 0.0,
        },
        _ => 0.0,
    }
}

/// Full score of one hit against the target title.
pub fn score_hit(target: &TitleInfo, hit: &SearchHit) -> f64 {
    let type_bonus = if hit.media_type == Some(target.media_type) {
        MEDIA_TYPE_BONUS
    } else {
        0.0
    };
    title_similarity(&target.title, &hit.title) + year_adjustment(target.year, hit.year) + type_bonus
}

/// Pick the best hit, or `None` if nothing is close enough.
///
/// Ties go to the earlier hit.
pub fn select_best_match<'a>(
    target: &TitleInfo,
    hits: &'a [SearchHit],
    threshold: f64,
) -> Option<&'a SearchHit> {
    let mut best: Option<(&SearchHit, f64)> = None;
    for hit in hits {
        let score = score_hit(target, hit);
        debug!("Match score {score:.2} for '{}' ({:?})", hit.title, hit.year);
        if score >= threshold && best.is_none_or(|(_, s)| score > s) {
            best = Some((hit, score));
        }
    }

    if let Some((hit, score)) = best {
        debug!("Selected '{}' with score {score:.2}", hit.title);
        return Some(hit);
    }

    let wanted = normalize_title(&target.title);
    if wanted.is_empty() {
        return None;
    }
    let fallback = hits.iter().find(|hit| {
        let title = normalize_title(&hit.title);
        title == wanted || contains_words(&title, &wanted)
    });
    if let Some(hit) = fallback {
        debug!("Selected '{}' by containment fallback", hit.title);
    }
    fallback
}

/// `haystack` contains `needle` as a whole-word sequence.
fn contains_words(haystack: &str, needle: &str) -> bool {
    format!(" {haystack} ").contains(&format!(" {needle} "))
}
