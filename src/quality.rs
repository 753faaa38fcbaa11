//! Quality classification.
//!
//! Maps heterogeneous signals (explicit pixel height, advertised bandwidth,
//! free-text labels and URLs) to one canonical, totally ordered [`Quality`].
//! Classification is a pure function: no I/O, same input, same output.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical stream quality, ordered `Unknown < P240 < ... < Uhd4k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "240p")]
    P240,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "4k")]
    Uhd4k,
}

/// Bandwidth floors in bits per second, highest first.
const BANDWIDTH_BUCKETS: [(u64, Quality); 6] = [
    (15_000_000, Quality::Uhd4k),
    (8_000_000, Quality::P1440),
    (5_000_000, Quality::P1080),
    (2_500_000, Quality::P720),
    (1_200_000, Quality::P480),
    (800_000, Quality::P360),
];

/// Numeric text patterns, tried in order. Group 1 is the height.
static TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:^|\D)(\d{3,4})p",
        r"(?i)(?:^|\D)(\d{3,4})k",
        r"(?i)quality[_-]?(\d{3,4})",
        r"(?i)res[_-]?(\d{3,4})",
        r"(?i)(?:^|\D)\d{3,4}x(\d{3,4})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static quality pattern"))
    .collect()
});

static UHD_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9])(?:4k|uhd)(?:$|[^a-z0-9])").expect("static uhd pattern")
});

const MIN_TEXT_HEIGHT: u32 = 240;
const MAX_TEXT_HEIGHT: u32 = 4320;

impl Quality {
    /// All qualities, best first.
    pub const ALL: [Quality; 8] = [
        Quality::Uhd4k,
        Quality::P1440,
        Quality::P1080,
        Quality::P720,
        Quality::P480,
        Quality::P360,
        Quality::P240,
        Quality::Unknown,
    ];

    /// Classify from whatever signals are available.
    ///
    /// Priority: explicit height, then bandwidth, then text patterns
    /// (label before URL), then `Unknown`.
    pub fn classify(hints: &QualityHints<'_>) -> Quality {
        if let Some(height) = hints.height.filter(|h| *h > 0) {
            return Self::from_height(height);
        }
        if let Some(bandwidth) = hints.bandwidth.filter(|b| *b > 0) {
            return Self::from_bandwidth(bandwidth);
        }
        hints
            .label
            .into_iter()
            .chain(hints.url)
            .find_map(Self::from_text)
            .unwrap_or(Quality::Unknown)
    }

    /// Map a pixel height through the fixed breakpoints.
    pub fn from_height(height: u32) -> Quality {
        match height {
            h if h >= 2160 => Quality::Uhd4k,
            h if h >= 1440 => Quality::P1440,
            h if h >= 1080 => Quality::P1080,
            h if h >= 720 => Quality::P720,
            h if h >= 480 => Quality::P480,
            h if h >= 360 => Quality::P360,
            _ => Quality::P240,
        }
    }

    /// Map an advertised bandwidth (bits/sec) through the fixed buckets.
    pub fn from_bandwidth(bandwidth: u64) -> Quality {
        BANDWIDTH_BUCKETS
            .iter()
            .find(|(floor, _)| bandwidth >= *floor)
            .map_or(Quality::P240, |(_, q)| *q)
    }

    /// Scan free text (a label or a URL). `None` if no pattern matches.
    pub fn from_text(text: &str) -> Option<Quality> {
        for pattern in TEXT_PATTERNS.iter() {
            let height = pattern
                .captures_iter(text)
                .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
                .find(|h| (MIN_TEXT_HEIGHT..=MAX_TEXT_HEIGHT).contains(h));
            if let Some(h) = height {
                return Some(Self::from_height(h));
            }
        }

        UHD_KEYWORD.is_match(text).then_some(Quality::Uhd4k)
    }

    /// Short display label (`"1080p"`, `"4K"`, `"Unknown"`).
    pub fn label(self) -> &'static str {
        match self {
            Quality::Uhd4k => "4K",
            Quality::P1440 => "1440p",
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
            Quality::P240 => "240p",
            Quality::Unknown => "Unknown",
        }
    }

    /// Descending order helper for `sort_by`.
    pub fn cmp_desc(a: &Quality, b: &Quality) -> Ordering {
        b.cmp(a)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Signals available for one stream. Every field is optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityHints<'a> {
    pub height: Option<u32>,
    pub bandwidth: Option<u64>,
    pub label: Option<&'a str>,
    pub url: Option<&'a str>,
}

impl<'a> QualityHints<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    #[must_use]
    pub fn bandwidth(mut self, bandwidth: u64) -> Self {
        self.bandwidth = Some(bandwidth);
        self
    }

    #[must_use]
    pub fn label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    #[must_use]
    pub fn url(mut self, url: &'a str) -> Self {
        self.url = Some(url);
        self
    }
}
