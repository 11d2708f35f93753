use std::fmt;

use chrono::NaiveDate;

/// Hard cap on published upcoming matches.
pub const MAX_UPCOMING: usize = 5;
/// Hard cap on published recent results.
pub const MAX_RESULTS: usize = 3;
/// Hard cap on stream links carried by a live match.
pub const MAX_STREAMS: usize = 3;

/// A roster entry scraped from the team info page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub image_url: Option<String>,
}

/// When an upcoming match is played, as the team page presents it.
///
/// `Unknown` covers rows with no usable date; they are treated as potential
/// same-day matches by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateLabel {
    Today,
    Tomorrow,
    On(NaiveDate),
    Unknown,
}

impl DateLabel {
    /// Whether this date should put the scheduler on match-day alert.
    pub fn is_today_candidate(&self) -> bool {
        matches!(self, DateLabel::Today | DateLabel::Unknown)
    }
}

impl fmt::Display for DateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateLabel::Today => write!(f, "today"),
            DateLabel::Tomorrow => write!(f, "tomorrow"),
            DateLabel::On(d) => write!(f, "{}", d.format("%d/%m/%y")),
            DateLabel::Unknown => write!(f, "TBA"),
        }
    }
}

/// A scheduled match from the team's match table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingMatch {
    pub date: DateLabel,
    /// "HH:MM" or "TBA" when the page carries no time.
    pub time: String,
    pub opponent: String,
    pub tournament: String,
}

/// A finished match from the team's match table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// "A:B" as displayed, our team first.
    pub score: String,
    pub opponent: String,
    pub tournament: String,
    pub victory: bool,
}

/// Best-of series format of a live match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesFormat {
    Bo1,
    Bo3,
    Bo5,
    Unknown,
}

impl fmt::Display for SeriesFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesFormat::Bo1 => write!(f, "bo1"),
            SeriesFormat::Bo3 => write!(f, "bo3"),
            SeriesFormat::Bo5 => write!(f, "bo5"),
            SeriesFormat::Unknown => write!(f, "unknown"),
        }
    }
}

/// Fully extracted state of the tracked team's live match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveMatch {
    pub opponent: String,
    /// Rounds on the current map, "ours-theirs".
    pub current_map_score: String,
    /// Maps taken in the series, "ours-theirs".
    pub maps_won: String,
    pub tournament: String,
    pub format: SeriesFormat,
    pub match_link: String,
    pub veto_details: Vec<String>,
    /// At most [`MAX_STREAMS`] links, highest viewer count first.
    pub stream_links: Vec<String>,
}
