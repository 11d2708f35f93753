pub mod hltv;

pub use hltv::HltvExtractor;

use crate::fetch::Document;
use crate::models::{LiveMatch, MatchResult, Player, UpcomingMatch};

/// The tracked team's entry on the live-matches index, carrying the fields
/// only that page knows. Completing it into a [`LiveMatch`] needs a second
/// fetch of the match detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveMatchRef {
    pub opponent: String,
    /// Rounds on the current map, "ours-theirs".
    pub current_map_score: String,
    /// Maps taken in the series, "ours-theirs".
    pub maps_won: String,
    pub tournament: String,
    pub match_link: String,
}

/// Turns rendered documents into typed records.
///
/// Implementations are pure and stateless: no I/O, no clock beyond "what day
/// is it". Missing fields become the documented defaults ("Unknown", "TBA",
/// empty sequence) instead of errors.
pub trait Extractor: Send + Sync {
    fn roster(&self, doc: &Document) -> Vec<Player>;
    fn upcoming(&self, doc: &Document) -> Vec<UpcomingMatch>;
    fn results(&self, doc: &Document) -> Vec<MatchResult>;
    /// Locate the tracked team on the live-matches index page.
    fn live_ref(&self, matches_doc: &Document) -> Option<LiveMatchRef>;
    /// Complete the live state from the match detail page.
    fn live_detail(&self, match_doc: &Document, live: &LiveMatchRef) -> LiveMatch;
}
