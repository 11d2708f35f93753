//! Selector logic for HLTV.org pages.
//!
//! Layout knowledge lives here and nowhere else. The team page carries the
//! roster grid plus one match table per tournament: each `thead` with an
//! event-header link is followed by the `tbody` holding that tournament's
//! rows. A row whose score cell is the "- : -" placeholder is an upcoming
//! match; numeric scores are finished results. The live-matches index tags
//! each entry with `team1`/`team2` id attributes, and the match detail page
//! contributes the series format, the veto history, and the stream links.

use chrono::{Local, NaiveDate, TimeZone};
use scraper::{ElementRef, Html, Selector};

use super::{Extractor, LiveMatchRef};
use crate::fetch::Document;
use crate::models::{DateLabel, LiveMatch, MatchResult, Player, SeriesFormat, UpcomingMatch};

const UNKNOWN: &str = "Unknown";
const TBA: &str = "TBA";

pub struct HltvExtractor {
    team_code: String,
    base_url: String,
}

impl HltvExtractor {
    pub fn new(team_code: impl Into<String>, base_url: impl Into<String>) -> Self {
        HltvExtractor {
            team_code: team_code.into(),
            base_url: base_url.into(),
        }
    }

    /// Date-parameterized variant of [`Extractor::upcoming`] so tests are
    /// not tied to the wall clock.
    pub fn upcoming_on(&self, doc: &Document, today: NaiveDate) -> Vec<UpcomingMatch> {
        let html = Html::parse_document(doc.html());
        let mut matches = Vec::new();

        for_each_tournament_row(&html, |tournament, row| {
            let score = row_score(row);
            if !is_score_placeholder(&score) {
                return;
            }

            let opponent = row_opponent(row).unwrap_or_else(|| UNKNOWN.to_string());
            let (date, time) = match row_unix_millis(row) {
                Some(ms) => date_and_time_from_unix(ms, today)
                    .unwrap_or((DateLabel::Unknown, TBA.to_string())),
                None => {
                    let cell = row_date_text(row);
                    if looks_like_time(&cell) {
                        // a bare HH:MM cell means the match is today
                        (DateLabel::Today, cell)
                    } else {
                        (DateLabel::Unknown, TBA.to_string())
                    }
                }
            };

            matches.push(UpcomingMatch {
                date,
                time,
                opponent,
                tournament: tournament.to_string(),
            });
        });

        matches
    }
}

impl Extractor for HltvExtractor {
    fn roster(&self, doc: &Document) -> Vec<Player> {
        let html = Html::parse_document(doc.html());
        let primary = sel("div.bodyshot-team.g-grid a");
        let fallback = sel("div.team-roster a.col-custom");

        let mut anchors: Vec<ElementRef> = html.select(&primary).collect();
        if anchors.is_empty() {
            anchors = html.select(&fallback).collect();
        }

        let name_sel = sel("div.text-ellipsis.nickname-container span.text-ellipsis.bold");
        let name_fallback = sel("div.nickname");
        let frame_img = sel("div.overlayImageFrame img");
        let bodyshot_img = sel("img.bodyshot-team-img");

        let mut players = Vec::new();
        for anchor in anchors {
            let name = first_text(anchor, &name_sel)
                .or_else(|| first_text(anchor, &name_fallback))
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }

            let image_url = anchor
                .select(&frame_img)
                .next()
                .and_then(|img| {
                    img.value()
                        .attr("src")
                        .filter(|s| !s.is_empty())
                        .or_else(|| img.value().attr("data-src"))
                })
                .or_else(|| {
                    anchor
                        .select(&bodyshot_img)
                        .next()
                        .and_then(|img| img.value().attr("src"))
                })
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            players.push(Player { name, image_url });
        }
        players
    }

    fn upcoming(&self, doc: &Document) -> Vec<UpcomingMatch> {
        self.upcoming_on(doc, Local::now().date_naive())
    }

    fn results(&self, doc: &Document) -> Vec<MatchResult> {
        let html = Html::parse_document(doc.html());
        let lost_sel = sel(".team-flex.team-1.lost");
        let mut results = Vec::new();

        for_each_tournament_row(&html, |tournament, row| {
            let score = row_score(row);
            if score.is_empty() || is_score_placeholder(&score) || !score.contains(':') {
                return;
            }
            let opponent = match row_opponent(row) {
                Some(o) => o,
                None => return,
            };
            // HLTV marks the losing side's flex container with "lost"
            let victory = row.select(&lost_sel).next().is_none();

            results.push(MatchResult {
                score,
                opponent,
                tournament: tournament.to_string(),
                victory,
            });
        });

        results
    }

    fn live_ref(&self, matches_doc: &Document) -> Option<LiveMatchRef> {
        let html = Html::parse_document(matches_doc.html());
        let wrapper = sel("div.match-wrapper.live-match-container");
        let event = sel("div.match-event.text-ellipsis");
        let link = sel("a.match-top");

        for entry in html.select(&wrapper) {
            let team1 = entry.value().attr("team1").unwrap_or("");
            let team2 = entry.value().attr("team2").unwrap_or("");
            if team1 != self.team_code && team2 != self.team_code {
                continue;
            }
            let opponent_id = if team1 == self.team_code { team2 } else { team1 };

            // team name boxes appear in team1/team2 order
            let teamname = sel("div.match-team .match-teamname");
            let opponent_index = if team1 == self.team_code { 1 } else { 0 };
            let opponent = entry
                .select(&teamname)
                .nth(opponent_index)
                .map(text_of)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string());

            let current_map_score = format!(
                "{}-{}",
                live_span(entry, "span.current-map-score", &self.team_code),
                live_span(entry, "span.current-map-score", opponent_id),
            );
            let maps_won = format!(
                "{}-{}",
                live_span(entry, "span[data-livescore-maps-won-for]", &self.team_code),
                live_span(entry, "span[data-livescore-maps-won-for]", opponent_id),
            );

            let tournament = first_text(entry, &event).unwrap_or_else(|| UNKNOWN.to_string());
            let match_link = entry
                .select(&link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| format!("{}{}", self.base_url, href))
                .unwrap_or_default();

            return Some(LiveMatchRef {
                opponent,
                current_map_score,
                maps_won,
                tournament,
                match_link,
            });
        }
        None
    }

    fn live_detail(&self, match_doc: &Document, live: &LiveMatchRef) -> LiveMatch {
        let html = Html::parse_document(match_doc.html());

        let format_sel = sel("div.standard-box.veto-box .padding.preformatted-text");
        let format = html
            .select(&format_sel)
            .next()
            .map(|el| series_format(&text_of(el)))
            .unwrap_or(SeriesFormat::Unknown);

        let veto_sel = sel("div.standard-box.veto-box .padding div");
        let veto_details: Vec<String> = html
            .select(&veto_sel)
            .map(text_of)
            .filter(|t| !t.is_empty())
            .collect();

        let stream_links = top_stream_links(&html);

        LiveMatch {
            opponent: live.opponent.clone(),
            current_map_score: live.current_map_score.clone(),
            maps_won: live.maps_won.clone(),
            tournament: live.tournament.clone(),
            format,
            match_link: live.match_link.clone(),
            veto_details,
            stream_links,
        }
    }
}

// --------------------------------------------------------------------------
// Page walking helpers
// --------------------------------------------------------------------------

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).unwrap()
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
}

/// Walk every match-table row, pairing each `tbody` with the tournament
/// named by the preceding event-header `thead`. Headers without a
/// tournament link do not consume a body.
fn for_each_tournament_row<'a>(html: &'a Html, mut visit: impl FnMut(&str, ElementRef<'a>)) {
    let container = sel(".table-container.match-table");
    let table_fallback = sel("table.match-table");
    let thead = sel("thead");
    let tbody = sel("tbody");
    let header_link = sel("tr.event-header-cell th.text-ellipsis a");
    let team_row = sel("tr.team-row");

    let mut tables: Vec<ElementRef> = html.select(&container).collect();
    if tables.is_empty() {
        tables = html.select(&table_fallback).collect();
    }

    for table in tables {
        let headers: Vec<ElementRef> = table.select(&thead).collect();
        let bodies: Vec<ElementRef> = table.select(&tbody).collect();
        let mut body_index = 0;

        for header in headers {
            if body_index >= bodies.len() {
                break;
            }
            let tournament = match first_text(header, &header_link) {
                Some(t) => t,
                None => continue,
            };
            for row in bodies[body_index].select(&team_row) {
                visit(&tournament, row);
            }
            body_index += 1;
        }
    }
}

fn row_score(row: ElementRef) -> String {
    first_text(row, &sel(".score-cell"))
        .or_else(|| first_text(row, &sel("div.score-cell")))
        .unwrap_or_default()
}

/// "- : -" (in any spacing) marks a match that has not been played yet.
fn is_score_placeholder(score: &str) -> bool {
    match score.split_once(':') {
        Some((a, b)) => a.trim() == "-" && b.trim() == "-",
        None => false,
    }
}

fn row_opponent(row: ElementRef) -> Option<String> {
    first_text(row, &sel(".team-name.team-2"))
        .or_else(|| first_text(row, &sel(".team-flex:not(.team-1) .team-name")))
}

fn row_date_text(row: ElementRef) -> String {
    first_text(row, &sel("td.date-cell span"))
        .or_else(|| first_text(row, &sel("td.date-cell")))
        .unwrap_or_default()
}

fn row_unix_millis(row: ElementRef) -> Option<i64> {
    let span_unix = sel("td.date-cell span[data-unix]");
    let cell = sel("td.date-cell");
    row.select(&span_unix)
        .next()
        .and_then(|el| el.value().attr("data-unix"))
        .or_else(|| {
            row.select(&cell)
                .next()
                .and_then(|el| el.value().attr("data-unix"))
        })
        .and_then(|raw| raw.parse().ok())
}

/// Millisecond timestamp -> (date label, "HH:MM") in local time.
fn date_and_time_from_unix(ms: i64, today: NaiveDate) -> Option<(DateLabel, String)> {
    let dt = Local.timestamp_millis_opt(ms).single()?;
    let date = dt.date_naive();
    let time = dt.format("%H:%M").to_string();
    let label = if date == today {
        DateLabel::Today
    } else if Some(date) == today.succ_opt() {
        DateLabel::Tomorrow
    } else {
        DateLabel::On(date)
    };
    Some((label, time))
}

fn looks_like_time(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 5
        && b[2] == b':'
        && [b[0], b[1], b[3], b[4]].iter().all(u8::is_ascii_digit)
}

/// One side of a live score pair; "0" when the span is absent or empty.
fn live_span(entry: ElementRef, span: &str, team_id: &str) -> String {
    Selector::parse(&format!("{span}[data-livescore-team='{team_id}']"))
        .ok()
        .and_then(|s| first_text(entry, &s))
        .unwrap_or_else(|| "0".to_string())
}

fn series_format(veto_text: &str) -> SeriesFormat {
    let lower = veto_text.to_lowercase();
    if lower.contains("best of 1") {
        SeriesFormat::Bo1
    } else if lower.contains("best of 3") {
        SeriesFormat::Bo3
    } else if lower.contains("best of 5") {
        SeriesFormat::Bo5
    } else {
        SeriesFormat::Unknown
    }
}

/// Stream links sorted by viewer count descending, capped at
/// [`crate::models::MAX_STREAMS`].
fn top_stream_links(html: &Html) -> Vec<String> {
    let stream_box = sel("div.stream-box");
    let viewers_sel = sel("span.viewers");
    let href_sel = sel("a[href]");

    let mut streams: Vec<(i64, String)> = html
        .select(&stream_box)
        .filter_map(|stream| {
            let href = stream
                .select(&href_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .filter(|h| !h.is_empty())?;
            let viewers = first_text(stream, &viewers_sel)
                .map(|t| t.chars().filter(char::is_ascii_digit).collect::<String>())
                .and_then(|digits| digits.parse().ok())
                .unwrap_or(0);
            Some((viewers, href.to_string()))
        })
        .collect();

    streams.sort_by(|a, b| b.0.cmp(&a.0));
    streams
        .into_iter()
        .take(crate::models::MAX_STREAMS)
        .map(|(_, href)| href)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> HltvExtractor {
        HltvExtractor::new("8297", "https://www.hltv.org")
    }

    const ROSTER_HTML: &str = r#"
        <div class="bodyshot-team g-grid">
            <a href="/player/1">
                <div class="overlayImageFrame"><img src="https://img/yuurih.png"></div>
                <div class="text-ellipsis nickname-container">
                    <span class="text-ellipsis bold">yuurih</span>
                </div>
            </a>
            <a href="/player/2">
                <div class="overlayImageFrame"><img data-src="https://img/kscerato.png" src=""></div>
                <div class="text-ellipsis nickname-container">
                    <span class="text-ellipsis bold">KSCERATO</span>
                </div>
            </a>
            <a href="/player/3">
                <div class="overlayImageFrame"><img src="https://img/ghost.png"></div>
            </a>
        </div>"#;

    #[test]
    fn test_roster_names_and_images() {
        let roster = extractor().roster(&Document::new(ROSTER_HTML));
        assert_eq!(roster.len(), 2, "anchor without a name is skipped");
        assert_eq!(roster[0].name, "yuurih");
        assert_eq!(roster[0].image_url.as_deref(), Some("https://img/yuurih.png"));
        // empty src falls back to data-src
        assert_eq!(
            roster[1].image_url.as_deref(),
            Some("https://img/kscerato.png")
        );
    }

    #[test]
    fn test_roster_fallback_layout() {
        let html = r#"
            <div class="team-roster">
                <a class="col-custom" href="/player/1">
                    <div class="nickname">FalleN</div>
                    <img class="bodyshot-team-img" src="https://img/fallen.png">
                </a>
            </div>"#;
        let roster = extractor().roster(&Document::new(html));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].name, "FalleN");
        assert_eq!(roster[0].image_url.as_deref(), Some("https://img/fallen.png"));
    }

    fn match_table(unix_ms: i64) -> String {
        format!(
            r#"
            <div class="table-container match-table"><table>
                <thead><tr class="event-header-cell">
                    <th class="text-ellipsis"><a href="/events/1">IEM Katowice</a></th>
                </tr></thead>
                <tbody>
                    <tr class="team-row">
                        <td class="date-cell"><span data-unix="{unix_ms}">date</span></td>
                        <td><div class="team-flex team-1"><div class="team-name team-1">FURIA</div></div></td>
                        <td class="score-cell"> - : - </td>
                        <td><div class="team-flex"><div class="team-name team-2">NAVI</div></div></td>
                    </tr>
                    <tr class="team-row">
                        <td class="date-cell"><span data-unix="1700000000000">date</span></td>
                        <td><div class="team-flex team-1 lost"><div class="team-name team-1">FURIA</div></div></td>
                        <td class="score-cell">0:2</td>
                        <td><div class="team-flex"><div class="team-name team-2">Spirit</div></div></td>
                    </tr>
                </tbody>
                <thead><tr><th>header without a tournament link</th></tr></thead>
                <thead><tr class="event-header-cell">
                    <th class="text-ellipsis"><a href="/events/2">BLAST Premier</a></th>
                </tr></thead>
                <tbody>
                    <tr class="team-row">
                        <td class="date-cell"><span>18:30</span></td>
                        <td><div class="team-flex team-1"><div class="team-name team-1">FURIA</div></div></td>
                        <td class="score-cell">- : -</td>
                        <td><div class="team-flex"><div class="team-name team-2">Vitality</div></div></td>
                    </tr>
                    <tr class="team-row">
                        <td class="date-cell"><span data-unix="1700000000000">date</span></td>
                        <td><div class="team-flex team-1"><div class="team-name team-1">FURIA</div></div></td>
                        <td class="score-cell">2:1</td>
                        <td><div class="team-flex"><div class="team-name team-2">G2</div></div></td>
                    </tr>
                </tbody>
            </table></div>"#
        )
    }

    #[test]
    fn test_upcoming_rows_with_tournament_pairing() {
        let now = Local::now();
        let doc = Document::new(match_table(now.timestamp_millis()));
        let upcoming = extractor().upcoming_on(&doc, now.date_naive());

        assert_eq!(upcoming.len(), 2, "only placeholder-score rows qualify");
        assert_eq!(upcoming[0].opponent, "NAVI");
        assert_eq!(upcoming[0].tournament, "IEM Katowice");
        assert_eq!(upcoming[0].date, DateLabel::Today);
        assert_eq!(upcoming[0].time, now.format("%H:%M").to_string());

        // bare HH:MM cell means today; linkless header consumed no tbody
        assert_eq!(upcoming[1].opponent, "Vitality");
        assert_eq!(upcoming[1].tournament, "BLAST Premier");
        assert_eq!(upcoming[1].date, DateLabel::Today);
        assert_eq!(upcoming[1].time, "18:30");
    }

    #[test]
    fn test_upcoming_tomorrow_and_literal_dates() {
        let now = Local::now();
        let tomorrow_ms = now.timestamp_millis() + 24 * 3600 * 1000;
        let doc = Document::new(match_table(tomorrow_ms));
        let upcoming = extractor().upcoming_on(&doc, now.date_naive());
        assert_eq!(upcoming[0].date, DateLabel::Tomorrow);

        let next_week_ms = now.timestamp_millis() + 7 * 24 * 3600 * 1000;
        let doc = Document::new(match_table(next_week_ms));
        let upcoming = extractor().upcoming_on(&doc, now.date_naive());
        assert!(matches!(upcoming[0].date, DateLabel::On(_)));
    }

    #[test]
    fn test_results_with_victory_detection() {
        let doc = Document::new(match_table(Local::now().timestamp_millis()));
        let results = extractor().results(&doc);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].opponent, "Spirit");
        assert_eq!(results[0].score, "0:2");
        assert!(!results[0].victory, "team-1 flex marked lost");
        assert_eq!(results[1].opponent, "G2");
        assert!(results[1].victory);
    }

    const LIVE_INDEX_HTML: &str = r#"
        <div class="live-matches-wrapper">
            <div class="match-wrapper live-match-container" team1="4608" team2="5995">
                <a class="match-top" href="/matches/1/other"></a>
            </div>
            <div class="match-wrapper live-match-container" team1="4608" team2="8297">
                <a class="match-top" href="/matches/2/navi-vs-furia"></a>
                <div class="match-event text-ellipsis">PGL Major</div>
                <div class="match-team"><div class="match-teamname">NAVI</div></div>
                <div class="match-team"><div class="match-teamname">FURIA</div></div>
                <span class="current-map-score" data-livescore-team="8297">12</span>
                <span class="current-map-score" data-livescore-team="4608">9</span>
                <span data-livescore-maps-won-for data-livescore-team="8297">1</span>
                <span data-livescore-maps-won-for data-livescore-team="4608">0</span>
            </div>
        </div>"#;

    #[test]
    fn test_live_ref_finds_tracked_team() {
        let live = extractor()
            .live_ref(&Document::new(LIVE_INDEX_HTML))
            .expect("tracked team is listed live");

        assert_eq!(live.opponent, "NAVI");
        assert_eq!(live.current_map_score, "12-9", "our score always first");
        assert_eq!(live.maps_won, "1-0");
        assert_eq!(live.tournament, "PGL Major");
        assert_eq!(live.match_link, "https://www.hltv.org/matches/2/navi-vs-furia");
    }

    #[test]
    fn test_live_ref_absent_when_not_listed() {
        let html = r#"
            <div class="live-matches-wrapper">
                <div class="match-wrapper live-match-container" team1="4608" team2="5995"></div>
            </div>"#;
        assert!(extractor().live_ref(&Document::new(html)).is_none());
    }

    const MATCH_PAGE_HTML: &str = r#"
        <div class="standard-box veto-box">
            <div class="padding preformatted-text">Best of 3 (LAN)</div>
        </div>
        <div class="standard-box veto-box">
            <div class="padding">
                <div>1. NAVI removed Nuke</div>
                <div>2. FURIA removed Inferno</div>
                <div>3. Mirage was left over</div>
            </div>
        </div>
        <div class="stream-box"><span class="viewers">1,200</span><a href="https://twitch.tv/small"></a></div>
        <div class="stream-box"><span class="viewers">85,000</span><a href="https://twitch.tv/main"></a></div>
        <div class="stream-box"><span class="viewers">300</span><a href="https://twitch.tv/tiny"></a></div>
        <div class="stream-box"><span class="viewers">9,400</span><a href="https://twitch.tv/co-stream"></a></div>"#;

    fn live_ref() -> LiveMatchRef {
        LiveMatchRef {
            opponent: "NAVI".into(),
            current_map_score: "12-9".into(),
            maps_won: "1-0".into(),
            tournament: "PGL Major".into(),
            match_link: "https://www.hltv.org/matches/2/navi-vs-furia".into(),
        }
    }

    #[test]
    fn test_live_detail_format_veto_and_streams() {
        let live = extractor().live_detail(&Document::new(MATCH_PAGE_HTML), &live_ref());

        assert_eq!(live.format, SeriesFormat::Bo3);
        assert_eq!(live.veto_details.len(), 3);
        assert_eq!(live.veto_details[0], "1. NAVI removed Nuke");
        // top 3 by viewers, descending
        assert_eq!(
            live.stream_links,
            vec![
                "https://twitch.tv/main",
                "https://twitch.tv/co-stream",
                "https://twitch.tv/small",
            ]
        );
        assert_eq!(live.current_map_score, "12-9");
    }

    #[test]
    fn test_live_detail_defaults_on_bare_page() {
        let live = extractor().live_detail(&Document::new("<html></html>"), &live_ref());
        assert_eq!(live.format, SeriesFormat::Unknown);
        assert!(live.veto_details.is_empty());
        assert!(live.stream_links.is_empty());
    }

    #[test]
    fn test_score_placeholder() {
        assert!(is_score_placeholder(" - : - "));
        assert!(is_score_placeholder("-:-"));
        assert!(!is_score_placeholder("2:1"));
        assert!(!is_score_placeholder("- : 1"));
    }

    #[test]
    fn test_looks_like_time() {
        assert!(looks_like_time("18:30"));
        assert!(!looks_like_time("TBA"));
        assert!(!looks_like_time("8:30"));
        assert!(!looks_like_time("18.30"));
    }
}
