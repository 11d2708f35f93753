//! Plain-text message rendering for chat replies.

use crate::models::{LiveMatch, MatchResult, Player, UpcomingMatch};

pub fn start_message(team: &str) -> String {
    format!(
        "Welcome! I track {team} on HLTV.\n\
         /team - current lineup\n\
         /next - upcoming matches\n\
         /results - recent results\n\
         /live - live match status\n\
         /help - this list"
    )
}

pub fn help_message(team: &str) -> String {
    start_message(team)
}

pub fn unknown_command() -> String {
    "Unknown command. Try /team, /next, /results, /live or /help.".to_string()
}

pub fn roster(team: &str, players: &[Player]) -> String {
    if players.is_empty() {
        return "No roster data available yet, try again later.".to_string();
    }
    let mut out = format!("👥 {team} lineup:\n");
    for player in players {
        out.push_str(&format!("  • {}\n", player.name));
    }
    out
}

pub fn upcoming(team: &str, matches: &[UpcomingMatch]) -> String {
    if matches.is_empty() {
        return "No upcoming matches found, try again later.".to_string();
    }

    let mut out = format!("📅 Upcoming {team} matches:\n");
    for (tournament, group) in group_by_tournament(matches) {
        out.push_str(&format!("\n🏆 {tournament}\n"));
        for m in group {
            out.push_str(&format!("  {} {} vs {}\n", m.date, m.time, m.opponent));
        }
    }
    out
}

pub fn results(team: &str, results: &[MatchResult]) -> String {
    if results.is_empty() {
        return "No recent results found, try again later.".to_string();
    }

    let mut out = format!("📊 Recent {team} results:\n");
    for r in results {
        let mark = if r.victory { "✅" } else { "❌" };
        out.push_str(&format!(
            "  {mark} {} vs {} ({})\n",
            r.score, r.opponent, r.tournament
        ));
    }
    out
}

pub fn live(team: &str, live: &LiveMatch) -> String {
    let (our_score, their_score) = split_pair(&live.current_map_score);
    let (our_maps, their_maps) = split_pair(&live.maps_won);

    let mut out = format!("🔥 {team} is live! 🔥\n");
    out.push_str(&format!(
        "🏆 {} - {}\n",
        live.tournament,
        live.format.to_string().to_uppercase()
    ));
    out.push_str(&format!(
        "{team} {our_score} ({our_maps}) - ({their_maps}) {their_score} {}\n",
        live.opponent
    ));

    if !live.veto_details.is_empty() {
        out.push_str("\nPicks and bans:\n");
        for veto in &live.veto_details {
            out.push_str(&format!("  - {veto}\n"));
        }
    }

    let streams: Vec<&String> = live
        .stream_links
        .iter()
        // HLTV's own relative re-stream entries are useless outside the site
        .filter(|s| !s.contains("/live?matchId="))
        .collect();
    if !streams.is_empty() {
        out.push_str("\nTop streams:\n");
        for stream in streams {
            out.push_str(&format!("  - {stream}\n"));
        }
    }

    out.push_str(&format!("\n📊 Match details:\n{}", live.match_link));
    out
}

/// Group matches by tournament in first-seen order.
fn group_by_tournament(matches: &[UpcomingMatch]) -> Vec<(&str, Vec<&UpcomingMatch>)> {
    let mut groups: Vec<(&str, Vec<&UpcomingMatch>)> = Vec::new();
    for m in matches {
        match groups.iter_mut().find(|(t, _)| *t == m.tournament) {
            Some((_, group)) => group.push(m),
            None => groups.push((&m.tournament, vec![m])),
        }
    }
    groups
}

/// Split an "x-y" score pair, defaulting missing sides to "0".
fn split_pair(score: &str) -> (&str, &str) {
    match score.split_once('-') {
        Some((a, b)) => (nonempty_or_zero(a), nonempty_or_zero(b)),
        None => ("0", "0"),
    }
}

fn nonempty_or_zero(s: &str) -> &str {
    let s = s.trim();
    if s.is_empty() {
        "0"
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateLabel, SeriesFormat};

    fn m(tournament: &str, opponent: &str) -> UpcomingMatch {
        UpcomingMatch {
            date: DateLabel::Today,
            time: "18:00".into(),
            opponent: opponent.into(),
            tournament: tournament.into(),
        }
    }

    #[test]
    fn test_upcoming_grouped_in_first_seen_order() {
        let matches = vec![
            m("IEM", "NAVI"),
            m("BLAST", "G2"),
            m("IEM", "Spirit"),
        ];
        let out = upcoming("FURIA", &matches);

        let iem = out.find("🏆 IEM").expect("IEM header");
        let blast = out.find("🏆 BLAST").expect("BLAST header");
        assert!(iem < blast, "tournament order follows first appearance");

        let spirit = out.find("Spirit").expect("Spirit entry");
        assert!(spirit > iem && spirit < blast, "Spirit listed under IEM");
    }

    #[test]
    fn test_empty_snapshots_say_try_later() {
        assert!(upcoming("FURIA", &[]).contains("try again later"));
        assert!(results("FURIA", &[]).contains("try again later"));
        assert!(roster("FURIA", &[]).contains("try again later"));
    }

    #[test]
    fn test_results_marks() {
        let rs = vec![
            MatchResult {
                score: "2:0".into(),
                opponent: "NAVI".into(),
                tournament: "IEM".into(),
                victory: true,
            },
            MatchResult {
                score: "0:2".into(),
                opponent: "G2".into(),
                tournament: "IEM".into(),
                victory: false,
            },
        ];
        let out = results("FURIA", &rs);
        assert!(out.contains("✅ 2:0 vs NAVI"));
        assert!(out.contains("❌ 0:2 vs G2"));
    }

    #[test]
    fn test_live_message_scoreline() {
        let live_match = LiveMatch {
            opponent: "NAVI".into(),
            current_map_score: "12-9".into(),
            maps_won: "1-0".into(),
            tournament: "PGL Major".into(),
            format: SeriesFormat::Bo3,
            match_link: "https://www.hltv.org/matches/2/navi-vs-furia".into(),
            veto_details: vec!["1. NAVI removed Nuke".into()],
            stream_links: vec![
                "https://twitch.tv/main".into(),
                "/live?matchId=2".into(),
            ],
        };
        let out = live("FURIA", &live_match);

        assert!(out.contains("PGL Major - BO3"));
        assert!(out.contains("FURIA 12 (1) - (0) 9 NAVI"));
        assert!(out.contains("1. NAVI removed Nuke"));
        assert!(out.contains("https://twitch.tv/main"));
        assert!(!out.contains("/live?matchId="), "internal links are dropped");
        assert!(out.contains("https://www.hltv.org/matches/2/navi-vs-furia"));
    }

    #[test]
    fn test_split_pair_defaults() {
        assert_eq!(split_pair("12-9"), ("12", "9"));
        assert_eq!(split_pair("-"), ("0", "0"));
        assert_eq!(split_pair(""), ("0", "0"));
        assert_eq!(split_pair("7-"), ("7", "0"));
    }
}
