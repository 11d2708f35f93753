pub mod format;
pub mod telegram;

pub use telegram::TelegramBot;

use crate::models::Player;
use crate::store::SnapshotStore;

/// Chat commands understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Team,
    Next,
    Results,
    Live,
}

impl Command {
    /// Match the leading command word, case-insensitive, tolerating the
    /// `/cmd@BotName` form Telegram uses in group chats.
    pub fn parse(text: &str) -> Option<Command> {
        let word = text.trim().split_whitespace().next()?;
        let word = word.split('@').next().unwrap_or(word).to_lowercase();
        match word.as_str() {
            "/start" => Some(Command::Start),
            "/help" => Some(Command::Help),
            "/team" | "/roster" => Some(Command::Team),
            "/next" | "/matches" => Some(Command::Next),
            "/results" => Some(Command::Results),
            "/live" => Some(Command::Live),
            _ => None,
        }
    }
}

/// A photo to follow the text reply up with, sent as part of a media album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub url: String,
    pub caption: String,
}

/// A rendered reply: the text body plus any album photos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub photos: Vec<Photo>,
}

impl Reply {
    fn plain(text: String) -> Self {
        Reply {
            text,
            photos: Vec::new(),
        }
    }
}

/// Maps incoming messages to replies.
///
/// Handlers read only the snapshot store: they never wait on the crawler
/// and never trigger a fetch. An empty snapshot becomes a "no data yet"
/// reply, not an error.
#[derive(Clone)]
pub struct CommandRouter {
    store: SnapshotStore,
    team_name: String,
}

impl CommandRouter {
    pub fn new(store: SnapshotStore, team_name: impl Into<String>) -> Self {
        CommandRouter {
            store,
            team_name: team_name.into(),
        }
    }

    pub async fn reply_to(&self, text: &str) -> Reply {
        match Command::parse(text) {
            Some(Command::Start) => Reply::plain(format::start_message(&self.team_name)),
            Some(Command::Help) => Reply::plain(format::help_message(&self.team_name)),
            Some(Command::Team) => {
                let roster = self.store.roster().await;
                Reply {
                    text: format::roster(&self.team_name, &roster),
                    photos: roster_photos(&roster),
                }
            }
            Some(Command::Next) => {
                Reply::plain(format::upcoming(&self.team_name, &self.store.upcoming().await))
            }
            Some(Command::Results) => {
                Reply::plain(format::results(&self.team_name, &self.store.results().await))
            }
            Some(Command::Live) => match self.store.live().await {
                Some(live) => Reply::plain(format::live(&self.team_name, &live)),
                None => Reply::plain(format!("No {} match is live right now.", self.team_name)),
            },
            None => Reply::plain(format::unknown_command()),
        }
    }
}

/// One album entry per player with a portrait, captioned by nickname.
/// Players the site carries no image for are simply left out.
fn roster_photos(players: &[Player]) -> Vec<Photo> {
    players
        .iter()
        .filter_map(|p| {
            p.image_url.as_ref().map(|url| Photo {
                url: url.clone(),
                caption: p.name.clone(),
            })
        })
        .collect()
}
