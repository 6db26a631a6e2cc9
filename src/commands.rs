//! Bot commands: each maps to one policy store write or a read-only listing.

use crate::db::{Database, PolicyError};
use crate::i18n::LanguageRegistry;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    BotInfo,
    Languages,
    TranslateOn,
    TranslateOff,
    UserOn,
    UserOff,
    /// `/setlang <code>`; the argument is absent when the user sent none
    SetLang(Option<String>),
}

impl Command {
    /// Parse a known command, accepting any `/command@BotName` addressee.
    /// Unknown commands return `None` and are treated as text.
    pub fn parse(text: &str) -> Option<Command> {
        Self::parse_for(text, None)
    }

    /// Parse a known command sent to `bot_username`. Commands addressed to
    /// another bot (`/command@OtherBot`) return `None`.
    pub fn parse_for(text: &str, bot_username: Option<&str>) -> Option<Command> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?.strip_prefix('/')?;
        let (name, addressee) = match head.split_once('@') {
            Some((name, addressee)) => (name, Some(addressee)),
            None => (head, None),
        };

        if let (Some(addressee), Some(me)) = (addressee, bot_username) {
            if !addressee.eq_ignore_ascii_case(me) {
                return None;
            }
        }

        let command = match name {
            "help" | "start" => Command::Help,
            "botinfo" => Command::BotInfo,
            "languages" => Command::Languages,
            "translate_on" => Command::TranslateOn,
            "translate_off" => Command::TranslateOff,
            "user_on" => Command::UserOn,
            "user_off" => Command::UserOff,
            "setlang" => Command::SetLang(parts.next().map(str::to_lowercase)),
            _ => return None,
        };
        Some(command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
    /// Send with `parse_mode = HTML`
    pub html: bool,
}

impl CommandReply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: false,
        }
    }

    fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: true,
        }
    }
}

pub async fn execute(
    db: &Database,
    chat_id: i64,
    user_id: Option<i64>,
    command: Command,
) -> Result<CommandReply, PolicyError> {
    let reply = match command {
        Command::Help => CommandReply::html(HELP_TEXT),
        Command::BotInfo => CommandReply::html(BOT_INFO_TEXT),
        Command::Languages => CommandReply::plain(languages_text()),
        Command::TranslateOn => {
            db.set_chat_enabled(chat_id, true).await?;
            info!("Translation enabled in chat {}", chat_id);
            CommandReply::plain("✅ Translation enabled in this chat")
        }
        Command::TranslateOff => {
            db.set_chat_enabled(chat_id, false).await?;
            info!("Translation disabled in chat {}", chat_id);
            CommandReply::plain("⛔ Translation disabled in this chat")
        }
        Command::UserOn | Command::UserOff => {
            let Some(user_id) = user_id else {
                return Ok(CommandReply::plain(
                    "❌ This command needs a user account as sender",
                ));
            };
            let enabled = command == Command::UserOn;
            db.set_user_enabled(user_id, enabled).await?;
            info!("Translation {} for user {}", on_off(enabled), user_id);
            if enabled {
                CommandReply::plain("✅ Translation enabled for you")
            } else {
                CommandReply::plain("⛔ Translation disabled for you")
            }
        }
        Command::SetLang(None) => CommandReply::plain("Usage: /setlang <language_code>"),
        Command::SetLang(Some(code)) => match db.set_chat_target(chat_id, &code).await {
            Ok(language) => {
                info!("Chat {} target language set to {}", chat_id, language);
                CommandReply::plain(format!(
                    "🌐 Target language set to {} ({})",
                    language.name(),
                    language.code()
                ))
            }
            Err(PolicyError::InvalidLanguageCode(_)) => {
                CommandReply::plain("❌ Unsupported language. Use /languages")
            }
            Err(e) => return Err(e),
        },
    };

    Ok(reply)
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

fn languages_text() -> String {
    let langs = LanguageRegistry::get()
        .list_all()
        .iter()
        .map(|lang| format!("{} ({})", lang.name, lang.code))
        .collect::<Vec<_>>()
        .join(", ");
    format!("🌍 Supported Languages:\n{}", langs)
}

const HELP_TEXT: &str = "📘 <b>Translation Bot Help</b>\n\
━━━━━━━━━━━━━━━━━━\n\n\
<b>Chat</b>\n\
• /translate_on\n\
• /translate_off\n\
• /setlang &lt;code&gt;\n\n\
<b>User</b>\n\
• /user_on\n\
• /user_off\n\n\
<b>Info</b>\n\
• /languages\n\
• /botinfo\n\
• /help";

const BOT_INFO_TEXT: &str = "🤖 <b>Translator Bot</b>\n\
━━━━━━━━━━━━━━━━━━\n\
• Auto language detection\n\
• SQLite persistence\n\
• In-memory caching\n\
• Rate limiting";
