//! Telegram Bot Integration
//!
//! Long-polls the Bot API through a teloxide [`Dispatcher`] and routes:
//! - `/start`, `/help`, `/reset` commands,
//! - plain text messages into the [`ExchangeOrchestrator`],
//! - the start-session button callback.
//!
//! Updates from one chat are handled in order; chats proceed concurrently.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use teloxide::RequestError;
use tracing::{debug, info, warn};

use crate::exchange::replies::{SESSION_STARTED, START_SESSION_BUTTON, START_SESSION_CALLBACK};
use crate::exchange::{ChatSink, ExchangeOrchestrator, InboundMessage};
use crate::secrets::{self, SecretString};
use crate::session::UserId;
use sdk::errors::EngineError;

/// Bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "перезапустить бота и увидеть приветствие")]
    Start,
    #[command(description = "показать справку")]
    Help,
    #[command(description = "сбросить историю диалога и начать заново")]
    Reset,
}

/// [`ChatSink`] backed by the Bot API
#[derive(Clone)]
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

impl fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSink").finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatSink for TelegramSink {
    async fn send_typing(&self, chat_id: i64) -> Result<(), EngineError> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
            .map(|_| ())
            .map_err(platform_error)
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), EngineError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|_| ())
            .map_err(platform_error)
    }
}

fn platform_error(e: RequestError) -> EngineError {
    EngineError::Platform(secrets::scrub(&e.to_string()))
}

/// Telegram front end for the orchestrator
pub struct TelegramBot {
    bot: Bot,
}

impl fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}

impl TelegramBot {
    pub fn new(token: &SecretString) -> Self {
        Self {
            bot: Bot::new(token.unsecure()),
        }
    }

    /// Outbound sink sharing this bot's connection
    pub fn sink(&self) -> Arc<dyn ChatSink> {
        Arc::new(TelegramSink::new(self.bot.clone()))
    }

    /// Run the long-polling dispatcher until Ctrl-C
    pub async fn run(self, orchestrator: Arc<ExchangeOrchestrator>) {
        info!("Starting Telegram bot long-polling loop...");

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!(error = %secrets::scrub(&e.to_string()), "Failed to register bot commands");
        }

        Dispatcher::builder(self.bot, schema())
            .dependencies(dptree::deps![orchestrator])
            .default_handler(|update| async move {
                debug!(update_id = ?update.id, "Ignoring unhandled update");
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram bot stopped");
    }
}

/// Update routing tree
fn schema() -> UpdateHandler<RequestError> {
    let messages = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text().map(is_plain_text).unwrap_or(false))
                .endpoint(handle_text),
        );

    let callbacks = Update::filter_callback_query()
        .filter(|q: CallbackQuery| is_start_session(q.data.as_deref()))
        .endpoint(handle_start_session);

    dptree::entry().branch(messages).branch(callbacks)
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    orchestrator: Arc<ExchangeOrchestrator>,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        warn!("Command with no user info - ignoring");
        return Ok(());
    };
    let user_id = UserId(user.id.0);
    info!(%user_id, command = ?cmd, "Received command");

    match cmd {
        Command::Start => {
            let welcome = orchestrator
                .start(user_id, Some(user.first_name.as_str()))
                .await;
            let keyboard = InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
                START_SESSION_BUTTON,
                START_SESSION_CALLBACK,
            )]]);
            bot.send_message(msg.chat.id, welcome)
                .reply_markup(keyboard)
                .await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, orchestrator.help()).await?;
        }
        Command::Reset => {
            let confirmation = orchestrator.reset(user_id).await;
            bot.send_message(msg.chat.id, confirmation).await?;
        }
    }

    Ok(())
}

async fn handle_text(msg: Message, orchestrator: Arc<ExchangeOrchestrator>) -> ResponseResult<()> {
    let (Some(user), Some(text)) = (msg.from(), msg.text()) else {
        warn!("Message with no user info - ignoring");
        return Ok(());
    };

    let inbound = InboundMessage::new(user.id.0, msg.chat.id.0, text);
    let outcome = orchestrator.handle_message(inbound).await;
    debug!(chat_id = msg.chat.id.0, ?outcome, "Message handled");

    Ok(())
}

async fn handle_start_session(bot: Bot, q: CallbackQuery) -> ResponseResult<()> {
    bot.answer_callback_query(q.id).await?;

    if let Some(message) = q.message {
        bot.edit_message_text(message.chat.id, message.id, SESSION_STARTED)
            .await?;
    }

    Ok(())
}

/// Text that is not a command; whitespace-only text still counts
fn is_plain_text(text: &str) -> bool {
    !text.is_empty() && !text.starts_with('/')
}

fn is_start_session(data: Option<&str>) -> bool {
    data == Some(START_SESSION_CALLBACK)
}
