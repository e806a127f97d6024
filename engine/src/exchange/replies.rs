//! User-facing reply texts

/// Sent instead of a reply when the content gate rejects a message
pub const REFUSAL: &str =
    "Извините, но я не могу обсуждать такие темы. Давайте поговорим о чем-то другом, что вас беспокоит.";

/// Sent when an exchange fails after the gate
pub const PROCESSING_ERROR: &str =
    "Произошла ошибка при обработке вашего сообщения. Попробуйте написать еще раз через минуту.";

/// Name used in the welcome when the user has no first name
pub const DEFAULT_NAME: &str = "друг";

pub const START_SESSION_BUTTON: &str = "🌟 Начать сессию";

/// Callback payload carried by the start-session button
pub const START_SESSION_CALLBACK: &str = "start_session";

pub const SESSION_STARTED: &str = "🌟 Сессия начата! Я готов вас выслушать.\n\n\
Поделитесь тем, что у вас на душе. Не стесняйтесь выражать свои чувства — здесь вы в безопасности.";

pub const RESET: &str = "🔄 История диалога сброшена.\n\n\
Мы можем начать разговор с чистого листа. О чем бы вы хотели поговорить?";

pub const HELP: &str = "🔧 Доступные команды:

/start — перезапустить бота и увидеть приветствие
/reset — сбросить историю диалога и начать заново
/help — показать эту справку

💡 Как пользоваться ботом:

1. Просто напишите мне о том, что вас беспокоит
2. Я буду задавать уточняющие вопросы
3. Вместе мы попробуем разобраться в ситуации
4. Если нужно начать заново — используйте /reset

🔒 Конфиденциальность:
Ваши сообщения не сохраняются после завершения сессии.

❤️ Помните: Я здесь, чтобы поддержать вас!";

/// Personalised greeting for `/start`
pub fn welcome(first_name: Option<&str>) -> String {
    let name = first_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_NAME);

    format!(
        "👋 Привет, {}! Я твой психолог, и я готов тебя выслушать.

😊 Я умею:
• Поддержать в трудную минуту
• Помочь разобраться в чувствах
• Просто поговорить по душам

💬 Можешь рассказать мне всё, что на сердце. Я не сужу и не ставлю диагнозы — просто слушаю и поддерживаю.

Команды: /help /reset

О чём хочешь поговорить? 🤗",
        name
    )
}
