use std::sync::Arc;

use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{Message, ParseMode, User},
    utils::{command::BotCommands, html},
    Bot,
};
use tracing::instrument;

use crate::{
    database::{
        connection::{QuizStore, RegisterUser, StoreError, VocabularyStore},
        vocabulary::{SavedWord, WordOrder},
    },
    keyboard::{delete_words_keyboard, quiz_options_keyboard},
    quiz::QuizEngine,
    HandlerResult, GENERIC_FAILURE,
};

const WORDS_SHOWN: usize = 50;
const DELETE_CHOICES: usize = 20;
const DELETE_LISTED: usize = 10;

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "start the bot.")]
    Start,
    #[command(description = "display help.")]
    Help,
    #[command(description = "take a vocabulary quiz.")]
    Test,
    #[command(description = "list your saved words.")]
    Words,
    #[command(description = "manage your saved words.")]
    Delete,
    #[command(description = "stop the current quiz.")]
    Stop,
}

const HELP_TEXT: &str = "🔤 <b>Vocabulary Bot Help</b>

<b>Basic Usage:</b>
• Send any English or Russian word → Get translation
• Click 'Add to Dictionary' → Save to your personal dictionary

<b>Commands:</b>
/test - Start vocabulary quiz with options:
  • All words - Test all your saved words
  • Last 20 - Test your 20 most recent words
  • Random 20 - Test 20 random words from your dictionary

/words - List your saved words
/delete - View and delete saved words
/stop - Stop current quiz
/help - Show this help message

💡 <b>Tips:</b>
• Build your vocabulary by adding words regularly
• Take quizzes to test your knowledge
• Use random quizzes for better retention";

pub(crate) fn display_name(user: &User) -> &str {
    user.username.as_deref().unwrap_or(&user.first_name)
}

pub(crate) async fn register_user<Store: RegisterUser>(
    connection: &Store,
    user: &User,
) -> Result<(), StoreError> {
    connection
        .get_or_create_user(user.id, Some(display_name(user)))
        .await
}

pub(crate) fn welcome_text(name: &str) -> String {
    format!(
        "🎯 Welcome to Vocabulary Bot, {}!\n\n\
         📚 Send me any English word and I'll translate it for you.\n\
         ➕ Use the 'Add to Dictionary' button to save words.\n\n\
         Available commands:\n\
         /test - Take a vocabulary quiz\n\
         /words - List your saved words\n\
         /delete - Manage your saved words\n\
         /stop - Stop current quiz\n\
         /help - Show this help message",
        html::escape(name)
    )
}

fn word_line(word: &SavedWord) -> String {
    format!(
        "• {} - {}",
        html::escape(word.headword()),
        html::escape(word.translation())
    )
}

/// `words` newest first, `total` the size of the whole dictionary.
pub(crate) fn words_listing(words: &[SavedWord], total: usize) -> String {
    if words.is_empty() {
        return "📚 Your dictionary is empty. Send me a word to add it.".to_owned();
    }

    let lines = words
        .iter()
        .take(WORDS_SHOWN)
        .map(word_line)
        .collect::<Vec<_>>()
        .join("\n");
    let mut text = format!(
        "📖 {} (total: {} words):\n\n{}",
        html::bold("Your dictionary"),
        total,
        lines
    );
    let shown = words.len().min(WORDS_SHOWN);
    if total > shown {
        text.push_str(&format!("\n\n...and {} more", total - shown));
    }
    text
}

pub(crate) fn delete_listing(words: &[SavedWord]) -> String {
    let lines = words
        .iter()
        .take(DELETE_LISTED)
        .map(word_line)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "🗑️ {} (showing up to {}):\n\n{}\n\nClick a button below to delete a word:",
        html::bold("Your saved words"),
        DELETE_LISTED,
        lines
    )
}

pub(crate) fn quiz_choice_text(word_count: usize) -> String {
    format!(
        "🎯 Choose your quiz type:\n\n📊 You have {} saved words",
        word_count
    )
}

/// Registers the sender, then loads their word count.
pub(crate) async fn load_word_count<Store: VocabularyStore>(
    connection: &Store,
    user: &User,
) -> Result<usize, StoreError> {
    register_user(connection, user).await?;
    connection.count_words(user.id).await
}

/// Registers the sender, then loads the newest `limit` words and the total.
pub(crate) async fn load_words<Store: VocabularyStore>(
    connection: &Store,
    user: &User,
    limit: usize,
) -> Result<(Vec<SavedWord>, usize), StoreError> {
    register_user(connection, user).await?;
    let total = connection.count_words(user.id).await?;
    let words = connection
        .list_words(user.id, WordOrder::NewestFirst, Some(limit))
        .await?;
    Ok((words, total))
}

async fn report_failure(bot: &Bot, msg: &Message, e: StoreError) -> HandlerResult {
    tracing::error!("Store failure in {}: {}", msg.chat.id, e);
    bot.send_message(msg.chat.id, GENERIC_FAILURE).await?;
    Ok(())
}

#[instrument(level = "info", skip(connection))]
pub(crate) async fn start<Store: VocabularyStore>(
    bot: Bot,
    msg: Message,
    connection: Arc<Store>,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    tracing::info!("{} ({}) started the bot", display_name(user), user.id);

    if let Err(e) = register_user(connection.as_ref(), user).await {
        return report_failure(&bot, &msg, e).await;
    }
    bot.send_message(msg.chat.id, welcome_text(display_name(user)))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, HELP_TEXT)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

#[instrument(level = "info", skip(connection))]
pub(crate) async fn test<Store: VocabularyStore>(
    bot: Bot,
    msg: Message,
    connection: Arc<Store>,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let word_count = match load_word_count(connection.as_ref(), user).await {
        Ok(count) => count,
        Err(e) => return report_failure(&bot, &msg, e).await,
    };

    if word_count == 0 {
        bot.send_message(
            msg.chat.id,
            "📚 You don't have any saved words yet! \
             Send me some English words and add them to your dictionary first.",
        )
        .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, quiz_choice_text(word_count))
        .reply_markup(quiz_options_keyboard())
        .await?;
    Ok(())
}

#[instrument(level = "info", skip(connection))]
pub(crate) async fn words<Store: VocabularyStore>(
    bot: Bot,
    msg: Message,
    connection: Arc<Store>,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let (words, total) = match load_words(connection.as_ref(), user, WORDS_SHOWN).await {
        Ok(loaded) => loaded,
        Err(e) => return report_failure(&bot, &msg, e).await,
    };

    bot.send_message(msg.chat.id, words_listing(&words, total))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

#[instrument(level = "info", skip(connection))]
pub(crate) async fn delete<Store: VocabularyStore>(
    bot: Bot,
    msg: Message,
    connection: Arc<Store>,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let words = match load_words(connection.as_ref(), user, DELETE_CHOICES).await {
        Ok((words, _)) => words,
        Err(e) => return report_failure(&bot, &msg, e).await,
    };

    if words.is_empty() {
        bot.send_message(msg.chat.id, "📚 You don't have any saved words to delete.")
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, delete_listing(&words))
        .parse_mode(ParseMode::Html)
        .reply_markup(delete_words_keyboard(&words))
        .await?;
    Ok(())
}

/// The engine reports the outcome to the chat itself.
#[instrument(level = "info", skip(engine))]
pub(crate) async fn stop<Store: QuizStore>(
    bot: Bot,
    msg: Message,
    engine: QuizEngine<Store, Bot>,
) -> HandlerResult {
    if let Err(e) = engine.stop_quiz(msg.chat.id).await {
        tracing::error!("Failed to stop quiz in {}: {}", msg.chat.id, e);
        bot.send_message(msg.chat.id, GENERIC_FAILURE).await?;
    }
    Ok(())
}
