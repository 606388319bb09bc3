use std::sync::Arc;

use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{CallbackQuery, Message, ParseMode, UserId},
    utils::html,
    Bot,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    callback::{answer_failure, edit_origin},
    commands::register_user,
    database::connection::{QuizStore, StoreError, VocabularyStore},
    keyboard::add_to_dictionary_keyboard,
    quiz::QuizEngine,
    translator::{TranslationProvider, Translator},
    HandlerResult,
};

const NOT_FOUND: &str = "❌ Sorry, I couldn't find a translation for that word.";

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn translation_reply(word: &str, translation: &str) -> String {
    format!(
        "🔤 {}\n📖 {}",
        html::bold(&html::escape(&capitalized(word))),
        html::escape(translation)
    )
}

/// Saves a word for `owner_id`. Without a translation the word is looked up
/// again. Returns the text to show in place of the button message.
pub(crate) async fn save_word<Store: VocabularyStore, P: TranslationProvider>(
    connection: &Store,
    translator: &Translator<P>,
    owner_id: UserId,
    headword: &str,
    translation: Option<String>,
) -> Result<String, StoreError> {
    let headword = headword.trim().to_lowercase();
    let translation = match translation {
        Some(translation) => translation,
        None => match translator.translate(&headword).await {
            Some(translation) => translation,
            None => return Ok(NOT_FOUND.to_owned()),
        },
    };

    match connection.create_word(owner_id, &headword, &translation).await? {
        Some(word) => {
            tracing::info!("{} added '{}' to their dictionary", owner_id, word.headword());
            Ok(format!(
                "✅ Added '{}' to your dictionary!\n📖 {}",
                word.headword(),
                word.translation()
            ))
        }
        None => Ok(format!("📚 '{}' is already in your dictionary!", headword)),
    }
}

pub(crate) async fn remove_word<Store: VocabularyStore>(
    connection: &Store,
    owner_id: UserId,
    word_id: Uuid,
) -> Result<String, StoreError> {
    match connection.delete_word(word_id, owner_id).await? {
        Some(word) => {
            tracing::info!("{} deleted '{}'", owner_id, word.headword());
            Ok(format!("🗑️ Deleted: {}", word))
        }
        None => Ok("❌ Word not found or already deleted.".to_owned()),
    }
}

/// Free text outside of a quiz is a translation request.
#[instrument(level = "info", skip(translator, engine))]
pub(crate) async fn translate_word<Store: QuizStore, P: TranslationProvider>(
    bot: Bot,
    msg: Message,
    translator: Arc<Translator<P>>,
    engine: QuizEngine<Store, Bot>,
) -> HandlerResult {
    if engine.is_running(msg.chat.id).await {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let word = text.trim().to_lowercase();
    tracing::info!("Translation requested for '{}'", word);

    let Some(translation) = translator.translate(&word).await else {
        bot.send_message(msg.chat.id, NOT_FOUND).await?;
        return Ok(());
    };

    let mut reply = bot
        .send_message(msg.chat.id, translation_reply(&word, &translation))
        .parse_mode(ParseMode::Html);
    match add_to_dictionary_keyboard(&word, &translation) {
        Some(keyboard) => reply = reply.reply_markup(keyboard),
        None => tracing::warn!("'{}' is too long for an add button", word),
    }
    reply.await?;
    Ok(())
}

#[instrument(level = "info", skip(connection, translator))]
pub(crate) async fn add_word<Store: VocabularyStore, P: TranslationProvider>(
    bot: Bot,
    q: CallbackQuery,
    (headword, translation): (String, Option<String>),
    connection: Arc<Store>,
    translator: Arc<Translator<P>>,
) -> HandlerResult {
    let saved: Result<String, StoreError> = async {
        register_user(connection.as_ref(), &q.from).await?;
        save_word(
            connection.as_ref(),
            translator.as_ref(),
            q.from.id,
            &headword,
            translation,
        )
        .await
    }
    .await;

    match saved {
        Ok(text) => edit_origin(&bot, &q, text).await,
        Err(e) => {
            tracing::error!("Failed to add '{}' for {}: {}", headword, q.from.id, e);
            answer_failure(&bot, &q).await
        }
    }
}

#[instrument(level = "info", skip(connection))]
pub(crate) async fn delete_word<Store: VocabularyStore>(
    bot: Bot,
    q: CallbackQuery,
    word_id: Uuid,
    connection: Arc<Store>,
) -> HandlerResult {
    let removed: Result<String, StoreError> = async {
        register_user(connection.as_ref(), &q.from).await?;
        remove_word(connection.as_ref(), q.from.id, word_id).await
    }
    .await;

    match removed {
        Ok(text) => edit_origin(&bot, &q, text).await,
        Err(e) => {
            tracing::error!("Failed to delete word {} for {}: {}", word_id, q.from.id, e);
            answer_failure(&bot, &q).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        database::{
            connection::{CreateWord, RetrieveWords},
            vocabulary::WordOrder,
        },
        testing::{FixedTranslation, MemoryStore},
    };

    const OWNER: UserId = UserId(42);

    fn translator(reply: Option<&'static str>) -> Translator<FixedTranslation> {
        Translator::new(FixedTranslation(reply), HashMap::new())
    }

    #[tokio::test]
    async fn saves_a_new_word() {
        let store = MemoryStore::default();
        let text = save_word(&store, &translator(None), OWNER, "Cat", Some("кошка".into()))
            .await
            .unwrap();

        assert_eq!(text, "✅ Added 'cat' to your dictionary!\n📖 кошка");
        let words = store.list_words(OWNER, WordOrder::NewestFirst, None).await.unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].headword(), "cat");
    }

    #[tokio::test]
    async fn second_add_is_reported_not_duplicated() {
        let store = MemoryStore::default();
        let translator = translator(None);
        save_word(&store, &translator, OWNER, "cat", Some("кошка".into()))
            .await
            .unwrap();
        let text = save_word(&store, &translator, OWNER, "cat", Some("кот".into()))
            .await
            .unwrap();

        assert_eq!(text, "📚 'cat' is already in your dictionary!");
        assert_eq!(store.count_words(OWNER).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_translation_is_looked_up_again() {
        let store = MemoryStore::default();

        let text = save_word(&store, &translator(Some("собака")), OWNER, "dog", None)
            .await
            .unwrap();
        assert!(text.ends_with("📖 собака"));

        let text = save_word(&store, &translator(None), OWNER, "bird", None)
            .await
            .unwrap();
        assert_eq!(text, NOT_FOUND);
        assert_eq!(store.count_words(OWNER).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn only_the_owner_can_delete() {
        let store = MemoryStore::default();
        let word = store
            .create_word(OWNER, "cat", "кошка")
            .await
            .unwrap()
            .unwrap();

        let text = remove_word(&store, UserId(7), *word.uuid()).await.unwrap();
        assert_eq!(text, "❌ Word not found or already deleted.");

        let text = remove_word(&store, OWNER, *word.uuid()).await.unwrap();
        assert_eq!(text, "🗑️ Deleted: cat - кошка");

        let text = remove_word(&store, OWNER, *word.uuid()).await.unwrap();
        assert_eq!(text, "❌ Word not found or already deleted.");
    }

    #[test]
    fn reply_capitalizes_and_escapes() {
        assert_eq!(translation_reply("ёж", "hedgehog"), "🔤 <b>Ёж</b>\n📖 hedgehog");
        assert_eq!(translation_reply("cat", "<кошка>"), "🔤 <b>Cat</b>\n📖 &lt;кошка&gt;");
    }
}
