use std::fmt;

use teloxide::{
    payloads::AnswerCallbackQuerySetters, prelude::Requester, types::CallbackQuery, Bot,
};
use uuid::Uuid;

use crate::{database::vocabulary::QuizType, HandlerResult, GENERIC_FAILURE};

/// Telegram rejects callback data longer than this many bytes.
pub const CALLBACK_DATA_LIMIT: usize = 64;

/// Payload of an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    AddWord {
        headword: String,
        /// Absent when it did not fit in the payload; looked up again on click.
        translation: Option<String>,
    },
    StartQuiz(QuizType),
    DeleteWord(Uuid),
}

impl CallbackAction {
    /// Builds an add-word payload, dropping the translation if the full
    /// payload would be too long. `None` if even the headword does not fit.
    pub fn add_word(headword: &str, translation: &str) -> Option<Self> {
        let full = CallbackAction::AddWord {
            headword: headword.to_owned(),
            translation: Some(translation.to_owned()),
        };
        if full.to_string().len() <= CALLBACK_DATA_LIMIT {
            return Some(full);
        }

        let short = CallbackAction::AddWord {
            headword: headword.to_owned(),
            translation: None,
        };
        (short.to_string().len() <= CALLBACK_DATA_LIMIT).then_some(short)
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (kind, rest) = data.split_once(':')?;
        match kind {
            "add_word" => {
                let (headword, translation) = match rest.split_once(':') {
                    Some((headword, translation)) => (headword, Some(translation.to_owned())),
                    None => (rest, None),
                };
                (!headword.is_empty()).then(|| CallbackAction::AddWord {
                    headword: headword.to_owned(),
                    translation,
                })
            }
            "quiz" => rest.parse().ok().map(CallbackAction::StartQuiz),
            "delete" => Uuid::parse_str(rest).ok().map(CallbackAction::DeleteWord),
            _ => None,
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::AddWord {
                headword,
                translation: Some(translation),
            } => write!(f, "add_word:{}:{}", headword, translation),
            CallbackAction::AddWord {
                headword,
                translation: None,
            } => write!(f, "add_word:{}", headword),
            CallbackAction::StartQuiz(quiz_type) => write!(f, "quiz:{}", quiz_type),
            CallbackAction::DeleteWord(word_id) => write!(f, "delete:{}", word_id),
        }
    }
}

/// Replaces the text of the message that carried the pressed button.
pub(crate) async fn edit_origin(bot: &Bot, q: &CallbackQuery, text: impl Into<String>) -> HandlerResult {
    if let Some(message) = &q.message {
        bot.edit_message_text(message.chat().id, message.id(), text)
            .await?;
    }
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

pub(crate) async fn answer_failure(bot: &Bot, q: &CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(q.id.clone())
        .text(GENERIC_FAILURE)
        .await?;
    Ok(())
}

/// Buttons from older versions of the bot, or tampered payloads.
pub(crate) async fn acknowledge_unknown(bot: Bot, q: CallbackQuery) -> HandlerResult {
    tracing::debug!("Ignoring callback {:?} from {}", q.data, q.from.id);
    bot.answer_callback_query(q.id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_action() {
        let id = Uuid::new_v4();

        assert_eq!(
            CallbackAction::parse("add_word:cat:кошка"),
            Some(CallbackAction::AddWord {
                headword: "cat".into(),
                translation: Some("кошка".into())
            })
        );
        assert_eq!(
            CallbackAction::parse("quiz:recent"),
            Some(CallbackAction::StartQuiz(QuizType::Recent))
        );
        assert_eq!(
            CallbackAction::parse(&format!("delete:{id}")),
            Some(CallbackAction::DeleteWord(id))
        );
    }

    #[test]
    fn translation_may_contain_colons() {
        assert_eq!(
            CallbackAction::parse("add_word:ratio:1:2"),
            Some(CallbackAction::AddWord {
                headword: "ratio".into(),
                translation: Some("1:2".into())
            })
        );
    }

    #[test]
    fn rejects_garbage() {
        for data in ["", "answer:1", "quiz:weekly", "delete:42", "add_word:", "nothing"] {
            assert_eq!(CallbackAction::parse(data), None, "{data}");
        }
    }

    #[test]
    fn long_translations_are_left_out_of_the_payload() {
        let long = "очень длинный перевод этого слова";
        let action = CallbackAction::add_word("cat", long).unwrap();

        assert_eq!(
            action,
            CallbackAction::AddWord {
                headword: "cat".into(),
                translation: None
            }
        );
        assert!(action.to_string().len() <= CALLBACK_DATA_LIMIT);
        assert_eq!(CallbackAction::parse(&action.to_string()), Some(action));
    }

    #[test]
    fn short_translations_are_kept() {
        let action = CallbackAction::add_word("cat", "кошка").unwrap();
        assert_eq!(action.to_string(), "add_word:cat:кошка");
    }

    #[test]
    fn oversized_headword_has_no_payload() {
        assert_eq!(CallbackAction::add_word(&"ж".repeat(40), "x"), None);
    }
}
