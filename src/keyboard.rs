use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::{
    callback::CallbackAction,
    database::vocabulary::{QuizType, SavedWord},
};

pub(crate) fn add_to_dictionary_keyboard(
    headword: &str,
    translation: &str,
) -> Option<InlineKeyboardMarkup> {
    let action = CallbackAction::add_word(headword, translation)?;

    Some(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("➕ Add to Dictionary", action.to_string()),
    ]]))
}

pub(crate) fn quiz_options_keyboard() -> InlineKeyboardMarkup {
    let keyboard = QuizType::ALL.into_iter().map(|quiz_type| {
        vec![InlineKeyboardButton::callback(
            quiz_type.label(),
            CallbackAction::StartQuiz(quiz_type).to_string(),
        )]
    });

    InlineKeyboardMarkup::new(keyboard)
}

/// One delete button per word, two per row.
pub(crate) fn delete_words_keyboard(words: &[SavedWord]) -> InlineKeyboardMarkup {
    let keyboard = words.chunks(2).map(|pair| {
        pair.iter()
            .map(|word| {
                InlineKeyboardButton::callback(
                    format!("🗑️ {}", word.headword()),
                    CallbackAction::DeleteWord(*word.uuid()).to_string(),
                )
            })
            .collect::<Vec<_>>()
    });

    InlineKeyboardMarkup::new(keyboard)
}
