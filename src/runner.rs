use std::sync::Arc;

use teloxide::{
    dispatching::dialogue::GetChatId,
    prelude::Requester,
    types::{CallbackQuery, PollAnswer, UserId, Voter},
    Bot,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    callback::{answer_failure, edit_origin},
    commands::register_user,
    database::{
        connection::{QuizStore, VocabularyStore},
        vocabulary::QuizType,
    },
    error::QuizError,
    quiz::{QuizEngine, MIN_WORDS},
    HandlerResult,
};

/// What the quiz keyboard message turns into. `None` for failures the user
/// can do nothing about.
pub(crate) fn quiz_start_reply(result: &Result<Uuid, QuizError>) -> Option<String> {
    match result {
        Ok(_) => Some("🎯 Starting quiz...".to_owned()),
        Err(QuizError::NotEnoughWords { .. }) => Some(format!(
            "❌ Not enough words for this quiz type. You need at least {} words.",
            MIN_WORDS
        )),
        Err(QuizError::AlreadyRunning) => {
            Some("⏳ A quiz is already running in this chat. Use /stop to end it.".to_owned())
        }
        Err(QuizError::Store(_)) => None,
    }
}

#[instrument(level = "info", skip(connection, engine))]
pub(crate) async fn start_quiz<Store: VocabularyStore>(
    bot: Bot,
    q: CallbackQuery,
    quiz_type: QuizType,
    connection: Arc<Store>,
    engine: QuizEngine<Store, Bot>,
) -> HandlerResult {
    let Some(chat_id) = q.chat_id() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    if let Err(e) = register_user(connection.as_ref(), &q.from).await {
        tracing::error!("Failed to register {}: {}", q.from.id, e);
        return answer_failure(&bot, &q).await;
    }

    tracing::info!("{} starts a '{}' quiz in {}", q.from.id, quiz_type, chat_id);
    let result = engine.start_quiz(chat_id, q.from.id, quiz_type).await;
    if let Err(e) = &result {
        tracing::info!("Quiz was not started in {}: {}", chat_id, e);
    }

    match quiz_start_reply(&result) {
        Some(text) => edit_origin(&bot, &q, text).await,
        None => answer_failure(&bot, &q).await,
    }
}

/// The voter and the chosen option of an answer. Answers cast on behalf of a
/// chat carry no user and are ignored.
pub(crate) fn chosen_option(answer: &PollAnswer) -> Option<(UserId, Option<usize>)> {
    let Voter::User(user) = &answer.voter else {
        return None;
    };
    let option = answer.option_ids.first().map(|&option| usize::from(option));
    Some((user.id, option))
}

/// Quiz polls are not anonymous, so every answer names its voter.
#[instrument(level = "info", skip(engine))]
pub(crate) async fn poll_answer<Store: QuizStore>(
    answer: PollAnswer,
    engine: QuizEngine<Store, Bot>,
) -> HandlerResult {
    let Some((voter, option)) = chosen_option(&answer) else {
        return Ok(());
    };

    match engine.record_answer(&answer.poll_id, voter, option).await {
        Ok(outcome) => tracing::debug!("Answer to poll {}: {:?}", answer.poll_id, outcome),
        Err(e) => tracing::error!("Failed to record answer to poll {}: {}", answer.poll_id, e),
    }
    Ok(())
}
