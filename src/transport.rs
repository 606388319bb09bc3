use std::{error::Error, future::Future, time::Duration};

use teloxide::{
    payloads::{SendMessageSetters, SendPollSetters},
    prelude::Requester,
    types::{ChatId, ParseMode, PollType},
    Bot,
};

pub type TransportError = Box<dyn Error + Send + Sync>;

const POLL_QUESTION_LIMIT: usize = 300;
const POLL_OPTION_LIMIT: usize = 100;
const POLL_EXPLANATION_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct QuizPoll {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    pub explanation: String,
    pub open_period: Duration,
}

/// The outbound side of the chat as seen by the quiz engine.
pub trait QuizTransport: Send + Sync + 'static {
    /// Sends an HTML-formatted message.
    fn send_text(
        &self,
        chat_id: ChatId,
        text: String,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Sends an auto-graded quiz poll and returns the poll identifier that
    /// answer events will carry.
    fn send_quiz_poll(
        &self,
        chat_id: ChatId,
        poll: QuizPoll,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

pub(crate) fn clip(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut clipped: String = text.chars().take(limit.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

impl QuizTransport for Bot {
    async fn send_text(&self, chat_id: ChatId, text: String) -> Result<(), TransportError> {
        self.send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    async fn send_quiz_poll(&self, chat_id: ChatId, poll: QuizPoll) -> Result<String, TransportError> {
        let options = poll
            .options
            .iter()
            .map(|option| clip(option, POLL_OPTION_LIMIT))
            .collect::<Vec<_>>();

        let message = self
            .send_poll(chat_id, clip(&poll.question, POLL_QUESTION_LIMIT), options)
            .type_(PollType::Quiz)
            .correct_option_id(u8::try_from(poll.correct_option)?)
            .is_anonymous(false)
            .explanation(clip(&poll.explanation, POLL_EXPLANATION_LIMIT))
            .open_period(u16::try_from(poll.open_period.as_secs())?)
            .await?;

        message
            .poll()
            .map(|sent| sent.id.to_string())
            .ok_or_else(|| "Telegram did not return the sent poll".into())
    }
}
