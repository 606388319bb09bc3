//! The quiz engine: one running quiz per chat, timed poll questions,
//! answer correlation and scoring.
//!
//! Questions advance on a timer only. Every sent poll schedules the next step
//! `advance_delay` later; an answer never moves the quiz forward. Timers are
//! not cancelled: each one carries the session it was scheduled for and turns
//! into a no-op when that session is no longer the chat's active quiz.

pub mod question;
pub mod summary;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use teloxide::types::{ChatId, UserId};
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    database::{
        connection::{QuizStore, StoreError},
        vocabulary::{QuizType, SavedWord, WordOrder},
    },
    error::QuizError,
    state::{ActiveQuiz, PendingPoll, SessionRegistry},
    transport::{QuizPoll, QuizTransport},
};
use question::Question;
use summary::QuizSummary;

/// Multiple choice needs one correct answer and three distractors.
pub const MIN_WORDS: usize = 4;
pub const MAX_QUESTIONS: usize = 20;

type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    /// How long a poll accepts answers.
    pub open_period: Duration,
    /// Delay between sending a poll and producing the next step.
    pub advance_delay: Duration,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            open_period: Duration::from_secs(10),
            advance_delay: Duration::from_secs(12),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    UnknownPoll,
    ForeignAnswer,
    /// The vote was retracted; the poll is consumed without scoring.
    NoSelection,
    /// The poll belongs to a quiz that is no longer running.
    Stale,
    Correct { score: u32 },
    Wrong { score: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { current_question: u32, total_questions: u32 },
    NothingToStop,
}

pub struct QuizEngine<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    registry: Arc<Mutex<SessionRegistry>>,
    settings: QuizSettings,
}

impl<S, T> Clone for QuizEngine<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            transport: Arc::clone(&self.transport),
            registry: Arc::clone(&self.registry),
            settings: self.settings,
        }
    }
}

impl<S: QuizStore, T: QuizTransport> QuizEngine<S, T> {
    pub fn new(store: Arc<S>, transport: Arc<T>, settings: QuizSettings) -> Self {
        Self::with_registry(store, transport, settings, SessionRegistry::default())
    }

    pub fn with_registry(
        store: Arc<S>,
        transport: Arc<T>,
        settings: QuizSettings,
        registry: SessionRegistry,
    ) -> Self {
        Self {
            store,
            transport,
            registry: Arc::new(Mutex::new(registry)),
            settings,
        }
    }

    pub async fn is_running(&self, chat_id: ChatId) -> bool {
        self.registry.lock().await.is_running(chat_id)
    }

    /// Starts a quiz and sends its first question.
    ///
    /// The registry is only locked to check and claim the chat; word loading
    /// and session creation run unlocked, so a slow store never holds up
    /// other chats.
    #[instrument(level = "info", skip(self))]
    pub async fn start_quiz(
        &self,
        chat_id: ChatId,
        owner_id: UserId,
        quiz_type: QuizType,
    ) -> Result<Uuid, QuizError> {
        if self.is_running(chat_id).await {
            return Err(QuizError::AlreadyRunning);
        }

        let pool = self
            .candidate_pool(owner_id, quiz_type)
            .await
            .inspect_err(|e| tracing::error!("Failed to load words for {}: {}", owner_id, e))?;
        if pool.len() < MIN_WORDS {
            tracing::info!(
                "{} has only {} words for a '{}' quiz",
                owner_id,
                pool.len(),
                quiz_type
            );
            return Err(QuizError::NotEnoughWords {
                available: pool.len(),
                required: MIN_WORDS,
            });
        }

        let total_questions = pool.len().min(MAX_QUESTIONS) as u32;
        let session = self
            .store
            .create_quiz_session(owner_id, quiz_type, total_questions)
            .await
            .inspect_err(|e| tracing::error!("Failed to create quiz session: {}", e))?;
        let session_id = *session.uuid();

        let claimed = self
            .registry
            .lock()
            .await
            .insert_quiz(chat_id, ActiveQuiz::new(session, pool));
        if let Err(lost) = claimed {
            tracing::info!("Another quiz started in {} meanwhile", chat_id);
            let abandoned = lost.session.completed();
            if let Err(e) = self.store.update_quiz_session(&abandoned).await {
                tracing::error!("Failed to close abandoned quiz {}: {}", session_id, e);
            }
            return Err(QuizError::AlreadyRunning);
        }

        tracing::info!(
            "Quiz {} started for {} (type: {}, questions: {})",
            session_id,
            owner_id,
            quiz_type,
            total_questions
        );
        self.produce_next_question(chat_id, session_id).await;
        Ok(session_id)
    }

    async fn candidate_pool(
        &self,
        owner_id: UserId,
        quiz_type: QuizType,
    ) -> Result<Vec<SavedWord>, StoreError> {
        match quiz_type {
            QuizType::All => {
                self.store
                    .list_words(owner_id, WordOrder::OldestFirst, None)
                    .await
            }
            QuizType::Recent => {
                self.store
                    .list_words(owner_id, WordOrder::NewestFirst, Some(MAX_QUESTIONS))
                    .await
            }
            QuizType::Random => {
                let words = self
                    .store
                    .list_words(owner_id, WordOrder::OldestFirst, None)
                    .await?;
                Ok(self.registry.lock().await.sample(words, MAX_QUESTIONS))
            }
        }
    }

    /// Sends the next question of the session, or finishes the quiz once every
    /// question was asked. Does nothing if `session_id` is no longer the
    /// chat's active quiz.
    pub fn produce_next_question(&self, chat_id: ChatId, session_id: Uuid) -> BoxFuture<'_> {
        Box::pin(async move {
            let next = {
                let mut registry = self.registry.lock().await;
                let Some(quiz) = registry
                    .quiz(chat_id)
                    .filter(|quiz| quiz.session().uuid() == &session_id)
                else {
                    tracing::debug!("No running quiz {} in {}, skipping", session_id, chat_id);
                    return;
                };
                let owner_id = quiz.session().owner_id();
                let total_questions = quiz.session().total_questions();

                registry
                    .advance(chat_id, &session_id)
                    .map(|(number, question)| (owner_id, number, total_questions, question))
            };

            match next {
                Some((owner_id, number, total_questions, question)) => {
                    self.ask(chat_id, session_id, owner_id, number, total_questions, question)
                        .await;
                    self.schedule_next(chat_id, session_id);
                }
                None => {
                    self.finish(chat_id, Some(session_id)).await;
                }
            }
        })
    }

    async fn ask(
        &self,
        chat_id: ChatId,
        session_id: Uuid,
        owner_id: UserId,
        number: u32,
        total_questions: u32,
        question: Question,
    ) {
        let correct_word = question.correct().clone();
        tracing::info!(
            "{}: asking question #{}/{}: '{}'",
            chat_id,
            number,
            total_questions,
            correct_word.headword()
        );

        let poll = QuizPoll {
            question: format!(
                "🎯 Question {}/{}\n🔤 What does '{}' mean?",
                number,
                total_questions,
                correct_word.headword()
            ),
            options: question.option_texts(),
            correct_option: question.correct_index(),
            explanation: format!(
                "✅ '{}' = '{}'",
                correct_word.headword(),
                correct_word.translation()
            ),
            open_period: self.settings.open_period,
        };

        match self.transport.send_quiz_poll(chat_id, poll).await {
            Ok(poll_id) => {
                let mut registry = self.registry.lock().await;
                if registry
                    .quiz(chat_id)
                    .is_some_and(|quiz| quiz.session().uuid() == &session_id)
                {
                    registry.register_poll(
                        poll_id,
                        PendingPoll {
                            chat_id,
                            session_id,
                            owner_id,
                            correct_word,
                            question_number: number,
                            correct_option: question.correct_index(),
                        },
                    );
                }
            }
            Err(e) => {
                tracing::error!("Failed to send question #{} to {}: {}", number, chat_id, e);
                if let Err(e) = self
                    .transport
                    .send_text(chat_id, "❌ Error generating question.".to_owned())
                    .await
                {
                    tracing::error!("Failed to report question error to {}: {}", chat_id, e);
                }
            }
        }
    }

    fn schedule_next(&self, chat_id: ChatId, session_id: Uuid) {
        let engine = self.clone();
        let delay = self.settings.advance_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.produce_next_question(chat_id, session_id).await;
        });
    }

    /// Scores an answer event. Only the first answer of the quiz owner counts;
    /// the quiz is not advanced.
    #[instrument(level = "info", skip(self))]
    pub async fn record_answer(
        &self,
        poll_id: &str,
        user_id: UserId,
        chosen_option: Option<usize>,
    ) -> Result<AnswerOutcome, QuizError> {
        let (pending, writes) = {
            let mut registry = self.registry.lock().await;

            let Some(pending) = registry.poll(poll_id) else {
                tracing::debug!("Answer for unknown poll {}", poll_id);
                return Ok(AnswerOutcome::UnknownPoll);
            };
            if pending.owner_id != user_id {
                tracing::debug!("Ignoring answer of {} to a quiz of {}", user_id, pending.owner_id);
                return Ok(AnswerOutcome::ForeignAnswer);
            }
            let Some(pending) = registry.take_poll(poll_id) else {
                return Ok(AnswerOutcome::UnknownPoll);
            };

            let Some(chosen_option) = chosen_option else {
                return Ok(AnswerOutcome::NoSelection);
            };
            let Some(quiz) = registry.session_quiz_mut(pending.chat_id, &pending.session_id) else {
                return Ok(AnswerOutcome::Stale);
            };

            if chosen_option != pending.correct_option {
                tracing::info!(
                    "Wrong answer to question #{} ('{}'). Score remains {}",
                    pending.question_number,
                    pending.correct_word.headword(),
                    quiz.session.score()
                );
                return Ok(AnswerOutcome::Wrong {
                    score: quiz.session.score(),
                });
            }
            (pending, quiz.writes())
        };

        let _writing = writes.lock_owned().await;
        let Some(updated) = self
            .registry
            .lock()
            .await
            .session_quiz_mut(pending.chat_id, &pending.session_id)
            .map(|quiz| quiz.session.with_correct_answer())
        else {
            tracing::debug!("Quiz {} ended before poll {} was scored", pending.session_id, poll_id);
            return Ok(AnswerOutcome::Stale);
        };

        if let Err(e) = self.store.update_quiz_session(&updated).await {
            tracing::error!("Failed to save score of quiz {}: {}", updated.uuid(), e);
            return Err(e.into());
        }
        if let Some(quiz) = self
            .registry
            .lock()
            .await
            .session_quiz_mut(pending.chat_id, &pending.session_id)
        {
            quiz.session = updated.clone();
        }

        tracing::info!(
            "Correct answer to question #{}! Score updated to {}",
            pending.question_number,
            updated.score()
        );
        Ok(AnswerOutcome::Correct {
            score: updated.score(),
        })
    }

    /// Completes the chat's quiz and sends the results.
    /// Returns `None` when nothing was running.
    pub async fn finish_quiz(&self, chat_id: ChatId) -> Option<QuizSummary> {
        self.finish(chat_id, None).await
    }

    /// The chat's active session (optionally only if it is `session_id`) and
    /// the lock ordering its store writes.
    async fn active_session(
        &self,
        chat_id: ChatId,
        session_id: Option<Uuid>,
    ) -> Option<(Uuid, Arc<Mutex<()>>)> {
        let registry = self.registry.lock().await;
        let quiz = registry.quiz(chat_id)?;
        let current = *quiz.session().uuid();
        if session_id.is_some_and(|id| id != current) {
            return None;
        }
        Some((current, quiz.writes()))
    }

    async fn finish(&self, chat_id: ChatId, session_id: Option<Uuid>) -> Option<QuizSummary> {
        let (session_id, writes) = self.active_session(chat_id, session_id).await?;
        let _writing = writes.lock_owned().await;

        let session = {
            let mut registry = self.registry.lock().await;
            registry.session_quiz_mut(chat_id, &session_id)?;
            registry.remove_quiz(chat_id)?.session.completed()
        };
        if let Err(e) = self.store.update_quiz_session(&session).await {
            tracing::error!("Failed to mark quiz {} completed: {}", session.uuid(), e);
        }

        let summary = QuizSummary::of(&session);
        tracing::info!(
            "Quiz finished for {}: score {}/{} ({:.0}%)",
            session.owner_id(),
            summary.score,
            summary.total_questions,
            summary.percentage
        );

        if let Err(e) = self.transport.send_text(chat_id, summary.to_string()).await {
            tracing::error!("Failed to send quiz results to {}: {}", chat_id, e);
        }
        Some(summary)
    }

    /// Ends the chat's quiz early. Pending polls of the quiz stop counting.
    /// The quiz keeps running if its completion cannot be stored.
    #[instrument(level = "info", skip(self))]
    pub async fn stop_quiz(&self, chat_id: ChatId) -> Result<StopOutcome, QuizError> {
        let outcome = match self.active_session(chat_id, None).await {
            None => StopOutcome::NothingToStop,
            Some((session_id, writes)) => {
                let _writing = writes.lock_owned().await;
                let snapshot = self.registry.lock().await.quiz(chat_id).and_then(|quiz| {
                    (quiz.session().uuid() == &session_id)
                        .then(|| (quiz.session().completed(), quiz.current_question()))
                });

                match snapshot {
                    None => StopOutcome::NothingToStop,
                    Some((session, current_question)) => {
                        if let Err(e) = self.store.update_quiz_session(&session).await {
                            tracing::error!("Failed to stop quiz {}: {}", session_id, e);
                            return Err(e.into());
                        }
                        let mut registry = self.registry.lock().await;
                        if registry.session_quiz_mut(chat_id, &session_id).is_some() {
                            registry.remove_quiz(chat_id);
                        }

                        tracing::info!("Quiz {} stopped at question {}", session_id, current_question);
                        StopOutcome::Stopped {
                            current_question,
                            total_questions: session.total_questions(),
                        }
                    }
                }
            }
        };

        let text = match outcome {
            StopOutcome::Stopped {
                current_question,
                total_questions,
            } => format!(
                "⏹️ Quiz stopped!\n📊 Current Progress: {}/{}",
                current_question, total_questions
            ),
            StopOutcome::NothingToStop => "❌ No active quiz to stop.".to_owned(),
        };
        if let Err(e) = self.transport.send_text(chat_id, text).await {
            tracing::error!("Failed to report stop to {}: {}", chat_id, e);
        }

        Ok(outcome)
    }
}
