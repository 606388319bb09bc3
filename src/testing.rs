//! In-memory stand-ins for the database and Telegram used by unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use chrono::{Duration, TimeZone, Utc};
use teloxide::types::{ChatId, UserId};
use uuid::Uuid;

use crate::{
    database::{
        connection::{
            CreateQuizSession, CreateWord, DeleteWord, RegisterUser, RetrieveWords, StoreError,
            UpdateQuizSession,
        },
        vocabulary::{QuizSession, QuizType, SavedWord, WordOrder},
    },
    translator::{Language, ProviderError, TranslationProvider},
    transport::{QuizPoll, QuizTransport, TransportError},
};

#[derive(Default)]
pub(crate) struct MemoryStore {
    users: Mutex<HashMap<UserId, Option<String>>>,
    words: Mutex<Vec<SavedWord>>,
    sessions: Mutex<HashMap<Uuid, QuizSession>>,
    failing_updates: AtomicBool,
    failing_lookups: AtomicBool,
    latency: Mutex<std::time::Duration>,
}

impl MemoryStore {
    /// `count` words added one minute apart, oldest first.
    pub(crate) fn with_words(owner_id: UserId, count: usize) -> Self {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let words = (0..count)
            .map(|i| {
                SavedWord::retreive(
                    Uuid::new_v4(),
                    owner_id,
                    format!("word{i}"),
                    format!("перевод{i}"),
                    base + Duration::minutes(i as i64),
                )
            })
            .collect();

        Self {
            words: Mutex::new(words),
            ..Self::default()
        }
    }

    pub(crate) fn session(&self, session_id: &Uuid) -> Option<QuizSession> {
        self.sessions.lock().unwrap().get(session_id).cloned()
    }

    pub(crate) fn sessions(&self) -> Vec<QuizSession> {
        self.sessions.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub(crate) fn words_newest_first(&self, owner_id: UserId) -> Vec<SavedWord> {
        let mut words: Vec<SavedWord> = self
            .words
            .lock()
            .unwrap()
            .iter()
            .filter(|word| word.owner_id() == owner_id)
            .cloned()
            .collect();
        words.sort_by(|a, b| b.added_at().cmp(a.added_at()));
        words
    }

    pub(crate) fn is_registered(&self, user_id: UserId) -> bool {
        self.users.lock().unwrap().contains_key(&user_id)
    }

    pub(crate) fn fail_updates(&self, failing: bool) {
        self.failing_updates.store(failing, Ordering::SeqCst);
    }

    /// Makes user and word lookups fail.
    pub(crate) fn fail_lookups(&self, failing: bool) {
        self.failing_lookups.store(failing, Ordering::SeqCst);
    }

    /// Delays every word listing and session write by `latency`.
    pub(crate) fn slow_down(&self, latency: std::time::Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    async fn wait(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_lookup(&self) -> Result<(), StoreError> {
        if self.failing_lookups.load(Ordering::SeqCst) {
            return Err("connection pool timed out".into());
        }
        Ok(())
    }
}

impl RegisterUser for MemoryStore {
    async fn get_or_create_user(&self, user_id: UserId, username: Option<&str>) -> Result<(), StoreError> {
        self.check_lookup()?;
        self.users
            .lock()
            .unwrap()
            .insert(user_id, username.map(str::to_owned));
        Ok(())
    }
}

impl RetrieveWords for MemoryStore {
    async fn list_words(
        &self,
        owner_id: UserId,
        order: WordOrder,
        limit: Option<usize>,
    ) -> Result<Vec<SavedWord>, StoreError> {
        self.check_lookup()?;
        self.wait().await;
        let mut words = self.words_newest_first(owner_id);
        if order == WordOrder::OldestFirst {
            words.reverse();
        }
        if let Some(limit) = limit {
            words.truncate(limit);
        }
        Ok(words)
    }

    async fn count_words(&self, owner_id: UserId) -> Result<usize, StoreError> {
        self.check_lookup()?;
        Ok(self.words_newest_first(owner_id).len())
    }
}

impl CreateWord for MemoryStore {
    async fn create_word(
        &self,
        owner_id: UserId,
        headword: &str,
        translation: &str,
    ) -> Result<Option<SavedWord>, StoreError> {
        let mut words = self.words.lock().unwrap();
        if words
            .iter()
            .any(|word| word.owner_id() == owner_id && word.headword() == headword)
        {
            return Ok(None);
        }
        let word = SavedWord::new(owner_id, headword.to_owned(), translation.to_owned());
        words.push(word.clone());
        Ok(Some(word))
    }
}

impl DeleteWord for MemoryStore {
    async fn delete_word(&self, word_id: Uuid, owner_id: UserId) -> Result<Option<SavedWord>, StoreError> {
        let mut words = self.words.lock().unwrap();
        let position = words
            .iter()
            .position(|word| word.uuid() == &word_id && word.owner_id() == owner_id);
        Ok(position.map(|index| words.remove(index)))
    }
}

impl CreateQuizSession for MemoryStore {
    async fn create_quiz_session(
        &self,
        owner_id: UserId,
        quiz_type: QuizType,
        total_questions: u32,
    ) -> Result<QuizSession, StoreError> {
        let session = QuizSession::new(owner_id, quiz_type, total_questions);
        self.sessions
            .lock()
            .unwrap()
            .insert(*session.uuid(), session.clone());
        Ok(session)
    }
}

impl UpdateQuizSession for MemoryStore {
    async fn update_quiz_session(&self, session: &QuizSession) -> Result<(), StoreError> {
        self.wait().await;
        if self.failing_updates.load(Ordering::SeqCst) {
            return Err("database is unavailable".into());
        }
        self.sessions
            .lock()
            .unwrap()
            .insert(*session.uuid(), session.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SentPoll {
    pub(crate) chat_id: ChatId,
    pub(crate) poll_id: String,
    pub(crate) poll: QuizPoll,
}

#[derive(Default)]
pub(crate) struct RecordingTransport {
    polls: Mutex<Vec<SentPoll>>,
    texts: Mutex<Vec<(ChatId, String)>>,
    failing_polls: AtomicBool,
}

impl RecordingTransport {
    pub(crate) fn polls(&self) -> Vec<SentPoll> {
        self.polls.lock().unwrap().clone()
    }

    pub(crate) fn last_poll(&self) -> Option<SentPoll> {
        self.polls.lock().unwrap().last().cloned()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub(crate) fn fail_polls(&self, failing: bool) {
        self.failing_polls.store(failing, Ordering::SeqCst);
    }
}

impl QuizTransport for RecordingTransport {
    async fn send_text(&self, chat_id: ChatId, text: String) -> Result<(), TransportError> {
        self.texts.lock().unwrap().push((chat_id, text));
        Ok(())
    }

    async fn send_quiz_poll(&self, chat_id: ChatId, poll: QuizPoll) -> Result<String, TransportError> {
        if self.failing_polls.load(Ordering::SeqCst) {
            return Err("Bad Request: poll can't be sent".into());
        }
        let mut polls = self.polls.lock().unwrap();
        let poll_id = format!("poll-{}", polls.len() + 1);
        polls.push(SentPoll {
            chat_id,
            poll_id: poll_id.clone(),
            poll,
        });
        Ok(poll_id)
    }
}

/// A translation service that always gives the same answer, or fails.
pub(crate) struct FixedTranslation(pub(crate) Option<&'static str>);

impl TranslationProvider for FixedTranslation {
    async fn translate(
        &self,
        _text: &str,
        _source: Language,
        _target: Language,
    ) -> Result<String, ProviderError> {
        self.0
            .map(str::to_owned)
            .ok_or_else(|| "translation service is down".into())
    }
}
