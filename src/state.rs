use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use teloxide::types::{ChatId, UserId};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::vocabulary::{QuizSession, SavedWord};
use crate::quiz::question::{pick_question, Question};

/// A quiz currently running in one chat.
#[derive(Debug, Clone)]
pub struct ActiveQuiz {
    pub(crate) session: QuizSession,
    pub(crate) candidate_pool: Vec<SavedWord>,
    pub(crate) current_question: u32,
    pub(crate) used_word_ids: HashSet<Uuid>,
    /// Held while the session is being written to the store, so writes of
    /// one quiz land in order without holding the registry.
    writes: Arc<Mutex<()>>,
}

/// A poll that was sent and has not been answered yet.
#[derive(Debug, Clone)]
pub struct PendingPoll {
    pub(crate) chat_id: ChatId,
    pub(crate) session_id: Uuid,
    pub(crate) owner_id: UserId,
    pub(crate) correct_word: SavedWord,
    pub(crate) question_number: u32,
    pub(crate) correct_option: usize,
}

impl ActiveQuiz {
    pub fn new(session: QuizSession, candidate_pool: Vec<SavedWord>) -> Self {
        Self {
            session,
            candidate_pool,
            current_question: 0,
            used_word_ids: HashSet::new(),
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) fn writes(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.writes)
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn current_question(&self) -> u32 {
        self.current_question
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_question >= self.session.total_questions()
    }

    /// Advances the question counter and picks the next question.
    /// Returns `None` once every question has been asked.
    pub(crate) fn advance(&mut self, rng: &mut StdRng) -> Option<(u32, Question)> {
        if self.is_exhausted() {
            return None;
        }
        let question = pick_question(&self.candidate_pool, &mut self.used_word_ids, rng)?;
        self.current_question += 1;
        Some((self.current_question, question))
    }
}

/// All in-memory quiz state of the process. Callers serialize access
/// (the engine keeps it behind a mutex).
pub struct SessionRegistry {
    quizzes: HashMap<ChatId, ActiveQuiz>,
    polls: HashMap<String, PendingPoll>,
    rng: StdRng,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl SessionRegistry {
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            quizzes: HashMap::new(),
            polls: HashMap::new(),
            rng,
        }
    }

    pub fn is_running(&self, chat_id: ChatId) -> bool {
        self.quizzes.contains_key(&chat_id)
    }

    pub fn quiz(&self, chat_id: ChatId) -> Option<&ActiveQuiz> {
        self.quizzes.get(&chat_id)
    }

    /// The chat's quiz, but only while it is still the given session.
    pub fn session_quiz_mut(&mut self, chat_id: ChatId, session_id: &Uuid) -> Option<&mut ActiveQuiz> {
        self.quizzes
            .get_mut(&chat_id)
            .filter(|quiz| quiz.session.uuid() == session_id)
    }

    /// Fails (handing the quiz back) when the chat already runs one.
    pub fn insert_quiz(&mut self, chat_id: ChatId, quiz: ActiveQuiz) -> Result<(), ActiveQuiz> {
        if self.is_running(chat_id) {
            return Err(quiz);
        }
        self.quizzes.insert(chat_id, quiz);
        Ok(())
    }

    /// Removes the chat's quiz together with every poll still pending for it.
    pub fn remove_quiz(&mut self, chat_id: ChatId) -> Option<ActiveQuiz> {
        let quiz = self.quizzes.remove(&chat_id)?;
        let session_id = *quiz.session.uuid();
        self.polls.retain(|_, poll| poll.session_id != session_id);
        Some(quiz)
    }

    pub fn advance(&mut self, chat_id: ChatId, session_id: &Uuid) -> Option<(u32, Question)> {
        let quiz = self.quizzes.get_mut(&chat_id)?;
        if quiz.session.uuid() != session_id {
            return None;
        }
        quiz.advance(&mut self.rng)
    }

    /// Up to `amount` words drawn uniformly without replacement.
    pub fn sample(&mut self, mut words: Vec<SavedWord>, amount: usize) -> Vec<SavedWord> {
        words.shuffle(&mut self.rng);
        words.truncate(amount);
        words
    }

    pub fn register_poll(&mut self, poll_id: String, poll: PendingPoll) {
        self.polls.insert(poll_id, poll);
    }

    pub fn poll(&self, poll_id: &str) -> Option<&PendingPoll> {
        self.polls.get(poll_id)
    }

    pub fn take_poll(&mut self, poll_id: &str) -> Option<PendingPoll> {
        self.polls.remove(poll_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::vocabulary::QuizType;

    fn quiz(words: usize) -> ActiveQuiz {
        let owner = UserId(5);
        let pool = (0..words)
            .map(|i| SavedWord::new(owner, format!("w{i}"), format!("t{i}")))
            .collect::<Vec<_>>();
        let total = pool.len().min(20) as u32;
        ActiveQuiz::new(QuizSession::new(owner, QuizType::All, total), pool)
    }

    fn pending(chat_id: ChatId, quiz: &ActiveQuiz) -> PendingPoll {
        PendingPoll {
            chat_id,
            session_id: *quiz.session.uuid(),
            owner_id: quiz.session.owner_id(),
            correct_word: quiz.candidate_pool[0].clone(),
            question_number: 1,
            correct_option: 0,
        }
    }

    #[test]
    fn one_quiz_per_chat() {
        let mut registry = SessionRegistry::with_rng(StdRng::seed_from_u64(1));
        let chat = ChatId(10);

        assert!(registry.insert_quiz(chat, quiz(4)).is_ok());
        assert!(registry.insert_quiz(chat, quiz(5)).is_err());
        assert_eq!(registry.quiz(chat).unwrap().candidate_pool.len(), 4);
        assert!(registry.insert_quiz(ChatId(11), quiz(5)).is_ok());
    }

    #[test]
    fn removing_a_quiz_drops_its_pending_polls() {
        let mut registry = SessionRegistry::with_rng(StdRng::seed_from_u64(1));
        let (first, second) = (quiz(4), quiz(4));
        registry.register_poll("a".into(), pending(ChatId(1), &first));
        registry.register_poll("b".into(), pending(ChatId(2), &second));
        registry.insert_quiz(ChatId(1), first).unwrap();
        registry.insert_quiz(ChatId(2), second).unwrap();

        assert!(registry.remove_quiz(ChatId(1)).is_some());
        assert!(registry.poll("a").is_none());
        assert!(registry.poll("b").is_some());
        assert!(registry.remove_quiz(ChatId(1)).is_none());
    }

    #[test]
    fn advance_is_bounded_by_total_questions() {
        let mut registry = SessionRegistry::with_rng(StdRng::seed_from_u64(2));
        let chat = ChatId(3);
        let active = quiz(4);
        let session_id = *active.session.uuid();
        registry.insert_quiz(chat, active).unwrap();

        for expected in 1..=4 {
            let (number, _) = registry.advance(chat, &session_id).unwrap();
            assert_eq!(number, expected);
        }
        assert!(registry.advance(chat, &session_id).is_none());
        assert!(registry.quiz(chat).unwrap().is_exhausted());
        assert!(registry.advance(chat, &Uuid::new_v4()).is_none());
    }

    #[test]
    fn sample_draws_distinct_words_of_the_pool() {
        let mut registry = SessionRegistry::with_rng(StdRng::seed_from_u64(3));
        let pool = quiz(35).candidate_pool;
        let pool_ids: HashSet<Uuid> = pool.iter().map(|word| *word.uuid()).collect();

        let drawn = registry.sample(pool.clone(), 20);
        let drawn_ids: HashSet<Uuid> = drawn.iter().map(|word| *word.uuid()).collect();
        assert_eq!(drawn.len(), 20);
        assert_eq!(drawn_ids.len(), 20);
        assert!(drawn_ids.is_subset(&pool_ids));

        let small = registry.sample(pool[..6].to_vec(), 20);
        assert_eq!(small.len(), 6);
    }
}
