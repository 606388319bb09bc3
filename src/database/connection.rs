use std::{borrow::Cow, error::Error, future::Future};

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use teloxide::types::UserId;
use uuid::Uuid;

use super::vocabulary::{QuizSession, QuizType, SavedWord, WordOrder};

pub type StoreError = Box<dyn Error + Send + Sync>;
type StoreResult<T> = Result<T, StoreError>;

pub struct Connection {
    pool: PgPool,
}

impl Connection {
    pub async fn connect<'a>(connection_string: Cow<'a, str>) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> StoreResult<()> {
        tracing::info!("Applying database migrations");
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

pub trait RegisterUser {
    fn get_or_create_user(
        &self,
        user_id: UserId,
        username: Option<&str>,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}

pub trait RetrieveWords {
    fn list_words(
        &self,
        owner_id: UserId,
        order: WordOrder,
        limit: Option<usize>,
    ) -> impl Future<Output = StoreResult<Vec<SavedWord>>> + Send;

    fn count_words(&self, owner_id: UserId) -> impl Future<Output = StoreResult<usize>> + Send;
}

pub trait CreateWord {
    /// Returns `None` when the owner already saved this headword.
    fn create_word(
        &self,
        owner_id: UserId,
        headword: &str,
        translation: &str,
    ) -> impl Future<Output = StoreResult<Option<SavedWord>>> + Send;
}

pub trait DeleteWord {
    /// Returns the removed word, or `None` if the owner has no such word.
    fn delete_word(
        &self,
        word_id: Uuid,
        owner_id: UserId,
    ) -> impl Future<Output = StoreResult<Option<SavedWord>>> + Send;
}

pub trait CreateQuizSession {
    fn create_quiz_session(
        &self,
        owner_id: UserId,
        quiz_type: QuizType,
        total_questions: u32,
    ) -> impl Future<Output = StoreResult<QuizSession>> + Send;
}

pub trait UpdateQuizSession {
    fn update_quiz_session(
        &self,
        session: &QuizSession,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}

pub trait Ping {
    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Everything the quiz engine touches.
pub trait QuizStore:
    RetrieveWords + CreateQuizSession + UpdateQuizSession + Send + Sync + 'static
{
}

impl<T> QuizStore for T where
    T: RetrieveWords + CreateQuizSession + UpdateQuizSession + Send + Sync + 'static
{
}

/// Everything the conversation handlers touch.
pub trait VocabularyStore: QuizStore + RegisterUser + CreateWord + DeleteWord {}

impl<T> VocabularyStore for T where T: QuizStore + RegisterUser + CreateWord + DeleteWord {}

#[derive(sqlx::FromRow)]
struct WordRecord {
    uuid: Uuid,
    owner_id: i64,
    headword: String,
    translation: String,
    added_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct QuizSessionRecord {
    uuid: Uuid,
    owner_id: i64,
    quiz_type: String,
    score: i32,
    total_questions: i32,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl From<WordRecord> for SavedWord {
    fn from(record: WordRecord) -> Self {
        SavedWord::retreive(
            record.uuid,
            UserId(record.owner_id as u64),
            record.headword,
            record.translation,
            record.added_at,
        )
    }
}

impl TryFrom<QuizSessionRecord> for QuizSession {
    type Error = StoreError;

    fn try_from(record: QuizSessionRecord) -> Result<Self, Self::Error> {
        Ok(QuizSession::retreive(
            record.uuid,
            UserId(record.owner_id as u64),
            record.quiz_type.parse()?,
            u32::try_from(record.score)?,
            u32::try_from(record.total_questions)?,
            record.completed,
            record.created_at,
        ))
    }
}

fn owner_key(user_id: UserId) -> i64 {
    user_id.0 as i64
}

impl RegisterUser for Connection {
    async fn get_or_create_user(&self, user_id: UserId, username: Option<&str>) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (telegram_id, username) VALUES ($1, $2)
             ON CONFLICT (telegram_id) DO UPDATE SET username = COALESCE(EXCLUDED.username, users.username)",
        )
        .bind(owner_key(user_id))
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl RetrieveWords for Connection {
    async fn list_words(
        &self,
        owner_id: UserId,
        order: WordOrder,
        limit: Option<usize>,
    ) -> StoreResult<Vec<SavedWord>> {
        let sql = match order {
            WordOrder::OldestFirst => {
                "SELECT uuid, owner_id, headword, translation, added_at FROM words
                 WHERE owner_id = $1 ORDER BY added_at ASC LIMIT $2"
            }
            WordOrder::NewestFirst => {
                "SELECT uuid, owner_id, headword, translation, added_at FROM words
                 WHERE owner_id = $1 ORDER BY added_at DESC LIMIT $2"
            }
        };
        // LIMIT NULL means no limit in Postgres.
        let limit = limit.map(i64::try_from).transpose()?;

        let records = sqlx::query_as::<_, WordRecord>(sql)
            .bind(owner_key(owner_id))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(SavedWord::from).collect())
    }

    async fn count_words(&self, owner_id: UserId) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM words WHERE owner_id = $1")
            .bind(owner_key(owner_id))
            .fetch_one(&self.pool)
            .await?;

        Ok(usize::try_from(count)?)
    }
}

impl CreateWord for Connection {
    async fn create_word(
        &self,
        owner_id: UserId,
        headword: &str,
        translation: &str,
    ) -> StoreResult<Option<SavedWord>> {
        let word = SavedWord::new(owner_id, headword.to_owned(), translation.to_owned());
        tracing::debug!("Adding word {} with uuid {}", word.headword(), word.uuid());

        let record = sqlx::query_as::<_, WordRecord>(
            "INSERT INTO words (uuid, owner_id, headword, translation, added_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (owner_id, headword) DO NOTHING
             RETURNING uuid, owner_id, headword, translation, added_at",
        )
        .bind(word.uuid())
        .bind(owner_key(owner_id))
        .bind(word.headword())
        .bind(word.translation())
        .bind(word.added_at())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(SavedWord::from))
    }
}

impl DeleteWord for Connection {
    async fn delete_word(&self, word_id: Uuid, owner_id: UserId) -> StoreResult<Option<SavedWord>> {
        let record = sqlx::query_as::<_, WordRecord>(
            "DELETE FROM words WHERE uuid = $1 AND owner_id = $2
             RETURNING uuid, owner_id, headword, translation, added_at",
        )
        .bind(word_id)
        .bind(owner_key(owner_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(SavedWord::from))
    }
}

impl CreateQuizSession for Connection {
    async fn create_quiz_session(
        &self,
        owner_id: UserId,
        quiz_type: QuizType,
        total_questions: u32,
    ) -> StoreResult<QuizSession> {
        let session = QuizSession::new(owner_id, quiz_type, total_questions);

        let record = sqlx::query_as::<_, QuizSessionRecord>(
            "INSERT INTO quiz_sessions (uuid, owner_id, quiz_type, score, total_questions, completed, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING uuid, owner_id, quiz_type, score, total_questions, completed, created_at",
        )
        .bind(session.uuid())
        .bind(owner_key(owner_id))
        .bind(quiz_type.as_str())
        .bind(i32::try_from(session.score())?)
        .bind(i32::try_from(total_questions)?)
        .bind(session.is_completed())
        .bind(session.created_at())
        .fetch_one(&self.pool)
        .await?;

        QuizSession::try_from(record)
    }
}

impl UpdateQuizSession for Connection {
    async fn update_quiz_session(&self, session: &QuizSession) -> StoreResult<()> {
        let updated = sqlx::query("UPDATE quiz_sessions SET score = $1, completed = $2 WHERE uuid = $3")
            .bind(i32::try_from(session.score())?)
            .bind(session.is_completed())
            .bind(session.uuid())
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(format!("quiz session {} does not exist", session.uuid()).into());
        }

        Ok(())
    }
}

impl Ping for Connection {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
