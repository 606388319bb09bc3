use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use teloxide::types::UserId;
use uuid::Uuid;

use crate::error::UnknownQuizType;

#[derive(Debug, Clone, PartialEq)]
pub struct SavedWord {
    uuid: Uuid,
    owner_id: UserId,
    headword: String,
    translation: String,
    added_at: DateTime<Utc>,
}

/// Which part of the owner's dictionary a quiz draws its questions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuizType {
    All,
    Recent,
    Random,
}

/// Durable record of one quiz run. The live control structure is
/// [`crate::state::ActiveQuiz`]; this row only tracks the outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    uuid: Uuid,
    owner_id: UserId,
    quiz_type: QuizType,
    score: u32,
    total_questions: u32,
    completed: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordOrder {
    OldestFirst,
    NewestFirst,
}

impl fmt::Display for SavedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.headword, self.translation)
    }
}

impl fmt::Display for QuizType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} quiz {}: {}/{}{}",
            self.quiz_type,
            self.uuid,
            self.score,
            self.total_questions,
            if self.completed { " (completed)" } else { "" }
        )
    }
}

impl FromStr for QuizType {
    type Err = UnknownQuizType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(QuizType::All),
            "recent" => Ok(QuizType::Recent),
            "random" => Ok(QuizType::Random),
            other => Err(UnknownQuizType(other.to_owned())),
        }
    }
}

impl QuizType {
    pub const ALL: [QuizType; 3] = [QuizType::All, QuizType::Recent, QuizType::Random];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuizType::All => "all",
            QuizType::Recent => "recent",
            QuizType::Random => "random",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuizType::All => "📚 All Words",
            QuizType::Recent => "🕐 Last 20 Words",
            QuizType::Random => "🎲 Random 20 Words",
        }
    }
}

impl SavedWord {
    pub fn new(owner_id: UserId, headword: String, translation: String) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            owner_id,
            headword,
            translation,
            added_at: Utc::now(),
        }
    }

    pub fn retreive(
        uuid: Uuid,
        owner_id: UserId,
        headword: String,
        translation: String,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid,
            owner_id,
            headword,
            translation,
            added_at,
        }
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn headword(&self) -> &str {
        &self.headword
    }

    pub fn translation(&self) -> &str {
        &self.translation
    }

    pub fn added_at(&self) -> &DateTime<Utc> {
        &self.added_at
    }
}

impl QuizSession {
    pub fn new(owner_id: UserId, quiz_type: QuizType, total_questions: u32) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            owner_id,
            quiz_type,
            score: 0,
            total_questions,
            completed: false,
            created_at: Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn retreive(
        uuid: Uuid,
        owner_id: UserId,
        quiz_type: QuizType,
        score: u32,
        total_questions: u32,
        completed: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid,
            owner_id,
            quiz_type,
            score,
            total_questions,
            completed,
            created_at,
        }
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn quiz_type(&self) -> QuizType {
        self.quiz_type
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    /// Copy of this session with one more correct answer.
    pub fn with_correct_answer(&self) -> Self {
        Self {
            score: self.score + 1,
            ..self.clone()
        }
    }

    pub fn completed(&self) -> Self {
        Self {
            completed: true,
            ..self.clone()
        }
    }
}
