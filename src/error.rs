use thiserror::Error;

use crate::database::connection::StoreError;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("not enough words for a quiz: {available} saved, at least {required} needed")]
    NotEnoughWords { available: usize, required: usize },
    #[error("a quiz is already running in this chat")]
    AlreadyRunning,
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown quiz type '{0}'")]
pub struct UnknownQuizType(pub String);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} should be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}
