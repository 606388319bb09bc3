pub mod callback;
pub mod commands;
pub mod config;
pub mod database;
pub mod dictionary;
pub mod error;
pub mod keyboard;
pub mod quiz;
pub mod runner;
pub mod schema;
pub mod state;
pub mod translator;
pub mod transport;
pub mod web;

#[cfg(test)]
mod testing;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;
type HandlerResult = Result<(), BoxedError>;

const GENERIC_FAILURE: &str = "❌ An error occurred. Please try again later.";
