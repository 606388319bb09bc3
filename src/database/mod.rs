pub mod connection;
pub mod vocabulary;
