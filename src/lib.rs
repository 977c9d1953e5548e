//! Intake Assist — scripted intake chat with streamed acknowledgements.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod reply;
pub mod reveal;
pub mod script;
pub mod server;
pub mod transcript;
