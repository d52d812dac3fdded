//! Result computation, visibility rules and vote recording for campus
//! elections, over a SQLite store.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod tasks;
pub mod voting;

pub use error::{Result, VoteError};
