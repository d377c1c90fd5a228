pub mod calendar;
pub mod commands;
pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod recurrence;
pub mod stats;
pub mod storage;

pub use error::{Error, Result};
