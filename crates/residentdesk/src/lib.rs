//! `residentdesk` - Resident feedback and maintenance tickets for a housing complex
//!
//! This library provides the validation, storage and web front end behind the
//! `resdesk` binary: residents rate the complex and report maintenance
//! problems, and every accepted submission is appended to a durable store.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod desk;
pub mod error;
pub mod logging;
pub mod records;
pub mod server;
pub mod storage;
pub mod validation;

pub use config::Config;
pub use desk::{Desk, Submission};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use records::{Collection, FeedbackRecord, TicketRecord};
pub use storage::{open_store, Store, StoreStats};
pub use validation::{FeedbackForm, Rejection, TicketForm};
