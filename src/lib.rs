//! Spaced repetition scheduling core for Repeat
//!
//! This crate provides:
//! - A pure scheduling engine ([`algorithm::transition`]): one review in,
//!   one new schedule state out
//! - Deterministic study queue construction ([`queue::build_queue`]) under
//!   daily new-card limits
//! - File-backed persistence of decks, cards and schedule state
//!   ([`storage::DeckStorage`]), including per-day counters and a review log

pub mod algorithm;
pub mod models;
pub mod queue;
pub mod storage;

pub use algorithm::{transition, ScheduleError};
pub use models::*;
pub use queue::build_queue;
pub use storage::{DayCounter, DeckStorage, StateRecord, StorageError};
