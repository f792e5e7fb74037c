//! Data models for decks, cards and per-card scheduling state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Interval (days) at or above which a review-phase card counts as mastered
pub const MASTERED_INTERVAL: i32 = 21;

/// A deck is a named collection of flashcards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub card_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            card_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A flashcard with question (front) and answer (back)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub front: String,
    pub back: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(deck_id: Uuid, front: String, back: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            deck_id,
            front,
            back,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Phase of a card in the spaced repetition lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Never reviewed
    New,
    /// In short-interval acquisition steps
    Learning,
    /// Long-interval spaced review
    Review,
}

impl Default for Phase {
    fn default() -> Self {
        Self::New
    }
}

/// Current spaced repetition state for a card.
///
/// Owned by the card record, mutated only by [`crate::algorithm::transition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    pub card_id: Uuid,
    /// Current lifecycle phase
    #[serde(default)]
    pub phase: Phase,
    /// Ease factor, never below `MIN_EASE_FACTOR` (default 2.5)
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f32,
    /// Current interval in days; meaningful in the Review phase
    #[serde(default)]
    pub interval_days: i32,
    /// Index into `LEARNING_STEPS`; meaningful in the Learning phase
    #[serde(default)]
    pub learning_step: usize,
    /// Consecutive successful review-phase reviews since the last lapse
    #[serde(default)]
    pub repetitions: i32,
    /// When the card was last reviewed; unset for New cards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// When the card next becomes eligible for study
    pub due_at: DateTime<Utc>,
}

fn default_ease_factor() -> f32 {
    2.5
}

impl ScheduleState {
    /// Initial state for a freshly created card: New, always due
    pub fn new(card_id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            card_id,
            phase: Phase::New,
            ease_factor: default_ease_factor(),
            interval_days: 0,
            learning_step: 0,
            repetitions: 0,
            last_reviewed_at: None,
            due_at: created_at,
        }
    }

    /// Check if the card is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    pub fn is_new(&self) -> bool {
        self.phase == Phase::New
    }

    pub fn is_learning(&self) -> bool {
        self.phase == Phase::Learning
    }

    /// A card counts as mastered once its review interval reaches three weeks
    pub fn is_mastered(&self) -> bool {
        self.phase == Phase::Review && self.interval_days >= MASTERED_INTERVAL
    }
}

/// A record of a single review attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub id: Uuid,
    pub card_id: Uuid,
    /// Quality rating (1-5): <3 Again, 3 Hard, 4 Good, 5 Easy
    pub quality: i32,
    /// Interval (days) after the review
    pub interval_days: i32,
    /// Ease factor after the review
    pub ease_factor: f32,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn new(card_id: Uuid, quality: i32, state: &ScheduleState, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            quality,
            interval_days: state.interval_days,
            ease_factor: state.ease_factor,
            reviewed_at,
        }
    }
}

/// Study settings that feed queue construction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyConfig {
    /// Maximum new cards introduced per calendar day
    #[serde(default = "default_cards_per_day")]
    pub cards_per_day: i32,
    /// Whether new cards are introduced on Saturdays and Sundays
    #[serde(default = "default_weekend_study")]
    pub weekend_study: bool,
}

fn default_cards_per_day() -> i32 {
    20
}

fn default_weekend_study() -> bool {
    true
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            cards_per_day: default_cards_per_day(),
            weekend_study: default_weekend_study(),
        }
    }
}

/// Derived statistics for a deck; computed on demand, never stored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckStats {
    pub total_cards: usize,
    pub new_cards: usize,
    pub learning_cards: usize,
    pub review_cards: usize,
    pub due_cards: usize,
    pub mastered_cards: usize,
}

/// A card with its current state, used for review sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardWithState {
    pub card: Card,
    pub state: ScheduleState,
}
