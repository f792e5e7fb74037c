//! Storage operations for decks, cards and schedule state
//!
//! Directory layout under the base path:
//! ```text
//! <base>/
//! ├── decks.json                  # Array of all decks
//! ├── settings.json               # StudyConfig
//! ├── cards/{card-id}.json        # Individual card files
//! ├── states/{card-id}.json       # Schedule state, wrapped in a revision envelope
//! ├── counters/{YYYY-MM-DD}.json  # Per-day new-card / review tallies
//! └── reviews/{YYYY-MM-DD}.json   # Per-day review log
//! ```
//!
//! Review submissions use an optimistic revision check: the state is loaded,
//! transitioned, and written back only if the on-disk revision is unchanged.
//! Two racing submissions for the same card make one of them reload and
//! retry, so each submitted review produces exactly one logical transition.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::algorithm::{transition, ScheduleError};
use crate::models::{Card, CardWithState, Deck, DeckStats, ReviewRecord, ScheduleState, StudyConfig};
use crate::queue::build_queue;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deck not found: {0}")]
    DeckNotFound(Uuid),

    #[error("Card not found: {0}")]
    CardNotFound(Uuid),

    #[error("Concurrent update conflict on card {0}")]
    ConcurrentUpdateConflict(Uuid),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Retries before a review submission gives up on revision conflicts
const MAX_CONFLICT_RETRIES: u32 = 3;

/// Persisted envelope around a card's schedule state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    /// Bumped on every write; the optimistic concurrency token
    pub revision: u64,
    pub state: ScheduleState,
}

/// Per-day study tallies (UTC calendar days)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCounter {
    pub date: NaiveDate,
    /// New cards that received their first review today
    pub new_introduced: i32,
    /// Total reviews submitted today
    pub reviews: i32,
}

impl DayCounter {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            new_introduced: 0,
            reviews: 0,
        }
    }
}

/// File-backed storage for decks, cards and scheduling state
pub struct DeckStorage {
    base_path: PathBuf,
}

impl DeckStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn decks_path(&self) -> PathBuf {
        self.base_path.join("decks.json")
    }

    fn settings_path(&self) -> PathBuf {
        self.base_path.join("settings.json")
    }

    fn cards_dir(&self) -> PathBuf {
        self.base_path.join("cards")
    }

    fn states_dir(&self) -> PathBuf {
        self.base_path.join("states")
    }

    fn counters_dir(&self) -> PathBuf {
        self.base_path.join("counters")
    }

    fn reviews_dir(&self) -> PathBuf {
        self.base_path.join("reviews")
    }

    fn card_path(&self, card_id: Uuid) -> PathBuf {
        self.cards_dir().join(format!("{}.json", card_id))
    }

    fn state_path(&self, card_id: Uuid) -> PathBuf {
        self.states_dir().join(format!("{}.json", card_id))
    }

    fn counter_path(&self, date: NaiveDate) -> PathBuf {
        self.counters_dir().join(format!("{}.json", date))
    }

    fn reviews_path(&self, date: NaiveDate) -> PathBuf {
        self.reviews_dir().join(format!("{}.json", date))
    }

    /// Initialize the storage directories
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        fs::create_dir_all(self.cards_dir())?;
        fs::create_dir_all(self.states_dir())?;
        fs::create_dir_all(self.counters_dir())?;
        fs::create_dir_all(self.reviews_dir())?;

        let decks_path = self.decks_path();
        if !decks_path.exists() {
            let empty: Vec<Deck> = Vec::new();
            fs::write(&decks_path, serde_json::to_string_pretty(&empty)?)?;
        }

        Ok(())
    }

    // ==================== Settings ====================

    /// Load the study settings, falling back to defaults
    pub fn get_config(&self) -> Result<StudyConfig> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(StudyConfig::default());
        }

        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn update_config(&self, config: &StudyConfig) -> Result<()> {
        self.init()?;
        fs::write(self.settings_path(), serde_json::to_string_pretty(config)?)?;
        Ok(())
    }

    // ==================== Deck Operations ====================

    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        let decks_path = self.decks_path();
        if !decks_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&decks_path)?;
        let decks: Vec<Deck> = serde_json::from_str(&content)?;
        Ok(decks)
    }

    pub fn get_deck(&self, deck_id: Uuid) -> Result<Deck> {
        self.list_decks()?
            .into_iter()
            .find(|d| d.id == deck_id)
            .ok_or(StorageError::DeckNotFound(deck_id))
    }

    pub fn create_deck(&self, name: String, description: Option<String>) -> Result<Deck> {
        self.init()?;

        let mut deck = Deck::new(name);
        deck.description = description;

        let mut decks = self.list_decks()?;
        decks.push(deck.clone());
        fs::write(self.decks_path(), serde_json::to_string_pretty(&decks)?)?;

        Ok(deck)
    }

    pub fn update_deck(&self, deck: &Deck) -> Result<()> {
        let mut decks = self.list_decks()?;
        let pos = decks
            .iter()
            .position(|d| d.id == deck.id)
            .ok_or(StorageError::DeckNotFound(deck.id))?;

        decks[pos] = deck.clone();
        fs::write(self.decks_path(), serde_json::to_string_pretty(&decks)?)?;

        Ok(())
    }

    /// Delete a deck and all its cards
    pub fn delete_deck(&self, deck_id: Uuid) -> Result<()> {
        for card in self.list_cards(deck_id)? {
            self.delete_card(card.id)?;
        }

        let mut decks = self.list_decks()?;
        decks.retain(|d| d.id != deck_id);
        fs::write(self.decks_path(), serde_json::to_string_pretty(&decks)?)?;

        log::info!("deleted deck {}", deck_id);
        Ok(())
    }

    fn update_deck_card_count(&self, deck_id: Uuid) -> Result<()> {
        let cards = self.list_cards(deck_id)?;
        let mut deck = self.get_deck(deck_id)?;
        deck.card_count = cards.len();
        deck.updated_at = Utc::now();
        self.update_deck(&deck)
    }

    // ==================== Card Operations ====================

    pub fn list_cards(&self, deck_id: Uuid) -> Result<Vec<Card>> {
        let cards_dir = self.cards_dir();
        if !cards_dir.exists() {
            return Ok(Vec::new());
        }

        let mut cards = Vec::new();
        for entry in fs::read_dir(&cards_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                let card: Card = serde_json::from_str(&content)?;
                if card.deck_id == deck_id {
                    cards.push(card);
                }
            }
        }

        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(cards)
    }

    pub fn get_card(&self, card_id: Uuid) -> Result<Card> {
        let card_path = self.card_path(card_id);
        if !card_path.exists() {
            return Err(StorageError::CardNotFound(card_id));
        }

        let content = fs::read_to_string(&card_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Create a card together with its initial (New, always due) state
    pub fn create_card(&self, deck_id: Uuid, front: String, back: String) -> Result<Card> {
        self.get_deck(deck_id)?;
        self.init()?;

        let card = Card::new(deck_id, front, back);
        fs::write(self.card_path(card.id), serde_json::to_string_pretty(&card)?)?;

        let record = StateRecord {
            revision: 0,
            state: ScheduleState::new(card.id, card.created_at),
        };
        fs::write(self.state_path(card.id), serde_json::to_string_pretty(&record)?)?;

        self.update_deck_card_count(deck_id)?;

        Ok(card)
    }

    /// Update a card's content; scheduling state is untouched
    pub fn update_card(&self, card_id: Uuid, front: String, back: String) -> Result<Card> {
        let mut card = self.get_card(card_id)?;
        card.front = front;
        card.back = back;
        card.updated_at = Utc::now();

        fs::write(self.card_path(card.id), serde_json::to_string_pretty(&card)?)?;
        Ok(card)
    }

    /// Delete a card and discard its schedule state
    pub fn delete_card(&self, card_id: Uuid) -> Result<()> {
        let card = self.get_card(card_id)?;

        fs::remove_file(self.card_path(card_id))?;
        let state_path = self.state_path(card_id);
        if state_path.exists() {
            fs::remove_file(&state_path)?;
        }

        self.update_deck_card_count(card.deck_id)?;

        log::info!("deleted card {}", card_id);
        Ok(())
    }

    // ==================== State Operations ====================

    /// Load the schedule state (and its revision) for a card
    pub fn get_state(&self, card_id: Uuid) -> Result<StateRecord> {
        let state_path = self.state_path(card_id);
        if !state_path.exists() {
            // Cards persisted before state tracking start out fresh
            let card = self.get_card(card_id)?;
            return Ok(StateRecord {
                revision: 0,
                state: ScheduleState::new(card_id, card.created_at),
            });
        }

        let content = fs::read_to_string(&state_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn card_with_state(&self, card_id: Uuid) -> Result<CardWithState> {
        let card = self.get_card(card_id)?;
        let record = self.get_state(card_id)?;
        Ok(CardWithState {
            card,
            state: record.state,
        })
    }

    /// Write a state only if the on-disk revision still matches
    fn write_state_if(&self, state: &ScheduleState, expected_revision: u64) -> Result<StateRecord> {
        let state_path = self.state_path(state.card_id);
        let current = if state_path.exists() {
            let content = fs::read_to_string(&state_path)?;
            let record: StateRecord = serde_json::from_str(&content)?;
            record.revision
        } else {
            0
        };

        if current != expected_revision {
            return Err(StorageError::ConcurrentUpdateConflict(state.card_id));
        }

        let record = StateRecord {
            revision: expected_revision + 1,
            state: state.clone(),
        };
        fs::write(&state_path, serde_json::to_string_pretty(&record)?)?;
        Ok(record)
    }

    // ==================== Review Operations ====================

    /// Submit a review for a card: load, transition, persist, return.
    ///
    /// An out-of-range quality changes nothing on disk. A revision conflict
    /// reloads the fresh state and retries the transition against it.
    pub fn submit_review(
        &self,
        card_id: Uuid,
        quality: i32,
        now: DateTime<Utc>,
    ) -> Result<ScheduleState> {
        let mut attempts = 0;
        loop {
            let record = self.get_state(card_id)?;
            let was_new = record.state.is_new();
            let next = transition(&record.state, quality, now)?;

            match self.write_state_if(&next, record.revision) {
                Ok(_) => {
                    self.bump_day_counter(now.date_naive(), was_new)?;
                    self.log_review(&ReviewRecord::new(card_id, quality, &next, now))?;
                    log::debug!(
                        "review card={} quality={} phase={:?} interval={}d due={}",
                        card_id,
                        quality,
                        next.phase,
                        next.interval_days,
                        next.due_at
                    );
                    return Ok(next);
                }
                Err(StorageError::ConcurrentUpdateConflict(_)) if attempts < MAX_CONFLICT_RETRIES => {
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Ordered study queue for a deck, using the stored settings and the
    /// persisted tally of new cards already introduced today
    pub fn due_queue(&self, deck_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let config = self.get_config()?;
        self.due_queue_with(deck_id, now, config.cards_per_day, config.weekend_study)
    }

    /// Same as [`due_queue`](Self::due_queue) with explicit limits
    pub fn due_queue_with(
        &self,
        deck_id: Uuid,
        now: DateTime<Utc>,
        cards_per_day: i32,
        weekend_study: bool,
    ) -> Result<Vec<Uuid>> {
        let states = self.deck_states(deck_id)?;
        let introduced = self.day_counter(now.date_naive())?.new_introduced;

        Ok(build_queue(&states, now, cards_per_day, weekend_study, introduced))
    }

    /// Snapshot of all schedule states for a deck
    pub fn deck_states(&self, deck_id: Uuid) -> Result<Vec<ScheduleState>> {
        self.get_deck(deck_id)?;

        let mut states = Vec::new();
        for card in self.list_cards(deck_id)? {
            states.push(self.get_state(card.id)?.state);
        }
        Ok(states)
    }

    /// Derived statistics for a deck; computed on demand, never stored
    pub fn deck_stats(&self, deck_id: Uuid, now: DateTime<Utc>) -> Result<DeckStats> {
        let states = self.deck_states(deck_id)?;

        let mut stats = DeckStats::default();
        stats.total_cards = states.len();
        for state in &states {
            if state.is_new() {
                stats.new_cards += 1;
            } else if state.is_learning() {
                stats.learning_cards += 1;
            } else {
                stats.review_cards += 1;
            }
            if state.is_due(now) {
                stats.due_cards += 1;
            }
            if state.is_mastered() {
                stats.mastered_cards += 1;
            }
        }

        Ok(stats)
    }

    // ==================== Day Counters & Review Log ====================

    /// Per-day tallies for a UTC calendar day
    pub fn day_counter(&self, date: NaiveDate) -> Result<DayCounter> {
        let path = self.counter_path(date);
        if !path.exists() {
            return Ok(DayCounter::empty(date));
        }

        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn bump_day_counter(&self, date: NaiveDate, introduced_new: bool) -> Result<()> {
        let mut counter = self.day_counter(date)?;
        counter.reviews += 1;
        if introduced_new {
            counter.new_introduced += 1;
        }

        fs::write(self.counter_path(date), serde_json::to_string_pretty(&counter)?)?;
        Ok(())
    }

    /// All reviews logged on a UTC calendar day
    pub fn reviews_on(&self, date: NaiveDate) -> Result<Vec<ReviewRecord>> {
        let path = self.reviews_path(date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn log_review(&self, record: &ReviewRecord) -> Result<()> {
        let date = record.reviewed_at.date_naive();
        let mut records = self.reviews_on(date)?;
        records.push(record.clone());

        fs::write(self.reviews_path(date), serde_json::to_string_pretty(&records)?)?;
        Ok(())
    }
}
