//! Spaced repetition scheduling engine
//!
//! A card moves through three phases: New (never reviewed), Learning
//! (short acquisition steps measured in minutes) and Review (long spaced
//! intervals measured in days). Each review is graded 1-5:
//! - 1-2: lapse ("Again") — back to the first learning step
//! - 3: marginal success ("Hard") — ease factor takes a half penalty
//! - 4: normal success ("Good") — ease factor unchanged
//! - 5: confident success ("Easy") — ease factor grows, interval gets a bonus
//!
//! [`transition`] is a pure function over an immutable state: no I/O, no
//! shared state, exactly one logical transition per submitted review.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::{Phase, ScheduleState};

/// Ease factor floor
pub const MIN_EASE_FACTOR: f32 = 1.3;
/// Ease factor assigned when a state has no usable ease yet
pub const INITIAL_EASE_FACTOR: f32 = 2.5;
/// Ease gained on an Easy (quality 5) review
pub const EASE_BONUS: f32 = 0.15;
/// Ease lost on a lapse; Hard reviews lose half of this
pub const EASE_PENALTY: f32 = 0.2;
/// Acquisition steps in minutes
pub const LEARNING_STEPS: [i64; 2] = [1, 10];
/// Review interval (days) after graduating with quality 3-4
pub const GRADUATING_INTERVAL: i32 = 1;
/// Review interval (days) after graduating with quality 5
pub const EASY_INTERVAL: i32 = 4;
/// Hard cap on review intervals (days)
pub const MAXIMUM_INTERVAL: i32 = 365;
/// Global multiplier applied to review-phase interval growth
pub const INTERVAL_MODIFIER: f32 = 1.0;
/// Extra growth multiplier on Easy reviews
const EASY_GROWTH_BONUS: f32 = 1.3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("quality must be an integer between 1 and 5, got {0}")]
    InvalidQuality(i32),
}

/// Apply one review to a card's schedule state.
///
/// Total over every `(state, quality in 1..=5, now)` triple; the input state
/// is never mutated. A `now` earlier than the last review is tolerated: the
/// elapsed time is treated as zero and the transition proceeds (the caller's
/// clock moved backwards, which is worth a log line but never fatal).
pub fn transition(
    state: &ScheduleState,
    quality: i32,
    now: DateTime<Utc>,
) -> Result<ScheduleState, ScheduleError> {
    if !(1..=5).contains(&quality) {
        return Err(ScheduleError::InvalidQuality(quality));
    }

    if let Some(last) = state.last_reviewed_at {
        if now < last {
            log::warn!(
                "clock regression for card {}: now {} precedes last review {}, clamping elapsed time to zero",
                state.card_id,
                now,
                last
            );
        }
    }

    let mut next = state.clone();
    next.last_reviewed_at = Some(now);

    match state.phase {
        // Acquisition always starts at the first step, whatever the grade
        Phase::New => enter_learning(&mut next, now),
        Phase::Learning => {
            if quality < 3 {
                enter_learning(&mut next, now);
            } else if state.learning_step + 1 < LEARNING_STEPS.len() {
                next.learning_step = state.learning_step + 1;
                next.due_at = now + Duration::minutes(LEARNING_STEPS[next.learning_step]);
            } else {
                graduate(&mut next, quality, now);
            }
        }
        Phase::Review => {
            if quality < 3 {
                lapse(&mut next, now);
            } else {
                grow_interval(&mut next, quality, now);
            }
        }
    }

    Ok(next)
}

/// (Re)start the acquisition steps at step zero
fn enter_learning(next: &mut ScheduleState, now: DateTime<Utc>) {
    next.phase = Phase::Learning;
    next.learning_step = 0;
    next.repetitions = 0;
    next.due_at = now + Duration::minutes(LEARNING_STEPS[0]);
}

/// Move a card that cleared the last learning step into the Review phase
fn graduate(next: &mut ScheduleState, quality: i32, now: DateTime<Utc>) {
    next.phase = Phase::Review;
    next.learning_step = 0;
    next.repetitions = 1;
    next.interval_days = if quality == 5 {
        EASY_INTERVAL
    } else {
        GRADUATING_INTERVAL
    };
    // Ease survives relearning; only states that never had one get the default
    if next.ease_factor < MIN_EASE_FACTOR {
        next.ease_factor = INITIAL_EASE_FACTOR;
    }
    next.due_at = now + Duration::days(next.interval_days as i64);
}

/// Failed review-phase card: back to acquisition, ease penalized.
/// `interval_days` is retained for audit; it is not used while relearning.
fn lapse(next: &mut ScheduleState, now: DateTime<Utc>) {
    next.phase = Phase::Learning;
    next.learning_step = 0;
    next.repetitions = 0;
    next.ease_factor = (next.ease_factor - EASE_PENALTY).max(MIN_EASE_FACTOR);
    next.due_at = now + Duration::minutes(LEARNING_STEPS[0]);
}

/// Successful review-phase card: adjust ease, then grow the interval with
/// the adjusted ease. Growth rounds half-up and clamps to `[1, 365]`.
fn grow_interval(next: &mut ScheduleState, quality: i32, now: DateTime<Utc>) {
    next.repetitions += 1;
    next.ease_factor = match quality {
        3 => (next.ease_factor - EASE_PENALTY / 2.0).max(MIN_EASE_FACTOR),
        5 => next.ease_factor + EASE_BONUS,
        _ => next.ease_factor,
    };

    let bonus = if quality == 5 { EASY_GROWTH_BONUS } else { 1.0 };
    let raw = next.interval_days as f32 * next.ease_factor * INTERVAL_MODIFIER * bonus;
    next.interval_days = (raw.round() as i32).clamp(1, MAXIMUM_INTERVAL);
    next.due_at = now + Duration::days(next.interval_days as i64);
}

/// Preview what each answer button (Again/Hard/Good/Easy) would schedule,
/// as human-readable "due in" strings. Shares [`transition`] so the preview
/// can never drift from the actual schedule.
pub fn preview_intervals(state: &ScheduleState, now: DateTime<Utc>) -> [String; 4] {
    [1, 3, 4, 5].map(|quality| {
        transition(state, quality, now)
            .map(|next| format_due_in(next.due_at - now))
            .unwrap_or_default()
    })
}

fn format_due_in(until_due: Duration) -> String {
    let minutes = until_due.num_minutes();
    if minutes < 60 {
        format!("{}m", minutes.max(0))
    } else {
        format_interval(until_due.num_days() as i32)
    }
}

/// Format an interval in days as a short human-readable string
pub fn format_interval(days: i32) -> String {
    match days {
        d if d <= 0 => "now".to_string(),
        d if d < 7 => format!("{}d", d),
        d if d < 30 => format!("{}w", d / 7),
        d if d < 365 => format!("{}mo", d / 30),
        d => format!("{}y", d / 365),
    }
}
