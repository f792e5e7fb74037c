//! Study queue construction
//!
//! Given a snapshot of a deck's schedule states, produces the ordered list
//! of card ids to study right now. Pure function: identical inputs always
//! yield an identical queue, whatever the order the states arrive in.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Utc, Weekday};
use uuid::Uuid;

use crate::models::{Phase, ScheduleState};

/// Build the study queue for one deck.
///
/// Due learning cards come first (most overdue first), then due review cards
/// (lowest ease first, so the hardest material gets the freshest attention),
/// then new cards up to the remaining daily allowance. New cards are held
/// back entirely on Saturdays and Sundays unless `weekend_study` is set.
pub fn build_queue(
    states: &[ScheduleState],
    now: DateTime<Utc>,
    cards_per_day: i32,
    weekend_study: bool,
    new_introduced_today: i32,
) -> Vec<Uuid> {
    let mut learning: Vec<&ScheduleState> = Vec::new();
    let mut review: Vec<&ScheduleState> = Vec::new();
    let mut fresh: Vec<&ScheduleState> = Vec::new();

    for state in states {
        match state.phase {
            Phase::Learning if state.is_due(now) => learning.push(state),
            Phase::Review if state.is_due(now) => review.push(state),
            Phase::New => fresh.push(state),
            _ => {}
        }
    }

    learning.sort_by(|a, b| a.due_at.cmp(&b.due_at).then(a.card_id.cmp(&b.card_id)));

    review.sort_by(|a, b| {
        a.ease_factor
            .partial_cmp(&b.ease_factor)
            .unwrap_or(Ordering::Equal)
            .then(a.due_at.cmp(&b.due_at))
            .then(a.card_id.cmp(&b.card_id))
    });

    // Creation order surrogate: ids are assigned at card creation
    fresh.sort_by(|a, b| a.card_id.cmp(&b.card_id));

    let allowance = if new_cards_allowed(now, weekend_study) {
        (cards_per_day - new_introduced_today).max(0) as usize
    } else {
        0
    };

    learning
        .iter()
        .chain(review.iter())
        .chain(fresh.iter().take(allowance))
        .map(|state| state.card_id)
        .collect()
}

fn new_cards_allowed(now: DateTime<Utc>, weekend_study: bool) -> bool {
    weekend_study || !matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn weekday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 19, 12, 0, 0).unwrap() // Wednesday
    }

    fn saturday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 22, 12, 0, 0).unwrap()
    }

    fn state_with(phase: Phase, due_at: DateTime<Utc>) -> ScheduleState {
        let mut state = ScheduleState::new(Uuid::new_v4(), due_at);
        state.phase = phase;
        state.due_at = due_at;
        state
    }

    #[test]
    fn test_priority_order_and_new_card_cap() {
        // 1 learning-due, 2 review-due (ease 2.8 and 2.0), 5 new,
        // cap 3 with 1 already introduced: expect learning, hard review,
        // easier review, then exactly 2 new cards
        let now = weekday_noon();
        let learning = state_with(Phase::Learning, now - Duration::minutes(5));

        let mut review_easy = state_with(Phase::Review, now - Duration::hours(2));
        review_easy.ease_factor = 2.8;
        let mut review_hard = state_with(Phase::Review, now - Duration::hours(1));
        review_hard.ease_factor = 2.0;

        let fresh: Vec<ScheduleState> = (0..5).map(|_| state_with(Phase::New, now)).collect();
        let mut fresh_ids: Vec<Uuid> = fresh.iter().map(|s| s.card_id).collect();
        fresh_ids.sort();

        let mut states = vec![review_easy.clone(), learning.clone(), review_hard.clone()];
        states.extend(fresh.clone());

        let queue = build_queue(&states, now, 3, false, 1);

        assert_eq!(queue.len(), 5);
        assert_eq!(queue[0], learning.card_id);
        assert_eq!(queue[1], review_hard.card_id);
        assert_eq!(queue[2], review_easy.card_id);
        assert_eq!(&queue[3..], &fresh_ids[..2]);
    }

    #[test]
    fn test_deterministic_under_permutation() {
        let now = weekday_noon();
        let mut states: Vec<ScheduleState> = Vec::new();
        for i in 0..10 {
            let mut s = state_with(Phase::Review, now - Duration::minutes(i));
            s.ease_factor = 1.3 + (i % 3) as f32 * 0.5;
            states.push(s);
        }
        for i in 0..4 {
            states.push(state_with(Phase::Learning, now - Duration::minutes(i)));
        }
        for _ in 0..6 {
            states.push(state_with(Phase::New, now));
        }

        let baseline = build_queue(&states, now, 20, true, 0);

        states.reverse();
        assert_eq!(build_queue(&states, now, 20, true, 0), baseline);

        states.rotate_left(7);
        assert_eq!(build_queue(&states, now, 20, true, 0), baseline);
    }

    #[test]
    fn test_not_due_cards_excluded() {
        let now = weekday_noon();
        let states = vec![
            state_with(Phase::Learning, now + Duration::minutes(5)),
            state_with(Phase::Review, now + Duration::days(3)),
        ];

        assert!(build_queue(&states, now, 20, true, 0).is_empty());
    }

    #[test]
    fn test_due_boundary_is_inclusive() {
        let now = weekday_noon();
        let state = state_with(Phase::Review, now);

        assert_eq!(build_queue(&[state.clone()], now, 20, true, 0), vec![state.card_id]);
    }

    #[test]
    fn test_new_cards_blocked_on_weekend_without_weekend_study() {
        let now = saturday_noon();
        let states = vec![
            state_with(Phase::New, now),
            state_with(Phase::Learning, now - Duration::minutes(1)),
        ];

        let queue = build_queue(&states, now, 20, false, 0);
        // Learning card still served; the new card waits for Monday
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0], states[1].card_id);

        let queue = build_queue(&states, now, 20, true, 0);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_exhausted_daily_allowance_admits_no_new_cards() {
        let now = weekday_noon();
        let states = vec![state_with(Phase::New, now), state_with(Phase::New, now)];

        assert!(build_queue(&states, now, 2, true, 2).is_empty());
        // Over-introduced counters never underflow into a negative allowance
        assert!(build_queue(&states, now, 2, true, 5).is_empty());
    }

    #[test]
    fn test_review_tie_breaks_on_due_then_id() {
        let now = weekday_noon();
        let mut a = state_with(Phase::Review, now - Duration::hours(2));
        let mut b = state_with(Phase::Review, now - Duration::hours(1));
        a.ease_factor = 2.5;
        b.ease_factor = 2.5;

        let queue = build_queue(&[b.clone(), a.clone()], now, 20, true, 0);
        assert_eq!(queue, vec![a.card_id, b.card_id]);

        // Same ease, same due date: card id decides
        b.due_at = a.due_at;
        let mut expected = vec![a.card_id, b.card_id];
        expected.sort();
        let queue = build_queue(&[b.clone(), a.clone()], now, 20, true, 0);
        assert_eq!(queue, expected);
    }

    #[test]
    fn test_empty_input_is_empty_queue() {
        assert!(build_queue(&[], weekday_noon(), 20, true, 0).is_empty());
    }
}
