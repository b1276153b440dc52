//! Local schedule suggestions
//!
//! Ranks up to three upcoming slots for a task. Pure computation over the
//! task and a supplied clock reading, so it never fails and needs no
//! fallback.

use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use tracing::debug;

use crate::domain::{Priority, ScheduleRank, ScheduleSuggestion, Task};

/// Slot start hours, in the caller's local time
pub const SLOT_HOURS: [u32; 3] = [9, 14, 19];

/// Reschedules after which a low priority task is pushed to the morning
pub const POSTPONE_THRESHOLD: u32 = 3;

/// Suggest ranked slots for `task`, best first
///
/// `now` carries the timezone the slot hours are interpreted in.
pub fn suggest<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> Vec<ScheduleSuggestion> {
    debug!(task_id = %task.id, priority = %task.priority, "suggest: called");
    let now_utc = now.with_timezone(&Utc);

    if let Some(at) = task.scheduled_at.filter(|at| *at > now_utc) {
        let mut suggestions = vec![ScheduleSuggestion {
            rank: ScheduleRank::Best,
            at,
            reason: "Keeps the time you already picked".to_string(),
        }];
        suggestions.extend(
            next_slots(now)
                .into_iter()
                .filter(|slot| *slot != at)
                .take(2)
                .zip([ScheduleRank::Good, ScheduleRank::Okay])
                .map(|(slot, rank)| ScheduleSuggestion {
                    rank,
                    at: slot,
                    reason: slot_reason(task, slot, now),
                }),
        );
        return suggestions;
    }

    let slots = next_slots(now);
    let best_index = best_slot(task, &slots, now);
    let mut ranks = [ScheduleRank::Good, ScheduleRank::Okay].into_iter();

    let mut suggestions: Vec<ScheduleSuggestion> = slots
        .iter()
        .enumerate()
        .map(|(i, &at)| {
            let (rank, reason) = if i == best_index {
                (ScheduleRank::Best, best_reason(task))
            } else {
                (ranks.next().unwrap_or(ScheduleRank::Okay), slot_reason(task, at, now))
            };
            ScheduleSuggestion { rank, at, reason }
        })
        .collect();
    suggestions.sort_by_key(|s| (s.rank, s.at));
    suggestions
}

/// The next occurrence of each slot hour, earliest first
fn next_slots<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<DateTime<Utc>> {
    let tz = now.timezone();
    let today = now.date_naive();
    let mut slots: Vec<DateTime<Utc>> = SLOT_HOURS
        .iter()
        .filter_map(|&hour| {
            let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
            [Some(today), today.checked_add_days(Days::new(1))]
                .into_iter()
                .flatten()
                .filter_map(|day| tz.from_local_datetime(&day.and_time(time)).earliest())
                .find(|candidate| candidate > now)
                .map(|slot| slot.with_timezone(&Utc))
        })
        .collect();
    slots.sort();
    slots
}

fn best_slot<Tz: TimeZone>(task: &Task, slots: &[DateTime<Utc>], now: &DateTime<Tz>) -> usize {
    if task.priority == Priority::Low && task.reschedule_count >= POSTPONE_THRESHOLD {
        let tz = now.timezone();
        return slots
            .iter()
            .position(|slot| local_hour(slot, &tz) == SLOT_HOURS[0])
            .unwrap_or(0);
    }
    // pressing or not, the earliest slot wins when nothing else applies
    0
}

fn best_reason(task: &Task) -> String {
    if task.priority == Priority::Low && task.reschedule_count >= POSTPONE_THRESHOLD {
        format!(
            "Postponed {} times already; a fresh morning start makes it stick",
            task.reschedule_count
        )
    } else if task.priority.is_pressing() {
        format!("{} priority, so the soonest slot is best", task.priority)
    } else {
        "Soonest open slot".to_string()
    }
}

fn slot_reason<Tz: TimeZone>(task: &Task, slot: DateTime<Utc>, now: &DateTime<Tz>) -> String {
    let minutes = task.effective_minutes();
    match local_hour(&slot, &now.timezone()) {
        9 => format!("Morning focus block for about {} minutes", minutes),
        14 => format!("Afternoon slot with room for {} minutes", minutes),
        _ => format!("Evening slot, about {} minutes", minutes),
    }
}

fn local_hour<Tz: TimeZone>(slot: &DateTime<Utc>, tz: &Tz) -> u32 {
    use chrono::Timelike;
    slot.with_timezone(tz).hour()
}
