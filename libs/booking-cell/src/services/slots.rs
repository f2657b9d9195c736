// libs/booking-cell/src/services/slots.rs
//
// Pure slot generation. No I/O, no shared state: the reservation path relies
// on calling this twice with identical input and getting identical output.

use crate::models::{Slot, TimeWindow};

/// Canonical slot identity shared by a slot, its reservation marker, and the
/// appointment that claims it.
pub fn slot_key(date: &str, start_time: &str) -> String {
    format!("{}_{}", date, start_time)
}

fn parse_hhmm(value: &str) -> Option<i64> {
    let (hours, minutes) = value.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }

    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    Some(hours * 60 + minutes)
}

fn format_hhmm(minute_of_day: i64) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

/// Generates the ordered candidate slots for one date: consecutive
/// `slot_minutes` steps over the working hours, earliest first. A slot that
/// would run past the end of the working hours is dropped, not truncated.
/// Break windows are honored independently with an open overlap test, so a
/// slot touching a break exactly at an endpoint is kept.
pub fn generate_slots(
    date: &str,
    work_hours: &TimeWindow,
    breaks: &[TimeWindow],
    slot_minutes: i64,
) -> Vec<Slot> {
    if slot_minutes <= 0 {
        return Vec::new();
    }

    let (work_start, work_end) = match (parse_hhmm(&work_hours.start), parse_hhmm(&work_hours.end)) {
        (Some(start), Some(end)) => (start, end),
        _ => return Vec::new(),
    };
    if work_start >= work_end {
        return Vec::new();
    }

    let break_windows: Vec<(i64, i64)> = breaks
        .iter()
        .filter_map(|window| Some((parse_hhmm(&window.start)?, parse_hhmm(&window.end)?)))
        .collect();

    let mut slots = Vec::new();
    let mut cursor = work_start;

    while cursor + slot_minutes <= work_end {
        let slot_end = cursor + slot_minutes;

        let in_break = break_windows
            .iter()
            .any(|&(break_start, break_end)| cursor < break_end && slot_end > break_start);

        if !in_break {
            let start_time = format_hhmm(cursor);
            slots.push(Slot {
                key: slot_key(date, &start_time),
                start_time,
                end_time: format_hhmm(slot_end),
            });
        }

        cursor += slot_minutes;
    }

    slots
}
