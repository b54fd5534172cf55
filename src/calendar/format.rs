//! Display text for calendar results

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

use super::CalendarEvent;

/// 12-hour clock with two-digit hour and minute, e.g. `09:05 AM`
pub const TIME_FORMAT: &str = "%I:%M %p";

/// Shown when no future event exists
pub const NO_UPCOMING_EVENTS: &str = "No upcoming events";

/// Shown when today's agenda is empty
pub const NO_EVENTS_TODAY: &str = "Nothing on your calendar today";

/// Wall-clock time of an instant in `zone`
#[must_use]
pub fn format_time<Z>(instant: &DateTime<Utc>, zone: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: Display,
{
    instant.with_timezone(zone).format(TIME_FORMAT).to_string()
}

/// `Next event: <summary> at <time>`
#[must_use]
pub fn format_next_event<Z>(event: Option<&CalendarEvent>, zone: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: Display,
{
    event.map_or_else(
        || NO_UPCOMING_EVENTS.to_string(),
        |event| {
            format!(
                "Next event: {} at {}",
                event.display_summary(),
                format_time(&event.start, zone)
            )
        },
    )
}

/// One `<summary> | <time>` line per event; empty when there are no events
#[must_use]
pub fn format_agenda<Z>(events: &[CalendarEvent], zone: &Z) -> String
where
    Z: TimeZone,
    Z::Offset: Display,
{
    events
        .iter()
        .map(|event| format!("{} | {}", event.display_summary(), format_time(&event.start, zone)))
        .collect::<Vec<_>>()
        .join("\n")
}
