//! iCalendar feed parsing and event selection
//!
//! Selection functions are pure: they take the raw feed text and the
//! caller's `now`, so identical inputs always select identical events.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use ical::property::Property;

use crate::{Error, Result};

/// Shown in place of a missing or blank summary
pub const UNTITLED: &str = "Untitled";

/// A single event read from a calendar feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl CalendarEvent {
    /// Summary for display, `"Untitled"` when blank
    #[must_use]
    pub fn display_summary(&self) -> &str {
        let trimmed = self.summary.trim();
        if trimmed.is_empty() { UNTITLED } else { trimmed }
    }
}

/// Parse every VEVENT with a start time out of a feed
///
/// Floating and date-only times resolve in `zone`; `TZID` times resolve in
/// the named zone when it is known.
///
/// # Errors
///
/// Returns `Error::Parse` if the text is not a calendar or a start time
/// cannot be interpreted
pub fn parse_events<Z: TimeZone>(feed: &str, zone: &Z) -> Result<Vec<CalendarEvent>> {
    let normalized = feed.replace("\r\n", "\n");
    let parser = ical::IcalParser::new(normalized.as_bytes());

    let mut calendars = 0_usize;
    let mut events = Vec::new();

    for calendar in parser {
        let calendar = calendar.map_err(|e| Error::Parse(e.to_string()))?;
        calendars += 1;

        for event in &calendar.events {
            if let Some(parsed) = parse_event(&event.properties, zone)? {
                events.push(parsed);
            }
        }
    }

    if calendars == 0 {
        return Err(Error::Parse("feed contains no calendar".to_string()));
    }

    tracing::trace!(calendars, events = events.len(), "parsed calendar feed");

    Ok(events)
}

/// The earliest event starting strictly after `now`
///
/// Events sharing a start time keep feed order, so the first one wins.
///
/// # Errors
///
/// Returns `Error::Parse` if the feed is malformed
pub fn next_event<Z: TimeZone>(feed: &str, now: &DateTime<Z>) -> Result<Option<CalendarEvent>> {
    let now_utc = now.with_timezone(&Utc);

    let next = parse_events(feed, &now.timezone())?
        .into_iter()
        .filter(|event| event.start > now_utc)
        .min_by_key(|event| event.start);

    Ok(next)
}

/// Events starting on `now`'s calendar date, ascending by start
///
/// The day is `[00:00:00, 23:59:59]` in `now`'s time zone, both ends
/// inclusive.
///
/// # Errors
///
/// Returns `Error::Parse` if the feed is malformed
pub fn today_events<Z: TimeZone>(feed: &str, now: &DateTime<Z>) -> Result<Vec<CalendarEvent>> {
    let zone = now.timezone();
    let today = now.date_naive();

    let mut events: Vec<CalendarEvent> = parse_events(feed, &zone)?
        .into_iter()
        .filter(|event| event.start.with_timezone(&zone).date_naive() == today)
        .collect();

    // stable: equal starts keep feed order
    events.sort_by_key(|event| event.start);

    Ok(events)
}

fn parse_event<Z: TimeZone>(properties: &[Property], zone: &Z) -> Result<Option<CalendarEvent>> {
    let Some(dtstart) = find_property(properties, "DTSTART") else {
        return Ok(None);
    };

    let start = parse_date_time(dtstart, zone)?;

    let end = find_property(properties, "DTEND").and_then(|dtend| parse_date_time(dtend, zone).ok());

    let summary = find_property(properties, "SUMMARY")
        .and_then(|p| p.value.as_deref())
        .map(unescape_text)
        .unwrap_or_default();

    Ok(Some(CalendarEvent {
        summary,
        start,
        end,
    }))
}

fn find_property<'a>(properties: &'a [Property], name: &str) -> Option<&'a Property> {
    properties
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

fn find_param<'a>(property: &'a Property, name: &str) -> Option<&'a str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}

fn parse_date_time<Z: TimeZone>(property: &Property, zone: &Z) -> Result<DateTime<Utc>> {
    let value = property
        .value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Parse(format!("{} has no value", property.name)))?;

    let invalid = |e: chrono::ParseError| Error::Parse(format!("invalid {} '{value}': {e}", property.name));

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").map_err(invalid)?;
        return Ok(Utc.from_utc_datetime(&naive));
    }

    let naive = if value.contains('T') {
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").map_err(invalid)?
    } else {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(invalid)?
            .and_time(NaiveTime::MIN)
    };

    let named_zone = find_param(property, "TZID")
        .map(|tzid| tzid.trim_matches('"').trim_start_matches('/'))
        .and_then(|tzid| tzid.parse::<Tz>().ok());

    match named_zone {
        Some(tz) => resolve_local(&tz, &naive),
        None => resolve_local(zone, &naive),
    }
}

/// Resolve a wall-clock time, skipping forward over DST gaps
fn resolve_local<Z: TimeZone>(zone: &Z, naive: &NaiveDateTime) -> Result<DateTime<Utc>> {
    zone.from_local_datetime(naive)
        .earliest()
        .or_else(|| {
            zone.from_local_datetime(&(*naive + TimeDelta::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Parse(format!("unrepresentable local time {naive}")))
}

/// Undo RFC 5545 TEXT escaping
fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
