//! French date labels for event cards and the event detail modal.

use std::fmt::Display;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use tracing::warn;

use campus_types::models::Event;

const MONTHS_SHORT: [&str; 12] = [
    "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.", "nov.", "déc.",
];

const MONTHS_LONG: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

fn month_index<D: Datelike>(date: &D) -> usize {
    usize::try_from(date.month0()).unwrap_or(0).min(11)
}

/// `dd MMM`
fn day_short<D: Datelike>(date: &D) -> String {
    format!("{:02} {}", date.day(), MONTHS_SHORT[month_index(date)])
}

/// `dd MMMM yyyy`
fn day_long<D: Datelike>(date: &D) -> String {
    format!("{:02} {} {}", date.day(), MONTHS_LONG[month_index(date)], date.year())
}

/// Start and effective end of an event in the viewer's time zone.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSpan<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: Option<DateTime<Tz>>,
}

impl<Tz: TimeZone> EventSpan<Tz>
where
    Tz::Offset: Display,
{
    /// An end before the start is not trusted and dropped.
    pub fn of(event: &Event, tz: &Tz) -> Self {
        if event.date_end.is_some() && event.effective_end().is_none() {
            warn!("Event {} ends before it starts; showing start only", event.id);
        }
        Self {
            start: event.date_start.with_timezone(tz),
            end: event.effective_end().map(|end| end.with_timezone(tz)),
        }
    }

    fn distinct_end(&self) -> Option<&DateTime<Tz>> {
        self.end
            .as_ref()
            .filter(|end| end.date_naive() != self.start.date_naive())
    }

    /// `01 mai - 03 mai 2024`, or `01 mai 2024` for a single day.
    pub fn card_label(&self) -> String {
        match self.distinct_end() {
            Some(end) => format!("{} - {} {}", day_short(&self.start), day_short(end), end.year()),
            None => format!("{} {}", day_short(&self.start), self.start.year()),
        }
    }

    /// `Du 01 mai 2024 au 03 mai 2024`, or `01 mai 2024` for a single day.
    pub fn detail_label(&self) -> String {
        match self.distinct_end() {
            Some(end) => format!("Du {} au {}", day_long(&self.start), day_long(end)),
            None => day_long(&self.start),
        }
    }

    /// `09:00 - 17:00` when the event has an end.
    pub fn time_label(&self) -> Option<String> {
        let end = self.end.as_ref()?;
        Some(format!("{} - {}", self.start.format("%H:%M"), end.format("%H:%M")))
    }

    /// Over once its end (or its start, without an end) has passed.
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        let last = self.end.as_ref().unwrap_or(&self.start);
        last.with_timezone(&Utc) < now
    }
}
