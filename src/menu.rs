use std::fmt::{self, Display, Formatter};

use chrono::{Datelike, Days, Duration, NaiveDate};
use serde::Serialize;

/// Days covered by the published feed: last week, this week and next week.
pub const FEED_DAYS: u32 = 21;

/// What the vendor had for one day. A failed lookup is an `Err`, never one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum MenuResult {
    Text(String),
    /// No menu, but the vendor left a note (e.g. "School is closed!").
    Alert(String),
    Empty,
}

impl MenuResult {
    pub fn from_text(text: String) -> Self {
        if text.is_empty() {
            Self::Empty
        } else {
            Self::Text(text)
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Alert(s) => Some(s),
            Self::Empty => None,
        }
    }

    pub fn as_str(&self) -> &str {
        self.text().unwrap_or_default()
    }
}

impl Display for MenuResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub date: NaiveDate,
    pub menu: MenuResult,
}

impl MenuEntry {
    pub fn text(&self) -> Option<&str> {
        self.menu.text()
    }
}

/// Consecutive days from `start`. Stops early rather than run past the last representable date.
pub fn date_iter(start: NaiveDate, count: u32) -> impl Iterator<Item = NaiveDate> {
    (0..count).map_while(move |x| start.checked_add_days(Days::new(u64::from(x))))
}

/// Last day of a `count`-day range from `start`, or `None` if it is not a representable date.
pub fn range_end(start: NaiveDate, count: u32) -> Option<NaiveDate> {
    match count.checked_sub(1) {
        Some(offset) => start.checked_add_days(Days::new(u64::from(offset))),
        None => Some(start),
    }
}

/// The Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Start and length of the published feed for `today`: from the Monday of the previous week,
/// through the end of next week.
pub fn feed_window(today: NaiveDate) -> (NaiveDate, u32) {
    (week_start(today) - Duration::days(7), FEED_DAYS)
}
