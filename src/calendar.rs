use icalendar::{Calendar, Component, EventLike, Property};

use crate::menu::MenuEntry;

static CALENDAR_NAME: &str = "Boonli Menu";

/// Renders the menus as an iCalendar feed with one all-day event per day that has text.
///
/// `sequence` is the iCalendar SEQUENCE and is left out when zero.
pub fn menus_to_ical(entries: &[MenuEntry], domain: &str, sequence: u32) -> String {
    let mut cal = Calendar::new();
    cal.append_property(Property::new("NAME", CALENDAR_NAME));
    cal.append_property(Property::new("X-WR-CALNAME", CALENDAR_NAME));
    cal.append_property(Property::new("X-WR-CALDESC", CALENDAR_NAME));

    for entry in entries {
        let Some(text) = entry.text() else {
            continue;
        };
        let Some(end) = entry.date.succ_opt() else {
            log::warn!("No day after {}, skipping its event", entry.date);
            continue;
        };
        let mut event = icalendar::Event::new();
        event
            .uid(&entry.date.format("%Y%m%d").to_string())
            .summary(text)
            .starts(entry.date)
            .ends(end);
        if sequence != 0 {
            event.add_property("SEQUENCE", sequence.to_string());
        }
        event.add_property("ORGANIZER", format!("mailto:donotreply@{domain}"));
        cal.push(event.done());
    }

    with_prodid(&cal.done().to_string(), domain)
}

/// The icalendar crate always writes its own PRODID; swap in ours.
fn with_prodid(ics: &str, domain: &str) -> String {
    let mut out = String::with_capacity(ics.len());
    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            out.push_str(&format!("PRODID:-//{CALENDAR_NAME}//{domain}//"));
        } else {
            out.push_str(line);
        }
        out.push_str("\r\n");
    }
    out
}
