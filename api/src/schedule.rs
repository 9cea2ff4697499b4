use crate::{DailyInfo, Event};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Days of the event week shown in the views.
pub const DAYS: std::ops::RangeInclusive<u32> = 1..=5;

/// Whole schedule document of one team, keyed by day.
pub type TeamSchedule = BTreeMap<u32, Vec<Event>>;

impl Event {
    pub fn new(time: impl Into<String>, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self { time: time.into(), name: name.into(), location: location.into() }
    }

    /// An event needs both a time and a name; location is optional.
    pub fn is_complete(&self) -> bool {
        !self.time.trim().is_empty() && !self.name.trim().is_empty()
    }
}

/// Drop incomplete rows, keeping the order of the rest.
pub fn clean_events(events: Vec<Event>) -> Vec<Event> {
    events.into_iter().filter(Event::is_complete).collect()
}

impl DailyInfo {
    /// Build from the admin form: one announcement or tip per line, blank
    /// lines ignored.
    pub fn from_form(title: &str, announcements: &str, tips: &str, locations: &str, contact: &str) -> Self {
        Self {
            title: title.trim().to_owned(),
            announcements: non_blank_lines(announcements),
            tips: non_blank_lines(tips),
            locations: locations.trim().to_owned(),
            contact: contact.trim().to_owned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.announcements.is_empty()
            && self.tips.is_empty()
            && self.locations.is_empty()
            && self.contact.is_empty()
    }
}

fn non_blank_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

// ---------------------------------------------------------------------------
// Plain-text formats used by the admin tool
// ---------------------------------------------------------------------------

/// One event per line: `time | name | location`. Rows missing a time or a
/// name are dropped, as are blank lines and `#` comments.
pub fn parse_events(text: &str) -> Vec<Event> {
    let rows = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|line| {
            let mut cols = line.splitn(3, '|').map(str::trim);
            Event::new(
                cols.next().unwrap_or_default(),
                cols.next().unwrap_or_default(),
                cols.next().unwrap_or_default(),
            )
        })
        .collect();
    clean_events(rows)
}

pub fn format_events(events: &[Event]) -> String {
    events.iter().fold(String::new(), |mut out, e| {
        let _ = writeln!(out, "{} | {} | {}", e.time, e.name, e.location);
        out
    })
}

/// ```text
/// title: Day 1 - Opening Day
/// locations: Science Building
/// contact: Help Desk
/// [announcements]
/// Welcome!
/// [tips]
/// Bring water
/// ```
pub fn parse_daily_info(text: &str) -> DailyInfo {
    #[derive(PartialEq)]
    enum Section {
        Keys,
        Announcements,
        Tips,
    }

    let mut section = Section::Keys;
    let (mut title, mut locations, mut contact) = (String::new(), String::new(), String::new());
    let (mut announcements, mut tips) = (String::new(), String::new());

    for line in text.lines() {
        let trimmed = line.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "[announcements]" => {
                section = Section::Announcements;
                continue;
            }
            "[tips]" => {
                section = Section::Tips;
                continue;
            }
            _ => {}
        }
        match section {
            Section::Announcements => {
                announcements.push_str(line);
                announcements.push('\n');
            }
            Section::Tips => {
                tips.push_str(line);
                tips.push('\n');
            }
            Section::Keys => {
                let Some((key, value)) = trimmed.split_once(':') else { continue };
                match key.trim().to_ascii_lowercase().as_str() {
                    "title" => title = value.to_owned(),
                    "locations" => locations = value.to_owned(),
                    "contact" => contact = value.to_owned(),
                    _ => {}
                }
            }
        }
    }

    DailyInfo::from_form(&title, &announcements, &tips, &locations, &contact)
}

pub fn format_daily_info(info: &DailyInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "title: {}", info.title);
    let _ = writeln!(out, "locations: {}", info.locations);
    let _ = writeln!(out, "contact: {}", info.contact);
    out.push_str("[announcements]\n");
    for line in &info.announcements {
        let _ = writeln!(out, "{line}");
    }
    out.push_str("[tips]\n");
    for line in &info.tips {
        let _ = writeln!(out, "{line}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_events_are_dropped_in_order() {
        let events = vec![
            Event::new("9:00", "A", "Hall"),
            Event::new("", "B", "Hall"),
            Event::new("10:00", "C", ""),
            Event::new("11:00", "  ", "Gym"),
        ];
        let kept = clean_events(events);
        let names: Vec<&str> = kept.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(kept[1].location, "");
    }

    #[test]
    fn form_lines_are_split_and_blank_lines_dropped() {
        let info = DailyInfo::from_form("Day 1", "x\n\n  \ny", "", " Gym ", "");
        assert_eq!(info.announcements, vec!["x", "y"]);
        assert!(info.tips.is_empty());
        assert_eq!(info.locations, "Gym");
        assert!(!info.is_empty());
        assert!(DailyInfo::default().is_empty());
    }

    #[test]
    fn event_lines_parse() {
        let text = "# day 2\n9:00 AM | Biology Quiz | Room 202\n\n11:00 AM | Math Olympiad\n | Orphan | Gym\n";
        let events = parse_events(text);
        assert_eq!(
            events,
            vec![
                Event::new("9:00 AM", "Biology Quiz", "Room 202"),
                Event::new("11:00 AM", "Math Olympiad", ""),
            ]
        );
        assert_eq!(parse_events(&format_events(&events)), events);
    }

    #[test]
    fn daily_info_sections_parse() {
        let text = "title: Day 3 - Finals\nlocations: Gym\ncontact: Desk: lobby\n[announcements]\nFinals today\n\n[tips]\nHydrate\nStretch\n";
        let info = parse_daily_info(text);
        assert_eq!(info.title, "Day 3 - Finals");
        assert_eq!(info.contact, "Desk: lobby");
        assert_eq!(info.announcements, vec!["Finals today"]);
        assert_eq!(info.tips, vec!["Hydrate", "Stretch"]);
        assert_eq!(parse_daily_info(&format_daily_info(&info)), info);
    }
}
