use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Race;

const TOOLTIP_DATE_FORMAT: &str = "%A %m/%d/%y";

/// Hover detail for a single performance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tooltip {
    pub meet: String,
    pub date: String,
    pub event: String,
    pub mark: String,
    pub place: String,
}

pub fn format(race: &Race) -> Tooltip {
    let date = race
        .day()
        .map(|d| d.format(TOOLTIP_DATE_FORMAT).to_string())
        .unwrap_or_else(|| race.date.clone());
    Tooltip {
        meet: race.meet.clone(),
        date,
        event: race.event.clone(),
        mark: race.mark.clone(),
        place: race.place.clone(),
    }
}

impl Tooltip {
    pub fn rows(&self) -> [(&'static str, &str); 5] {
        [
            ("Meet", self.meet.as_str()),
            ("Date", self.date.as_str()),
            ("Event", self.event.as_str()),
            ("Time", self.mark.as_str()),
            ("Place", self.place.as_str()),
        ]
    }

    pub fn to_html(&self) -> String {
        self.rows()
            .iter()
            .map(|(label, value)| format!("<p>{}: <span>{}</span></p>", label, escape_html(value)))
            .collect()
    }
}

impl fmt::Display for Tooltip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, value)) in self.rows().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", label, value)?;
        }
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AthleteId, Color, RaceKey};

    fn race(date: &str, meet: &str) -> Race {
        Race {
            key: RaceKey("1|5000|x".into()),
            athlete_id: AthleteId::Number(1),
            athlete_name: "Alice".into(),
            event: "5000".into(),
            date: date.into(),
            mark: "15:45.00".into(),
            meet: meet.into(),
            place: "2".into(),
            color: Color::default(),
        }
    }

    #[test]
    fn test_plain_text_rows() {
        let tip = format(&race("02-01-20", "Husky Classic"));
        assert_eq!(tip.date, "Saturday 02/01/20");
        assert_eq!(
            tip.to_string(),
            "Meet: Husky Classic\nDate: Saturday 02/01/20\nEvent: 5000\nTime: 15:45.00\nPlace: 2"
        );
    }

    #[test]
    fn test_html_escapes_values() {
        let tip = format(&race("01/31/20-02/01/20", "A&M <Invite>"));
        let html = tip.to_html();
        assert!(html.starts_with("<p>Meet: <span>A&amp;M &lt;Invite&gt;</span></p>"));
        assert!(html.contains("<p>Date: <span>Saturday 02/01/20</span></p>"));
    }

    #[test]
    fn test_unparsable_date_shown_raw() {
        assert_eq!(format(&race("TBD", "Meet")).date, "TBD");
    }
}
