//! The loaded athletes and the only state the UI mutates on them.

use tracing::debug;

use crate::{aggregate, Athlete, Color, Event, TrackrError};

/// Ten-colour categorical palette; athletes take colours by roster position.
pub const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Clone, Debug, Default)]
pub struct Roster {
    athletes: Vec<Athlete>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_athletes(athletes: impl IntoIterator<Item = Athlete>) -> Self {
        let mut roster = Self::new();
        for athlete in athletes {
            roster.add_athlete(athlete);
        }
        roster
    }

    /// Parse the scraper's JSON array of athletes.
    pub fn from_json(text: &str) -> Result<Self, TrackrError> {
        let athletes: Vec<Athlete> = serde_json::from_str(text)?;
        Ok(Self::from_athletes(athletes))
    }

    /// Append an athlete, switching it on and handing it the next palette colour.
    pub fn add_athlete(&mut self, mut athlete: Athlete) -> &Athlete {
        let index = self.athletes.len();
        athlete.active = true;
        athlete.color = Color::new(CATEGORY10[index % CATEGORY10.len()]);
        debug!(
            "Added athlete {} ({}) with {} races, colour {}",
            athlete.name,
            athlete.id,
            athlete.races.len(),
            athlete.color
        );
        self.athletes.push(athlete);
        &self.athletes[index]
    }

    /// Toggle every athlete whose id matches `label`. Returns whether any matched.
    pub fn set_active(&mut self, label: &str, active: bool) -> bool {
        let mut found = false;
        for athlete in self.athletes.iter_mut().filter(|a| a.id.matches(label)) {
            athlete.active = active;
            found = true;
        }
        found
    }

    pub fn athletes(&self) -> &[Athlete] {
        &self.athletes
    }

    pub fn len(&self) -> usize {
        self.athletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.athletes.is_empty()
    }

    pub fn events(&self) -> Vec<Event> {
        aggregate(&self.athletes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AthleteId;

    const ROSTER_JSON: &str = r##"[
        {"id": 11, "name": "Alice", "active": false, "color": "#000000",
         "races": [{"event": "5000", "date": "02-01-20", "mark": "15:45.00"}]},
        {"id": "b-2", "name": "Bea",
         "races": [{"event": "1500", "date": "02-08-20", "mark": "4:20.10"}]}
    ]"##;

    #[test]
    fn test_load_assigns_active_and_palette() {
        let roster = Roster::from_json(ROSTER_JSON).unwrap();
        assert_eq!(roster.len(), 2);
        assert!(roster.athletes().iter().all(|a| a.active));
        assert_eq!(roster.athletes()[0].color.as_str(), CATEGORY10[0]);
        assert_eq!(roster.athletes()[1].color.as_str(), CATEGORY10[1]);
        assert_eq!(roster.athletes()[1].id, AthleteId::Text("b-2".into()));
    }

    #[test]
    fn test_palette_wraps() {
        let mut roster = Roster::new();
        for i in 0..11 {
            roster.add_athlete(Athlete {
                id: AthleteId::Number(i),
                name: format!("A{}", i),
                races: Vec::new(),
                active: false,
                color: Color::default(),
            });
        }
        assert_eq!(roster.athletes()[10].color, roster.athletes()[0].color);
    }

    #[test]
    fn test_toggle_controls_events() {
        let mut roster = Roster::from_json(ROSTER_JSON).unwrap();
        assert_eq!(roster.events().len(), 2);
        assert!(roster.set_active("11", false));
        let events = roster.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "1500");
        assert!(!roster.set_active("99", false));
        // Toggling never recolours.
        assert_eq!(roster.athletes()[0].color.as_str(), CATEGORY10[0]);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Roster::from_json("{\"id\": 1}"),
            Err(TrackrError::Json(_))
        ));
    }
}
