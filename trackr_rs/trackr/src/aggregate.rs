use std::cmp::Reverse;
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{race_date, Athlete, AthleteId, Color, Race, RaceKey, RaceRecord};

/// One athlete's races within an event, most recent first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AthleteSeries {
    pub athlete_id: AthleteId,
    pub name: String,
    pub color: Color,
    pub races: Vec<Race>,
}

impl AthleteSeries {
    fn for_athlete(athlete: &Athlete) -> Self {
        Self {
            athlete_id: athlete.id.clone(),
            name: athlete.name.clone(),
            color: athlete.color.clone(),
            races: Vec::new(),
        }
    }
}

/// All qualifying races for one event, flat and grouped by athlete name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub races: Vec<Race>,
    pub athletes: IndexMap<String, AthleteSeries>,
}

impl Event {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            races: Vec::new(),
            athletes: IndexMap::new(),
        }
    }

    pub fn series(&self, athlete_name: &str) -> Option<&AthleteSeries> {
        self.athletes.get(athlete_name)
    }
}

/// Group the active athletes' timed races by event.
///
/// Events come out in first-encountered order. Athletes sharing a name share a
/// series, keyed by whichever of them appeared first.
pub fn aggregate(athletes: &[Athlete]) -> Vec<Event> {
    let mut events: IndexMap<String, Event> = IndexMap::new();
    let mut key_uses: HashMap<RaceKey, usize> = HashMap::new();

    for athlete in athletes.iter().filter(|a| a.active) {
        for record in athlete.races.iter().filter(|r| !r.is_no_time()) {
            let key = unique_key(&mut key_uses, RaceKey::compose(&athlete.id, record));
            let race = derive_race(athlete, record, key);
            let event = events
                .entry(record.event.clone())
                .or_insert_with(|| Event::new(&record.event));
            event
                .athletes
                .entry(athlete.name.clone())
                .or_insert_with(|| AthleteSeries::for_athlete(athlete))
                .races
                .push(race.clone());
            event.races.push(race);
        }
    }

    let mut out: Vec<Event> = events.into_values().collect();
    for event in &mut out {
        for series in event.athletes.values_mut() {
            sort_most_recent_first(&mut series.races);
        }
    }
    debug!(
        "Aggregated {} athletes into {} events",
        athletes.len(),
        out.len()
    );
    out
}

// Identical (athlete, event, date, mark) rows get an occurrence suffix; encounter
// order is deterministic so the suffix is stable across passes.
fn unique_key(uses: &mut HashMap<RaceKey, usize>, base: RaceKey) -> RaceKey {
    let count = uses.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        RaceKey(format!("{}#{}", base.0, count))
    }
}

fn derive_race(athlete: &Athlete, record: &RaceRecord, key: RaceKey) -> Race {
    Race {
        key,
        athlete_id: athlete.id.clone(),
        athlete_name: athlete.name.clone(),
        event: record.event.clone(),
        date: record.date.clone(),
        mark: record.mark.clone(),
        meet: record.meet.clone(),
        place: record.place.clone(),
        color: athlete.color.clone(),
    }
}

/// Stable; undated races go last in their original relative order.
fn sort_most_recent_first(races: &mut [Race]) {
    races.sort_by_key(|race| Reverse(race_date(&race.date)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(event: &str, date: &str, mark: &str) -> RaceRecord {
        RaceRecord {
            event: event.to_string(),
            date: date.to_string(),
            mark: mark.to_string(),
            meet: "Invitational".to_string(),
            place: "1".to_string(),
        }
    }

    fn athlete(id: u64, name: &str, active: bool, races: Vec<RaceRecord>) -> Athlete {
        Athlete {
            id: AthleteId::Number(id),
            name: name.to_string(),
            races,
            active,
            color: Color::new(format!("#00000{}", id % 10)),
        }
    }

    fn roster() -> Vec<Athlete> {
        vec![
            athlete(
                1,
                "Alice",
                true,
                vec![
                    record("5000", "02-01-20", "15:45.00"),
                    record("1500", "01-15-20", "4:30.10"),
                    record("5000", "01-01-20", "16:30.00"),
                    record("5000", "12-01-19", "NT"),
                ],
            ),
            athlete(
                2,
                "Bea",
                true,
                vec![
                    record("1500", "02-02-20", "4:20.00"),
                    record("800", "01-10-20", "2:10.00"),
                ],
            ),
            athlete(3, "Cal", false, vec![record("5000", "02-01-20", "14:00.00")]),
        ]
    }

    #[test]
    fn test_events_in_first_encounter_order() {
        let events = aggregate(&roster());
        let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["5000", "1500", "800"]);
    }

    #[test]
    fn test_excludes_no_time_and_inactive() {
        let events = aggregate(&roster());
        for event in &events {
            for race in &event.races {
                assert_ne!(race.mark, "NT");
                assert_ne!(race.athlete_name, "Cal");
            }
            for series in event.athletes.values() {
                assert!(series.races.iter().all(|r| r.mark != "NT"));
            }
        }
        let five_k = &events[0];
        assert_eq!(five_k.races.len(), 2);
        assert!(five_k.series("Cal").is_none());
    }

    #[test]
    fn test_flat_and_grouped_counts_agree() {
        for event in aggregate(&roster()) {
            let grouped: usize = event.athletes.values().map(|s| s.races.len()).sum();
            assert_eq!(grouped, event.races.len(), "event {}", event.name);
        }
    }

    #[test]
    fn test_no_active_athletes_yields_nothing() {
        let mut athletes = roster();
        for a in &mut athletes {
            a.active = false;
        }
        assert!(aggregate(&athletes).is_empty());
    }

    #[test]
    fn test_race_inherits_color_and_stable_key() {
        let first = aggregate(&roster());
        let second = aggregate(&roster());
        assert_eq!(first, second);
        let race = &first[0].races[0];
        assert_eq!(race.color, Color::new("#000001"));
        assert_eq!(race.key.as_str(), "1|5000|02-01-20|15:45.00");
    }

    #[test]
    fn test_duplicate_rows_get_distinct_keys() {
        let athletes = vec![athlete(
            7,
            "Dee",
            true,
            vec![
                record("400", "03-01-20", "55.00"),
                record("400", "03-01-20", "55.00"),
            ],
        )];
        let events = aggregate(&athletes);
        let keys: Vec<&str> = events[0].races.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["7|400|03-01-20|55.00", "7|400|03-01-20|55.00#2"]);
    }

    #[test]
    fn test_series_sorted_most_recent_first() {
        let athletes = vec![athlete(
            4,
            "Eve",
            true,
            vec![
                record("5000", "01-01-20", "16:30.00"),
                record("5000", "bad date", "16:00.00"),
                record("5000", "02-01-20", "15:45.00"),
            ],
        )];
        let events = aggregate(&athletes);
        let dates: Vec<&str> = events[0].athletes["Eve"]
            .races
            .iter()
            .map(|r| r.date.as_str())
            .collect();
        assert_eq!(dates, vec!["02-01-20", "01-01-20", "bad date"]);
        // The flat list keeps encounter order.
        assert_eq!(events[0].races[0].date, "01-01-20");
    }

    #[test]
    fn test_duplicate_names_merge_into_one_series() {
        let athletes = vec![
            athlete(5, "Sam", true, vec![record("800", "01-01-20", "2:00.00")]),
            athlete(6, "Sam", true, vec![record("800", "02-01-20", "1:58.00")]),
        ];
        let events = aggregate(&athletes);
        assert_eq!(events[0].athletes.len(), 1);
        let series = &events[0].athletes["Sam"];
        assert_eq!(series.athlete_id, AthleteId::Number(5));
        assert_eq!(series.races.len(), 2);
    }
}
