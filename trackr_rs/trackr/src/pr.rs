use tracing::debug;

use crate::Race;

/// Personal-record progression of one athlete's races in one event.
///
/// Input is expected most recent first (the order [`crate::aggregate`] produces).
/// Races are replayed chronologically by parsed date, with ties and same-day
/// races falling back to that input order, and every race strictly faster than
/// all earlier ones is kept. Output is chronological: the earliest timed race
/// first, then each improvement. Races without a parsable date or mark cannot
/// be placed on a chart and are skipped.
pub fn extract_prs(races: &[Race]) -> Vec<Race> {
    let mut timeline = Vec::with_capacity(races.len());
    for (idx, race) in races.iter().enumerate() {
        match (race.day(), race.seconds()) {
            (Some(day), Ok(seconds)) => timeline.push((day, idx, seconds)),
            (_, Err(err)) => debug!("Skipping {} in PR progression: {}", race.key, err),
            (None, _) => debug!("Skipping {} in PR progression: unparsable date", race.key),
        }
    }
    // Earliest day first; within a day the later input position happened first.
    timeline.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut best: Option<f64> = None;
    let mut prs = Vec::new();
    for (_, idx, seconds) in timeline {
        if best.map_or(true, |b| seconds < b) {
            best = Some(seconds);
            prs.push(races[idx].clone());
        }
    }
    prs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AthleteId, Color, RaceKey};

    fn race(date: &str, mark: &str) -> Race {
        Race {
            key: RaceKey(format!("1|5000|{}|{}", date, mark)),
            athlete_id: AthleteId::Number(1),
            athlete_name: "Alice".to_string(),
            event: "5000".to_string(),
            date: date.to_string(),
            mark: mark.to_string(),
            meet: "Meet".to_string(),
            place: "1".to_string(),
            color: Color::default(),
        }
    }

    fn seconds(races: &[Race]) -> Vec<f64> {
        races.iter().map(|r| r.seconds().unwrap()).collect()
    }

    #[test]
    fn test_two_race_improvement() {
        let races = vec![race("01-01-20", "16:30.00"), race("02-01-20", "15:45.00")];
        let prs = extract_prs(&races);
        assert_eq!(seconds(&prs), vec![990.0, 945.0]);
        assert_eq!(prs[0].date, "01-01-20");
    }

    #[test]
    fn test_progression_from_most_recent_first_input() {
        let races = vec![
            race("05-01-20", "15:20.00"),
            race("04-01-20", "15:50.00"),
            race("03-01-20", "15:30.00"),
            race("02-01-20", "16:00.00"),
            race("01-01-20", "15:40.00"),
        ];
        let prs = extract_prs(&races);
        assert_eq!(seconds(&prs), vec![940.0, 930.0, 920.0]);
        assert_eq!(prs[0].date, "01-01-20");
    }

    #[test]
    fn test_ties_are_not_records() {
        let races = vec![race("02-01-20", "15:00.00"), race("01-01-20", "15:00.00")];
        let prs = extract_prs(&races);
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].date, "01-01-20");
    }

    #[test]
    fn test_same_day_uses_input_order() {
        // Heat then final on the same day: the final is listed first.
        let races = vec![race("06-01-20", "4:01.00"), race("06-01-20", "4:05.00")];
        assert_eq!(seconds(&extract_prs(&races)), vec![245.0, 241.0]);
    }

    #[test]
    fn test_strictly_decreasing_and_starts_earliest() {
        let marks = ["16:10.0", "16:40.0", "15:59.9", "16:20.0", "16:05.0", "17:00.0"];
        let dates = ["06-01-20", "05-01-20", "04-01-20", "03-01-20", "02-01-20", "01-01-20"];
        let races: Vec<Race> = dates.iter().zip(marks).map(|(d, m)| race(d, m)).collect();
        let prs = extract_prs(&races);
        assert!(!prs.is_empty());
        assert_eq!(prs[0].date, "01-01-20");
        let values = seconds(&prs);
        assert!(values.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_unparsable_rows_skipped() {
        let races = vec![
            race("03-01-20", "DQ"),
            race("sometime", "15:00.00"),
            race("01-01-20", "16:00.00"),
        ];
        assert_eq!(seconds(&extract_prs(&races)), vec![960.0]);
        assert!(extract_prs(&[]).is_empty());
    }
}
