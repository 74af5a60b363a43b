//! Chart panels: one per event, each owning its scales, keyed marks and tooltip.
//!
//! A panel is initialised once, then updated whenever the event data or line mode
//! changes. Points are keyed by race key and lines by athlete id; entering marks
//! fade in, surviving marks move to their new coordinates and exiting marks fade
//! out at their position under the new scales before being reaped by `tick`.

use std::collections::HashSet;
use std::time::Duration;

use chrono::NaiveDate;
use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::debug;

use crate::scale::{date_axis_ticks, seconds_axis_ticks, AxisOrientation, LinearScale, TimeScale};
use crate::scene::{AxisFrame, LineFrame, PointFrame, Scene, TooltipDirection, TooltipFrame};
use crate::transition::{Animated, Point, HIDDEN, VISIBLE};
use crate::{
    extract_prs, tooltip, AthleteId, ChartConfig, Color, Event, LineType, Race, RaceKey,
    TrackrError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelState {
    Uninitialized,
    Initialized,
    Disposed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    /// Hold each value until the next vertex, then jump.
    StepAfter,
}

impl From<LineType> for Interpolation {
    fn from(value: LineType) -> Self {
        match value {
            LineType::AllConnected => Interpolation::Linear,
            LineType::Prs => Interpolation::StepAfter,
        }
    }
}

pub fn line_vertices(points: &[Point], interpolation: Interpolation) -> Vec<Point> {
    match interpolation {
        Interpolation::Linear => points.to_vec(),
        Interpolation::StepAfter => {
            let mut out = Vec::with_capacity(points.len() * 2);
            for pair in points.windows(2) {
                out.push(pair[0]);
                out.push(Point::new(pair[1].x, pair[0].y));
            }
            out.extend(points.last().copied());
            out
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffCounts {
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub points: DiffCounts,
    pub lines: DiffCounts,
    /// Races left off the chart because their date or mark would not parse.
    pub dropped: usize,
}

#[derive(Clone, Debug)]
struct PointMark {
    race: Race,
    center: Animated<Point>,
    opacity: Animated<f64>,
    exiting: bool,
}

#[derive(Clone, Debug)]
struct LineMark {
    races: Vec<Race>,
    color: Color,
    interpolation: Interpolation,
    vertices: Animated<Vec<Point>>,
    opacity: Animated<f64>,
    exiting: bool,
}

#[derive(Clone, Debug)]
struct AxisDomains {
    x: Animated<[f64; 2]>,
    y: Animated<[f64; 2]>,
}

#[derive(Clone, Debug)]
struct Hover {
    key: RaceKey,
    frame: TooltipFrame,
}

fn plot_values(race: &Race) -> Option<(NaiveDate, f64)> {
    let Some(day) = race.day() else {
        debug!("Dropping {} from chart: unparsable date {:?}", race.key, race.date);
        return None;
    };
    match race.seconds() {
        Ok(seconds) => Some((day, seconds)),
        Err(err) => {
            debug!("Dropping {} from chart: {}", race.key, err);
            None
        }
    }
}

fn project(x: &TimeScale, y: &LinearScale, day: NaiveDate, seconds: f64) -> Point {
    Point::new(x.apply(day), y.apply(seconds))
}

fn project_races(x: &TimeScale, y: &LinearScale, races: &[Race]) -> Vec<Point> {
    races
        .iter()
        .filter_map(plot_values)
        .map(|(day, seconds)| project(x, y, day, seconds))
        .collect()
}

pub struct ChartPanel {
    name: String,
    config: ChartConfig,
    state: PanelState,
    container_id: Option<String>,
    x: TimeScale,
    y: LinearScale,
    domains: Option<AxisDomains>,
    points: IndexMap<RaceKey, PointMark>,
    lines: IndexMap<AthleteId, LineMark>,
    hover: Option<Hover>,
}

impl ChartPanel {
    pub fn new(name: impl Into<String>, config: ChartConfig) -> Self {
        let x = TimeScale::new([0.0, config.inner_width()]);
        // Faster times sit higher on the panel.
        let y = LinearScale::new([0.0, config.inner_height()]);
        Self {
            name: name.into(),
            config,
            state: PanelState::Uninitialized,
            container_id: None,
            x,
            y,
            domains: None,
            points: IndexMap::new(),
            lines: IndexMap::new(),
            hover: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn x_scale(&self) -> &TimeScale {
        &self.x
    }

    pub fn y_scale(&self) -> &LinearScale {
        &self.y
    }

    /// Bind the panel to its container. Must happen exactly once, before any update.
    pub fn init(&mut self, container_id: &str) -> Result<(), TrackrError> {
        if self.state != PanelState::Uninitialized {
            return Err(TrackrError::PanelState(format!(
                "panel {:?} cannot be initialised while {:?}",
                self.name, self.state
            )));
        }
        self.config.validate()?;
        self.x = TimeScale::new([0.0, self.config.inner_width()]);
        self.y = LinearScale::new([0.0, self.config.inner_height()]);
        self.container_id = Some(container_id.to_string());
        self.state = PanelState::Initialized;
        debug!("Initialised panel {} in #{}", self.name, container_id);
        Ok(())
    }

    fn ensure_initialized(&self, op: &str) -> Result<(), TrackrError> {
        match self.state {
            PanelState::Initialized => Ok(()),
            other => Err(TrackrError::PanelState(format!(
                "cannot {} panel {:?} while {:?}",
                op, self.name, other
            ))),
        }
    }

    /// Rescale to the event's full extent and keyed-diff points and lines.
    pub fn update(
        &mut self,
        event: &Event,
        line_type: LineType,
        now: Duration,
    ) -> Result<UpdateSummary, TrackrError> {
        self.ensure_initialized("update")?;
        self.tick(now);

        let plotted: Vec<(&Race, NaiveDate, f64)> = event
            .races
            .iter()
            .filter_map(|race| plot_values(race).map(|(day, seconds)| (race, day, seconds)))
            .collect();
        let dropped = event.races.len() - plotted.len();

        match extent(&plotted) {
            Some((first, last, fastest, slowest)) => {
                self.x.set_domain(first, last);
                self.y.domain = [fastest, slowest];
                self.transition_axes(now);
            }
            None => debug!("Panel {} has no plottable races; keeping domains", self.name),
        }

        let points = self.draw_points(&plotted, now);
        let lines = self.draw_lines(event, line_type, now);
        let summary = UpdateSummary {
            points,
            lines,
            dropped,
        };
        debug!(
            "Updated panel {} ({}): points {:?}, lines {:?}, dropped {}",
            self.name, line_type, summary.points, summary.lines, dropped
        );
        Ok(summary)
    }

    fn transition_axes(&mut self, now: Duration) {
        let duration = self.config.transition();
        let x_target = self.x.domain_days();
        let y_target = self.y.domain;
        match self.domains.as_mut() {
            Some(domains) => {
                domains.x.retarget(x_target, now, duration);
                domains.y.retarget(y_target, now, duration);
            }
            None => {
                self.domains = Some(AxisDomains {
                    x: Animated::settled(x_target),
                    y: Animated::settled(y_target),
                });
            }
        }
    }

    fn draw_points(&mut self, plotted: &[(&Race, NaiveDate, f64)], now: Duration) -> DiffCounts {
        let duration = self.config.transition();
        let (x, y) = (self.x, self.y);
        let mut counts = DiffCounts::default();
        let mut live: HashSet<RaceKey> = HashSet::with_capacity(plotted.len());

        for &(race, day, seconds) in plotted {
            if !live.insert(race.key.clone()) {
                continue;
            }
            let target = project(&x, &y, day, seconds);
            match self.points.get_mut(&race.key) {
                Some(mark) => {
                    mark.race = race.clone();
                    mark.center.retarget(target, now, duration);
                    if mark.exiting {
                        mark.exiting = false;
                        mark.opacity.retarget(VISIBLE, now, duration);
                        counts.entered += 1;
                    } else {
                        counts.updated += 1;
                    }
                }
                None => {
                    self.points.insert(
                        race.key.clone(),
                        PointMark {
                            race: race.clone(),
                            center: Animated::settled(target),
                            opacity: Animated::towards(HIDDEN, VISIBLE, now, duration),
                            exiting: false,
                        },
                    );
                    counts.entered += 1;
                }
            }
        }

        for (key, mark) in self.points.iter_mut() {
            if live.contains(key) {
                continue;
            }
            if let Some((day, seconds)) = plot_values(&mark.race) {
                mark.center
                    .retarget(project(&x, &y, day, seconds), now, duration);
            }
            if !mark.exiting {
                mark.exiting = true;
                mark.opacity.retarget(HIDDEN, now, duration);
                counts.exited += 1;
            }
        }
        counts
    }

    fn draw_lines(&mut self, event: &Event, line_type: LineType, now: Duration) -> DiffCounts {
        let duration = self.config.transition();
        let interpolation = Interpolation::from(line_type);
        let (x, y) = (self.x, self.y);
        let mut counts = DiffCounts::default();
        let mut live: HashSet<AthleteId> = HashSet::with_capacity(event.athletes.len());

        for series in event.athletes.values() {
            let races = match line_type {
                LineType::Prs => extract_prs(&series.races),
                LineType::AllConnected => series.races.clone(),
            };
            let projected = project_races(&x, &y, &races);
            if projected.is_empty() || !live.insert(series.athlete_id.clone()) {
                continue;
            }
            let vertices = line_vertices(&projected, interpolation);
            match self.lines.get_mut(&series.athlete_id) {
                Some(mark) => {
                    mark.races = races;
                    mark.color = series.color.clone();
                    mark.interpolation = interpolation;
                    mark.vertices.retarget(vertices, now, duration);
                    if mark.exiting {
                        mark.exiting = false;
                        mark.opacity.retarget(VISIBLE, now, duration);
                        counts.entered += 1;
                    } else {
                        counts.updated += 1;
                    }
                }
                None => {
                    self.lines.insert(
                        series.athlete_id.clone(),
                        LineMark {
                            races,
                            color: series.color.clone(),
                            interpolation,
                            vertices: Animated::settled(vertices),
                            opacity: Animated::towards(HIDDEN, VISIBLE, now, duration),
                            exiting: false,
                        },
                    );
                    counts.entered += 1;
                }
            }
        }

        for (id, mark) in self.lines.iter_mut() {
            if live.contains(id) {
                continue;
            }
            mark.interpolation = interpolation;
            let vertices = line_vertices(&project_races(&x, &y, &mark.races), interpolation);
            mark.vertices.retarget(vertices, now, duration);
            if !mark.exiting {
                mark.exiting = true;
                mark.opacity.retarget(HIDDEN, now, duration);
                counts.exited += 1;
            }
        }
        counts
    }

    /// Remove exiting marks whose fade has completed. Returns how many went.
    pub fn tick(&mut self, now: Duration) -> usize {
        let before = self.points.len() + self.lines.len();
        self.points
            .retain(|_, mark| !(mark.exiting && mark.opacity.is_finished(now)));
        self.lines
            .retain(|_, mark| !(mark.exiting && mark.opacity.is_finished(now)));
        let orphaned = self
            .hover
            .as_ref()
            .map_or(false, |h| !self.points.contains_key(&h.key));
        if orphaned {
            self.hover = None;
        }
        before - (self.points.len() + self.lines.len())
    }

    /// Whether every mark and axis has reached its target.
    pub fn is_settled(&self, now: Duration) -> bool {
        let axes = self
            .domains
            .as_ref()
            .map_or(true, |d| d.x.is_finished(now) && d.y.is_finished(now));
        axes && self
            .points
            .values()
            .all(|m| m.center.is_finished(now) && m.opacity.is_finished(now))
            && self
                .lines
                .values()
                .all(|m| m.vertices.is_finished(now) && m.opacity.is_finished(now))
    }

    /// Show the detail popup for a point, on whichever side has more room.
    pub fn hover(&mut self, key: &RaceKey, now: Duration) -> Option<&TooltipFrame> {
        let mark = self.points.get(key).filter(|m| !m.exiting)?;
        let center = mark.center.sample(now);
        let margin = self.config.margin;
        let left = margin.left + center.x;
        let top = margin.top + center.y;
        let reach = self.config.point_radius + self.config.tooltip_offset_px;
        let (direction, anchor) = if left < self.config.tooltip_flip_px {
            (TooltipDirection::East, Point::new(left + reach, top))
        } else {
            (TooltipDirection::North, Point::new(left, top - reach))
        };
        let frame = TooltipFrame {
            anchor,
            direction,
            content: tooltip::format(&mark.race),
        };
        self.hover = Some(Hover {
            key: key.clone(),
            frame,
        });
        self.hover.as_ref().map(|h| &h.frame)
    }

    pub fn leave(&mut self) {
        self.hover = None;
    }

    /// Release every mark; the panel accepts no further updates.
    pub fn dispose(&mut self) {
        self.points.clear();
        self.lines.clear();
        self.domains = None;
        self.hover = None;
        self.state = PanelState::Disposed;
        debug!("Disposed panel {}", self.name);
    }

    pub fn point_target(&self, key: &RaceKey) -> Option<Point> {
        self.points.get(key).map(|m| *m.center.target())
    }

    pub fn line_target(&self, athlete_id: &AthleteId) -> Option<&[Point]> {
        self.lines.get(athlete_id).map(|m| m.vertices.target().as_slice())
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Snapshot every attribute at `now`.
    pub fn frame(&self, now: Duration) -> Scene {
        let inner_w = self.config.inner_width();
        let inner_h = self.config.inner_height();
        let (x_ticks, y_ticks) = match &self.domains {
            Some(d) => (
                date_axis_ticks(d.x.sample(now), [0.0, inner_w], self.config.x_ticks),
                seconds_axis_ticks(d.y.sample(now), [0.0, inner_h], self.config.y_ticks),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let points = self
            .points
            .iter()
            .filter(|(_, m)| !(m.exiting && m.opacity.is_finished(now)))
            .map(|(key, m)| PointFrame {
                key: key.to_string(),
                center: m.center.sample(now),
                radius: self.config.point_radius,
                color: m.race.color.clone(),
                opacity: m.opacity.sample(now),
            })
            .collect();
        let lines = self
            .lines
            .iter()
            .filter(|(_, m)| !(m.exiting && m.opacity.is_finished(now)))
            .map(|(id, m)| LineFrame {
                key: id.to_string(),
                vertices: m.vertices.sample(now),
                color: m.color.clone(),
                opacity: m.opacity.sample(now),
            })
            .collect();

        Scene {
            name: self.name.clone(),
            container_id: self.container_id.clone().unwrap_or_default(),
            width: self.config.width,
            height: self.config.height,
            origin: Point::new(self.config.margin.left, self.config.margin.top),
            x_axis: AxisFrame {
                orientation: AxisOrientation::Bottom,
                length: inner_w,
                ticks: x_ticks,
            },
            y_axis: AxisFrame {
                orientation: AxisOrientation::Left,
                length: inner_h,
                ticks: y_ticks,
            },
            points,
            lines,
            tooltip: self.hover.as_ref().map(|h| h.frame.clone()),
        }
    }
}

fn extent(plotted: &[(&Race, NaiveDate, f64)]) -> Option<(NaiveDate, NaiveDate, f64, f64)> {
    let (_, first_day, first_secs) = plotted.first()?;
    let init = (*first_day, *first_day, *first_secs, *first_secs);
    Some(
        plotted
            .iter()
            .fold(init, |(lo_d, hi_d, lo_s, hi_s), &(_, day, secs)| {
                (lo_d.min(day), hi_d.max(day), lo_s.min(secs), hi_s.max(secs))
            }),
    )
}

/// DOM-safe container id for an event name, e.g. `"5000 Meters"` -> `"chart-5000-meters"`.
pub fn container_id_for(event_name: &str) -> String {
    let slug: String = event_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("chart-{}", slug)
}

/// Panels for the current event list, kept in event order.
pub struct PanelSet {
    config: ChartConfig,
    panels: IndexMap<String, ChartPanel>,
}

impl PanelSet {
    pub fn new(config: ChartConfig) -> Self {
        Self {
            config,
            panels: IndexMap::new(),
        }
    }

    /// Dispose panels whose event vanished, create panels for new events and
    /// update every panel with its event.
    pub fn sync(
        &mut self,
        events: &[Event],
        line_type: LineType,
        now: Duration,
    ) -> Result<(), TrackrError> {
        let current: HashSet<&str> = events.iter().map(|e| e.name.as_str()).collect();
        self.panels.retain(|name, panel| {
            let keep = current.contains(name.as_str());
            if !keep {
                panel.dispose();
            }
            keep
        });

        for event in events {
            let panel = match self.panels.entry(event.name.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut panel = ChartPanel::new(event.name.clone(), self.config.clone());
                    panel.init(&container_id_for(&event.name))?;
                    entry.insert(panel)
                }
            };
            panel.update(event, line_type, now)?;
        }

        let position = |name: &str| {
            events
                .iter()
                .position(|e| e.name == name)
                .unwrap_or(usize::MAX)
        };
        self.panels
            .sort_by(|a, _, b, _| position(a.as_str()).cmp(&position(b.as_str())));
        Ok(())
    }

    pub fn tick(&mut self, now: Duration) -> usize {
        self.panels.values_mut().map(|p| p.tick(now)).sum()
    }

    pub fn is_settled(&self, now: Duration) -> bool {
        self.panels.values().all(|p| p.is_settled(now))
    }

    pub fn get(&self, event_name: &str) -> Option<&ChartPanel> {
        self.panels.get(event_name)
    }

    pub fn get_mut(&mut self, event_name: &str) -> Option<&mut ChartPanel> {
        self.panels.get_mut(event_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChartPanel> {
        self.panels.values()
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn frames(&self, now: Duration) -> Vec<Scene> {
        self.panels.values().map(|p| p.frame(now)).collect()
    }
}
