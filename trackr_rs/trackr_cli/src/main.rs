use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use trackr::scene::{TooltipDirection, TooltipFrame};
use trackr::transition::Point;
use trackr::{extract_prs, ChartConfig, Event, LineType, PanelSet, RaceKey, Roster, Scene};

#[derive(Parser, Debug)]
#[command(author, version, about = "Track and field performance charts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one SVG chart per event for the roster's active athletes
    Chart(ChartArgs),
    /// Export every athlete's PR progression per event as CSV
    Prs(PrsArgs),
    /// List the events the roster aggregates into
    Events(EventsArgs),
}

#[derive(Parser, Debug)]
struct ChartArgs {
    /// Roster JSON (array of athletes with their races)
    #[arg(value_hint = ValueHint::FilePath)]
    roster: PathBuf,

    /// Directory receiving `<event>.svg`
    #[arg(long, default_value = "charts", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Line mode: connect every race, or only PR progressions
    #[arg(long, value_enum, default_value_t = LineTypeOpt::All)]
    line_type: LineTypeOpt,

    /// Chart geometry/timing overrides (JSON)
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Athlete ids to switch off before aggregating (repeatable)
    #[arg(long)]
    inactive: Vec<String>,

    /// Race key to show the detail popup for
    #[arg(long)]
    hover: Option<String>,

    /// Also write each panel's scene snapshot as `<event>.json`
    #[arg(long, action = ArgAction::SetTrue)]
    scene_json: bool,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct PrsArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    roster: PathBuf,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "prs.csv", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Athlete ids to leave out (repeatable)
    #[arg(long)]
    inactive: Vec<String>,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct EventsArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    roster: PathBuf,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LineTypeOpt {
    All,
    Prs,
}

impl From<LineTypeOpt> for LineType {
    fn from(value: LineTypeOpt) -> Self {
        match value {
            LineTypeOpt::All => LineType::AllConnected,
            LineTypeOpt::Prs => LineType::Prs,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Chart(args) => args.verbose,
        Command::Prs(args) => args.verbose,
        Command::Events(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Chart(args) => handle_chart(args),
        Command::Prs(args) => handle_prs(args),
        Command::Events(args) => handle_events(args),
    }
}

fn load_roster(path: &Path, inactive: &[String]) -> Result<Roster> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut roster = Roster::from_json(&text)
        .with_context(|| format!("{} is not a valid roster", path.display()))?;
    for id in inactive {
        if !roster.set_active(id, false) {
            warn!("No athlete with id {} in {}", id, path.display());
        }
    }
    info!("Loaded {} athletes from {}", roster.len(), path.display());
    Ok(roster)
}

fn load_config(path: &Path) -> Result<ChartConfig> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    ChartConfig::from_json(&text)
        .with_context(|| format!("invalid chart config {}", path.display()))
}

fn handle_chart(args: ChartArgs) -> Result<()> {
    let roster = load_roster(&args.roster, &args.inactive)?;
    let config = match args.config.as_ref() {
        Some(path) => load_config(path)?,
        None => ChartConfig::default(),
    };
    let line_type = LineType::from(args.line_type);

    let events = roster.events();
    if events.is_empty() {
        warn!("No active athlete has a timed race; nothing to chart");
        return Ok(());
    }

    let mut panels = PanelSet::new(config.clone());
    panels.sync(&events, line_type, Duration::ZERO)?;
    let settled = config.transition();
    let reaped = panels.tick(settled);
    debug!("Settled {} panels at {:?} ({} marks reaped)", panels.len(), settled, reaped);

    if let Some(label) = args.hover.as_ref() {
        let key = RaceKey(label.clone());
        let names: Vec<String> = panels.iter().map(|p| p.name().to_string()).collect();
        let shown = names.iter().any(|name| {
            panels
                .get_mut(name)
                .and_then(|panel| panel.hover(&key, settled))
                .is_some()
        });
        if !shown {
            warn!("Race key {} is not plotted in any panel", label);
        }
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let t_render = Instant::now();
    let scenes = panels.frames(settled);
    let written = scenes
        .par_iter()
        .map(|scene| -> Result<PathBuf> {
            let stem = file_stem(&scene.name);
            let path = args.out_dir.join(format!("{}.svg", stem));
            write_scene_svg(scene, &path)
                .with_context(|| format!("failed to render {}", path.display()))?;
            if args.scene_json {
                let json_path = args.out_dir.join(format!("{}.json", stem));
                let text = serde_json::to_string_pretty(scene)?;
                fs::write(&json_path, text)
                    .with_context(|| format!("failed to write {}", json_path.display()))?;
            }
            Ok(path)
        })
        .collect::<Result<Vec<_>>>()?;

    for path in &written {
        info!("Wrote chart: {}", path.display());
    }
    info!(
        "Render stage: {:.1} ms ({} panels, {})",
        t_render.elapsed().as_secs_f64() * 1000.0,
        written.len(),
        line_type
    );
    Ok(())
}

fn handle_prs(args: PrsArgs) -> Result<()> {
    let roster = load_roster(&args.roster, &args.inactive)?;
    let events = roster.events();
    if args.output.as_os_str() == "-" {
        write_prs_stdout(&events)?;
    } else {
        write_prs_csv(&events, &args.output)?;
        info!("Wrote PR progressions: {}", args.output.display());
    }
    Ok(())
}

fn handle_events(args: EventsArgs) -> Result<()> {
    let roster = load_roster(&args.roster, &[])?;
    let events = roster.events();
    if events.is_empty() {
        warn!("No events: no active athlete has a timed race");
    }
    for event in &events {
        info!(
            "{}: {} races across {} athletes",
            event.name,
            event.races.len(),
            event.athletes.len()
        );
    }
    Ok(())
}

fn file_stem(event_name: &str) -> String {
    let stem: String = event_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "event".to_string()
    } else {
        stem
    }
}

fn write_prs_stdout(events: &[Event]) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::Writer::from_writer(handle);
    write_pr_rows(events, &mut writer)
}

fn write_prs_csv(events: &[Event], path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_pr_rows(events, &mut writer)
}

fn write_pr_rows<W: Write>(events: &[Event], writer: &mut csv::Writer<W>) -> Result<()> {
    writer.write_record(["event", "athlete", "date", "mark", "seconds", "meet"])?;
    for event in events {
        for series in event.athletes.values() {
            for race in extract_prs(&series.races) {
                let seconds = race.seconds()?;
                writer.write_record([
                    event.name.as_str(),
                    series.name.as_str(),
                    race.date.as_str(),
                    race.mark.as_str(),
                    format!("{:.2}", seconds).as_str(),
                    race.meet.as_str(),
                ])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_scene_svg(scene: &Scene, path: &Path) -> Result<()> {
    let size = (scene.width.round() as u32, scene.height.round() as u32);
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw_scene(root, scene)
}

fn series_color(color: &trackr::Color) -> RGBColor {
    match color.rgb() {
        Some((r, g, b)) => RGBColor(r, g, b),
        None => {
            warn!("Unrecognised colour {}; drawing in black", color);
            BLACK
        }
    }
}

const TOOLTIP_WIDTH: i32 = 190;
const TOOLTIP_ROW: i32 = 15;

fn draw_scene<DB>(root: DrawingArea<DB, Shift>, scene: &Scene) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let origin = scene.origin;
    let px = |p: Point| {
        (
            (origin.x + p.x).round() as i32,
            (origin.y + p.y).round() as i32,
        )
    };

    let axis_style = BLACK.mix(0.85);
    let label_font = ("sans-serif", 11).into_font().color(&BLACK);
    let inner_w = scene.x_axis.length;
    let inner_h = scene.y_axis.length;

    root.draw(&PathElement::new(
        vec![px(Point::new(0.0, inner_h)), px(Point::new(inner_w, inner_h))],
        axis_style,
    ))?;
    for tick in &scene.x_axis.ticks {
        let (x, y) = px(Point::new(tick.position, inner_h));
        root.draw(&PathElement::new(vec![(x, y), (x, y + 6)], axis_style))?;
        root.draw(&Text::new(
            tick.label.clone(),
            (x, y + 8),
            label_font.pos(Pos::new(HPos::Center, VPos::Top)),
        ))?;
    }

    root.draw(&PathElement::new(
        vec![px(Point::new(0.0, 0.0)), px(Point::new(0.0, inner_h))],
        axis_style,
    ))?;
    for tick in &scene.y_axis.ticks {
        let (x, y) = px(Point::new(0.0, tick.position));
        root.draw(&PathElement::new(vec![(x - 6, y), (x, y)], axis_style))?;
        root.draw(&Text::new(
            tick.label.clone(),
            (x - 8, y),
            label_font.pos(Pos::new(HPos::Right, VPos::Center)),
        ))?;
    }

    root.draw(&Text::new(
        scene.name.clone(),
        (px(Point::new(0.0, 0.0)).0, 2),
        ("sans-serif", 13).into_font().color(&BLACK),
    ))?;

    for point in &scene.points {
        let style = series_color(&point.color).mix(point.opacity).filled();
        root.draw(&Circle::new(
            px(point.center),
            point.radius.round() as i32,
            style,
        ))?;
    }

    for line in &scene.lines {
        if line.vertices.len() < 2 {
            continue;
        }
        let style = series_color(&line.color).mix(line.opacity).stroke_width(2);
        let vertices: Vec<(i32, i32)> = line.vertices.iter().map(|v| px(*v)).collect();
        root.draw(&PathElement::new(vertices, style))?;
    }

    if let Some(tooltip) = scene.tooltip.as_ref() {
        draw_tooltip(&root, tooltip)?;
    }

    root.present()?;
    Ok(())
}

fn draw_tooltip<DB>(root: &DrawingArea<DB, Shift>, tooltip: &TooltipFrame) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let rows = tooltip.content.rows();
    let height = TOOLTIP_ROW * rows.len() as i32 + 8;
    let (ax, ay) = (
        tooltip.anchor.x.round() as i32,
        tooltip.anchor.y.round() as i32,
    );
    let (left, top) = match tooltip.direction {
        TooltipDirection::East => (ax, ay - height / 2),
        TooltipDirection::North => (ax - TOOLTIP_WIDTH / 2, ay - height),
    };
    root.draw(&Rectangle::new(
        [(left, top), (left + TOOLTIP_WIDTH, top + height)],
        BLACK.mix(0.8).filled(),
    ))?;
    let font = ("sans-serif", 11).into_font().color(&WHITE);
    for (i, (label, value)) in rows.iter().enumerate() {
        root.draw(&Text::new(
            format!("{}: {}", label, value),
            (left + 6, top + 4 + TOOLTIP_ROW * i as i32),
            font.clone(),
        ))?;
    }
    Ok(())
}
