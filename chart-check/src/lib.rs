//! Checks chart documents: upgrades them, loads them against a chart
//! system and reports what is broken.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use note_editor::{
    chart::{
        migrate::{chart_version, CURRENT_VERSION},
        Chart,
    },
    model::UuidSource,
    system::MusicGameSystem,
    timeline::Problem,
};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(
    name = "chart-check",
    about = "Check, upgrade and time rhythm game charts"
)]
pub struct Args {
    /// Chart document
    pub chart: PathBuf,

    /// Chart system descriptor. Without it only the system name is checked.
    #[arg(long)]
    pub system: Option<PathBuf>,

    /// Save the upgraded chart over the input
    #[arg(long)]
    pub write: bool,

    /// Print begin times of the measures in use
    #[arg(long)]
    pub time: bool,
}

pub struct Report {
    /// Version of the document before upgrading.
    pub version: u64,
    pub chart: Chart,
    pub problems: Vec<Problem>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn upgraded(&self) -> bool {
        self.version < CURRENT_VERSION
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timeline = &self.chart.timeline;
        let name = &self.chart.info.name;
        write!(f, "chart `{}`, version {}", name, self.version)?;
        if self.upgraded() {
            write!(f, " (upgraded to {})", CURRENT_VERSION)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "notes: {}, lanes: {}, lane points: {}, note lines: {}, \
            other objects: {}, layers: {}",
            timeline.notes().len(),
            timeline.lanes().len(),
            timeline.lane_points().len(),
            timeline.note_lines().len(),
            timeline.other_objects().len(),
            timeline.layers().len(),
        )?;
        write!(f, "problems: {}", self.problems.len())?;
        for problem in self.problems.iter() {
            write!(f, "\n  {}", problem)?;
        }
        Ok(())
    }
}

/// System with nothing but the name and version the chart asks for.
pub fn bare_system(chart: &Value) -> MusicGameSystem {
    let field = |key: &str| chart.get(key).cloned().unwrap_or_default();
    MusicGameSystem {
        name: field("musicGameSystemName")
            .as_str()
            .unwrap_or_default()
            .to_string(),
        version: field("musicGameSystemVersion").as_u64().unwrap_or(0) as u32,
        ..Default::default()
    }
}

pub fn read_system(path: &Path) -> Result<MusicGameSystem> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Can not read {}", path.display()))?;
    MusicGameSystem::from_json(&json)
        .with_context(|| format!("Invalid chart system {}", path.display()))
}

/// Upgrade, load and validate a raw chart.
pub fn check(chart: Value, system: &MusicGameSystem) -> Result<Report> {
    let version = chart_version(&chart)?;
    let chart = Chart::from_value(chart, system, &mut UuidSource)
        .context("Can not load chart")?;
    let problems = chart.timeline.validate_for(system);
    for problem in problems.iter() {
        log::debug!("{}", problem);
    }
    Ok(Report {
        version,
        chart,
        problems,
    })
}

/// Begin time in seconds of every measure written to disk.
pub fn measure_times(chart: &mut Chart) -> Vec<(usize, f64)> {
    let count = chart.persisted_measure_count();
    let calculator = chart.timeline.calculate_time();
    (0..count)
        .map(|index| (index, calculator.get_time(index as f64)))
        .collect()
}

/// Run the checks `args` ask for. `Ok(false)` when problems were found.
pub fn run(args: &Args) -> Result<bool> {
    let json = fs::read_to_string(&args.chart)
        .with_context(|| format!("Can not read {}", args.chart.display()))?;
    let value: Value = serde_json::from_str(&json)
        .with_context(|| format!("Invalid JSON in {}", args.chart.display()))?;
    let system = match &args.system {
        Some(path) => read_system(path)?,
        None => bare_system(&value),
    };
    let mut report = check(value, &system)?;
    println!("{}", report);

    if args.time {
        for (index, time) in measure_times(&mut report.chart) {
            println!("{:>5} {:>10.3}", index, time);
        }
    }
    if args.write {
        let path = args.chart.display();
        fs::write(&args.chart, report.chart.to_json()?)
            .with_context(|| format!("Can not write {}", path))?;
        report.chart.save();
        log::info!("saved {}", path);
    }
    Ok(report.is_clean())
}
