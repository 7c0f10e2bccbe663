use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use vgrid::{
    Align, Dimensions, Gap, GridProps, GridSnapshot, GridSystem, IndexLocation, Overscan,
    Realm, ScrollBehavior, ScrollSeekConfiguration,
};

mod host;

use host::Host;

#[derive(Parser)]
#[command(name = "vgrid-example")]
#[command(
    version,
    about = "Drive a virtualized grid through a simulated scroll session",
    long_about = None
)]
struct Cli {
    /// Number of items in the grid
    #[arg(short = 'n', long, default_value_t = 10_000)]
    total_count: usize,
    /// Viewport size, WIDTHxHEIGHT
    #[arg(long, default_value = "400x300", value_parser = parse_size)]
    viewport: Dimensions,
    /// Size of every item, WIDTHxHEIGHT
    #[arg(long, default_value = "100x50", value_parser = parse_size)]
    item: Dimensions,
    /// Row and column gap in pixels
    #[arg(long, default_value_t = 0.0)]
    gap: f64,
    /// Extra pixels rendered above and below the viewport
    #[arg(long, default_value_t = 0.0)]
    overscan: f64,
    /// Items rendered before anything is measured
    #[arg(long, default_value_t = 0)]
    initial_item_count: usize,
    /// Item shown at the top after mount
    #[arg(long)]
    initial_index: Option<usize>,
    /// Number of simulated scroll steps
    #[arg(short, long, default_value_t = 10)]
    steps: u32,
    /// Pixels scrolled per step
    #[arg(long, default_value_t = 120.0, allow_negative_numbers = true)]
    step: f64,
    /// Scroll this item into view after the steps
    #[arg(long)]
    scroll_to: Option<usize>,
    /// Alignment used by --scroll-to
    #[arg(long, value_enum, default_value_t = AlignArg::Start)]
    align: AlignArg,
    /// Animate the --scroll-to command
    #[arg(long)]
    smooth: bool,
    /// Enter placeholder mode above this velocity (pixels per sample)
    #[arg(long)]
    seek_velocity: Option<f64>,
    /// Restore from this snapshot if it exists, and save the final snapshot to it
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlignArg {
    Start,
    Center,
    End,
}

impl From<AlignArg> for Align {
    fn from(value: AlignArg) -> Self {
        match value {
            AlignArg::Start => Align::Start,
            AlignArg::Center => Align::Center,
            AlignArg::End => Align::End,
        }
    }
}

fn parse_size(value: &str) -> Result<Dimensions, String> {
    let (width, height) = value
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid length `{part}`: {err}"))
    };
    Ok(Dimensions::new(parse(width)?, parse(height)?))
}

fn init_tracing() {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            match tracing_subscriber::EnvFilter::try_new("error,vgrid=info,vgrid_example=info") {
                Ok(filter) => filter,
                Err(_) => tracing_subscriber::EnvFilter::new("error"),
            }
        }
    };

    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .try_init();
}

fn load_snapshot(path: &Path) -> Result<Option<GridSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let snapshot = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
    Ok(Some(snapshot))
}

fn print_state(label: &str, host: &Host) {
    let grid = host.grid();
    let realm = grid.realm();
    let state = host.state();
    let range = state
        .range()
        .map(|range| format!("{}..={}", range.start_index, range.end_index))
        .unwrap_or_else(|| "-".to_string());
    let first = state
        .items
        .first()
        .and_then(|item| item.data.clone())
        .unwrap_or_default();
    println!(
        "{label:>10}  top={:>8.1}  items={range:<12} first={first:<12} above={:>8.1} below={:>8.1} at_top={} at_bottom={} seeking={}",
        host.scroll_top(),
        state.offset_top,
        state.offset_bottom,
        realm.value(grid.state_flags.is_at_top),
        realm.value(grid.state_flags.is_at_bottom),
        realm.value(grid.scroll_seek.is_seeking),
    );
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    if cli.viewport.width <= 0.0 || cli.viewport.height <= 0.0 {
        bail!("the viewport must have a positive size");
    }

    let realm = Realm::new();
    let grid = GridSystem::<String>::new(&realm);
    realm.subscribe(grid.start_reached, |_, index| {
        tracing::info!(index, "start reached");
    });
    realm.subscribe(grid.end_reached, |_, index| {
        tracing::info!(index, "end reached");
    });
    realm.subscribe(grid.range_changed, |_, range| {
        tracing::debug!(start = range.start_index, end = range.end_index, "range changed");
    });

    let labels: Vec<String> = (0..cli.total_count)
        .map(|index| format!("item #{index}"))
        .collect();
    let mut props = GridProps::default()
        .total_count(cli.total_count)
        .initial_item_count(cli.initial_item_count)
        .data(labels)
        .gap(Gap::new(cli.gap, cli.gap))
        .overscan(Overscan::Uniform(cli.overscan));
    if let Some(index) = cli.initial_index {
        props = props.initial_top_most_item_index(index);
    }
    if let Some(velocity) = cli.seek_velocity {
        let configuration =
            ScrollSeekConfiguration::velocity_thresholds(velocity, velocity / 10.0);
        props = props.scroll_seek_configuration(configuration);
    }
    if let Some(path) = &cli.snapshot
        && let Some(snapshot) = load_snapshot(path)?
    {
        tracing::info!(scroll_top = snapshot.scroll_top, "restoring snapshot");
        props = props.restore_state_from(snapshot);
    }
    props.apply(&grid).context("invalid grid configuration")?;

    let mut host = Host::new(grid.clone(), cli.viewport, cli.item);
    host.measure();
    host.settle();
    print_state("mount", &host);

    for step in 1..=cli.steps {
        host.scroll_by(cli.step);
        print_state(&format!("step {step}"), &host);
    }

    if let Some(index) = cli.scroll_to {
        let behavior = if cli.smooth {
            ScrollBehavior::Smooth
        } else {
            ScrollBehavior::Auto
        };
        grid.scroll_to_index(
            IndexLocation::from(index)
                .align(cli.align.into())
                .behavior(behavior),
        );
        host.settle();
        print_state("scroll to", &host);
    }

    host.idle(Duration::from_millis(500));
    print_state("idle", &host);

    if let Some(path) = &cli.snapshot {
        let json = serde_json::to_string_pretty(&grid.snapshot())?;
        fs::write(path, json)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), "snapshot saved");
    }
    Ok(())
}
