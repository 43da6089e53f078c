//! Visit Map - viewer and inspection CLI
//!
//! CLI commands:
//! - gui: Launch the native map viewer
//! - layout: Print collision-adjusted marker positions
//! - order: Print the chronological reveal order

mod gui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use visit_map::config::{Config, Env};
use visit_map::data::Dataset;
use visit_map::layout::max_overlap;
use visit_map::{logging, projection, Scene};

#[derive(Parser)]
#[command(name = "visit_map")]
#[command(about = "Animated map of visited places")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to visit_map.yaml config
    #[arg(short, long, default_value = "visit_map.yaml")]
    config: PathBuf,

    /// Directory holding markers.json, visits.json and images/ (overrides DATA_DIR)
    #[arg(short, long)]
    data: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch native map viewer
    Gui,

    /// Print adjusted marker positions as JSON
    Layout {
        /// Override the number of relaxation passes
        #[arg(short, long)]
        passes: Option<usize>,
    },

    /// Print markers in reveal order
    Order,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = Env::load();

    // Initialize logging first; the guard flushes the file log on exit
    let _log_guard = logging::init_logging(&env.log_dir)?;
    tracing::info!("Visit Map starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let mut config = if cli.config.exists() {
        tracing::info!("Loading config from {:?}", cli.config);
        Config::load(&cli.config)?
    } else {
        tracing::warn!("Config file not found: {:?}, using defaults", cli.config);
        Config::default()
    };

    let data_dir = cli.data.unwrap_or(env.data_dir);
    let dataset = Dataset::load(&data_dir)?;

    if let Commands::Layout { passes: Some(passes) } = cli.command {
        config.layout.passes = passes;
    }

    let projector = projection::from_canvas(&config.canvas);
    let scene = Scene::build(&config, projector.as_ref(), &dataset);
    report_scene(&scene);

    match cli.command {
        Commands::Gui => {
            tracing::info!("Launching native map viewer");
            gui::run_viewer(config, scene, data_dir)?;
        }

        Commands::Layout { .. } => {
            print_layout(&scene)?;
        }

        Commands::Order => {
            print_order(&scene);
        }
    }

    Ok(())
}

/// Log what the pipeline dropped along the way
fn report_scene(scene: &Scene) {
    for id in &scene.dropped {
        tracing::warn!("Marker '{}' cannot be projected; skipped", id);
    }
    for rejected in &scene.order.rejected {
        tracing::warn!("{}; visit left out of the reveal order", rejected);
    }
    tracing::info!(
        "Scene built: {} placed, {} dropped, {} to reveal",
        scene.markers.len(),
        scene.dropped.len(),
        scene.order.len()
    );
}

/// Print adjusted positions and the worst remaining overlap
fn print_layout(scene: &Scene) -> anyhow::Result<()> {
    let positions: Vec<_> = scene.markers.iter().map(|m| m.position).collect();
    let radii: Vec<f64> = scene.markers.iter().map(|m| m.radius).collect();

    let markers: Vec<serde_json::Value> = scene
        .markers
        .iter()
        .map(|m| {
            serde_json::json!({
                "id": m.id(),
                "anchor": m.anchor,
                "position": m.position,
                "radius": m.radius,
            })
        })
        .collect();

    let data = serde_json::json!({
        "markers": markers,
        "dropped": scene.dropped,
        "maxOverlap": max_overlap(&positions, &radii),
    });

    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

/// Print markers in reveal order
fn print_order(scene: &Scene) {
    println!("Reveal order ({}):", scene.order.len());
    println!();

    for (index, entry) in scene.order.entries.iter().enumerate() {
        let name = scene
            .marker(&entry.id)
            .map(|m| m.record.display_name.as_str())
            .unwrap_or(entry.id.as_str());
        println!("  {:>3}. {} [{}] ({})", index + 1, name, entry.id, entry.first_visit.date());
    }

    if !scene.order.rejected.is_empty() {
        println!();
        println!("Skipped {} visits with malformed dates", scene.order.rejected.len());
    }
}
