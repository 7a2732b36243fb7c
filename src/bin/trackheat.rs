//! trackheat CLI - Store GPS tracks and inspect the aggregated view
//!
//! Usage:
//!   trackheat add <files>... [--db <path>]
//!   trackheat show [--json] [--top <n>]
//!   trackheat clear
//!
//! Tracks are stored under their file name in a SQLite database. Every
//! command that changes the store rebuilds the aggregated view from all
//! stored tracks, the same way the map viewer does.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::error;
use serde_json::json;
use trackheat::{
    MemorySink, RebuildStatus, Result, Session, SqliteTrackStore, Track, TrackError, ViewerConfig,
    Viewport,
};

#[derive(Parser)]
#[command(name = "trackheat")]
#[command(about = "Store GPS tracks and build a combined track and density view")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Track database (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store track files (GPX or GeoJSON), replacing tracks with the same name
    Add {
        /// Track files to store
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the aggregated view of all stored tracks
    Show {
        /// Print the view as JSON
        #[arg(long)]
        json: bool,

        /// Number of densest cells to list
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Remove every stored track
    Clear,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = run(cli) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ViewerConfig::from_json_file(path)?,
        None => ViewerConfig::default(),
    };
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.database_path));

    let store = SqliteTrackStore::open(&db_path)?;
    let session = Session::new(store, MemorySink::new(), config);

    match cli.command {
        Commands::Add { files } => {
            let tracks = read_tracks(&files)?;
            let status = session.upload(tracks)?;
            print_report(&status);
            print_summary(&session, 0);
        }
        Commands::Show { json, top } => {
            let status = session.refresh()?;
            if json {
                print_json(&session);
            } else {
                print_report(&status);
                print_summary(&session, top);
            }
        }
        Commands::Clear => {
            session.clear()?;
            println!("Cleared all tracks");
        }
    }
    Ok(())
}

/// Read files unchanged, keyed by file name.
fn read_tracks(files: &[PathBuf]) -> Result<Vec<Track>> {
    files
        .iter()
        .map(|path| -> Result<Track> {
            let id = path
                .file_name()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    TrackError::input(path.display().to_string(), "no usable file name")
                })?
                .to_string();
            let data = fs::read(path)
                .map_err(|e| TrackError::input(path.display().to_string(), e.to_string()))?;
            Ok(Track::new(id, data))
        })
        .collect()
}

fn print_report(status: &RebuildStatus) {
    let Some(report) = status.report() else {
        return;
    };
    for failure in &report.failures {
        println!("  skipped: {}", failure);
    }
    for warning in &report.warnings {
        println!(
            "  warning: {} contains unsupported {} geometry",
            warning.track_id, warning.geometry_type
        );
    }
}

fn print_summary(session: &Session<SqliteTrackStore, MemorySink>, top: usize) {
    let view = session.view();

    println!("\n=== Tracks ===");
    for track in &view.tracks {
        println!(
            "  {:<40} {:>4} paths {:>8} points {:>9.2} km",
            track.id,
            track.line_paths,
            track.point_samples,
            track.length_meters / 1000.0
        );
    }
    println!(
        "  total: {} tracks, {} paths, {} points, {:.2} km",
        view.tracks.len(),
        view.line_paths.len(),
        view.point_samples.len(),
        view.total_length_meters() / 1000.0
    );

    session.with_sink(|sink| {
        match sink.viewport() {
            Viewport::Fit { bounds, padding_px } => println!(
                "\nView: [{:.5}, {:.5}] - [{:.5}, {:.5}] (padding {}px)",
                bounds.min_lat, bounds.min_lng, bounds.max_lat, bounds.max_lng, padding_px
            ),
            Viewport::Center { center, zoom } => println!(
                "\nView: center ({:.1}, {:.1}) zoom {}",
                center.latitude, center.longitude, zoom
            ),
        }

        if top == 0 {
            return;
        }
        match sink.density() {
            Some(grid) => {
                println!("\n=== Densest cells ({}m) ===", grid.cell_size_meters);
                for cell in grid.cells.iter().take(top) {
                    println!(
                        "  ({:.5}, {:.5}) {:>6} points  intensity {:.2}",
                        cell.center_lat, cell.center_lng, cell.count, cell.intensity
                    );
                }
            }
            None => println!("\nNo density data"),
        }
    });
}

fn print_json(session: &Session<SqliteTrackStore, MemorySink>) {
    let view = session.view();
    let output = session.with_sink(|sink| {
        json!({
            "view": &*view,
            "viewport": sink.viewport(),
            "hasDensityData": view.has_density_data(),
        })
    });
    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => error!("Failed to serialize view: {}", e),
    }
}
