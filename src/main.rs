use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;

use playlist_curator::config::load_config;
use playlist_curator::playlist::{CurationOutcome, CuratorConfig};
use playlist_curator::sources::{
    CandidateSource, EmptyPlaylistStore, JsonFileSource, JsonPlaylistStore, PlaylistStore, curate,
};

#[derive(Parser)]
#[command(name = "playlist-curator")]
#[command(about = "Deterministic track selection for curated playlists")]
#[command(version)]
struct Args {
    /// Path to the curator configuration JSON file (defaults to $CURATOR_CONFIG or curator.json)
    #[arg(short = 'c', long = "config")]
    config_file: Option<String>,

    /// Playlist type, e.g. daily or weekly; selects weight and artist cap overrides
    #[arg(short = 't', long = "playlist-type")]
    playlist_type: Option<String>,

    /// Candidate source as name=path to a JSON array of tracks (repeatable)
    #[arg(short = 's', long = "source", required = true)]
    sources: Vec<String>,

    /// Current playlist snapshot JSON (defaults to $CURATOR_PLAYLIST_STATE)
    #[arg(long = "current")]
    current: Option<String>,

    /// Reference date for recency scoring (YYYY-MM-DD, defaults to today)
    #[arg(long = "as-of")]
    as_of: Option<NaiveDate>,

    /// Print the full outcome as JSON
    #[arg(long = "json")]
    json: bool,

    /// Enable debug mode - list every selected track with its scores
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Quiet mode - reduce output verbosity
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let env = load_config();
    let config_path = args
        .config_file
        .clone()
        .unwrap_or_else(|| env.config_path.to_string_lossy().into_owned());

    if !std::path::Path::new(&config_path).exists() {
        eprintln!("Error: Curator configuration file '{config_path}' not found.");
        eprintln!("Please ensure the file exists or specify a different file with --config.");
        return Err(anyhow::anyhow!("Configuration file '{}' not found", config_path));
    }

    let config = match CuratorConfig::load_from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Invalid configuration: {e}");
            return Err(e.into());
        }
    };

    let sources: Vec<JsonFileSource> = args.sources.iter().map(|arg| JsonFileSource::from_arg(arg)).collect();
    let source_refs: Vec<&dyn CandidateSource> = sources.iter().map(|s| s as &dyn CandidateSource).collect();

    let state_path = args
        .current
        .clone()
        .or_else(|| env.state_path.map(|p| p.to_string_lossy().into_owned()));
    let store: Box<dyn PlaylistStore> = match state_path {
        Some(path) => Box::new(JsonPlaylistStore::new(path)),
        None => Box::new(EmptyPlaylistStore),
    };

    let playlist_type = args.playlist_type.clone().or(env.playlist_type);
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());

    let outcome = curate(config, playlist_type.as_deref(), &source_refs, store.as_ref(), as_of)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome, args.debug, args.quiet);
    }

    Ok(())
}

fn print_summary(outcome: &CurationOutcome, debug: bool, quiet: bool) {
    let title = outcome.playlist_type.as_deref().unwrap_or("playlist");
    let selection = &outcome.selection;

    println!("\n{title}");
    println!("{}", "=".repeat(title.len()));
    println!(
        "   Tracks: {}/{} | Unique Artists: {} | Eligible Candidates: {}",
        selection.len(),
        selection.requested_size,
        selection.unique_artists(),
        outcome.eligible_candidates
    );
    if selection.shortfall {
        println!("   ⚠️ Shortfall: {} slots could not be filled", selection.shortfall_count);
    }

    let distribution: Vec<String> = selection
        .bucket_distribution()
        .into_iter()
        .map(|(bucket, count)| format!("{bucket} ({count}/{})", outcome.plan.quota(&bucket)))
        .collect();
    if !distribution.is_empty() {
        println!("   Buckets: {}", distribution.join(", "));
    }

    if !quiet {
        let report = &outcome.report;
        if report.has_warnings() {
            println!(
                "   Data: {} without id, {} duplicates, {} unmapped genre, {} missing audio features",
                report.skipped_missing_id,
                report.duplicate_ids,
                report.unmapped_genre,
                report.missing_audio_features
            );
        }
        for source in &report.failed_sources {
            println!("   ✗ Source '{source}' failed");
        }
    }

    if debug {
        for (i, track) in selection.tracks.iter().enumerate() {
            let reallocated = if track.reallocated { " (reallocated)" } else { "" };
            println!(
                "     {}. \"{}\" by {} [{}]{} | S:{:.3} | ID: {}",
                i + 1,
                track.title,
                track.artist,
                track.bucket,
                reallocated,
                track.score,
                track.id
            );
        }
    }

    let diff = &outcome.diff;
    if diff.update_needed {
        println!(
            "\n✓ Update needed: +{} -{} ({} unchanged, {} moved)",
            diff.added.len(),
            diff.removed.len(),
            diff.unchanged,
            diff.displaced
        );
    } else {
        println!("\n✓ Playlist is up to date");
    }
}
