mod backend;
mod config;
mod export;
mod logging;
mod model;
mod ports;
mod report;
mod setlist_fm;
mod sync;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{WrapErr, eyre},
};

use crate::{
    backend::resolver::{Platform, SystemProbe, resolve_backend},
    config::Config,
    export::ExportTarget,
    logging::setup_logging,
    model::PlaylistIdentity,
    report::render_outcome,
    setlist_fm::{API_KEY_PAGE, SetlistFmClient, extract_setlist_id, parse_setlist},
    sync::{SyncOutcome, sync_playlist},
};

/// Create a music app playlist from a setlist.fm URL
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The setlist.fm URL
    url: String,

    /// setlist.fm API key
    #[arg(short = 'k', long = "api-key", env = "SETLISTFM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Custom playlist name (default: 'Artist - Venue - Date')
    #[arg(short, long)]
    playlist_name: Option<String>,

    /// Skip the music app and write an M3U playlist file
    #[arg(short, long)]
    export_only: bool,

    /// Path of the playlist file when exporting
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// The config file to use
    #[arg(short, long, env = "SETLIST_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Console log level (default: off)
    #[arg(long, default_value = "off", env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug")]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "SETLIST_SYNC_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.clone(), args.log_file_level)?;

    log::debug!("setlist-sync starting");

    let config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .wrap_err("Failed to load setlist-sync config")?;

    let api_key = args
        .api_key
        .filter(|key| !key.trim().is_empty())
        .or_else(|| config.api_key().map(str::to_string))
        .ok_or_else(|| {
            eyre!(
                "setlist.fm API key required.\nSet SETLISTFM_API_KEY, use --api-key, or add api_key to the config file.\n\nGet your API key at: {}",
                API_KEY_PAGE
            )
        })?;

    println!("Fetching setlist from: {}\n", args.url);

    let setlist_id = extract_setlist_id(&args.url)?;
    println!("Setlist ID: {}", setlist_id);

    let client = SetlistFmClient::new(reqwest::Client::new(), api_key);
    let raw = client.fetch_setlist(&setlist_id).await?;
    let setlist = parse_setlist(raw);

    if setlist.tracks.is_empty() {
        return Err(eyre!("No songs found in setlist {}", setlist_id));
    }

    println!("Artist: {}", setlist.artist);
    println!("Venue: {}", setlist.venue);
    println!("Date: {}", setlist.event_date);
    println!("Songs found: {}\n", setlist.tracks.len());

    let playlist = PlaylistIdentity::new(
        args.playlist_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| setlist.default_playlist_name()),
    );

    let resolution = resolve_backend(
        &Platform::current(),
        args.export_only,
        config.music_app(),
        &SystemProbe,
    )
    .await;
    if let Some(warning) = &resolution.warning {
        eprintln!("Warning: {}. Writing a playlist file instead.\n", warning);
    }
    let mut backend = resolution.backend;

    if !backend.is_null() {
        println!("Creating playlist: {}\n", playlist.name);
    }

    let export_target = ExportTarget {
        path: args.output,
        directory: config.export_directory(),
    };
    let outcome = sync_playlist(&setlist.tracks, &playlist, &mut backend, &export_target)
        .await
        .wrap_err("Failed to export playlist file")?;

    // Releases the host application binding before printing the summary
    drop(backend);

    print!("{}", render_outcome(&playlist.name, &outcome));

    if matches!(outcome, SyncOutcome::Synced(_)) {
        println!("\nOpen your music app to view your playlist!");
    }

    outcome.into_result()
}
