// SPDX-License-Identifier: GPL-3.0-or-later
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use anyhow::Result;
use cadence_application::{IdentityRegistry, Resolver, SourceList};
use cadence_config::{load as load_config, TelemetryConfig};
use cadence_domain::{Query, Source, SourceId, TrackResult};
use cadence_infrastructure::{init_database, NewCatalogFile, SqliteCatalogStore};
use cadence_pipeline::{Resolution, ResolvePipeline};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Resolve tracks against the local music catalog
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an artist/track pair
    Resolve {
        #[arg(long)]
        artist: String,
        #[arg(long)]
        track: String,
        #[arg(long, default_value = "")]
        album: String,
        /// Locator of a previously resolved copy to try first
        #[arg(long)]
        hint: Option<String>,
    },
    /// Free-text search across artists, albums and tracks
    Search { text: String },
    /// Add a local file to the catalog
    Add {
        /// Path of the file on disk
        path: String,
        #[arg(long)]
        artist: String,
        #[arg(long)]
        track: String,
        #[arg(long)]
        album: Option<String>,
        #[arg(long)]
        composer: Option<String>,
        /// Duration in seconds
        #[arg(long, default_value_t = 0)]
        duration: i64,
        /// Bitrate in kbps
        #[arg(long, default_value_t = 0)]
        bitrate: i64,
        #[arg(long)]
        album_position: Option<i64>,
        #[arg(long)]
        disc_number: Option<i64>,
        #[arg(long)]
        mimetype: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.telemetry);
    info!(
        target: "cli",
        database = %config.database.url,
        full_text_candidate_limit = config.resolver.full_text_candidate_limit,
        exact_candidate_limit = ?config.resolver.exact_candidate_limit,
        min_score = config.resolver.min_score,
        max_concurrent_commands = config.pipeline.max_concurrent_commands,
        "configuration loaded"
    );

    let pool = init_database(&config.database).await?;
    let store = Arc::new(SqliteCatalogStore::new(pool).with_min_score(config.resolver.min_score));

    let query = match cli.command {
        Command::Add {
            path,
            artist,
            track,
            album,
            composer,
            duration,
            bitrate,
            album_position,
            disc_number,
            mimetype,
        } => {
            let (size, mtime) = file_stats(&path);
            let file = NewCatalogFile {
                source: SourceId::LOCAL,
                url: path,
                size,
                mtime,
                mimetype,
                duration,
                bitrate,
                artist,
                track,
                album,
                composer,
                album_position,
                disc_number,
                ..Default::default()
            };
            let file_id = store.index_file(&file).await?;
            info!(target: "cli", file_id, url = %file.url, "file added to catalog");
            if !cli.json {
                println!("Added {} (file {})", file.url, file_id);
            }
            return Ok(());
        }
        Command::Resolve {
            artist,
            track,
            album,
            hint,
        } => {
            let query = Query::fields(artist, track, album)?;
            match hint {
                Some(hint) => query.with_result_hint(hint),
                None => query,
            }
        }
        Command::Search { text } => Query::full_text(text)?,
    };

    let sources = Arc::new(SourceList::new(Source::local("My Collection")));
    let resolver = Resolver::new(
        store,
        sources,
        Arc::new(IdentityRegistry::new()),
        config.resolver.clone(),
    );
    let pipeline = ResolvePipeline::new(Arc::new(resolver), config.pipeline.max_concurrent_commands);

    info!(target: "cli", query_id = %query.id(), "resolving");
    let resolution = pipeline.resolve(query).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&ResolutionSummary::from(&resolution))?);
    } else {
        print_resolution(&resolution);
    }
    Ok(())
}

fn init_tracing(telemetry: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&telemetry.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so JSON output on stdout stays parseable.
    if telemetry.json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Size and modification time of a file, zero for whatever cannot be read.
fn file_stats(path: &str) -> (i64, i64) {
    let Ok(metadata) = std::fs::metadata(path) else {
        return (0, 0);
    };
    let size = i64::try_from(metadata.len()).unwrap_or(i64::MAX);
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |age| i64::try_from(age.as_secs()).unwrap_or(i64::MAX));
    (size, mtime)
}

fn print_resolution(resolution: &Resolution) {
    if !resolution.artists.is_empty() {
        println!("Artists:");
        for artist in &resolution.artists {
            println!("  {}", artist.name());
        }
    }
    if !resolution.albums.is_empty() {
        println!("Albums:");
        for album in &resolution.albums {
            println!("  {} - {}", album.artist().name(), album.name());
        }
    }
    if resolution.results.is_empty() {
        println!("No results.");
        return;
    }
    println!("Results:");
    for result in &resolution.results {
        let album = result
            .album
            .as_ref()
            .map(|album| format!(" [{}]", album.name()))
            .unwrap_or_default();
        println!(
            "  {:.2}  {} - {}{}  {}",
            result.score(),
            result.artist.name(),
            result.track,
            album,
            result.url()
        );
    }
}

#[derive(Debug, Serialize)]
struct ResolutionSummary {
    artists: Vec<String>,
    albums: Vec<AlbumSummary>,
    results: Vec<ResultSummary>,
}

#[derive(Debug, Serialize)]
struct AlbumSummary {
    artist: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct ResultSummary {
    url: String,
    score: f32,
    artist: String,
    track: String,
    album: Option<String>,
    composer: Option<String>,
    duration: u32,
    bitrate: u32,
    size: u64,
    mimetype: String,
    album_position: u32,
    disc_number: u32,
    collection: String,
    attributes: BTreeMap<String, String>,
}

impl From<&Resolution> for ResolutionSummary {
    fn from(resolution: &Resolution) -> Self {
        Self {
            artists: resolution
                .artists
                .iter()
                .map(|artist| artist.name().to_string())
                .collect(),
            albums: resolution
                .albums
                .iter()
                .map(|album| AlbumSummary {
                    artist: album.artist().name().to_string(),
                    name: album.name().to_string(),
                })
                .collect(),
            results: resolution.results.iter().map(ResultSummary::from).collect(),
        }
    }
}

impl From<&TrackResult> for ResultSummary {
    fn from(result: &TrackResult) -> Self {
        Self {
            url: result.url(),
            score: result.score(),
            artist: result.artist.name().to_string(),
            track: result.track.clone(),
            album: result.album.as_ref().map(|album| album.name().to_string()),
            composer: result
                .composer
                .as_ref()
                .map(|composer| composer.name().to_string()),
            duration: result.duration,
            bitrate: result.bitrate,
            size: result.size,
            mimetype: result.mimetype.clone(),
            album_position: result.album_position,
            disc_number: result.disc_number,
            collection: result.collection.name().to_string(),
            attributes: result.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_domain::{Album, AlbumId, Artist, ArtistId, Locator, TrackId};

    #[test]
    fn resolve_command_parses_fields_and_hint() {
        let cli = Cli::parse_from([
            "cadence",
            "--json",
            "resolve",
            "--artist",
            "Daft Punk",
            "--track",
            "One More Time",
            "--hint",
            "/music/01.mp3",
        ]);
        assert!(cli.json);
        match cli.command {
            Command::Resolve {
                artist,
                track,
                album,
                hint,
            } => {
                assert_eq!(artist, "Daft Punk");
                assert_eq!(track, "One More Time");
                assert_eq!(album, "");
                assert_eq!(hint.as_deref(), Some("/music/01.mp3"));
            }
            _ => panic!("expected resolve command"),
        }
    }

    #[test]
    fn missing_files_have_no_stats() {
        assert_eq!(file_stats("/definitely/not/here.mp3"), (0, 0));
    }

    #[test]
    fn search_command_takes_free_text() {
        let cli = Cli::parse_from(["cadence", "search", "daft punk one more time"]);
        assert!(!cli.json);
        assert!(matches!(cli.command, Command::Search { ref text } if text == "daft punk one more time"));
    }

    #[test]
    fn summary_flattens_entities() {
        let source = Source::local("My Collection");
        let artist = Arc::new(Artist::new(ArtistId(1), "Daft Punk"));
        let album = Arc::new(Album::new(AlbumId(1), "Discovery", Arc::clone(&artist)));
        let mut result = TrackResult::new(
            Locator::Local("/music/01.mp3".to_string()),
            TrackId(1),
            "One More Time",
            Arc::clone(&artist),
            Arc::clone(source.collection()),
        );
        result.album = Some(Arc::clone(&album));
        result.set_score(0.8);

        let resolution = Resolution {
            results: vec![result],
            artists: vec![artist],
            albums: vec![album],
        };
        let summary = ResolutionSummary::from(&resolution);
        let json = serde_json::to_value(&summary).expect("serialize");

        assert_eq!(json["artists"][0], "Daft Punk");
        assert_eq!(json["albums"][0]["name"], "Discovery");
        assert_eq!(json["results"][0]["url"], "/music/01.mp3");
        assert_eq!(json["results"][0]["album"], "Discovery");
        assert!(json["results"][0]["composer"].is_null());
    }
}
