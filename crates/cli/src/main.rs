use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tagtime_core::{
    app_paths, load_config, read_tags, start_exiftool, GeoTzLookup, NormalizedRecord, ReadTask,
    TagBag, TzOptions,
};
use tzf_rs::DefaultFinder;
use walkdir::WalkDir;

static FINDER: LazyLock<DefaultFinder> = LazyLock::new(DefaultFinder::new);

#[derive(Debug, Parser)]
#[command(name = "tagtime-cli")]
#[command(about = "Normalizes exiftool dates, times, GPS fields and time zones")]
struct Cli {
    /// Log strategy decisions and parse details.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Normalize(NormalizeArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    #[arg(long, default_value_t = false)]
    recursive: bool,
    /// Treat each path as exiftool `-json` output instead of a media file.
    #[arg(long, default_value_t = false)]
    json_input: bool,
    #[arg(long, default_value_t = false)]
    pretty: bool,
    /// Skip the coordinate to time zone lookup.
    #[arg(long, default_value_t = false)]
    no_geo_lookup: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Normalize(args) => cmd_normalize(args),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn tzf_lookup(latitude: f64, longitude: f64) -> Result<Option<String>> {
    let name = FINDER.get_tz_name(longitude, latitude);
    Ok((!name.is_empty()).then(|| name.to_string()))
}

fn cmd_normalize(args: NormalizeArgs) -> Result<()> {
    let config = load_config()?;
    let options = config.timezone;
    let pretty = args.pretty || config.pretty_json;
    let lookup: Option<&(dyn GeoTzLookup + Sync)> = if args.no_geo_lookup || !config.geo_lookup {
        None
    } else {
        Some(&tzf_lookup)
    };

    let files = collect_files(&args.paths, args.recursive)?;
    log::debug!("normalizing {} file(s)", files.len());

    let results: Vec<Result<Vec<NormalizedRecord>>> = if args.json_input {
        files
            .par_iter()
            .map(|path| {
                let bags = read_json_bags(path)?;
                Ok(bags
                    .into_iter()
                    .map(|tags| normalize(tags, &options, lookup))
                    .collect())
            })
            .collect()
    } else {
        files
            .par_iter()
            .map_init(start_exiftool, |exiftool, path| {
                let exiftool = exiftool.as_mut().map_err(|err| anyhow::anyhow!("{err:#}"))?;
                let tags = read_tags(exiftool, path)?;
                Ok(vec![normalize(tags, &options, lookup)])
            })
            .collect()
    };

    let mut records = Vec::new();
    let mut failures = 0usize;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(batch) => records.extend(batch),
            Err(err) => {
                failures += 1;
                log::error!("{}: {err:#}", path.display());
            }
        }
    }

    let body = if pretty {
        serde_json::to_string_pretty(&records)?
    } else {
        serde_json::to_string(&records)?
    };
    println!("{body}");

    if failures > 0 {
        anyhow::bail!("{failures} of {} file(s) could not be read", files.len());
    }
    Ok(())
}

fn normalize(
    tags: TagBag,
    options: &TzOptions,
    lookup: Option<&(dyn GeoTzLookup + Sync)>,
) -> NormalizedRecord {
    let lookup = lookup.map(|l| l as &dyn GeoTzLookup);
    ReadTask::new(tags, options, lookup).normalize()
}

fn collect_files(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let walker = WalkDir::new(path).sort_by_file_name();
        let walker = if recursive { walker } else { walker.max_depth(1) };
        for entry in walker {
            let entry =
                entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

/// One tag object or an array of them, as `exiftool -json` prints.
fn read_json_bags(path: &Path) -> Result<Vec<TagBag>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .map(|item| {
            TagBag::from_value(item)
                .with_context(|| format!("{} holds a non-object entry", path.display()))
        })
        .collect()
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
