//! Main Program for Jigunshuffle
//! Run with `--help` for more instruction

// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Error};
use clap::{ArgAction, Parser};
use jigunshuffle::manifest::Manifest;
use jigunshuffle::{Config, ConfigBuilder, ImageJob, Outcome, OutputFormat, Pipeline, Scheme};
use log::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input files, in page order
    #[arg(required_unless_present = "manifest")]
    inputs: Vec<PathBuf>,

    /// JSON manifest listing the pages of a chapter
    #[arg(short = 'm', long, conflicts_with = "inputs")]
    manifest: Option<PathBuf>,

    /// TOML configuration file, overridden by the flags below
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Scrambling scheme
    #[arg(short = 's', long, value_enum)]
    scheme: Option<Scheme>,

    /// Scramble seed (permutation scheme only)
    #[arg(long)]
    seed: Option<String>,

    /// Tiles per axis
    #[arg(short = 't', long)]
    tile_count: Option<usize>,

    /// Tile sides are multiples of this
    #[arg(short = 'b', long)]
    block_multiple: Option<usize>,

    /// Output format
    #[arg(short = 'f', long, value_enum)]
    format: Option<OutputFormat>,

    /// Encoder quality (0.0 - 1.0)
    #[arg(short = 'q', long)]
    quality: Option<f32>,

    /// Worker threads
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Output directory
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Log more (repeat for debug output)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

fn load_config(args: &Args) -> Result<Config, Error> {
    let base = match &args.config {
        Some(p) => {
            let s = fs::read_to_string(p)
                .with_context(|| format!("Cannot read config {}", p.display()))?;
            Config::from_toml(&s)?
        }
        None => Config::default(),
    };

    let mut builder = ConfigBuilder::from_config(base);
    if let Some(v) = args.scheme {
        builder = builder.scheme(v);
    }
    if let Some(v) = args.tile_count {
        builder = builder.tile_count(v);
    }
    if let Some(v) = args.block_multiple {
        builder = builder.block_multiple(v);
    }
    if let Some(v) = args.format {
        builder = builder.format(v);
    }
    if let Some(v) = args.quality {
        builder = builder.quality(v);
    }
    if let Some(v) = args.jobs {
        builder = builder.workers(v);
    }
    Ok(builder.build()?)
}

/// Pages to restore, with the files they came from.
struct Batch {
    directory: Option<String>,
    jobs: Vec<ImageJob>,
    sources: HashMap<usize, PathBuf>,
    unreadable: usize,
}

fn read_page(index: usize, path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(b) => Some(b),
        Err(e) => {
            error!("page {index}: cannot read {}: {e}", path.display());
            None
        }
    }
}

fn load_batch(args: &Args) -> Result<Batch, Error> {
    let mut batch = Batch {
        directory: None,
        jobs: Vec::new(),
        sources: HashMap::new(),
        unreadable: 0,
    };

    if let Some(p) = &args.manifest {
        let s = fs::read_to_string(p)
            .with_context(|| format!("Cannot read manifest {}", p.display()))?;
        let manifest = Manifest::from_json(&s)
            .with_context(|| format!("Cannot parse manifest {}", p.display()))?;
        let base = p.parent().unwrap_or(Path::new("."));

        for i in 0..manifest.pages.len() {
            let Some(path) = manifest.page_path(i, base) else {
                continue;
            };
            let Some(mut job) = read_page(i, &path).and_then(|b| manifest.job(i, b)) else {
                batch.unreadable += 1;
                continue;
            };
            if job.seed.is_none() {
                job.seed = args.seed.clone();
            }
            batch.jobs.push(job);
            batch.sources.insert(i, path);
        }
        batch.directory = manifest.directory_name();
    } else {
        for (i, path) in args.inputs.iter().enumerate() {
            let Some(bytes) = read_page(i, path) else {
                batch.unreadable += 1;
                continue;
            };
            let mut job = ImageJob::new(i, bytes);
            job.seed = args.seed.clone();
            batch.jobs.push(job);
            batch.sources.insert(i, path.clone());
        }
    }

    Ok(batch)
}

/// Extension for bytes written back unchanged.
fn passthrough_extension(bytes: &[u8], source: Option<&PathBuf>) -> String {
    if let Ok(f) = image::guess_format(bytes) {
        if let Some(e) = f.extensions_str().first() {
            return (*e).to_owned();
        }
    }
    source
        .and_then(|p| p.extension())
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bin".to_owned())
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(&args)?;
    let batch = load_batch(&args)?;

    let mut out_dir = args.output.clone();
    if let Some(dir) = &batch.directory {
        out_dir.push(dir);
    }
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Cannot create {}", out_dir.display()))?;

    let total = batch.jobs.len() + batch.unreadable;
    let mut failed = batch.unreadable;
    let pipeline = Pipeline::new(config)?;
    let ext = pipeline.config().format.extension();

    for out in pipeline.submit(batch.jobs) {
        let source = batch.sources.get(&out.index);
        let (bytes, ext) = match out.result {
            Ok(Outcome::Restored(b)) => (b, ext.to_owned()),
            Ok(Outcome::PassThrough(b)) => {
                let e = passthrough_extension(&b, source);
                (b, e)
            }
            Err(e) => {
                error!("page {}: {:#}", out.index, Error::from(e));
                failed += 1;
                continue;
            }
        };

        let path = out_dir.join(format!("{}.{ext}", out.index));
        if let Err(e) = fs::write(&path, bytes) {
            error!("page {}: cannot write {}: {e}", out.index, path.display());
            failed += 1;
            continue;
        }
        info!("page {} -> {}", out.index, path.display());
    }

    if failed > 0 {
        bail!("{failed} of {total} pages failed");
    }
    Ok(())
}
