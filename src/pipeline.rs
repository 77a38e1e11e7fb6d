// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Batch restoration.
//!
//! Each page goes through decode, unscramble and encode on its own. Pages
//! run in parallel on a dedicated thread pool and finished pages are
//! streamed back through a bounded channel, in completion order.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::codec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::strategy::{Strategy, Unscrambled, Unscrambler};

/// One page to restore.
#[derive(Clone, Debug)]
pub struct ImageJob {
    /// Caller-chosen tag, copied to the matching [`JobOutput`].
    pub index: usize,
    pub bytes: Vec<u8>,
    /// Dimensions declared by the host page, if known.
    pub width: Option<usize>,
    pub height: Option<usize>,
    /// Seed text, required by the permutation scheme.
    pub seed: Option<String>,
}

impl ImageJob {
    pub fn new(index: usize, bytes: Vec<u8>) -> Self {
        Self {
            index,
            bytes,
            width: None,
            height: None,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_dimensions(mut self, width: usize, height: usize) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Restored page bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Re-encoded page with tiles back in place.
    Restored(Vec<u8>),
    /// Page too small for a grid, input bytes returned unchanged.
    PassThrough(Vec<u8>),
}

impl Outcome {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Outcome::Restored(b) | Outcome::PassThrough(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Outcome::Restored(b) | Outcome::PassThrough(b) => b,
        }
    }
}

#[derive(Debug)]
pub struct JobOutput {
    pub index: usize,
    pub result: Result<Outcome>,
}

/// Restore a single page.
pub fn process(job: ImageJob, config: &Config) -> Result<Outcome> {
    let strategy = Strategy::select(config.scheme, config.grid, job.seed.as_deref())?;

    let raster = codec::decode(&job.bytes)?;
    let (w, h) = (raster.width(), raster.height());
    debug!("page {}: decoded {w}x{h}x{}", job.index, raster.channels());
    if let (Some(dw), Some(dh)) = (job.width, job.height) {
        if (dw, dh) != (w, h) {
            warn!(
                "page {}: declared {dw}x{dh} but decoded {w}x{h}, using decoded size",
                job.index
            );
        }
    }

    match strategy.unscramble(raster)? {
        Unscrambled::Restored(r) => Ok(Outcome::Restored(codec::encode(
            &r,
            config.format,
            config.quality,
        )?)),
        Unscrambled::PassThrough(..) => Ok(Outcome::PassThrough(job.bytes)),
    }
}

/// Runs batches of pages on its own thread pool.
pub struct Pipeline {
    config: Arc<Config>,
    pool: Arc<ThreadPool>,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("jigunshuffle-{i}"));
        if let Some(n) = config.workers {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            pool: Arc::new(pool),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start restoring `jobs` and return their results as they finish.
    ///
    /// A failing page only fails its own [`JobOutput`]. Dropping the
    /// returned iterator stops the remaining pages from being picked up.
    pub fn submit(&self, jobs: Vec<ImageJob>) -> Results {
        let (tx, rx) = channel::bounded(self.config.queue_depth);
        let config = Arc::clone(&self.config);
        info!("restoring {} pages", jobs.len());

        self.pool.spawn(move || {
            let _ = jobs.into_par_iter().try_for_each_with(tx, |tx, job| {
                let index = job.index;
                let result = process(job, &config);
                tx.send(JobOutput { index, result }).map_err(drop)
            });
        });

        Results {
            rx,
            _pool: Arc::clone(&self.pool),
        }
    }
}

/// Lazy stream of finished pages, in completion order.
pub struct Results {
    rx: Receiver<JobOutput>,
    _pool: Arc<ThreadPool>,
}

impl Results {
    /// Wait for every page and sort the outputs by job index.
    pub fn collect_ordered(self) -> Vec<JobOutput> {
        let mut out: Vec<_> = self.collect();
        out.sort_by_key(|o| o.index);
        out
    }
}

impl Iterator for Results {
    type Item = JobOutput;

    fn next(&mut self) -> Option<JobOutput> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{OutputFormat, RasterBuffer};
    use crate::config::ConfigBuilder;
    use crate::strategy::Scheme;
    use ndarray::Array3;

    fn png(w: usize, h: usize) -> Vec<u8> {
        let r = RasterBuffer::new(Array3::from_shape_fn((h, w, 3), |(y, x, c)| {
            (y * 3 + x + c) as u8
        }))
        .unwrap();
        codec::encode(&r, OutputFormat::Png, 1.0).unwrap()
    }

    #[test]
    fn small_page_returns_input_bytes() {
        let config = ConfigBuilder::new().build().unwrap();
        let bytes = png(20, 100);
        let out = process(ImageJob::new(0, bytes.clone()).with_seed("9"), &config).unwrap();
        assert_eq!(out, Outcome::PassThrough(bytes));
    }

    #[test]
    fn missing_seed_fails_before_decoding() {
        let config = ConfigBuilder::new().build().unwrap();
        let r = process(ImageJob::new(0, b"junk".to_vec()), &config);
        assert!(matches!(r, Err(Error::MissingSeed)));

        let config = ConfigBuilder::new().scheme(Scheme::Transpose).build().unwrap();
        let r = process(ImageJob::new(0, b"junk".to_vec()), &config);
        assert!(matches!(r, Err(Error::Decode(_))));
    }

    #[test]
    fn oversized_grid_fails_the_page_without_panicking() {
        let mut config = ConfigBuilder::new().build().unwrap();
        config.grid.tile_count = 1 << 33;
        let job = ImageJob::new(0, png(64, 64)).with_seed("1");
        assert!(matches!(process(job, &config), Err(Error::InvalidConfig(_))));

        config.grid.tile_count = 60000;
        let job = ImageJob::new(0, png(64, 64)).with_seed("1");
        assert!(matches!(process(job, &config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn declared_size_mismatch_is_tolerated() {
        let config = ConfigBuilder::new().build().unwrap();
        let job = ImageJob::new(0, png(64, 64))
            .with_seed("3")
            .with_dimensions(100, 100);
        assert!(matches!(process(job, &config), Ok(Outcome::Restored(_))));
    }

    #[test]
    fn failures_are_isolated() {
        let config = ConfigBuilder::new()
            .format(OutputFormat::Png)
            .workers(2)
            .queue_depth(1)
            .build()
            .unwrap();
        let pipeline = Pipeline::new(config).unwrap();
        let jobs = vec![
            ImageJob::new(0, png(64, 48)).with_seed("1"),
            ImageJob::new(1, b"broken".to_vec()).with_seed("1"),
            ImageJob::new(2, png(64, 48)),
            ImageJob::new(3, png(10, 10)).with_seed("1"),
        ];

        let out = pipeline.submit(jobs).collect_ordered();
        let indices: Vec<_> = out.iter().map(|o| o.index).collect();
        assert_eq!(indices, [0, 1, 2, 3]);
        assert!(matches!(out[0].result, Ok(Outcome::Restored(_))));
        assert!(matches!(out[1].result, Err(Error::Decode(_))));
        assert!(matches!(out[2].result, Err(Error::MissingSeed)));
        assert!(matches!(out[3].result, Ok(Outcome::PassThrough(_))));
    }

    #[test]
    fn early_drop_does_not_hang() {
        let config = ConfigBuilder::new().workers(1).queue_depth(1).build().unwrap();
        let pipeline = Pipeline::new(config).unwrap();
        let jobs = (0..6)
            .map(|i| ImageJob::new(i, png(40, 40)).with_seed("2"))
            .collect();
        let mut results = pipeline.submit(jobs);
        assert!(results.next().is_some());
        drop(results);

        let again = pipeline.submit(vec![ImageJob::new(9, png(40, 40)).with_seed("2")]);
        assert_eq!(again.count(), 1);
    }
}
