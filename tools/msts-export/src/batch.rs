//! Parallel batch conversion
//!
//! Shapes and standalone textures are converted on a rayon pool. Every
//! output location is written at most once per batch: many shapes share
//! textures, and a directory may also contain those textures on their own.
//! A texture a shape names as `sub\\wall.ace` lands in `textures/sub/`, so
//! the model's reference still resolves against the textures directory.

use anyhow::{Context, Result};
use hashbrown::HashSet;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

use crate::config::ConvertConfig;
use crate::convert::{MODEL_EXTENSION, convert_texture, sanitize_relative, texture_jobs, write_shape};
use crate::mesh::TEXTURE_EXTENSION;
use crate::run_id::RunIds;
use crate::shape::read_shape_file;

pub const MODELS_DIR: &str = "models";
pub const TEXTURES_DIR: &str = "textures";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Texture,
    Shape,
}

impl AssetKind {
    /// `.ace` or `.s`, any case
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "ace" => Some(Self::Texture),
            "s" => Some(Self::Shape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub input: PathBuf,
    pub kind: AssetKind,
}

impl BatchJob {
    pub fn from_path(input: impl Into<PathBuf>) -> Option<Self> {
        let input = input.into();
        let kind = AssetKind::from_path(&input)?;
        Some(Self { input, kind })
    }
}

/// Collect `.ace` and `.s` files under `dir`, sorted by path
pub fn collect_jobs(dir: &Path, recursive: bool) -> Result<Vec<BatchJob>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut jobs = Vec::new();

    for entry in WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("Failed to scan directory: {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(job) = BatchJob::from_path(entry.into_path()) {
            jobs.push(job);
        }
    }

    jobs.sort_by(|a, b| a.input.cmp(&b.input));
    Ok(jobs)
}

#[derive(Debug)]
pub struct AssetFailure {
    pub input: PathBuf,
    pub error: anyhow::Error,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Written output files
    pub converted: Vec<PathBuf>,
    /// Textures referenced by a shape but not found, as `image (shape)`
    pub skipped: Vec<String>,
    /// Inputs whose output location was already claimed in this batch
    pub duplicates: Vec<PathBuf>,
    pub failures: Vec<AssetFailure>,
}

impl BatchReport {
    pub fn merge(&mut self, other: BatchReport) {
        self.converted.extend(other.converted);
        self.skipped.extend(other.skipped);
        self.duplicates.extend(other.duplicates);
        self.failures.extend(other.failures);
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, input: &Path, error: anyhow::Error) {
        tracing::error!("{:#}", error);
        self.failures.push(AssetFailure {
            input: input.to_path_buf(),
            error,
        });
    }
}

/// Lower-cased source names, relative to their output directory, already
/// claimed by a worker
#[derive(Debug, Default)]
struct SeenFiles(Mutex<HashSet<String>>);

impl SeenFiles {
    /// True the first time a relative name is seen
    fn claim(&self, relative: &Path) -> bool {
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
            .collect::<Vec<_>>()
            .join("/");
        let mut seen = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        seen.insert(key)
    }
}

fn file_name(path: &Path) -> &Path {
    path.file_name().map(Path::new).unwrap_or(path)
}

struct BatchConverter<'a> {
    config: &'a ConvertConfig,
    run_ids: &'a RunIds,
    models_dir: PathBuf,
    textures_dir: PathBuf,
    seen: SeenFiles,
}

impl BatchConverter<'_> {
    fn run(&self, job: &BatchJob) -> BatchReport {
        let mut report = BatchReport::default();
        match job.kind {
            AssetKind::Texture => self.texture(&job.input, file_name(&job.input), &mut report),
            AssetKind::Shape => self.shape(&job.input, &mut report),
        }
        report
    }

    /// `relative` is the source name below the textures directory
    fn texture(&self, input: &Path, relative: &Path, report: &mut BatchReport) {
        if !self.seen.claim(relative) {
            tracing::debug!("Already converted: {:?}", input);
            report.duplicates.push(input.to_path_buf());
            return;
        }

        let output = self.textures_dir.join(relative).with_extension(TEXTURE_EXTENSION);
        tracing::info!("Converting {:?} -> {:?}", input, output);
        match convert_texture(input, &output, self.config) {
            Ok(_) => report.converted.push(output),
            Err(e) => report.fail(input, e),
        }
    }

    fn shape(&self, input: &Path, report: &mut BatchReport) {
        if !self.seen.claim(file_name(input)) {
            tracing::debug!("Already converted: {:?}", input);
            report.duplicates.push(input.to_path_buf());
            return;
        }

        let shape = match read_shape_file(input)
            .with_context(|| format!("Failed to read shape: {:?}", input))
        {
            Ok(shape) => shape,
            Err(e) => return report.fail(input, e),
        };

        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let output = self.models_dir.join(format!("{stem}.{MODEL_EXTENSION}"));
        tracing::info!("Converting {:?} -> {:?}", input, output);
        match write_shape(&shape, input, &output, self.config, self.run_ids) {
            Ok(_) => report.converted.push(output),
            Err(e) => return report.fail(input, e),
        }

        for job in texture_jobs(&shape, input, &self.textures_dir, self.config) {
            match job.input {
                Some(texture) => {
                    let relative = sanitize_relative(&job.image);
                    let relative = if relative.as_os_str().is_empty() {
                        file_name(&texture).to_path_buf()
                    } else {
                        relative
                    };
                    self.texture(&texture, &relative, report)
                }
                None => {
                    tracing::warn!("Texture {} not found for {:?}, skipping", job.image, input);
                    report.skipped.push(format!("{} ({})", job.image, input.display()));
                }
            }
        }
    }
}

/// Convert every job, in parallel. A failing asset is recorded in the report
/// and never stops the others; only a pool setup failure is returned as an
/// error.
pub fn convert_batch(
    jobs: &[BatchJob],
    output_dir: &Path,
    config: &ConvertConfig,
    run_ids: &RunIds,
) -> Result<BatchReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.unwrap_or(0))
        .build()
        .context("Failed to start worker pool")?;

    let converter = BatchConverter {
        config,
        run_ids,
        models_dir: output_dir.join(MODELS_DIR),
        textures_dir: output_dir.join(TEXTURES_DIR),
        seen: SeenFiles::default(),
    };

    let reports: Vec<BatchReport> =
        pool.install(|| jobs.par_iter().map(|job| converter.run(job)).collect());

    let mut report = BatchReport::default();
    for r in reports {
        report.merge(r);
    }

    tracing::info!(
        "Batch complete: {} converted, {} skipped, {} duplicates, {} failed",
        report.converted.len(),
        report.skipped.len(),
        report.duplicates.len(),
        report.failures.len()
    );
    Ok(report)
}
