//! File-level conversion
//!
//! Every output is serialised in memory, written next to its destination as
//! `<output>.partial` and renamed into place, so a failed conversion never
//! leaves a truncated file behind.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use ts_common::{ConvertedModel, TextureImage, model_to_bytes, texture_to_bytes};

use crate::animation::transcode_animations;
use crate::ace::TextureDecoder;
use crate::config::ConvertConfig;
use crate::mesh::{MeshTranscoder, TEXTURE_EXTENSION, extract_hierarchy, with_extension};
use crate::optimize::{ControllerOptimizer, KeyEquality};
use crate::run_id::RunIds;
use crate::shape::{Shape, read_shape_file};

pub const MODEL_EXTENSION: &str = "ts_model";

/// Sibling directory searched for shape textures
const TEXTURES_DIR: &str = "../TEXTURES";

pub fn texture_output_path(input: &Path) -> PathBuf {
    input.with_extension(TEXTURE_EXTENSION)
}

pub fn model_output_path(input: &Path) -> PathBuf {
    input.with_extension(MODEL_EXTENSION)
}

/// `<dir>/<shape stem>_converted_textures`
pub fn default_shape_texture_dir(shape: &Path) -> PathBuf {
    let stem = shape.file_stem().unwrap_or_default().to_string_lossy();
    shape.with_file_name(format!("{stem}_converted_textures"))
}

/// Write `bytes` to `<output>.partial`, then rename it over `output`
pub fn commit(output: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let mut partial: OsString = output.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    fs::write(&partial, bytes).with_context(|| format!("Failed to write: {:?}", partial))?;
    if let Err(e) = fs::rename(&partial, output) {
        let _ = fs::remove_file(&partial);
        return Err(e).with_context(|| format!("Failed to create output: {:?}", output));
    }
    Ok(())
}

/// Decode an ACE file to in-memory texture data
pub fn convert_texture_to_memory(input: &Path, config: &ConvertConfig) -> Result<TextureImage> {
    TextureDecoder::new()
        .decode_file(input)
        .with_context(|| format!("Failed to decode texture: {:?}", input))
}

/// Convert an ACE file to a TSTEXT container
pub fn convert_texture(input: &Path, output: &Path, config: &ConvertConfig) -> Result<TextureImage> {
    let texture = convert_texture_to_memory(input, config)?;
    let bytes = texture_to_bytes(&texture)
        .with_context(|| format!("Failed to encode texture: {:?}", input))?;
    commit(output, &bytes)?;

    tracing::info!(
        "Converted texture: {}x{} {}, {} bytes",
        texture.width,
        texture.height,
        texture.format,
        texture.data.len()
    );
    Ok(texture)
}

/// Transcode a parsed shape. `output_stem` and `run_id` feed material names.
pub fn build_model(
    shape: &Shape,
    output_stem: &str,
    run_id: u32,
    config: &ConvertConfig,
) -> crate::error::Result<ConvertedModel> {
    let hierarchy = extract_hierarchy(shape);
    let lods = MeshTranscoder::new(shape, output_stem, run_id).transcode_lods()?;
    let mut animations = transcode_animations(&shape.animations);

    if config.optimize_controllers {
        let optimizer = ControllerOptimizer::new(KeyEquality::from_config(config.compare_tcb_shape));
        let removed = optimizer.optimize_all(&mut animations);
        tracing::debug!("Removed {} constant controllers", removed);
    }

    Ok(ConvertedModel {
        hierarchy,
        lods,
        animations,
        ..Default::default()
    })
}

pub fn convert_shape_to_memory(
    input: &Path,
    output_stem: &str,
    config: &ConvertConfig,
    run_ids: &RunIds,
) -> Result<ConvertedModel> {
    let shape =
        read_shape_file(input).with_context(|| format!("Failed to read shape: {:?}", input))?;
    build_model(&shape, output_stem, run_ids.next_id(), config)
        .with_context(|| format!("Failed to convert shape: {:?}", input))
}

/// Convert an MSTS text shape to a TSMODL container
pub fn convert_shape(
    input: &Path,
    output: &Path,
    config: &ConvertConfig,
    run_ids: &RunIds,
) -> Result<ConvertedModel> {
    let shape =
        read_shape_file(input).with_context(|| format!("Failed to read shape: {:?}", input))?;
    write_shape(&shape, input, output, config, run_ids)
}

/// Transcode an already parsed shape and commit it to `output`
pub fn write_shape(
    shape: &Shape,
    input: &Path,
    output: &Path,
    config: &ConvertConfig,
    run_ids: &RunIds,
) -> Result<ConvertedModel> {
    let stem = output.file_stem().unwrap_or_default().to_string_lossy();
    let model = build_model(shape, &stem, run_ids.next_id(), config)
        .with_context(|| format!("Failed to convert shape: {:?}", input))?;
    let bytes =
        model_to_bytes(&model).with_context(|| format!("Failed to encode model: {:?}", input))?;
    commit(output, &bytes)?;

    tracing::info!(
        "Converted shape: {} matrices, {} LODs, {} primitives, {} animations",
        model.hierarchy.len(),
        model.lods.len(),
        model.primitive_count(),
        model.animations.len()
    );
    Ok(model)
}

/// One image referenced by a shape
#[derive(Debug, Clone, PartialEq)]
pub struct TextureJob {
    /// Image name as written in the shape
    pub image: String,
    /// Located source file, `None` when not found
    pub input: Option<PathBuf>,
    pub output: PathBuf,
}

/// Locate and name the textures of a shape file without converting them
pub fn shape_texture_jobs(
    shape_path: &Path,
    output_dir: &Path,
    config: &ConvertConfig,
) -> Result<Vec<TextureJob>> {
    let shape = read_shape_file(shape_path)
        .with_context(|| format!("Failed to read shape: {:?}", shape_path))?;
    Ok(texture_jobs(&shape, shape_path, output_dir, config))
}

pub fn texture_jobs(
    shape: &Shape,
    shape_path: &Path,
    output_dir: &Path,
    config: &ConvertConfig,
) -> Vec<TextureJob> {
    let shape_dir = shape_path.parent().unwrap_or(Path::new(""));
    shape
        .images
        .iter()
        .map(|image| TextureJob {
            image: image.clone(),
            input: find_texture(image, shape_dir, &config.texture_dirs),
            output: output_dir.join(sanitize_relative(&with_extension(image, TEXTURE_EXTENSION))),
        })
        .collect()
}

/// Outcome of converting the textures of one shape
#[derive(Debug, Default)]
pub struct ShapeTextures {
    pub converted: Vec<PathBuf>,
    /// Image names that could not be found
    pub missing: Vec<String>,
    pub failed: Vec<(PathBuf, anyhow::Error)>,
}

/// Convert every texture a shape references. Missing textures are skipped
/// and a failing texture does not stop the others.
pub fn convert_shape_textures(
    shape_path: &Path,
    output_dir: &Path,
    config: &ConvertConfig,
) -> Result<ShapeTextures> {
    let mut result = ShapeTextures::default();

    for job in shape_texture_jobs(shape_path, output_dir, config)? {
        let Some(input) = job.input else {
            tracing::warn!("Texture {} not found, skipping", job.image);
            result.missing.push(job.image);
            continue;
        };

        match convert_texture(&input, &job.output, config) {
            Ok(_) => result.converted.push(job.output),
            Err(e) => {
                tracing::error!("{:#}", e);
                result.failed.push((input, e));
            }
        }
    }

    Ok(result)
}

/// Search the shape directory, its `../TEXTURES` sibling and the extra
/// directories, matching file names case-insensitively
pub fn find_texture(image: &str, shape_dir: &Path, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
    let relative = sanitize_relative(image);
    let file_name = relative.file_name()?.to_os_string();

    let mut dirs = vec![shape_dir.to_path_buf(), shape_dir.join(TEXTURES_DIR)];
    dirs.extend(extra_dirs.iter().cloned());

    dirs.iter().find_map(|dir| {
        let direct = dir.join(&relative);
        if direct.is_file() {
            return Some(direct);
        }
        find_case_insensitive(dir, &file_name.to_string_lossy())
    })
}

fn find_case_insensitive(dir: &Path, file_name: &str) -> Option<PathBuf> {
    fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.is_file()
                && path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(file_name))
        })
}

/// Relative path from a shape-style name: either separator, with `.`/`..`
/// and root components dropped
pub fn sanitize_relative(name: &str) -> PathBuf {
    name.split(['/', '\\'])
        .map(Path::new)
        .flat_map(|part| part.components())
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{SAMPLE_SHAPE, parse_shape};
    use ts_common::Controller;

    #[test]
    fn test_output_paths() {
        assert_eq!(texture_output_path(Path::new("a/WALL.ace")), PathBuf::from("a/WALL.ts_tex"));
        assert_eq!(model_output_path(Path::new("a/house.s")), PathBuf::from("a/house.ts_model"));
        assert_eq!(
            default_shape_texture_dir(Path::new("route/shapes/house.s")),
            PathBuf::from("route/shapes/house_converted_textures")
        );
    }

    #[test]
    fn test_sanitize_relative() {
        assert_eq!(sanitize_relative("..\\textures\\wall.ts_tex"), PathBuf::from("textures/wall.ts_tex"));
        assert_eq!(sanitize_relative("/abs/./x.ace"), PathBuf::from("abs/x.ace"));
        assert_eq!(sanitize_relative("wall.ace"), PathBuf::from("wall.ace"));
    }

    #[test]
    fn test_commit_replaces_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested/out.ts_tex");

        commit(&output, b"first").unwrap();
        commit(&output, b"second").unwrap();

        assert_eq!(fs::read(&output).unwrap(), b"second");
        assert!(!dir.path().join("nested/out.ts_tex.partial").exists());
    }

    #[test]
    fn test_find_texture_search_order() {
        let root = tempfile::tempdir().unwrap();
        let shapes = root.path().join("SHAPES");
        let textures = root.path().join("TEXTURES");
        let extra = root.path().join("GLOBAL");
        for dir in [&shapes, &textures, &extra] {
            fs::create_dir_all(dir).unwrap();
        }

        fs::write(extra.join("a.ace"), b"").unwrap();
        assert_eq!(
            find_texture("a.ace", &shapes, std::slice::from_ref(&extra)),
            Some(extra.join("a.ace"))
        );

        fs::write(textures.join("A.ACE"), b"").unwrap();
        let found = find_texture("a.ace", &shapes, std::slice::from_ref(&extra)).unwrap();
        assert_eq!(found.parent(), Some(shapes.join(TEXTURES_DIR).as_path()));

        fs::write(shapes.join("a.ace"), b"").unwrap();
        assert_eq!(find_texture("a.ace", &shapes, &[]), Some(shapes.join("a.ace")));

        assert_eq!(find_texture("missing.ace", &shapes, &[]), None);
    }

    #[test]
    fn test_build_model_optimizes_by_default() {
        let shape = parse_shape(SAMPLE_SHAPE.as_bytes()).unwrap();

        let model = build_model(&shape, "house", 9, &ConvertConfig::default()).unwrap();
        assert_eq!(model.version, ts_common::MODEL_VERSION);
        assert_eq!(model.hierarchy.len(), 2);
        // The sample position controller never moves, the rotation does
        let clip = &model.animations[0];
        assert_eq!(clip.controller_count(), 1);
        assert_eq!(clip.nodes.len(), 2);
        assert!(matches!(clip.nodes[1].controllers[0], Controller::TcbRotation(_)));

        let config = ConvertConfig {
            optimize_controllers: false,
            ..Default::default()
        };
        let model = build_model(&shape, "house", 9, &config).unwrap();
        assert_eq!(model.animations[0].controller_count(), 2);
    }
}
