//! Human-readable summaries for the `info` command

use anyhow::{Context, Result, bail};
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use ts_common::{ConvertedModel, TextureImage, TsReader};

use crate::ace::TextureDecoder;
use crate::shape::{Shape, read_shape_file};

/// Summarise an `.ace`, `.s`, `.ts_tex` or `.ts_model` file
pub fn describe_file(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "ace" => {
            let texture = TextureDecoder::new()
                .decode_file(path)
                .with_context(|| format!("Failed to decode texture: {:?}", path))?;
            Ok(describe_texture(path, &texture))
        }
        "ts_tex" => {
            let file = File::open(path).with_context(|| format!("Failed to open: {:?}", path))?;
            let texture = TsReader::new(BufReader::new(file))
                .read_texture()
                .with_context(|| format!("Failed to read texture container: {:?}", path))?;
            Ok(describe_texture(path, &texture))
        }
        "s" => {
            let shape = read_shape_file(path)
                .with_context(|| format!("Failed to read shape: {:?}", path))?;
            Ok(describe_shape(path, &shape))
        }
        "ts_model" => {
            let file = File::open(path).with_context(|| format!("Failed to open: {:?}", path))?;
            let model = TsReader::new(BufReader::new(file))
                .read_model()
                .with_context(|| format!("Failed to read model container: {:?}", path))?;
            Ok(describe_model(path, &model))
        }
        _ => bail!(
            "Unsupported file type: {:?} (use .ace, .s, .ts_tex or .ts_model)",
            path
        ),
    }
}

pub fn describe_texture(path: &Path, texture: &TextureImage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Texture: {}", path.display());
    let _ = writeln!(out, "Width: {}", texture.width);
    let _ = writeln!(out, "Height: {}", texture.height);
    let _ = writeln!(out, "Format: {}", texture.format);
    let _ = writeln!(out, "Data length: {}", texture.data.len());
    out
}

pub fn describe_shape(path: &Path, shape: &Shape) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Shape: {}", path.display());
    let _ = writeln!(out, "Points count: {}", shape.points.len());
    let _ = writeln!(out, "Normals count: {}", shape.normals.len());
    let _ = writeln!(out, "Images count: {}", shape.images.len());
    let _ = writeln!(out, "Matrices count: {}", shape.matrices.len());

    let _ = writeln!(out, "\nImages:");
    for image in &shape.images {
        let _ = writeln!(out, "\tImage - {image}");
    }
    let _ = writeln!(out, "\nMatrices:");
    for matrix in &shape.matrices {
        let _ = writeln!(out, "\tMatrix - {}", matrix.name);
    }
    out
}

pub fn describe_model(path: &Path, model: &ConvertedModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model: {} (version {})", path.display(), model.version);
    let _ = writeln!(out, "Matrices: {}", model.hierarchy.len());

    let _ = writeln!(out, "\nLods:");
    for lod in &model.lods {
        let _ = writeln!(out, "\tLod ({})", lod.distance);
        for sub in &lod.sub_objects {
            let _ = writeln!(out, "\t\tSubobject: {} vertices", sub.vertices.len());
            for primitive in &sub.primitives {
                let node = model.node_name(primitive.hierarchy_index).unwrap_or("?");
                let _ = writeln!(out, "\t\t\tPrimitive ({node}): {} triangles", primitive.triangle_count());
                let _ = writeln!(out, "\t\t\t\tTexture: {}", primitive.texture);
                let _ = writeln!(out, "\t\t\t\tMaterial Name: {}", primitive.material_name);
            }
        }
    }

    if !model.animations.is_empty() {
        let _ = writeln!(out, "\nAnimations:");
        for clip in &model.animations {
            let _ = writeln!(
                out,
                "\t{} frames @ {} fps, {} nodes, {} controllers",
                clip.frame_count,
                clip.frame_rate,
                clip.nodes.len(),
                clip.controller_count()
            );
        }
    }
    out
}
