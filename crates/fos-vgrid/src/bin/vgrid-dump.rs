//! vgrid-dump - preprocess text and write the atlas groups as images
//!
//! Usage: vgrid-dump <font file | family name> [text] [output dir]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fos_vgrid::{AtlasGroup, GlyphPreprocessor, BEZIER_ATLAS_SIZE, GRID_ATLAS_SIZE};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let font = args
        .next()
        .context("usage: vgrid-dump <font file | family name> [text] [output dir]")?;
    let text = args.next();
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));

    let mut preprocessor = GlyphPreprocessor::new();
    let font_id = if Path::new(&font).exists() {
        preprocessor.open_font(&font)?
    } else {
        preprocessor.open_system_font(&font)?
    };

    match &text {
        Some(text) => {
            for c in text.chars() {
                preprocessor.get_glyph(font_id, c as u32)?;
            }
        }
        None => preprocessor.load_ascii(font_id)?,
    }

    let stored: usize = preprocessor
        .atlas_groups()
        .iter()
        .map(|g| g.glyph_count)
        .sum();
    let empty = preprocessor.glyph_count().saturating_sub(stored);
    tracing::info!(
        "{} glyphs preprocessed ({} empty) into {} atlas groups",
        preprocessor.glyph_count(),
        empty,
        preprocessor.atlas_groups().len()
    );

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    for index in preprocessor.pending_uploads() {
        let group = &preprocessor.atlas_groups()[index];
        log_occupancy(index, group);
        dump_group(&out_dir, index, group)?;
        preprocessor.mark_uploaded(index);
    }

    Ok(())
}

fn log_occupancy(index: usize, group: &AtlasGroup) {
    let data_capacity = BEZIER_ATLAS_SIZE as u32 * BEZIER_ATLAS_SIZE as u32;
    tracing::info!(
        "group {}: {} glyphs, data {}/{} px ({:.1}%), grid cursor {:?}{}",
        index,
        group.glyph_count,
        group.used_data_pixels(),
        data_capacity,
        100.0 * group.used_data_pixels() as f64 / data_capacity as f64,
        group.next_grid_pos,
        if group.full { ", full" } else { "" }
    );
}

fn dump_group(out_dir: &Path, index: usize, group: &AtlasGroup) -> Result<()> {
    let grid_side = GRID_ATLAS_SIZE as u32;
    let grid = image::RgbaImage::from_raw(grid_side, grid_side, group.grid_atlas.clone())
        .context("grid atlas has an unexpected size")?;
    let grid_path = out_dir.join(format!("group{index}-grid.png"));
    grid.save(&grid_path)
        .with_context(|| format!("writing {}", grid_path.display()))?;

    let data_side = BEZIER_ATLAS_SIZE as u32;
    let data = image::RgbaImage::from_raw(data_side, data_side, group.glyph_data.clone())
        .context("glyph data buffer has an unexpected size")?;
    let data_path = out_dir.join(format!("group{index}-data.png"));
    data.save(&data_path)
        .with_context(|| format!("writing {}", data_path.display()))?;

    tracing::info!("wrote {} and {}", grid_path.display(), data_path.display());
    Ok(())
}
