//! Isoterrain CLI - voxel terrain from a drawn land outline.
//!
//! Reads an outline (or grayscale mask) image, grows it into a density
//! volume and writes the extracted surface as a Wavefront OBJ.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use isoterrain::export::{export_density_slice_png, export_heightmap_png, export_mesh_obj, PngExportOptions};
use isoterrain::source::{GrayscaleImageSource, HeightmapSource, OutlineConfig, OutlineImageSource};
use isoterrain::terrain::{TerrainConfig, TerrainSettings};
use isoterrain::TerrainPipeline;

/// Voxel terrain generator.
#[derive(Parser)]
#[command(name = "isoterrain")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Grid options shared by every subcommand. Unset flags fall back to the
/// settings file, then to the defaults.
#[derive(clap::Args)]
struct GridArgs {
    /// JSON settings file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grid cells along x.
    #[arg(long)]
    width: Option<usize>,

    /// Grid cells along z.
    #[arg(long)]
    depth: Option<usize>,

    /// Layers of solid plateau under the terrain.
    #[arg(long)]
    plateau: Option<usize>,

    /// Layers of noise-sculpted terrain above the plateau.
    #[arg(long)]
    terrain: Option<usize>,

    /// Noise sampling scale per voxel.
    #[arg(long)]
    noise_scale: Option<f32>,

    /// Surface threshold in [0, 1].
    #[arg(long)]
    iso: Option<f32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a terrain mesh from an image.
    Generate {
        /// Outline drawing, or a grayscale mask with --direct/--graded.
        input: PathBuf,

        #[command(flatten)]
        grid: GridArgs,

        /// Noise seed for reproducible generation.
        #[arg(short, long)]
        seed: Option<i32>,

        /// Treat the input as a land mask (bright is land) instead of an outline.
        #[arg(long)]
        direct: bool,

        /// Treat the input as a graded heightmap (luma / 255).
        #[arg(long, conflicts_with_all = ["direct", "threshold"])]
        graded: bool,

        /// Luminance threshold: outline pixels below it are ink (default 170),
        /// mask pixels at or above it are land with --direct (default 128).
        #[arg(long)]
        threshold: Option<u8>,

        /// Output directory for generated files.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Base name for output files.
        #[arg(short, long, default_value = "terrain")]
        name: String,

        /// Also write the heightmap and the first terrain slice as PNG.
        #[arg(long)]
        previews: bool,
    },

    /// Show grid dimensions and memory estimates.
    Info {
        #[command(flatten)]
        grid: GridArgs,
    },
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            grid,
            seed,
            direct,
            graded,
            threshold,
            output,
            name,
            previews,
        } => {
            let source: Box<dyn HeightmapSource> = if graded {
                Box::new(GrayscaleImageSource::graded())
            } else if direct {
                Box::new(mask_source(threshold))
            } else {
                Box::new(outline_source(threshold))
            };
            let mut config = load_config(&grid)?;
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            } else if grid.config.is_none() {
                config = config.with_seed(clock_seed());
            }
            run_generate(config, source.as_ref(), input, &output, &name, previews).await
        }
        Commands::Info { grid } => {
            run_info(&load_config(&grid)?);
            Ok(())
        }
    }
}

fn mask_source(threshold: Option<u8>) -> GrayscaleImageSource {
    match threshold {
        Some(threshold) => GrayscaleImageSource {
            threshold: Some(threshold),
        },
        None => GrayscaleImageSource::default(),
    }
}

fn outline_source(threshold: Option<u8>) -> OutlineImageSource {
    let defaults = OutlineConfig::default();
    OutlineImageSource::new(OutlineConfig {
        threshold: threshold.unwrap_or(defaults.threshold),
        ..defaults
    })
}

/// Settings file (or defaults) with command line overrides applied.
fn load_config(grid: &GridArgs) -> anyhow::Result<TerrainConfig> {
    let mut settings = match &grid.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<TerrainSettings>(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => TerrainSettings::default(),
    };

    if let Some(width) = grid.width {
        settings.width = width;
    }
    if let Some(depth) = grid.depth {
        settings.depth = depth;
    }
    if let Some(plateau) = grid.plateau {
        settings.plateau_height = plateau;
        settings.absolute_height = None;
    }
    if let Some(terrain) = grid.terrain {
        settings.terrain_height = terrain;
        settings.absolute_height = None;
    }
    if let Some(noise_scale) = grid.noise_scale {
        settings.noise_scale = noise_scale;
    }
    if let Some(iso) = grid.iso {
        settings.iso = iso;
    }

    Ok(TerrainConfig::try_from(settings)?)
}

fn clock_seed() -> i32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32 as i32)
        .unwrap_or(42)
}

async fn run_generate(
    config: TerrainConfig,
    source: &dyn HeightmapSource,
    input: PathBuf,
    output: &Path,
    name: &str,
    previews: bool,
) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("input image {} does not exist", input.display());
    }
    tokio::fs::create_dir_all(output)
        .await
        .with_context(|| format!("creating {}", output.display()))?;

    println!("Isoterrain - Voxel Terrain Generator");
    println!("====================================");
    println!("Input:      {}", input.display());
    println!("Grid:       {:?} (x, y, z)", config.grid_shape());
    println!("Seed:       {}", config.noise.seed);
    println!("Iso:        {}", config.iso);
    println!();

    let start = Instant::now();
    let mut pipeline = TerrainPipeline::new(config)?;
    let mesh = pipeline.from_image(source, input).await?;

    if mesh.is_empty() {
        bail!("no land found in the input image; nothing to mesh");
    }

    let obj_path = output.join(format!("{name}.obj"));
    export_mesh_obj(&mesh, &obj_path)?;
    info!(path = %obj_path.display(), "Wrote mesh");

    if previews {
        let options = PngExportOptions::default();
        if let Some(heightmap) = pipeline.heightmap() {
            let path = output.join(format!("{name}_heightmap.png"));
            export_heightmap_png(heightmap, &path, &options)?;
            info!(path = %path.display(), "Wrote heightmap preview");
        }
        if let Some(field) = pipeline.density_field() {
            let y = pipeline.config().plateau_height.min(field.height() - 1);
            let path = output.join(format!("{name}_slice_{y}.png"));
            export_density_slice_png(field, y, &path, &options)?;
            info!(path = %path.display(), "Wrote density slice preview");
        }
    }

    println!("Vertices:   {}", mesh.vertex_count());
    println!("Triangles:  {}", mesh.triangle_count());
    if let Some((lo, hi)) = mesh.bounds() {
        println!("Bounds:     {:?} .. {:?}", lo, hi);
    }
    println!("Offset:     {:?}", pipeline.config().world_offset());
    println!("Output:     {}", obj_path.display());
    println!("Completed in {:.2?}", start.elapsed());
    Ok(())
}

fn run_info(config: &TerrainConfig) {
    let [w, h, d] = config.grid_shape();
    let voxels = config.voxel_count();
    let field_bytes = voxels * std::mem::size_of::<f32>();
    let heightmap_bytes = w * d * std::mem::size_of::<f32>();

    println!("Isoterrain Grid Information");
    println!("===========================");
    println!();
    println!("Grid:            {} x {} x {} (x, y, z)", w, h, d);
    println!("Plateau layers:  {}", config.plateau_height);
    println!("Terrain layers:  {}", config.terrain_height);
    println!("Voxels:          {}", voxels);
    println!();
    println!("Memory Estimates:");
    println!("  Heightmap:      {:.2} MB", heightmap_bytes as f64 / 1_048_576.0);
    println!("  Density field:  {:.2} MB", field_bytes as f64 / 1_048_576.0);
    println!();
    println!("World size:      {:?}", config.world_scale * glam::Vec3::new(w as f32, h as f32, d as f32));
    println!("World offset:    {:?}", config.world_offset());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_reaches_every_source() {
        assert_eq!(mask_source(Some(40)).threshold, Some(40));
        assert_eq!(mask_source(None).threshold, Some(128));
        assert_eq!(outline_source(Some(90)).config.threshold, 90);
        assert_eq!(outline_source(None).config, OutlineConfig::default());
    }

    #[test]
    fn test_graded_rejects_threshold() {
        let parsed = Cli::try_parse_from(["isoterrain", "generate", "map.png", "--graded", "--threshold", "10"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["isoterrain", "generate", "map.png", "--direct", "--threshold", "10"]);
        assert!(parsed.is_ok());
    }
}
