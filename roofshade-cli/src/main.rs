use clap::Parser;
use roofshade::image::io::load_tile;
use roofshade::lowlevel::from_geo_transform;
use roofshade::{
    BuildingFeature, FeatureReconstruction, MemoryRaster, ModelVariant,
    MultiPolygon, Point, Polygon, ReconstructionConfig, Reconstructor, Ring,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Roofshade CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ModelVariantConfig {
    Prismatic,
}

impl From<ModelVariantConfig> for ModelVariant {
    fn from(value: ModelVariantConfig) -> Self {
        match value {
            ModelVariantConfig::Prismatic => ModelVariant::Prismatic,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ReconstructionConfigJson {
    segmentize_step: f64,
    projection_step: u32,
    position_walk: f64,
    roof_variants: usize,
    shade_variants: usize,
    max_length: u32,
    tile_margin: usize,
    parallel: bool,
    model: ModelVariantConfig,
}

impl Default for ReconstructionConfigJson {
    fn default() -> Self {
        let cfg = ReconstructionConfig::default();
        Self {
            segmentize_step: cfg.segmentize_step,
            projection_step: cfg.projection_step,
            position_walk: cfg.position_walk,
            roof_variants: cfg.roof_variants,
            shade_variants: cfg.shade_variants,
            max_length: cfg.max_length,
            tile_margin: cfg.tile_margin,
            parallel: cfg.parallel,
            model: ModelVariantConfig::Prismatic,
        }
    }
}

impl From<ReconstructionConfigJson> for ReconstructionConfig {
    fn from(rc: ReconstructionConfigJson) -> Self {
        Self {
            segmentize_step: rc.segmentize_step,
            projection_step: rc.projection_step,
            position_walk: rc.position_walk,
            roof_variants: rc.roof_variants,
            shade_variants: rc.shade_variants,
            max_length: rc.max_length,
            tile_margin: rc.tile_margin,
            parallel: rc.parallel,
            variant: rc.model.into(),
            ..ReconstructionConfig::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureJson {
    id: u64,
    /// Exterior ring as `[x, y]` pairs in world coordinates.
    footprint: Vec<[f64; 2]>,
    #[serde(default)]
    holes: Vec<Vec<[f64; 2]>>,
    projection: [f64; 2],
    shade: [f64; 2],
    #[serde(default)]
    max_length: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    image_path: String,
    output_path: Option<String>,
    /// GDAL-style `[x0, dx, rx, y0, ry, dy]`; identity when omitted.
    geo_transform: [f64; 6],
    features: Vec<FeatureJson>,
    reconstruction: ReconstructionConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: String::new(),
            output_path: None,
            geo_transform: [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            features: Vec::new(),
            reconstruction: ReconstructionConfigJson::default(),
        }
    }
}

fn ring_from_json(coords: &[[f64; 2]]) -> Ring {
    Ring::new(coords.iter().map(|c| Point::new(c[0], c[1])).collect())
}

impl From<&FeatureJson> for BuildingFeature {
    fn from(value: &FeatureJson) -> Self {
        Self {
            id: value.id,
            footprint: Polygon::new(
                ring_from_json(&value.footprint),
                value.holes.iter().map(|h| ring_from_json(h)).collect(),
            ),
            projection: Point::new(value.projection[0], value.projection[1]),
            shade: Point::new(value.shade[0], value.shade[1]),
            max_length: value.max_length,
        }
    }
}

/// Polygons as rings of `[x, y]` pairs, exterior first.
type PolygonsJson = Vec<Vec<Vec<[f64; 2]>>>;

fn polygons_to_json(polygons: &MultiPolygon) -> PolygonsJson {
    polygons
        .polygons()
        .iter()
        .map(|polygon| {
            polygon
                .rings()
                .map(|ring| ring.points().iter().map(|p| [p.x, p.y]).collect())
                .collect()
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct FeatureRecord {
    id: u64,
    length: u32,
    value: f64,
    shade_weight: f64,
    roof: PolygonsJson,
    projection: PolygonsJson,
    shade: PolygonsJson,
}

impl From<FeatureReconstruction> for FeatureRecord {
    fn from(value: FeatureReconstruction) -> Self {
        Self {
            id: value.id,
            length: value.length,
            value: value.value,
            shade_weight: value.shade_weight,
            roof: polygons_to_json(&value.roof),
            projection: polygons_to_json(&value.projection),
            shade: polygons_to_json(&value.shade),
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    requested: usize,
    features: Vec<FeatureRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("roofshade=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_path.is_empty() {
        return Err("image_path must be set in the config".into());
    }
    if config.reconstruction.projection_step == 0 {
        return Err("projection_step must be at least 1".into());
    }

    let tile = load_tile(&config.image_path)?;
    let raster = MemoryRaster::new(tile, from_geo_transform(config.geo_transform));
    let features: Vec<BuildingFeature> = config.features.iter().map(BuildingFeature::from).collect();

    let reconstructor = Reconstructor::new(config.reconstruction.into());

    let results = reconstructor.reconstruct_all(&raster, &features);
    tracing::info!(
        requested = features.len(),
        reconstructed = results.len(),
        "reconstruction finished"
    );
    let output = Output {
        requested: features.len(),
        features: results.into_iter().map(FeatureRecord::from).collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_config_maps_to_library_defaults() {
        let config: Config = serde_json::from_str(EXAMPLE_JSON).unwrap();
        assert!(!config.features.is_empty());
        let rc: ReconstructionConfig = config.reconstruction.into();
        assert_eq!(rc, ReconstructionConfig::default());
    }

    #[test]
    fn schema_lists_every_reconstruction_field() {
        let schema: serde_json::Value = serde_json::from_str(SCHEMA_JSON).unwrap();
        let fields = schema["properties"]["reconstruction"]["properties"]
            .as_object()
            .unwrap();
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        for name in [
            "segmentize_step",
            "projection_step",
            "position_walk",
            "roof_variants",
            "shade_variants",
            "max_length",
            "tile_margin",
            "parallel",
            "model",
        ] {
            assert!(names.contains(&name), "missing {name}");
        }
        assert_eq!(names.len(), 9);
    }
}
