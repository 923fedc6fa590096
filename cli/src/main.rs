use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use puzzlecut::{GeneratorConfig, PuzzleGenerator};
use puzzlecut_core::{quote, ImageRef, OptionCatalog, PuzzleSpec, Shape};
use rand::Rng;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "puzzlecut-cli", version, about = "Jigsaw cut files and quotes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a laser cut file for one puzzle.
    Generate {
        #[arg(long, default_value = "rectangle")]
        shape: String,
        #[arg(long)]
        size: String,
        #[arg(long)]
        material: String,
        #[arg(long)]
        pieces: u32,
        #[arg(long)]
        seed: Option<String>,
        #[arg(long)]
        image: String,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, env = "PUZZLECUT_CONFIG")]
        config: Option<PathBuf>,
        #[arg(long, env = "PUZZLECUT_CATALOG")]
        catalog: Option<PathBuf>,
        /// Reject undersized rim pieces instead of merging them.
        #[arg(long)]
        strict_slivers: bool,
    },
    /// Price a configuration without generating geometry.
    Quote {
        #[arg(long)]
        size: String,
        #[arg(long)]
        material: String,
        #[arg(long)]
        pieces: u32,
        #[arg(long)]
        json: bool,
        #[arg(long, env = "PUZZLECUT_CATALOG")]
        catalog: Option<PathBuf>,
    },
    /// List sizes, materials and piece tiers.
    Options {
        #[arg(long, env = "PUZZLECUT_CATALOG")]
        catalog: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            shape,
            size,
            material,
            pieces,
            seed,
            image,
            out,
            config,
            catalog,
            strict_slivers,
        } => {
            let catalog = load_catalog(catalog.as_deref())?;
            let mut config = match config {
                Some(path) => GeneratorConfig::load(path)?,
                None => GeneratorConfig::default(),
            };
            config.merge_slivers &= !strict_slivers;
            let seed = match seed.as_deref() {
                Some(raw) => parse_seed_arg(raw)?,
                None => random_seed(),
            };
            let spec = PuzzleSpec {
                shape: shape.parse::<Shape>()?,
                size: catalog.parse_size(&size)?,
                material: catalog.parse_material(&material)?,
                piece_count: pieces,
                image_ref: ImageRef::new(image)?,
                seed,
            };
            let generator = PuzzleGenerator::new(catalog, config)?;
            let generation = match generator.generate(&spec) {
                Ok(generation) => generation,
                Err(err) => {
                    if err.is_retryable() {
                        if generator.config().merge_slivers {
                            eprintln!("hint: try another --seed or a different --pieces tier");
                        } else {
                            eprintln!("hint: allow sliver merging or try another --seed");
                        }
                    }
                    return Err(err.into());
                }
            };

            match out {
                Some(path) => fs::write(&path, generation.artifact.as_svg())?,
                None => std::io::stdout().write_all(generation.artifact.as_svg().as_bytes())?,
            }
            eprintln!("seed: {seed:#010x}");
            eprintln!(
                "grid: {}x{} ({} pieces cut)",
                generation.grid.cols,
                generation.grid.rows,
                generation.artifact.piece_count()
            );
            eprintln!("price: {}", generation.quote.final_price);
        }
        Commands::Quote {
            size,
            material,
            pieces,
            json,
            catalog,
        } => {
            let catalog = load_catalog(catalog.as_deref())?;
            let size = catalog.parse_size(&size)?;
            let material = catalog.parse_material(&material)?;
            let quote = quote(&catalog, size, material, pieces)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&quote)?);
            } else {
                println!("base: {}", quote.base_price);
                println!("material: {}", quote.material_multiplier);
                println!("pieces: {}", quote.piece_count_multiplier);
                println!("price: {}", quote.final_price);
            }
        }
        Commands::Options { catalog } => {
            let catalog = load_catalog(catalog.as_deref())?;
            println!("sizes:");
            for option in &catalog.sizes {
                println!(
                    "  {} ({}) {}x{} mm, base {}",
                    option.size, option.label, option.width_mm, option.height_mm, option.base_price
                );
            }
            println!("materials:");
            for option in &catalog.materials {
                println!("  {} ({}) {}", option.material, option.label, option.multiplier);
            }
            println!("pieces:");
            for tier in &catalog.piece_tiers {
                println!("  {} {}", tier.pieces, tier.multiplier);
            }
        }
    }

    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<OptionCatalog, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(OptionCatalog::from_toml_str(&fs::read_to_string(path)?)?),
        None => Ok(OptionCatalog::builtin()),
    }
}

fn random_seed() -> u32 {
    let mut rng = rand::rng();
    rng.random_range(0..=u32::MAX)
}

fn parse_seed_arg(raw: &str) -> Result<u32, Box<dyn std::error::Error>> {
    let trimmed = raw.trim();
    let value = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16)?
    } else {
        trimmed.parse::<u32>()?
    };
    Ok(value)
}
