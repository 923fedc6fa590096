use std::collections::HashSet;
use std::env;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

const KNOWN_SIZES: &[(&str, &str)] = &[
    ("small", "Small"),
    ("medium", "Medium"),
    ("large", "Large"),
    ("xlarge", "XLarge"),
];
const KNOWN_MATERIALS: &[(&str, &str)] = &[
    ("paper", "Paper"),
    ("wood", "Wood"),
    ("acrylic", "Acrylic"),
];

#[derive(Deserialize)]
struct CatalogFile {
    sizes: Vec<SizeEntry>,
    materials: Vec<MaterialEntry>,
    piece_tiers: Vec<TierEntry>,
}

#[derive(Deserialize)]
struct SizeEntry {
    size: String,
    label: Option<String>,
    width_mm: f64,
    height_mm: f64,
    base_price: f64,
}

#[derive(Deserialize)]
struct MaterialEntry {
    material: String,
    label: Option<String>,
    multiplier: f64,
}

#[derive(Deserialize)]
struct TierEntry {
    pieces: u32,
    multiplier: f64,
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("missing CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir.parent().unwrap_or(&manifest_dir);
    let env_path = workspace_root.join(".env");
    let env_local_path = workspace_root.join(".env.local");

    let _ = dotenvy::from_filename(&env_local_path);
    let _ = dotenvy::from_filename(&env_path);

    println!("cargo:rerun-if-env-changed=OPTION_CATALOG_PATH");
    println!("cargo:rerun-if-changed={}", env_path.display());
    println!("cargo:rerun-if-changed={}", env_local_path.display());

    let catalog_path = resolve_catalog_path(&manifest_dir);
    println!("cargo:rerun-if-changed={}", catalog_path.display());

    let contents = fs::read_to_string(&catalog_path).unwrap_or_else(|err| {
        panic!(
            "failed to read option catalog at {}: {err}",
            catalog_path.display()
        )
    });

    let catalog: CatalogFile = toml::from_str(&contents).unwrap_or_else(|err| {
        panic!(
            "failed to parse option catalog at {}: {err}",
            catalog_path.display()
        )
    });

    validate_catalog(&catalog, &catalog_path);

    let mut output = String::new();
    writeln!(&mut output, "pub const BUILTIN_SIZES: &[SizeOption] = &[").unwrap();
    for entry in &catalog.sizes {
        writeln!(&mut output, "    SizeOption {{").unwrap();
        writeln!(&mut output, "        size: Size::{},", variant(KNOWN_SIZES, &entry.size)).unwrap();
        writeln!(&mut output, "        label: Cow::Borrowed({}),", rust_string(&label(&entry.label, &entry.size))).unwrap();
        writeln!(&mut output, "        width_mm: {:?},", entry.width_mm).unwrap();
        writeln!(&mut output, "        height_mm: {:?},", entry.height_mm).unwrap();
        writeln!(&mut output, "        base_price: Price::from_cents({}),", cents(entry.base_price)).unwrap();
        writeln!(&mut output, "    }},").unwrap();
    }
    writeln!(&mut output, "];").unwrap();
    writeln!(&mut output).unwrap();

    writeln!(&mut output, "pub const BUILTIN_MATERIALS: &[MaterialOption] = &[").unwrap();
    for entry in &catalog.materials {
        writeln!(&mut output, "    MaterialOption {{").unwrap();
        writeln!(&mut output, "        material: Material::{},", variant(KNOWN_MATERIALS, &entry.material)).unwrap();
        writeln!(&mut output, "        label: Cow::Borrowed({}),", rust_string(&label(&entry.label, &entry.material))).unwrap();
        writeln!(&mut output, "        multiplier: Multiplier::from_permille({}),", permille(entry.multiplier)).unwrap();
        writeln!(&mut output, "    }},").unwrap();
    }
    writeln!(&mut output, "];").unwrap();
    writeln!(&mut output).unwrap();

    writeln!(&mut output, "pub const BUILTIN_PIECE_TIERS: &[PieceTier] = &[").unwrap();
    for tier in &catalog.piece_tiers {
        writeln!(
            &mut output,
            "    PieceTier {{ pieces: {}, multiplier: Multiplier::from_permille({}) }},",
            tier.pieces,
            permille(tier.multiplier)
        )
        .unwrap();
    }
    writeln!(&mut output, "];").unwrap();

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("missing OUT_DIR"));
    let out_path = out_dir.join("option_catalog.rs");
    fs::write(&out_path, output).unwrap_or_else(|err| {
        panic!("failed to write {}: {err}", out_path.display())
    });
}

fn resolve_catalog_path(manifest_dir: &Path) -> PathBuf {
    let env_value = env::var("OPTION_CATALOG_PATH").ok();
    let raw_path = match env_value {
        Some(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => manifest_dir.join("options/catalog.toml"),
    };
    if raw_path.is_relative() {
        manifest_dir.join(raw_path)
    } else {
        raw_path
    }
}

fn rust_string(value: &str) -> String {
    format!("{:?}", value)
}

fn label(label: &Option<String>, key: &str) -> String {
    match label {
        Some(value) if !value.trim().is_empty() => value.clone(),
        _ => key.to_string(),
    }
}

fn variant(known: &[(&str, &'static str)], key: &str) -> &'static str {
    known
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, variant)| *variant)
        .unwrap_or_else(|| panic!("unknown option key '{key}'"))
}

fn cents(value: f64) -> u64 {
    (value * 100.0).round() as u64
}

fn permille(value: f64) -> u32 {
    (value * 1000.0).round() as u32
}

fn validate_catalog(catalog: &CatalogFile, catalog_path: &Path) {
    if catalog.sizes.is_empty() || catalog.materials.is_empty() || catalog.piece_tiers.is_empty() {
        panic!(
            "option catalog {} needs sizes, materials and piece_tiers",
            catalog_path.display()
        );
    }

    let mut sizes = HashSet::new();
    for entry in &catalog.sizes {
        if !KNOWN_SIZES.iter().any(|(name, _)| *name == entry.size) {
            panic!("unknown size '{}' in {}", entry.size, catalog_path.display());
        }
        if !sizes.insert(entry.size.clone()) {
            panic!("duplicate size '{}' in {}", entry.size, catalog_path.display());
        }
        if !(entry.width_mm > 0.0 && entry.height_mm > 0.0) {
            panic!(
                "size '{}' has invalid dimensions in {}",
                entry.size,
                catalog_path.display()
            );
        }
        if !(entry.base_price > 0.0 && cents(entry.base_price) > 0) {
            panic!(
                "size '{}' must have a positive base price in {}",
                entry.size,
                catalog_path.display()
            );
        }
    }

    let mut materials = HashSet::new();
    let mut ordered = Vec::new();
    for entry in &catalog.materials {
        let rank = KNOWN_MATERIALS
            .iter()
            .position(|(name, _)| *name == entry.material)
            .unwrap_or_else(|| {
                panic!(
                    "unknown material '{}' in {}",
                    entry.material,
                    catalog_path.display()
                )
            });
        if !materials.insert(entry.material.clone()) {
            panic!(
                "duplicate material '{}' in {}",
                entry.material,
                catalog_path.display()
            );
        }
        if !(entry.multiplier > 0.0 && permille(entry.multiplier) > 0) {
            panic!(
                "material '{}' must have a positive multiplier in {}",
                entry.material,
                catalog_path.display()
            );
        }
        ordered.push((rank, permille(entry.multiplier), entry.material.as_str()));
    }
    ordered.sort();
    for pair in ordered.windows(2) {
        if pair[1].1 < pair[0].1 {
            panic!(
                "material '{}' is priced below '{}' in {}",
                pair[1].2,
                pair[0].2,
                catalog_path.display()
            );
        }
    }

    for pair in catalog.piece_tiers.windows(2) {
        if pair[1].pieces <= pair[0].pieces || pair[1].multiplier < pair[0].multiplier {
            panic!(
                "piece tiers must increase in count and price ({} after {}) in {}",
                pair[1].pieces,
                pair[0].pieces,
                catalog_path.display()
            );
        }
    }
    for tier in &catalog.piece_tiers {
        if tier.pieces == 0 || !(tier.multiplier > 0.0 && permille(tier.multiplier) > 0) {
            panic!(
                "piece tier {} is invalid in {}",
                tier.pieces,
                catalog_path.display()
            );
        }
    }
}
