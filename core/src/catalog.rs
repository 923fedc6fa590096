use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OptionKind, PuzzleError};
use crate::spec::{Material, Size};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog parse failed: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// Amount in minor currency units (cents).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(u64);

impl Price {
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> u64 {
        self.0
    }
}

impl TryFrom<f64> for Price {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value <= 0.0 {
            return Err(format!("price must be positive, got {value}"));
        }
        let cents = (value * 100.0).round() as u64;
        if cents == 0 {
            return Err(format!("price {value} rounds to zero cents"));
        }
        Ok(Self(cents))
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> f64 {
        price.0 as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Fixed-point multiplier in thousandths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Multiplier(u32);

impl Multiplier {
    pub const SCALE: u32 = 1000;

    pub const fn from_permille(permille: u32) -> Self {
        Self(permille)
    }

    pub fn permille(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl TryFrom<f64> for Multiplier {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value <= 0.0 || value > 1000.0 {
            return Err(format!("multiplier must be in (0, 1000], got {value}"));
        }
        let permille = (value * Self::SCALE as f64).round() as u32;
        if permille == 0 {
            return Err(format!("multiplier {value} rounds to zero"));
        }
        Ok(Self(permille))
    }
}

impl From<Multiplier> for f64 {
    fn from(multiplier: Multiplier) -> f64 {
        multiplier.as_f64()
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.as_f64())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeOption {
    pub size: Size,
    #[serde(default)]
    pub label: Cow<'static, str>,
    pub width_mm: f64,
    pub height_mm: f64,
    pub base_price: Price,
}

impl SizeOption {
    pub fn aspect(&self) -> f64 {
        self.width_mm / self.height_mm
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialOption {
    pub material: Material,
    #[serde(default)]
    pub label: Cow<'static, str>,
    pub multiplier: Multiplier,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceTier {
    pub pieces: u32,
    pub multiplier: Multiplier,
}

include!(concat!(env!("OUT_DIR"), "/option_catalog.rs"));

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionCatalog {
    pub sizes: Vec<SizeOption>,
    pub materials: Vec<MaterialOption>,
    pub piece_tiers: Vec<PieceTier>,
}

impl Default for OptionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl OptionCatalog {
    pub fn builtin() -> Self {
        Self {
            sizes: BUILTIN_SIZES.to_vec(),
            materials: BUILTIN_MATERIALS.to_vec(),
            piece_tiers: BUILTIN_PIECE_TIERS.to_vec(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let catalog: OptionCatalog = toml::from_str(contents)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.sizes.is_empty() || self.materials.is_empty() || self.piece_tiers.is_empty() {
            return Err(CatalogError::Invalid(
                "sizes, materials and piece_tiers must all be non-empty".to_string(),
            ));
        }

        let mut sizes = HashSet::new();
        for entry in &self.sizes {
            if !sizes.insert(entry.size) {
                return Err(CatalogError::Invalid(format!("duplicate size '{}'", entry.size)));
            }
            let valid = |v: f64| v.is_finite() && v > 0.0;
            if !valid(entry.width_mm) || !valid(entry.height_mm) {
                return Err(CatalogError::Invalid(format!(
                    "size '{}' has invalid dimensions {}x{}",
                    entry.size, entry.width_mm, entry.height_mm
                )));
            }
        }

        let mut materials: Vec<&MaterialOption> = self.materials.iter().collect();
        materials.sort_by_key(|entry| entry.material);
        for pair in materials.windows(2) {
            if pair[0].material == pair[1].material {
                return Err(CatalogError::Invalid(format!(
                    "duplicate material '{}'",
                    pair[0].material
                )));
            }
            if pair[1].multiplier < pair[0].multiplier {
                return Err(CatalogError::Invalid(format!(
                    "material '{}' is priced below '{}'",
                    pair[1].material, pair[0].material
                )));
            }
        }

        for pair in self.piece_tiers.windows(2) {
            if pair[1].pieces <= pair[0].pieces {
                return Err(CatalogError::Invalid(format!(
                    "piece tiers must be strictly increasing ({} after {})",
                    pair[1].pieces, pair[0].pieces
                )));
            }
            if pair[1].multiplier < pair[0].multiplier {
                return Err(CatalogError::Invalid(format!(
                    "piece tier {} is priced below tier {}",
                    pair[1].pieces, pair[0].pieces
                )));
            }
        }
        if self.piece_tiers.iter().any(|tier| tier.pieces == 0) {
            return Err(CatalogError::Invalid("piece tier of 0 pieces".to_string()));
        }
        Ok(())
    }

    pub fn size(&self, size: Size) -> Result<&SizeOption, PuzzleError> {
        self.sizes
            .iter()
            .find(|entry| entry.size == size)
            .ok_or_else(|| PuzzleError::unknown(OptionKind::Size, size.key()))
    }

    pub fn material(&self, material: Material) -> Result<&MaterialOption, PuzzleError> {
        self.materials
            .iter()
            .find(|entry| entry.material == material)
            .ok_or_else(|| PuzzleError::unknown(OptionKind::Material, material.key()))
    }

    pub fn piece_tier(&self, pieces: u32) -> Result<&PieceTier, PuzzleError> {
        self.piece_tiers
            .iter()
            .find(|tier| tier.pieces == pieces)
            .ok_or_else(|| PuzzleError::unknown(OptionKind::PieceCount, pieces.to_string()))
    }

    /// Parses a storefront size string and checks it is offered by this catalog.
    pub fn parse_size(&self, value: &str) -> Result<Size, PuzzleError> {
        let size: Size = value.parse()?;
        self.size(size)?;
        Ok(size)
    }

    pub fn parse_material(&self, value: &str) -> Result<Material, PuzzleError> {
        let material: Material = value.parse()?;
        self.material(material)?;
        Ok(material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_CATALOG: &str = r#"
[[sizes]]
size = "medium"
width_mm = 300.0
height_mm = 300.0
base_price = 19.99

[[materials]]
material = "wood"
multiplier = 1.5

[[piece_tiers]]
pieces = 100
multiplier = 1.0
"#;

    #[test]
    fn builtin_catalog_validates() {
        OptionCatalog::builtin().validate().expect("builtin catalog");
    }

    #[test]
    fn builtin_catalog_matches_published_prices() {
        let catalog = OptionCatalog::builtin();
        let medium = catalog.size(Size::Medium).expect("medium");
        assert_eq!(medium.base_price, Price::from_cents(2500));
        let wood = catalog.material(Material::Wood).expect("wood");
        assert_eq!(wood.multiplier, Multiplier::from_permille(1500));
        let tier = catalog.piece_tier(500).expect("500 tier");
        assert_eq!(tier.multiplier, Multiplier::from_permille(1400));
    }

    #[test]
    fn loads_runtime_catalog() {
        let catalog = OptionCatalog::from_toml_str(SMALL_CATALOG).expect("catalog");
        assert_eq!(catalog.sizes.len(), 1);
        assert_eq!(catalog.sizes[0].base_price.cents(), 1999);
        assert_eq!(catalog.sizes[0].label, "");
        assert!(matches!(
            catalog.size(Size::Small),
            Err(PuzzleError::UnknownOption { kind: OptionKind::Size, .. })
        ));
        assert!(matches!(
            catalog.parse_material("paper"),
            Err(PuzzleError::UnknownOption { kind: OptionKind::Material, .. })
        ));
    }

    #[test]
    fn rejects_decreasing_tiers() {
        let contents = SMALL_CATALOG.replace(
            "[[piece_tiers]]\npieces = 100\nmultiplier = 1.0\n",
            "[[piece_tiers]]\npieces = 100\nmultiplier = 1.2\n\n[[piece_tiers]]\npieces = 200\nmultiplier = 1.1\n",
        );
        let err = OptionCatalog::from_toml_str(&contents).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)), "{err}");
    }

    #[test]
    fn rejects_cheaper_upgrade_material() {
        let contents = SMALL_CATALOG.replace(
            "[[materials]]\nmaterial = \"wood\"\nmultiplier = 1.5\n",
            "[[materials]]\nmaterial = \"wood\"\nmultiplier = 1.5\n\n[[materials]]\nmaterial = \"acrylic\"\nmultiplier = 1.2\n",
        );
        assert!(OptionCatalog::from_toml_str(&contents).is_err());
    }

    #[test]
    fn rejects_non_positive_multiplier() {
        let contents = SMALL_CATALOG.replace("multiplier = 1.5", "multiplier = 0.0");
        assert!(matches!(
            OptionCatalog::from_toml_str(&contents),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn rejects_values_that_round_to_zero() {
        assert!(Multiplier::try_from(0.0004).is_err());
        assert_eq!(Multiplier::try_from(0.0005), Ok(Multiplier::from_permille(1)));
        assert!(Price::try_from(0.004).is_err());
        assert_eq!(Price::try_from(0.005), Ok(Price::from_cents(1)));

        let contents = SMALL_CATALOG.replace("multiplier = 1.5", "multiplier = 0.0001");
        assert!(matches!(
            OptionCatalog::from_toml_str(&contents),
            Err(CatalogError::Parse(_))
        ));
    }
}
