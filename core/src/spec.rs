use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OptionKind, PuzzleError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Rectangle,
    Circle,
    Octagon,
}

impl Shape {
    pub const ALL: [Shape; 3] = [Shape::Rectangle, Shape::Circle, Shape::Octagon];

    pub fn key(self) -> &'static str {
        match self {
            Shape::Rectangle => "rectangle",
            Shape::Circle => "circle",
            Shape::Octagon => "octagon",
        }
    }
}

impl FromStr for Shape {
    type Err = PuzzleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Shape::ALL
            .into_iter()
            .find(|shape| shape.key().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PuzzleError::InvalidSpec(format!("unknown shape '{trimmed}'")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Small,
    Medium,
    Large,
    XLarge,
}

impl Size {
    pub const ALL: [Size; 4] = [Size::Small, Size::Medium, Size::Large, Size::XLarge];

    pub fn key(self) -> &'static str {
        match self {
            Size::Small => "small",
            Size::Medium => "medium",
            Size::Large => "large",
            Size::XLarge => "xlarge",
        }
    }
}

impl FromStr for Size {
    type Err = PuzzleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Size::ALL
            .into_iter()
            .find(|size| size.key().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PuzzleError::unknown(OptionKind::Size, trimmed))
    }
}

// Declaration order is the upgrade order used for pricing checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    Paper,
    Wood,
    Acrylic,
}

impl Material {
    pub const ALL: [Material; 3] = [Material::Paper, Material::Wood, Material::Acrylic];

    pub fn key(self) -> &'static str {
        match self {
            Material::Paper => "paper",
            Material::Wood => "wood",
            Material::Acrylic => "acrylic",
        }
    }
}

impl FromStr for Material {
    type Err = PuzzleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Material::ALL
            .into_iter()
            .find(|material| material.key().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PuzzleError::unknown(OptionKind::Material, trimmed))
    }
}

macro_rules! display_key {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.key())
            }
        })*
    };
}

display_key!(Shape, Size, Material);

/// Opaque handle to the customer's uploaded image. The core never reads it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(value: impl Into<String>) -> Result<Self, PuzzleError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(PuzzleError::InvalidSpec("missing image reference".to_string()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PuzzleSpec {
    pub shape: Shape,
    pub size: Size,
    pub material: Material,
    pub piece_count: u32,
    pub image_ref: ImageRef,
    pub seed: u32,
}

impl PuzzleSpec {
    pub fn validate(&self, max_piece_count: u32) -> Result<(), PuzzleError> {
        if self.piece_count == 0 {
            return Err(PuzzleError::InvalidSpec(
                "piece count must be positive".to_string(),
            ));
        }
        if self.piece_count > max_piece_count {
            return Err(PuzzleError::InvalidSpec(format!(
                "piece count {} exceeds maximum {}",
                self.piece_count, max_piece_count
            )));
        }
        if self.image_ref.as_str().trim().is_empty() {
            return Err(PuzzleError::InvalidSpec("missing image reference".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_case_insensitively() {
        assert_eq!("Circle".parse::<Shape>(), Ok(Shape::Circle));
        assert_eq!(" xlarge ".parse::<Size>(), Ok(Size::XLarge));
        assert_eq!("WOOD".parse::<Material>(), Ok(Material::Wood));
    }

    #[test]
    fn unlisted_material_is_unknown_option() {
        let err = "gold".parse::<Material>().unwrap_err();
        assert_eq!(
            err,
            PuzzleError::UnknownOption {
                kind: OptionKind::Material,
                value: "gold".to_string(),
            }
        );
    }

    #[test]
    fn unlisted_shape_is_invalid_spec() {
        assert!(matches!(
            "heart".parse::<Shape>(),
            Err(PuzzleError::InvalidSpec(_))
        ));
    }

    #[test]
    fn empty_image_ref_is_rejected() {
        assert!(ImageRef::new("  ").is_err());
        assert_eq!(ImageRef::new("upload/42").unwrap().as_str(), "upload/42");
    }
}
