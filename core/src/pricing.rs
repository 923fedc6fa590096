use serde::Serialize;

use crate::catalog::{Multiplier, OptionCatalog, Price};
use crate::error::PuzzleError;
use crate::spec::{Material, Size};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub base_price: Price,
    pub material_multiplier: Multiplier,
    pub piece_count_multiplier: Multiplier,
    /// Whole currency units.
    pub final_price: u64,
}

pub fn quote(
    catalog: &OptionCatalog,
    size: Size,
    material: Material,
    piece_count: u32,
) -> Result<PriceQuote, PuzzleError> {
    let base_price = catalog.size(size)?.base_price;
    let material_multiplier = catalog.material(material)?.multiplier;
    let piece_count_multiplier = catalog.piece_tier(piece_count)?.multiplier;
    Ok(PriceQuote {
        base_price,
        material_multiplier,
        piece_count_multiplier,
        final_price: combine(base_price, material_multiplier, piece_count_multiplier),
    })
}

/// `round_half_up(base * material * pieces)` in integer arithmetic so that
/// 52.5 always becomes 53.
pub fn combine(base: Price, material: Multiplier, pieces: Multiplier) -> u64 {
    let scale = Multiplier::SCALE as u128;
    let numerator =
        base.cents() as u128 * material.permille() as u128 * pieces.permille() as u128;
    let denominator = 100 * scale * scale;
    ((numerator + denominator / 2) / denominator) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_up() {
        let total = combine(
            Price::from_cents(2500),
            Multiplier::from_permille(1500),
            Multiplier::from_permille(1400),
        );
        assert_eq!(total, 53);
        let total = combine(
            Price::from_cents(1000),
            Multiplier::from_permille(1000),
            Multiplier::from_permille(1049),
        );
        assert_eq!(total, 10);
    }
}
