use std::f64::consts::{PI, SQRT_2};

use crate::error::PuzzleError;
use crate::spec::Shape;

pub const DEFAULT_MAX_PIECE_COUNT: u32 = 5000;
pub const GRID_PIECE_RATIO_MAX: f64 = 1.42;
pub const GRID_ROW_MIN: u32 = 1;
pub const GRID_ROW_WIDEN: f64 = 1.5;
pub const GRID_EXTRA_COLS: u32 = 3;
pub const GRID_SCORE_COUNT: f64 = 1.0;
pub const GRID_SCORE_GRID: f64 = 1.0;
pub const GRID_SCORE_PIECE: f64 = 0.5;
const SCORE_EPS: f64 = 1e-12;
const CIRCLE_RIM: f64 = 1.0;
const OCTAGON_RIM: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridChoice {
    pub target_count: u32,
    pub cols: u32,
    pub rows: u32,
    pub actual_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridDescriptor {
    pub rows: u32,
    pub cols: u32,
    pub cell_width: f64,
    pub cell_height: f64,
    pub requested_count: u32,
    /// Cell count the lattice was sized for. Equals `requested_count` for
    /// rectangles; larger for outlines that leave cells outside.
    pub cell_target: u32,
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Top-left corner of the lattice on the canvas, in millimetres.
    pub origin_x: f64,
    pub origin_y: f64,
}

impl GridDescriptor {
    pub fn cell_count(&self) -> u32 {
        self.rows * self.cols
    }

    pub fn width(&self) -> f64 {
        self.cell_width * self.cols as f64
    }

    pub fn height(&self) -> f64 {
        self.cell_height * self.rows as f64
    }

    /// Edges shared by two cells: `(rows - 1) * cols` horizontal plus
    /// `rows * (cols - 1)` vertical.
    pub fn internal_edge_count(&self) -> u32 {
        let rows = self.rows;
        let cols = self.cols;
        (rows - 1) * cols + rows * (cols - 1)
    }

    pub fn cell_id(&self, row: u32, col: u32) -> usize {
        (row * self.cols + col) as usize
    }
}

/// Bounding box of an outline on its canvas and the share of that box the
/// outline covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub width: f64,
    pub height: f64,
    pub coverage: f64,
    /// Rim cells kept per square root of the lattice size, beyond what
    /// `coverage` alone predicts.
    pub rim: f64,
}

impl Footprint {
    pub fn for_shape(shape: Shape, width: f64, height: f64) -> Self {
        match shape {
            Shape::Rectangle => Self {
                width,
                height,
                coverage: 1.0,
                rim: 0.0,
            },
            Shape::Circle => {
                let side = width.min(height);
                Self {
                    width: side,
                    height: side,
                    coverage: PI / 4.0,
                    rim: CIRCLE_RIM,
                }
            }
            Shape::Octagon => {
                let chamfer = width.min(height) / (2.0 + SQRT_2);
                Self {
                    width,
                    height,
                    coverage: 1.0 - 2.0 * chamfer * chamfer / (width * height),
                    rim: OCTAGON_RIM,
                }
            }
        }
    }

    /// Smallest lattice size `n` with `coverage * n + rim * sqrt(n)` at
    /// least `pieces`, and never fewer cells than pieces.
    pub fn cell_target(&self, pieces: u32) -> u32 {
        if self.coverage >= 1.0 {
            return pieces;
        }
        let wanted = pieces as f64;
        let root = (-self.rim + (self.rim * self.rim + 4.0 * self.coverage * wanted).sqrt())
            / (2.0 * self.coverage);
        ((root * root - 1e-9).ceil() as u32).max(pieces)
    }
}

/// Lays a lattice over the bounding box of `shape` on a `width` x `height`
/// canvas, sized so that roughly `piece_count` cells survive clipping.
pub fn partition(
    width: f64,
    height: f64,
    shape: Shape,
    piece_count: u32,
    max_piece_count: u32,
) -> Result<GridDescriptor, PuzzleError> {
    if piece_count == 0 {
        return Err(PuzzleError::InvalidSpec(
            "piece count must be positive".to_string(),
        ));
    }
    if piece_count > max_piece_count {
        return Err(PuzzleError::InvalidSpec(format!(
            "piece count {piece_count} exceeds maximum {max_piece_count}"
        )));
    }
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(PuzzleError::InvalidSpec(format!(
            "canvas {width}x{height} has no area"
        )));
    }
    let footprint = Footprint::for_shape(shape, width, height);
    let cell_target = footprint.cell_target(piece_count);
    let choice = best_grid_for_count(footprint.width / footprint.height, cell_target)
        .ok_or_else(|| {
            PuzzleError::InvalidSpec(format!(
                "no grid fits {piece_count} pieces on a {width}x{height} canvas"
            ))
        })?;
    Ok(GridDescriptor {
        rows: choice.rows,
        cols: choice.cols,
        cell_width: footprint.width / choice.cols as f64,
        cell_height: footprint.height / choice.rows as f64,
        requested_count: piece_count,
        cell_target,
        canvas_width: width,
        canvas_height: height,
        origin_x: (width - footprint.width) * 0.5,
        origin_y: (height - footprint.height) * 0.5,
    })
}

struct Candidate {
    choice: GridChoice,
    score: f64,
    squareness: f64,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        if self.score < other.score - SCORE_EPS {
            return true;
        }
        if self.score > other.score + SCORE_EPS {
            return false;
        }
        if self.squareness < other.squareness - SCORE_EPS {
            return true;
        }
        if self.squareness > other.squareness + SCORE_EPS {
            return false;
        }
        self.choice.actual_count < other.choice.actual_count
    }
}

/// Picks the grid whose piece count is the closest achievable value at or
/// above `target` while keeping cells close to square.
pub fn best_grid_for_count(aspect: f64, target: u32) -> Option<GridChoice> {
    if target == 0 || !aspect.is_finite() || aspect <= 0.0 {
        return None;
    }
    let piece_ratio_max = GRID_PIECE_RATIO_MAX.max(1.0);
    let piece_ratio_min = 1.0 / piece_ratio_max;
    let r_hi = ((target as f64 / aspect).sqrt() * GRID_ROW_WIDEN).ceil() as u32;
    let r_hi = r_hi.clamp(GRID_ROW_MIN, target);
    let mut best: Option<Candidate> = None;
    for r in GRID_ROW_MIN..=r_hi {
        let c0 = target.div_ceil(r);
        for dc in 0..=GRID_EXTRA_COLS {
            let c = c0 + dc;
            let actual = r as u64 * c as u64;
            if actual > u32::MAX as u64 {
                continue;
            }
            let rel_err = (actual as f64 - target as f64) / target as f64;
            let grid_ratio = c as f64 / r as f64;
            let piece_ratio = aspect / grid_ratio;
            if piece_ratio < piece_ratio_min || piece_ratio > piece_ratio_max {
                continue;
            }
            let count_term = rel_err.powi(2);
            let grid_term = (grid_ratio / aspect).ln().powi(2);
            let piece_term = piece_ratio.ln().powi(2);
            let candidate = Candidate {
                choice: GridChoice {
                    target_count: target,
                    cols: c,
                    rows: r,
                    actual_count: actual as u32,
                },
                score: GRID_SCORE_COUNT * count_term
                    + GRID_SCORE_GRID * grid_term
                    + GRID_SCORE_PIECE * piece_term,
                squareness: grid_ratio.ln().abs(),
            };
            match &best {
                Some(current) if !candidate.beats(current) => {}
                _ => best = Some(candidate),
            }
        }
    }
    best.map(|candidate| candidate.choice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_a_full_lattice() {
        let choice = best_grid_for_count(4.0 / 3.0, 100).expect("grid");
        assert_eq!((choice.rows, choice.cols, choice.actual_count), (9, 12, 108));
    }

    #[test]
    fn rectangles_need_no_extra_cells() {
        let footprint = Footprint::for_shape(Shape::Rectangle, 400.0, 300.0);
        assert_eq!(footprint.cell_target(300), 300);
    }

    #[test]
    fn round_outlines_ask_for_more_cells() {
        let circle = Footprint::for_shape(Shape::Circle, 400.0, 300.0);
        assert_eq!((circle.width, circle.height), (300.0, 300.0));
        let target = circle.cell_target(300);
        let kept = circle.coverage * target as f64 + circle.rim * (target as f64).sqrt();
        assert!(kept >= 300.0 && target > 300, "{target}");
        assert!(circle.cell_target(300) < 400);

        let octagon = Footprint::for_shape(Shape::Octagon, 300.0, 300.0);
        assert!((octagon.coverage - (2.0 * SQRT_2 - 2.0)).abs() < 1e-12);
        assert_eq!((octagon.width, octagon.height), (300.0, 300.0));
    }

    #[test]
    fn tiny_counts_still_get_a_grid() {
        let choice = best_grid_for_count(1.0, 1).expect("grid");
        assert_eq!((choice.rows, choice.cols), (1, 1));
        let choice = best_grid_for_count(1.0, 2).expect("grid");
        assert!(choice.actual_count >= 2);
    }
}
