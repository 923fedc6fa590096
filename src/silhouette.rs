use std::f64::consts::{PI, SQRT_2};

use puzzlecut_core::{GridDescriptor, Shape};

use crate::path::{signed_area, Point};

const CONTAINS_EPSILON: f64 = 1e-9;

/// Convex outline of the puzzle in grid units, wound clockwise on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct Silhouette {
    shape: Shape,
    polygon: Vec<Point>,
}

impl Silhouette {
    /// The lattice already spans the outline's bounding box: circles fill
    /// its square, octagons chamfer its corners so that a square box yields
    /// a regular octagon.
    pub fn for_grid(shape: Shape, grid: &GridDescriptor, circle_segments: usize) -> Self {
        let width = grid.width();
        let height = grid.height();
        let to_grid = |(x, y): Point| (x / grid.cell_width, y / grid.cell_height);
        let physical: Vec<Point> = match shape {
            Shape::Rectangle => vec![(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)],
            Shape::Circle => {
                let radius = width.min(height) * 0.5;
                let (cx, cy) = (width * 0.5, height * 0.5);
                let segments = circle_segments.max(3);
                (0..segments)
                    .map(|step| {
                        let theta = 2.0 * PI * step as f64 / segments as f64;
                        (cx + radius * theta.cos(), cy + radius * theta.sin())
                    })
                    .collect()
            }
            Shape::Octagon => {
                let chamfer = width.min(height) / (2.0 + SQRT_2);
                vec![
                    (chamfer, 0.0),
                    (width - chamfer, 0.0),
                    (width, chamfer),
                    (width, height - chamfer),
                    (width - chamfer, height),
                    (chamfer, height),
                    (0.0, height - chamfer),
                    (0.0, chamfer),
                ]
            }
        };
        let polygon = match shape {
            // Exact integers keep the rectangle's corners identical to the
            // grid corners.
            Shape::Rectangle => vec![
                (0.0, 0.0),
                (grid.cols as f64, 0.0),
                (grid.cols as f64, grid.rows as f64),
                (0.0, grid.rows as f64),
            ],
            _ => physical.into_iter().map(to_grid).collect(),
        };
        Self { shape, polygon }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_rectangle(&self) -> bool {
        self.shape == Shape::Rectangle
    }

    pub fn polygon(&self) -> &[Point] {
        &self.polygon
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.polygon)
    }

    /// Inclusive of the outline itself.
    pub fn contains(&self, (px, py): Point) -> bool {
        let count = self.polygon.len();
        (0..count).all(|idx| {
            let (ax, ay) = self.polygon[idx];
            let (bx, by) = self.polygon[(idx + 1) % count];
            (bx - ax) * (py - ay) - (by - ay) * (px - ax) >= -CONTAINS_EPSILON
        })
    }

    pub fn contains_all(&self, points: &[Point]) -> bool {
        points.iter().all(|point| self.contains(*point))
    }

    /// Length of the part of segment `a`-`b` inside the outline.
    pub fn chord_length(&self, a: Point, b: Point) -> f64 {
        let count = self.polygon.len();
        let (mut enter, mut leave) = (0.0_f64, 1.0_f64);
        for idx in 0..count {
            let (px, py) = self.polygon[idx];
            let (qx, qy) = self.polygon[(idx + 1) % count];
            let side = |(x, y): Point| (qx - px) * (y - py) - (qy - py) * (x - px);
            let (sa, sb) = (side(a), side(b));
            if sa < 0.0 && sb < 0.0 {
                return 0.0;
            }
            if sa < 0.0 {
                enter = enter.max(sa / (sa - sb));
            } else if sb < 0.0 {
                leave = leave.min(sa / (sa - sb));
            }
        }
        if leave <= enter {
            return 0.0;
        }
        (leave - enter) * (b.0 - a.0).hypot(b.1 - a.1)
    }
}
