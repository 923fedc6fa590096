use geo::{Area, BooleanOps, LineString, MultiPolygon, Polygon};
use rayon::prelude::*;

use puzzlecut_core::PuzzleError;

use crate::assembler::Piece;
use crate::edges::CellCoord;
use crate::path::{signed_area, BoundaryPath, Point};
use crate::silhouette::Silhouette;

/// Components smaller than this, in square grid units, are numerical debris.
const AREA_EPSILON: f64 = 1e-9;
/// Shortest shared cut, in grid units, along which a sliver may join a host.
const MIN_CONTACT: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipSettings {
    pub min_area_ratio: f64,
    pub flatten_steps: usize,
    pub merge_slivers: bool,
    pub parallel: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipOutcome {
    pub pieces: Vec<Piece>,
    /// Cells with nothing left inside the silhouette.
    pub dropped: Vec<CellCoord>,
    /// Slivers and the piece that absorbed each of them.
    pub merged: Vec<(CellCoord, CellCoord)>,
}

enum Trimmed {
    Inside,
    Outside,
    Clipped { ring: Vec<Point>, area: f64 },
}

/// Cuts every piece down to the silhouette. Pieces already inside keep their
/// curves; straddling pieces become polylines closed along the outline. Cell
/// area is one square grid unit, so `min_area_ratio` compares directly
/// against clipped areas.
pub fn clip_pieces(
    pieces: Vec<Piece>,
    silhouette: &Silhouette,
    settings: &ClipSettings,
) -> Result<ClipOutcome, PuzzleError> {
    if silhouette.is_rectangle() {
        return Ok(ClipOutcome {
            pieces,
            ..ClipOutcome::default()
        });
    }
    let outline = MultiPolygon(vec![to_polygon(silhouette.polygon())]);
    let trim = |piece: &Piece| trim_piece(piece, silhouette, &outline, settings.flatten_steps);
    let trimmed: Vec<Result<Trimmed, PuzzleError>> = if settings.parallel {
        pieces.par_iter().map(trim).collect()
    } else {
        pieces.iter().map(trim).collect()
    };

    let mut kept: Vec<Piece> = Vec::with_capacity(pieces.len());
    let mut dropped = Vec::new();
    let mut slivers: Vec<(Piece, f64)> = Vec::new();
    for (mut piece, result) in pieces.into_iter().zip(trimmed) {
        match result? {
            Trimmed::Inside => kept.push(piece),
            Trimmed::Outside => dropped.push(piece.cell),
            Trimmed::Clipped { ring, area } => {
                piece.boundary = ring_to_boundary(ring, piece.cell)?;
                piece.clipped = true;
                if area >= settings.min_area_ratio {
                    kept.push(piece);
                } else if settings.merge_slivers {
                    slivers.push((piece, area));
                } else {
                    tracing::warn!(
                        row = piece.row(),
                        col = piece.col(),
                        area_ratio = area,
                        "clipped piece below minimum area"
                    );
                    return Err(PuzzleError::UnclippablePiece {
                        row: piece.row(),
                        col: piece.col(),
                        area_ratio: area,
                    });
                }
            }
        }
    }

    // Slivers touching only other slivers wait for those to find a host.
    let mut merged = Vec::new();
    let mut pending = slivers;
    while !pending.is_empty() {
        let before = pending.len();
        let mut stuck = Vec::new();
        for (sliver, area) in pending {
            match absorb_sliver(&mut kept, &sliver, silhouette, settings.flatten_steps)? {
                Some(host) => merged.push((sliver.cell, host)),
                None => stuck.push((sliver, area)),
            }
        }
        if stuck.len() == before {
            let (sliver, area) = &stuck[0];
            tracing::warn!(
                row = sliver.row(),
                col = sliver.col(),
                area_ratio = *area,
                "no neighbour can absorb sliver"
            );
            return Err(PuzzleError::UnclippablePiece {
                row: sliver.row(),
                col: sliver.col(),
                area_ratio: *area,
            });
        }
        pending = stuck;
    }

    for piece in &mut kept {
        let cell = piece.cell;
        let mut neighbors: Vec<CellCoord> = piece
            .neighbors
            .iter()
            .filter(|other| !dropped.contains(other))
            .map(|other| {
                merged
                    .iter()
                    .find(|(sliver, _)| sliver == other)
                    .map(|(_, host)| *host)
                    .unwrap_or(*other)
            })
            .filter(|other| *other != cell)
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        piece.neighbors = neighbors;
    }

    tracing::debug!(
        kept = kept.len(),
        dropped = dropped.len(),
        merged = merged.len(),
        shape = %silhouette.shape(),
        "pieces clipped"
    );
    Ok(ClipOutcome {
        pieces: kept,
        dropped,
        merged,
    })
}

fn trim_piece(
    piece: &Piece,
    silhouette: &Silhouette,
    outline: &MultiPolygon<f64>,
    flatten_steps: usize,
) -> Result<Trimmed, PuzzleError> {
    // Curves never leave the hull of their control points.
    if silhouette.contains_all(&piece.boundary.control_points()) {
        return Ok(Trimmed::Inside);
    }
    let subject = MultiPolygon(vec![to_polygon(&piece.boundary.flatten(flatten_steps))]);
    let components: Vec<Polygon<f64>> = subject
        .intersection(outline)
        .into_iter()
        .filter(|polygon| polygon.unsigned_area() > AREA_EPSILON)
        .collect();
    match components.as_slice() {
        [] => Ok(Trimmed::Outside),
        [polygon] if is_solid(polygon) => Ok(Trimmed::Clipped {
            ring: open_ring(polygon.exterior()),
            area: polygon.unsigned_area(),
        }),
        _ => {
            let area = components
                .iter()
                .map(|polygon| polygon.unsigned_area())
                .fold(0.0, f64::max);
            tracing::warn!(
                row = piece.row(),
                col = piece.col(),
                components = components.len(),
                "clipping split a piece"
            );
            Err(PuzzleError::UnclippablePiece {
                row: piece.row(),
                col: piece.col(),
                area_ratio: area,
            })
        }
    }
}

/// Unions the sliver into the largest piece it shares a cut with. Returns
/// the host cell, or `None` while no such piece exists yet.
fn absorb_sliver(
    kept: &mut [Piece],
    sliver: &Piece,
    silhouette: &Silhouette,
    flatten_steps: usize,
) -> Result<Option<CellCoord>, PuzzleError> {
    let touches = |cell: &CellCoord| contact(silhouette, sliver.cell, *cell) >= MIN_CONTACT;
    let mut candidates: Vec<(usize, f64)> = kept
        .iter()
        .enumerate()
        .filter(|(_, piece)| touches(&piece.cell) || piece.merged.iter().any(|cell| touches(cell)))
        .map(|(idx, piece)| (idx, piece.boundary.signed_area(flatten_steps)))
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    let sliver_shape = MultiPolygon(vec![to_polygon(&sliver.boundary.flatten(flatten_steps))]);
    for (idx, _) in candidates {
        let host = &mut kept[idx];
        let host_shape = MultiPolygon(vec![to_polygon(&host.boundary.flatten(flatten_steps))]);
        let union: Vec<Polygon<f64>> = host_shape
            .union(&sliver_shape)
            .into_iter()
            .filter(|polygon| polygon.unsigned_area() > AREA_EPSILON)
            .collect();
        let [polygon] = union.as_slice() else {
            continue;
        };
        if !is_solid(polygon) {
            continue;
        }
        host.boundary = ring_to_boundary(open_ring(polygon.exterior()), host.cell)?;
        host.clipped = true;
        host.merged.push(sliver.cell);
        host.neighbors.extend(sliver.neighbors.iter().copied());
        tracing::debug!(
            sliver_row = sliver.row(),
            sliver_col = sliver.col(),
            host_row = host.row(),
            host_col = host.col(),
            "sliver merged"
        );
        return Ok(Some(host.cell));
    }
    Ok(None)
}

/// Inside length of the grid line between two 4-adjacent cells.
fn contact(silhouette: &Silhouette, a: CellCoord, b: CellCoord) -> f64 {
    let (row, col) = (a.row.max(b.row) as f64, a.col.max(b.col) as f64);
    if a.row == b.row && a.col.abs_diff(b.col) == 1 {
        silhouette.chord_length((col, row), (col, row + 1.0))
    } else if a.col == b.col && a.row.abs_diff(b.row) == 1 {
        silhouette.chord_length((col, row), (col + 1.0, row))
    } else {
        0.0
    }
}

/// Interior rings below debris size do not count as holes.
fn is_solid(polygon: &Polygon<f64>) -> bool {
    polygon
        .interiors()
        .iter()
        .all(|ring| Polygon::new(ring.clone(), vec![]).unsigned_area() <= AREA_EPSILON)
}

fn to_polygon(ring: &[Point]) -> Polygon<f64> {
    Polygon::new(LineString::from(ring.to_vec()), vec![])
}

fn open_ring(exterior: &LineString<f64>) -> Vec<Point> {
    let mut ring: Vec<Point> = exterior.coords().map(|coord| (coord.x, coord.y)).collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Re-winds the ring clockwise on screen to match assembled pieces.
fn ring_to_boundary(mut ring: Vec<Point>, cell: CellCoord) -> Result<BoundaryPath, PuzzleError> {
    if signed_area(&ring) < 0.0 {
        ring.reverse();
    }
    BoundaryPath::from_ring(&ring).ok_or_else(|| PuzzleError::UnclippablePiece {
        row: cell.row,
        col: cell.col,
        area_ratio: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{assemble, TabDepthLimit};
    use crate::config::ShapeSettings;
    use crate::edges::EdgeTable;
    use puzzlecut_core::{partition, Shape};

    fn run(shape: Shape, count: u32, settings: ClipSettings) -> Result<ClipOutcome, PuzzleError> {
        let grid = partition(400.0, 300.0, shape, count, 5000).expect("grid");
        let limits = TabDepthLimit::for_grid(&grid, 0.25);
        let silhouette = Silhouette::for_grid(shape, &grid, 256);
        let table = EdgeTable::build(&grid, 42, &silhouette, &ShapeSettings::default(), &limits, false);
        let pieces = assemble(&grid, &table, &limits, false);
        clip_pieces(pieces, &silhouette, &settings)
    }

    fn settings(min_area_ratio: f64, merge_slivers: bool) -> ClipSettings {
        ClipSettings {
            min_area_ratio,
            flatten_steps: 16,
            merge_slivers,
            parallel: false,
        }
    }

    #[test]
    fn rectangle_passes_through() {
        let outcome = run(Shape::Rectangle, 12, settings(0.1, false)).expect("clip");
        assert_eq!(outcome.pieces.len(), 12);
        assert!(outcome.pieces.iter().all(|piece| !piece.clipped));
    }

    #[test]
    fn circle_corner_cells_keep_a_small_piece() {
        let outcome = run(Shape::Circle, 12, settings(0.1, false)).expect("clip");
        assert_eq!(outcome.pieces.len(), 16);
        let corner = &outcome.pieces[0];
        assert!(corner.clipped);
        let area = corner.boundary.signed_area(16);
        assert!(area > 0.30 && area < 0.33, "corner area {area}");
    }

    #[test]
    fn undersized_piece_is_rejected() {
        let err = run(Shape::Circle, 12, settings(0.4, false)).unwrap_err();
        assert!(matches!(
            err,
            PuzzleError::UnclippablePiece { row: 0, col: 0, .. }
        ));
    }

    #[test]
    fn corners_fold_into_an_edge_neighbour() {
        let outcome = run(Shape::Circle, 12, settings(0.4, true)).expect("clip");
        assert_eq!(outcome.pieces.len(), 12);
        assert_eq!(outcome.merged.len(), 4);
        for (sliver, host) in &outcome.merged {
            let steps = sliver.row.abs_diff(host.row) + sliver.col.abs_diff(host.col);
            assert_eq!(steps, 1, "{sliver:?} went to {host:?}");
        }
    }

    #[test]
    fn slivers_fold_into_neighbours() {
        assert!(matches!(
            run(Shape::Octagon, 100, settings(0.1, false)),
            Err(PuzzleError::UnclippablePiece { row: 0, col: 1, .. })
        ));
        let outcome = run(Shape::Octagon, 100, settings(0.1, true)).expect("clip");
        assert_eq!(outcome.merged.len(), 8);
        assert_eq!(outcome.dropped.len(), 4);
        for piece in &outcome.pieces {
            assert!(piece.boundary.is_closed());
            assert!(piece.boundary.signed_area(16) >= 0.1, "{:?}", piece.cell);
            for neighbor in &piece.neighbors {
                assert!(!outcome.dropped.contains(neighbor));
                assert!(outcome.merged.iter().all(|(sliver, _)| sliver != neighbor));
            }
        }
    }

    #[test]
    fn contact_follows_the_outline() {
        let grid = partition(400.0, 300.0, Shape::Circle, 12, 5000).expect("grid");
        let circle = Silhouette::for_grid(Shape::Circle, &grid, 256);
        let corner = CellCoord::new(0, 0);
        let right = contact(&circle, corner, CellCoord::new(0, 1));
        assert!((right - (3.0_f64.sqrt() - 1.0)).abs() < 1e-3, "{right}");
        assert_eq!(contact(&circle, corner, CellCoord::new(1, 1)), 0.0);
        let inner = contact(&circle, CellCoord::new(1, 1), CellCoord::new(1, 2));
        assert!((inner - 1.0).abs() < 1e-12);
    }
}
