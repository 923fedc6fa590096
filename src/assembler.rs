use rayon::prelude::*;

use puzzlecut_core::GridDescriptor;

use crate::edges::{CellCoord, EdgeId, EdgeKind, EdgeOrientation, EdgeTable};
use crate::path::BoundaryPath;

/// Deepest excursion a knob may make from its straight cut, in grid units
/// perpendicular to each edge orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TabDepthLimit {
    pub horizontal: f64,
    pub vertical: f64,
}

impl TabDepthLimit {
    /// `cap` is a fraction of the smaller cell side, so knobs on long and
    /// short edges of a non-square cell protrude the same physical distance.
    pub fn for_grid(grid: &GridDescriptor, cap: f64) -> Self {
        let side = grid.cell_width.min(grid.cell_height);
        Self {
            horizontal: cap * side / grid.cell_height,
            vertical: cap * side / grid.cell_width,
        }
    }

    pub fn along(&self, orientation: EdgeOrientation) -> f64 {
        match orientation {
            EdgeOrientation::Horizontal => self.horizontal,
            EdgeOrientation::Vertical => self.vertical,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Piece {
    pub cell: CellCoord,
    /// Top, right, bottom, left.
    pub edges: [EdgeId; 4],
    pub kinds: [EdgeKind; 4],
    pub neighbors: Vec<CellCoord>,
    pub boundary: BoundaryPath,
    /// Cells folded into this piece by sliver merging.
    pub merged: Vec<CellCoord>,
    pub clipped: bool,
}

impl Piece {
    pub fn row(&self) -> u32 {
        self.cell.row
    }

    pub fn col(&self) -> u32 {
        self.cell.col
    }

    pub fn tab_count(&self) -> usize {
        self.kinds.iter().filter(|kind| **kind == EdgeKind::Tab).count()
    }

    pub fn socket_count(&self) -> usize {
        self.kinds.iter().filter(|kind| **kind == EdgeKind::Socket).count()
    }
}

pub fn assemble(
    grid: &GridDescriptor,
    table: &EdgeTable,
    limits: &TabDepthLimit,
    parallel: bool,
) -> Vec<Piece> {
    let build = |id: u32| {
        let cell = CellCoord::new(id / grid.cols, id % grid.cols);
        assemble_piece(cell, table, limits)
    };
    let total = grid.rows * grid.cols;
    let pieces: Vec<Piece> = if parallel {
        (0..total).into_par_iter().map(build).collect()
    } else {
        (0..total).map(build).collect()
    };
    tracing::debug!(pieces = pieces.len(), "pieces assembled");
    pieces
}

/// Walks top, right, bottom and left edges in turn. Every curve starts where
/// the previous one ended, so the outline closes on the cell's top-left
/// corner.
pub fn assemble_piece(cell: CellCoord, table: &EdgeTable, limits: &TabDepthLimit) -> Piece {
    let edges = table.cell_edges(cell);
    let mut boundary = BoundaryPath::new((cell.col as f64, cell.row as f64));
    let mut neighbors = Vec::with_capacity(4);
    let mut kinds = [EdgeKind::Flat; 4];
    for (slot, id) in edges.iter().enumerate() {
        let Some(edge) = table.get(*id) else {
            continue;
        };
        let curve = edge.curve_for(cell, limits);
        debug_assert_eq!(curve.start(), boundary.end());
        boundary.extend(curve.segments());
        kinds[slot] = edge.kind_for(cell).unwrap_or(EdgeKind::Flat);
        if let Some(other) = edge.owners.other(cell) {
            neighbors.push(other);
        }
    }
    Piece {
        cell,
        edges,
        kinds,
        neighbors,
        boundary,
        merged: Vec::new(),
        clipped: false,
    }
}
