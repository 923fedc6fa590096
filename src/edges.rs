use rayon::prelude::*;

use puzzlecut_core::{edge_seed, rand_bit, rand_range, rand_unit, GridDescriptor};

use crate::assembler::TabDepthLimit;
use crate::config::ShapeSettings;
use crate::path::{Point, Segment};
use crate::silhouette::Silhouette;

pub const TAB_WIDTH_MIN: f64 = 0.2;
pub const TAB_WIDTH_MAX: f64 = 0.72;
pub const TAB_WIDTH_RANGE: f64 = 0.16;
pub const TAB_DEPTH_MIN: f64 = 0.2;
pub const TAB_DEPTH_MAX: f64 = 1.1;
pub const TAB_DEPTH_RANGE: f64 = 0.35;
pub const TAB_SIZE_SCALE_MIN: f64 = 0.1;
pub const TAB_SIZE_SCALE_MAX: f64 = 0.5;
pub const TAB_SIZE_MIN_LIMIT: f64 = 0.02;
pub const TAB_SIZE_MAX_LIMIT: f64 = 0.18;
pub const JITTER_STRENGTH_MIN: f64 = 0.0;
pub const JITTER_STRENGTH_MAX: f64 = 0.3;
pub const JITTER_LEN_BIAS_MIN: f64 = 0.0;
pub const JITTER_LEN_BIAS_MAX: f64 = 1.0;
pub const SKEW_RANGE_MAX: f64 = 0.2;
pub const VARIATION_MIN: f64 = 0.0;
pub const VARIATION_MAX: f64 = 1.0;
/// Shoulder wobble stays within this fraction of the depth limit.
pub const SHOULDER_JITTER_RATIO: f64 = 0.2;
/// Extra clearance around a tab band when testing it against the silhouette.
pub const EDGE_BAND_MARGIN: f64 = 0.05;
pub const MAX_RESAMPLE_ATTEMPTS: u32 = 64;

const SIDE_SALT: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    fn parity(self) -> bool {
        (self.row + self.col) % 2 == 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeOrientation {
    Horizontal,
    Vertical,
}

impl EdgeOrientation {
    fn salt(self) -> u32 {
        match self {
            EdgeOrientation::Horizontal => 0,
            EdgeOrientation::Vertical => 1,
        }
    }
}

/// `first` is the cell above (horizontal) or to the left (vertical).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeOwners {
    Shared { first: CellCoord, second: CellCoord },
    Boundary(CellCoord),
}

impl EdgeOwners {
    pub fn contains(&self, cell: CellCoord) -> bool {
        match *self {
            EdgeOwners::Shared { first, second } => cell == first || cell == second,
            EdgeOwners::Boundary(owner) => owner == cell,
        }
    }

    pub fn other(&self, cell: CellCoord) -> Option<CellCoord> {
        match *self {
            EdgeOwners::Shared { first, second } if cell == first => Some(second),
            EdgeOwners::Shared { first, second } if cell == second => Some(first),
            _ => None,
        }
    }
}

/// Which owner carries the protruding knob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TabSide {
    First,
    Second,
}

impl TabSide {
    pub fn flipped(self) -> Self {
        match self {
            TabSide::First => TabSide::Second,
            TabSide::Second => TabSide::First,
        }
    }

    /// The knob bulges away from the cell that owns it.
    fn sign(self) -> f64 {
        match self {
            TabSide::First => 1.0,
            TabSide::Second => -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeParams {
    pub tab_size: f64,
    pub tab_depth: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EdgeProfile {
    Flat,
    Interlocking { tab: TabSide, params: EdgeParams },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Tab,
    Socket,
    Flat,
}

impl EdgeKind {
    pub fn complement(self) -> Self {
        match self {
            EdgeKind::Tab => EdgeKind::Socket,
            EdgeKind::Socket => EdgeKind::Tab,
            EdgeKind::Flat => EdgeKind::Flat,
        }
    }
}

/// Cut geometry of one edge, in grid units, from its start corner to its end
/// corner. `Cubic` holds `3n + 1` points: a start followed by `n` triples of
/// (control, control, end).
#[derive(Clone, Debug, PartialEq)]
pub enum EdgeCurve {
    Straight([Point; 2]),
    Cubic(Vec<Point>),
}

impl EdgeCurve {
    pub fn points(&self) -> &[Point] {
        match self {
            EdgeCurve::Straight(points) => points,
            EdgeCurve::Cubic(points) => points,
        }
    }

    pub fn start(&self) -> Point {
        self.points()[0]
    }

    pub fn end(&self) -> Point {
        let points = self.points();
        points[points.len() - 1]
    }

    /// Same cut, walked the other way. A cubic chain reversed point by point
    /// traces the identical set of points.
    pub fn reversed(&self) -> Self {
        match self {
            EdgeCurve::Straight([from, to]) => EdgeCurve::Straight([*to, *from]),
            EdgeCurve::Cubic(points) => EdgeCurve::Cubic(points.iter().rev().copied().collect()),
        }
    }

    /// Drawing commands that follow the curve's start point.
    pub fn segments(&self) -> Vec<Segment> {
        match self {
            EdgeCurve::Straight([_, to]) => vec![Segment::LineTo(*to)],
            EdgeCurve::Cubic(points) => points[1..]
                .chunks_exact(3)
                .map(|triple| Segment::CubicTo {
                    c1: triple[0],
                    c2: triple[1],
                    to: triple[2],
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub orientation: EdgeOrientation,
    /// Grid line the edge lies on: a row line for horizontal edges, a column
    /// line for vertical ones.
    pub line: u32,
    /// Position along that line.
    pub index: u32,
    pub owners: EdgeOwners,
    pub profile: EdgeProfile,
    pub curve_seed: u32,
    pub attempts: u32,
}

impl Edge {
    pub fn is_boundary(&self) -> bool {
        matches!(self.owners, EdgeOwners::Boundary(_))
    }

    pub fn tab_side(&self) -> Option<TabSide> {
        match self.profile {
            EdgeProfile::Interlocking { tab, .. } => Some(tab),
            EdgeProfile::Flat => None,
        }
    }

    /// Role of this edge from the point of view of `cell`, or `None` when the
    /// cell does not touch it.
    pub fn kind_for(&self, cell: CellCoord) -> Option<EdgeKind> {
        if !self.owners.contains(cell) {
            return None;
        }
        let (tab, first) = match (self.profile, self.owners) {
            (EdgeProfile::Interlocking { tab, .. }, EdgeOwners::Shared { first, .. }) => {
                (tab, first)
            }
            _ => return Some(EdgeKind::Flat),
        };
        let owns_tab = (tab == TabSide::First) == (cell == first);
        Some(if owns_tab { EdgeKind::Tab } else { EdgeKind::Socket })
    }

    pub fn start(&self) -> Point {
        self.local_to_grid(0.0, 0.0)
    }

    pub fn end(&self) -> Point {
        self.local_to_grid(1.0, 0.0)
    }

    /// `u` runs along the edge and `v` points from the first owner toward the
    /// second, both in grid units.
    fn local_to_grid(&self, u: f64, v: f64) -> Point {
        let line = self.line as f64;
        let index = self.index as f64;
        match self.orientation {
            EdgeOrientation::Horizontal => (index + u, line + v),
            EdgeOrientation::Vertical => (line + v, index + u),
        }
    }

    pub fn curve(&self, limits: &TabDepthLimit) -> EdgeCurve {
        let (tab, params) = match self.profile {
            EdgeProfile::Flat => return EdgeCurve::Straight([self.start(), self.end()]),
            EdgeProfile::Interlocking { tab, params } => (tab, params),
        };
        let local = tab_control_points(&params, limits.along(self.orientation));
        let sign = tab.sign();
        let mut points: Vec<Point> = local
            .iter()
            .map(|&(u, v)| self.local_to_grid(u, v * sign))
            .collect();
        // Corners must match their neighbours bit for bit.
        points[0] = self.start();
        points[9] = self.end();
        EdgeCurve::Cubic(points)
    }

    /// The curve as walked clockwise around `cell`: top and right edges run
    /// forward, bottom and left edges run backward.
    pub fn curve_for(&self, cell: CellCoord, limits: &TabDepthLimit) -> EdgeCurve {
        let forward = match self.orientation {
            EdgeOrientation::Horizontal => cell.row == self.line,
            EdgeOrientation::Vertical => cell.col + 1 == self.line,
        };
        let curve = self.curve(limits);
        if forward {
            curve
        } else {
            curve.reversed()
        }
    }

    fn band_corners(&self, limits: &TabDepthLimit) -> [Point; 4] {
        let depth = limits.along(self.orientation) + EDGE_BAND_MARGIN;
        [
            self.local_to_grid(0.0, -depth),
            self.local_to_grid(1.0, -depth),
            self.local_to_grid(1.0, depth),
            self.local_to_grid(0.0, depth),
        ]
    }

    fn resample(&mut self, parity: bool) {
        let EdgeProfile::Interlocking { tab, .. } = &mut self.profile else {
            return;
        };
        let current = *tab;
        while self.attempts < MAX_RESAMPLE_ATTEMPTS {
            self.attempts += 1;
            let drawn = draw_tab_side(self.curve_seed, parity, self.attempts);
            if drawn != current {
                *tab = drawn;
                return;
            }
        }
        *tab = current.flipped();
    }
}

fn jitter_value(seed: u32, salt: u32, base: f64, range: f64, min: f64, max: f64, variation: f64) -> f64 {
    let jitter = rand_unit(seed, salt) * 2.0 - 1.0;
    let value = base + jitter * range * variation;
    value.clamp(min, max)
}

/// Knob shape for one edge, drawn from its seed. `tab_size` is the neck
/// half-width along the edge and `tab_depth` the bulb height relative to it;
/// `a`..`e` jitter the shoulders, neck and bulb. Nothing here is capped
/// against the cell yet: [`tab_control_points`] applies the depth limit.
pub fn edge_params(seed: u32, settings: &ShapeSettings) -> EdgeParams {
    let variation = settings.variation.clamp(VARIATION_MIN, VARIATION_MAX);
    let tab_size_raw = jitter_value(
        seed,
        0,
        settings.tab_width,
        TAB_WIDTH_RANGE,
        TAB_WIDTH_MIN,
        TAB_WIDTH_MAX,
        variation,
    );
    let tab_depth_raw = jitter_value(
        seed,
        2,
        settings.tab_depth,
        TAB_DEPTH_RANGE,
        TAB_DEPTH_MIN,
        TAB_DEPTH_MAX,
        variation,
    );
    let tab_size_scale = settings
        .tab_size_scale
        .clamp(TAB_SIZE_SCALE_MIN, TAB_SIZE_SCALE_MAX);
    let tab_size_min = settings
        .tab_size_min
        .clamp(TAB_SIZE_MIN_LIMIT, TAB_SIZE_MAX_LIMIT);
    let tab_size_max = settings.tab_size_max.clamp(tab_size_min, TAB_SIZE_MAX_LIMIT);
    let tab_size = (tab_size_raw * tab_size_scale).clamp(tab_size_min, tab_size_max);
    let tab_depth = tab_depth_raw.clamp(TAB_DEPTH_MIN, TAB_DEPTH_MAX);
    let jitter_strength = settings
        .jitter_strength
        .clamp(JITTER_STRENGTH_MIN, JITTER_STRENGTH_MAX);
    let jitter_base = (variation * jitter_strength).clamp(0.0, jitter_strength);
    let skew_ratio = (settings.skew_range / SKEW_RANGE_MAX).clamp(0.0, 1.0);
    let jitter_len_bias = settings
        .jitter_len_bias
        .clamp(JITTER_LEN_BIAS_MIN, JITTER_LEN_BIAS_MAX);
    let jitter_len = jitter_base * (jitter_len_bias + (1.0 - jitter_len_bias) * skew_ratio);
    let jitter_depth = jitter_base * tab_depth;
    EdgeParams {
        tab_size,
        tab_depth,
        a: rand_range(seed, 3, -jitter_depth, jitter_depth),
        b: rand_range(seed, 4, -jitter_len, jitter_len),
        c: rand_range(seed, 5, -jitter_depth, jitter_depth),
        d: rand_range(seed, 6, -jitter_len, jitter_len),
        e: rand_range(seed, 7, -jitter_depth, jitter_depth),
    }
}

/// Checkerboard parity decides the default; the seed flips it at random.
fn draw_tab_side(curve_seed: u32, parity: bool, attempt: u32) -> TabSide {
    if parity ^ rand_bit(curve_seed, SIDE_SALT + attempt) {
        TabSide::First
    } else {
        TabSide::Second
    }
}

/// Ten control points of the knob in edge-local `(u, v)`, before the sign of
/// the tab side is applied.
///
/// The bulb top sits at `3 * t_depth + c`. Holding `t_depth` to a third of
/// `depth_limit` and `c` to the remainder keeps it within the limit, and the
/// shoulder offsets `a` and `e` stay within [`SHOULDER_JITTER_RATIO`] of it,
/// so no point strays further than `depth_limit` from the straight cut.
pub fn tab_control_points(params: &EdgeParams, depth_limit: f64) -> [Point; 10] {
    let t_len = params.tab_size;
    let mut t_depth = t_len * params.tab_depth;
    let max_t_depth = depth_limit / 3.0;
    if t_depth > max_t_depth {
        t_depth = max_t_depth;
    }
    let max_jitter_depth = (depth_limit - 3.0 * t_depth).max(0.0);
    let shoulder = depth_limit * SHOULDER_JITTER_RATIO;
    let mut a = params.a.clamp(-shoulder, shoulder);
    let mut c = params.c.clamp(-max_jitter_depth, max_jitter_depth);
    let mut e = params.e.clamp(-shoulder, shoulder);
    let b = params.b;
    let d = params.d;
    if max_jitter_depth == 0.0 {
        a = 0.0;
        c = 0.0;
        e = 0.0;
    }

    [
        (0.0, 0.0),
        (0.2, a),
        (0.5 + b + d, -t_depth + c),
        (0.5 - t_len + b, t_depth + c),
        (0.5 - 2.0 * t_len + b - d, 3.0 * t_depth + c),
        (0.5 + 2.0 * t_len + b - d, 3.0 * t_depth + c),
        (0.5 + t_len + b, t_depth + c),
        (0.5 + b + d, -t_depth + c),
        (0.8, e),
        (1.0, 0.0),
    ]
}

/// Every edge of the grid, indexed by [`EdgeId`]. Horizontal edges come
/// first, row line by row line, then vertical edges.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeTable {
    rows: u32,
    cols: u32,
    edges: Vec<Edge>,
    resampled: usize,
}

impl EdgeTable {
    pub fn build(
        grid: &GridDescriptor,
        seed: u32,
        silhouette: &Silhouette,
        settings: &ShapeSettings,
        limits: &TabDepthLimit,
        parallel: bool,
    ) -> Self {
        let rows = grid.rows;
        let cols = grid.cols;
        let horizontal = collect_lines(rows + 1, parallel, |line| {
            (0..cols)
                .map(|col| {
                    let id = EdgeId(line * cols + col);
                    let owners = if line == 0 {
                        EdgeOwners::Boundary(CellCoord::new(0, col))
                    } else if line == rows {
                        EdgeOwners::Boundary(CellCoord::new(rows - 1, col))
                    } else {
                        EdgeOwners::Shared {
                            first: CellCoord::new(line - 1, col),
                            second: CellCoord::new(line, col),
                        }
                    };
                    new_edge(
                        id,
                        EdgeOrientation::Horizontal,
                        line,
                        col,
                        owners,
                        seed,
                        silhouette,
                        settings,
                        limits,
                    )
                })
                .collect()
        });
        let offset = (rows + 1) * cols;
        let vertical = collect_lines(rows, parallel, |row| {
            (0..=cols)
                .map(|line| {
                    let id = EdgeId(offset + row * (cols + 1) + line);
                    let owners = if line == 0 {
                        EdgeOwners::Boundary(CellCoord::new(row, 0))
                    } else if line == cols {
                        EdgeOwners::Boundary(CellCoord::new(row, cols - 1))
                    } else {
                        EdgeOwners::Shared {
                            first: CellCoord::new(row, line - 1),
                            second: CellCoord::new(row, line),
                        }
                    };
                    new_edge(
                        id,
                        EdgeOrientation::Vertical,
                        line,
                        row,
                        owners,
                        seed,
                        silhouette,
                        settings,
                        limits,
                    )
                })
                .collect()
        });

        let mut edges = horizontal;
        edges.extend(vertical);
        let mut table = Self {
            rows,
            cols,
            edges,
            resampled: 0,
        };
        table.resampled = table.break_uniform_cells(seed);
        tracing::debug!(
            edges = table.edges.len(),
            interlocking = table.interlocking_count(),
            resampled = table.resampled,
            "edge table built"
        );
        table
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn get(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    /// Number of edges whose tab side was redrawn to avoid all-tab or
    /// all-socket pieces.
    pub fn resampled(&self) -> usize {
        self.resampled
    }

    pub fn interlocking_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|edge| matches!(edge.profile, EdgeProfile::Interlocking { .. }))
            .count()
    }

    pub fn shared_count(&self) -> usize {
        self.edges.iter().filter(|edge| !edge.is_boundary()).count()
    }

    pub fn horizontal_id(&self, line: u32, col: u32) -> EdgeId {
        EdgeId(line * self.cols + col)
    }

    pub fn vertical_id(&self, row: u32, line: u32) -> EdgeId {
        EdgeId((self.rows + 1) * self.cols + row * (self.cols + 1) + line)
    }

    /// Top, right, bottom and left edge of a cell, in clockwise order.
    pub fn cell_edges(&self, cell: CellCoord) -> [EdgeId; 4] {
        [
            self.horizontal_id(cell.row, cell.col),
            self.vertical_id(cell.row, cell.col + 1),
            self.horizontal_id(cell.row + 1, cell.col),
            self.vertical_id(cell.row, cell.col),
        ]
    }

    pub fn cell_kinds(&self, cell: CellCoord) -> [EdgeKind; 4] {
        self.cell_edges(cell).map(|id| {
            self.edges[id.index()]
                .kind_for(cell)
                .unwrap_or(EdgeKind::Flat)
        })
    }

    /// Row-major sweep. A cell whose four edges all interlock the same way
    /// gets its right or bottom edge redrawn; those edges only touch cells the
    /// sweep has not reached yet.
    fn break_uniform_cells(&mut self, seed: u32) -> usize {
        let mut resampled = 0;
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = CellCoord::new(row, col);
                let kinds = self.cell_kinds(cell);
                let uniform = kinds[0] != EdgeKind::Flat && kinds.iter().all(|kind| *kind == kinds[0]);
                if !uniform {
                    continue;
                }
                let [_, right, bottom, _] = self.cell_edges(cell);
                let target = if rand_bit(seed ^ row.wrapping_mul(self.cols).wrapping_add(col), 1) {
                    bottom
                } else {
                    right
                };
                let edge = &mut self.edges[target.index()];
                let parity = match edge.owners {
                    EdgeOwners::Shared { first, .. } => first.parity(),
                    EdgeOwners::Boundary(owner) => owner.parity(),
                };
                edge.resample(parity);
                resampled += 1;
            }
        }
        resampled
    }
}

fn collect_lines<F>(count: u32, parallel: bool, build: F) -> Vec<Edge>
where
    F: Fn(u32) -> Vec<Edge> + Sync + Send,
{
    let lines: Vec<Vec<Edge>> = if parallel {
        (0..count).into_par_iter().map(&build).collect()
    } else {
        (0..count).map(&build).collect()
    };
    lines.into_iter().flatten().collect()
}

#[allow(clippy::too_many_arguments)]
fn new_edge(
    id: EdgeId,
    orientation: EdgeOrientation,
    line: u32,
    index: u32,
    owners: EdgeOwners,
    seed: u32,
    silhouette: &Silhouette,
    settings: &ShapeSettings,
    limits: &TabDepthLimit,
) -> Edge {
    let (seed_row, seed_col) = match orientation {
        EdgeOrientation::Horizontal => (line, index),
        EdgeOrientation::Vertical => (index, line),
    };
    let curve_seed = edge_seed(seed, orientation.salt(), seed_row, seed_col);
    let mut edge = Edge {
        id,
        orientation,
        line,
        index,
        owners,
        profile: EdgeProfile::Flat,
        curve_seed,
        attempts: 0,
    };
    if let EdgeOwners::Shared { first, .. } = owners {
        let band = edge.band_corners(limits);
        if silhouette.contains_all(&band) {
            edge.profile = EdgeProfile::Interlocking {
                tab: draw_tab_side(curve_seed, first.parity(), 0),
                params: edge_params(curve_seed, settings),
            };
        }
    }
    edge
}
