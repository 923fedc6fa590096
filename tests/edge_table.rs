use proptest::prelude::*;
use puzzlecut::{
    assemble, EdgeKind, EdgeOrientation, EdgeTable, GeneratorConfig, ShapeSettings, Silhouette, TabDepthLimit,
};
use puzzlecut_core::{partition, Shape};

fn uniform(kinds: &[EdgeKind; 4]) -> bool {
    kinds[0] != EdgeKind::Flat && kinds.iter().all(|kind| *kind == kinds[0])
}

#[test]
fn default_shape_table_is_reproducible() {
    let grid = partition(300.0, 225.0, Shape::Rectangle, 500, 5000).expect("grid");
    let config = GeneratorConfig::default();
    let limits = TabDepthLimit::for_grid(&grid, config.tab_depth_cap);
    let silhouette = Silhouette::for_grid(Shape::Rectangle, &grid, config.circle_segments);
    let first = EdgeTable::build(&grid, 77, &silhouette, &config.shape, &limits, true);
    let second = EdgeTable::build(&grid, 77, &silhouette, &config.shape, &limits, true);
    assert_eq!(first, second);
}

#[test]
fn tab_depth_never_exceeds_cap() {
    let grid = partition(200.0, 150.0, Shape::Rectangle, 100, 5000).expect("grid");
    let limits = TabDepthLimit::for_grid(&grid, 0.25);
    let silhouette = Silhouette::for_grid(Shape::Rectangle, &grid, 256);
    let table = EdgeTable::build(&grid, 5, &silhouette, &ShapeSettings::default(), &limits, true);
    for edge in table.edges() {
        let line = edge.line as f64;
        let depth = limits.along(edge.orientation);
        for &(x, y) in edge.curve(&limits).points() {
            let offset = match edge.orientation {
                EdgeOrientation::Horizontal => y - line,
                EdgeOrientation::Vertical => x - line,
            };
            assert!(offset.abs() <= depth + 1e-9, "{:?}: {offset}", edge.id);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn no_piece_is_all_tabs_or_all_sockets(
        seed in any::<u32>(),
        pieces in 4u32..400,
        shape in prop::sample::select(Shape::ALL.to_vec()),
    ) {
        let grid = partition(400.0, 300.0, shape, pieces, 5000).expect("grid");
        let limits = TabDepthLimit::for_grid(&grid, 0.25);
        let silhouette = Silhouette::for_grid(shape, &grid, 256);
        let table = EdgeTable::build(&grid, seed, &silhouette, &ShapeSettings::default(), &limits, false);
        for piece in assemble(&grid, &table, &limits, false) {
            prop_assert!(!uniform(&piece.kinds), "{} {:?} has {:?}", shape, piece.cell, piece.kinds);
        }
    }
}
