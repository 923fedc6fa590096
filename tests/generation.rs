use puzzlecut::{
    validate_path_data, EdgeKind, EdgeOwners, GeneratorConfig, ImageRef, Material, OptionCatalog,
    PuzzleError, PuzzleGenerator, PuzzleSpec, Shape, Size,
};
use puzzlecut_core::OptionKind;

const TEST_CATALOG: &str = r#"
[[sizes]]
size = "large"
width_mm = 400.0
height_mm = 300.0
base_price = 40.0

[[materials]]
material = "paper"
multiplier = 1.0

[[materials]]
material = "wood"
multiplier = 1.5

[[piece_tiers]]
pieces = 12
multiplier = 1.0

[[piece_tiers]]
pieces = 48
multiplier = 1.05

[[piece_tiers]]
pieces = 300
multiplier = 1.2
"#;

fn spec(shape: Shape, size: Size, material: Material, piece_count: u32, seed: u32) -> PuzzleSpec {
    PuzzleSpec {
        shape,
        size,
        material,
        piece_count,
        image_ref: ImageRef::new("uploads/cat.png").expect("image ref"),
        seed,
    }
}

fn test_generator(config: GeneratorConfig) -> PuzzleGenerator {
    let catalog = OptionCatalog::from_toml_str(TEST_CATALOG).expect("catalog");
    PuzzleGenerator::new(catalog, config).expect("generator")
}

fn endpoints(data: &str) -> (String, String) {
    let tokens: Vec<&str> = data.split_whitespace().collect();
    let first = format!("{} {}", tokens[1], tokens[2]);
    let last = format!("{} {}", tokens[tokens.len() - 3], tokens[tokens.len() - 2]);
    (first, last)
}

#[test]
fn same_spec_gives_identical_bytes() {
    let generator = PuzzleGenerator::default();
    let request = spec(Shape::Rectangle, Size::Medium, Material::Wood, 500, 7);
    let first = generator.generate(&request).expect("first run");
    let second = generator.generate(&request).expect("second run");
    assert_eq!(first.artifact.document, second.artifact.document);
    assert_eq!(first.quote.final_price, 53);

    let reseeded = spec(Shape::Rectangle, Size::Medium, Material::Wood, 500, 8);
    let other = generator.generate(&reseeded).expect("other seed");
    assert_ne!(first.artifact.document, other.artifact.document);
}

#[test]
fn sequential_and_parallel_runs_agree() {
    let parallel = PuzzleGenerator::default();
    let sequential = PuzzleGenerator::new(
        OptionCatalog::builtin(),
        GeneratorConfig {
            parallel: false,
            ..GeneratorConfig::default()
        },
    )
    .expect("generator");
    let request = spec(Shape::Rectangle, Size::Small, Material::Paper, 100, 0xBEEF);
    assert_eq!(
        parallel.generate(&request).expect("parallel").artifact,
        sequential.generate(&request).expect("sequential").artifact
    );
}

#[test]
fn three_hundred_piece_rectangle() {
    let generator = PuzzleGenerator::default();
    let request = spec(Shape::Rectangle, Size::Large, Material::Paper, 300, 1);
    let generation = generator.generate(&request).expect("generate");
    assert_eq!((generation.grid.rows, generation.grid.cols), (15, 20));
    assert_eq!(generation.artifact.piece_count(), 300);
    assert_eq!(generation.artifact.width_mm, 400.0);
    assert_eq!(generation.artifact.height_mm, 300.0);
    assert!(generation
        .artifact
        .document
        .contains("width=\"400.000mm\" height=\"300.000mm\" viewBox=\"0 0 400.000 300.000\""));

    let layout = generator.layout(&request).expect("layout");
    assert_eq!(layout.edges.shared_count(), 565);
    assert_eq!(layout.edges.interlocking_count(), 565);
    assert_eq!(layout.grid.internal_edge_count(), 565);
}

#[test]
fn every_path_closes_on_its_start() {
    let generator = PuzzleGenerator::default();
    for shape in Shape::ALL {
        let request = spec(shape, Size::Medium, Material::Paper, 100, 99);
        let generation = generator
            .generate(&request)
            .unwrap_or_else(|err| panic!("{shape}: {err}"));
        for data in &generation.artifact.paths {
            validate_path_data(data).expect("closed path");
            let (first, last) = endpoints(data);
            assert_eq!(first, last, "{data}");
            assert!(data.ends_with(" Z"));
        }
    }
}

#[test]
fn shared_edges_are_traversed_in_reverse() {
    let generator = PuzzleGenerator::default();
    let request = spec(Shape::Rectangle, Size::Large, Material::Paper, 300, 4);
    let layout = generator.layout(&request).expect("layout");
    for edge in layout.edges.edges() {
        let EdgeOwners::Shared { first, second } = edge.owners else {
            continue;
        };
        let mut forward = edge.curve_for(first, &layout.limits).points().to_vec();
        forward.reverse();
        assert_eq!(
            forward,
            edge.curve_for(second, &layout.limits).points(),
            "{:?}",
            edge.id
        );
        let kinds = (
            edge.kind_for(first).expect("first"),
            edge.kind_for(second).expect("second"),
        );
        assert!(
            matches!(kinds, (EdgeKind::Tab, EdgeKind::Socket) | (EdgeKind::Socket, EdgeKind::Tab)),
            "{kinds:?}"
        );
    }
}

#[test]
fn rectangle_pieces_tile_the_canvas() {
    let generator = PuzzleGenerator::default();
    let request = spec(Shape::Rectangle, Size::Large, Material::Paper, 300, 12);
    let layout = generator.layout(&request).expect("layout");
    let steps = generator.config().flatten_steps;
    let mut total = 0.0;
    for piece in &layout.pieces {
        let area = piece.boundary.signed_area(steps);
        assert!(area > 0.0, "{:?} winds the wrong way", piece.cell);
        total += area;
    }
    let expected = (layout.grid.rows * layout.grid.cols) as f64;
    assert!((total - expected).abs() < 1e-6, "{total} vs {expected}");
}

#[test]
fn every_catalog_option_generates() {
    let generator = PuzzleGenerator::default();
    let tiers: Vec<u32> = generator
        .catalog()
        .piece_tiers
        .iter()
        .map(|tier| tier.pieces)
        .collect();
    let mut seed = 0u32;
    for shape in Shape::ALL {
        for size in Size::ALL {
            for &pieces in &tiers {
                seed = seed.wrapping_add(0x9E37);
                let request = spec(shape, size, Material::Wood, pieces, seed);
                let generation = generator
                    .generate(&request)
                    .unwrap_or_else(|err| panic!("{shape} {size} {pieces}: {err}"));
                let cut = generation.artifact.piece_count() as f64;
                let wanted = pieces as f64;
                assert!(
                    cut >= wanted * 0.8 && cut <= wanted * 1.25,
                    "{shape} {size} {pieces}: cut {cut}"
                );
            }
        }
    }
}

#[test]
fn circle_and_octagon_clip_a_small_grid() {
    let generator = test_generator(GeneratorConfig::default());
    for (shape, grid, cut) in [(Shape::Circle, (4, 4), 16), (Shape::Octagon, (3, 4), 12)] {
        let request = spec(shape, Size::Large, Material::Wood, 12, 21);
        let generation = generator.generate(&request).expect("generate");
        assert_eq!((generation.grid.rows, generation.grid.cols), grid, "{shape}");
        assert_eq!(generation.artifact.piece_count(), cut, "{shape}");
        assert_eq!(generation.artifact.width_mm, 400.0);
        assert_eq!(generation.artifact.height_mm, 300.0);

        let layout = generator.layout(&request).expect("layout");
        assert!(layout.merged.is_empty());
        let total: f64 = layout
            .pieces
            .iter()
            .map(|piece| piece.boundary.signed_area(16))
            .sum();
        let outline = layout.silhouette.area();
        assert!((total - outline).abs() / outline < 1e-3, "{shape}: {total} vs {outline}");
    }
}

#[test]
fn circle_sits_in_the_middle_of_the_canvas() {
    let generator = test_generator(GeneratorConfig::default());
    let request = spec(Shape::Circle, Size::Large, Material::Paper, 48, 3);
    let generation = generator.generate(&request).expect("generate");
    for data in &generation.artifact.paths {
        let numbers: Vec<f64> = data
            .split_whitespace()
            .filter_map(|token| token.parse::<f64>().ok())
            .collect();
        for point in numbers.chunks(2) {
            let (dx, dy) = (point[0] - 200.0, point[1] - 150.0);
            assert!(dx.hypot(dy) <= 150.0 + 1e-3, "{point:?} outside the circle");
        }
    }
}

#[test]
fn raised_area_threshold_rejects_corner_slivers() {
    let generator = test_generator(GeneratorConfig {
        min_piece_area_ratio: 0.4,
        merge_slivers: false,
        ..GeneratorConfig::default()
    });
    let request = spec(Shape::Circle, Size::Large, Material::Paper, 12, 21);
    let err = generator.generate(&request).unwrap_err();
    assert!(
        matches!(err, PuzzleError::UnclippablePiece { row: 0, col: 0, area_ratio } if area_ratio < 0.4),
        "{err}"
    );
    assert!(err.is_retryable());
}

#[test]
fn raised_area_threshold_merges_corners_by_default() {
    let generator = test_generator(GeneratorConfig {
        min_piece_area_ratio: 0.4,
        ..GeneratorConfig::default()
    });
    let request = spec(Shape::Circle, Size::Large, Material::Paper, 12, 21);
    let generation = generator.generate(&request).expect("generate");
    assert_eq!(generation.artifact.piece_count(), 12);
    let layout = generator.layout(&request).expect("layout");
    assert_eq!(layout.merged.len(), 4);
}

#[test]
fn rim_slivers_merge_unless_strict() {
    let strict = test_generator(GeneratorConfig {
        merge_slivers: false,
        ..GeneratorConfig::default()
    });
    let request = spec(Shape::Circle, Size::Large, Material::Paper, 300, 5);
    assert!(matches!(
        strict.generate(&request),
        Err(PuzzleError::UnclippablePiece { .. })
    ));

    let merging = test_generator(GeneratorConfig::default());
    let generation = merging.generate(&request).expect("generate");
    let layout = merging.layout(&request).expect("layout");
    assert_eq!(generation.artifact.piece_count(), layout.pieces.len());
    assert!((270..=330).contains(&layout.pieces.len()), "{}", layout.pieces.len());
    assert!(!layout.merged.is_empty());
    assert!(!layout.dropped.is_empty());
}

#[test]
fn zero_pieces_is_invalid() {
    let generator = PuzzleGenerator::default();
    let request = spec(Shape::Rectangle, Size::Small, Material::Paper, 0, 1);
    assert!(matches!(
        generator.generate(&request),
        Err(PuzzleError::InvalidSpec(_))
    ));
}

#[test]
fn unlisted_options_are_unknown() {
    let generator = PuzzleGenerator::default();
    let err = generator.catalog().parse_material("gold").unwrap_err();
    assert_eq!(
        err,
        PuzzleError::UnknownOption {
            kind: OptionKind::Material,
            value: "gold".to_string()
        }
    );

    let small_only = test_generator(GeneratorConfig::default());
    let request = spec(Shape::Rectangle, Size::Small, Material::Paper, 12, 1);
    assert!(matches!(
        small_only.generate(&request),
        Err(PuzzleError::UnknownOption {
            kind: OptionKind::Size,
            ..
        })
    ));
}
