pub mod assembler;
pub mod clip;
pub mod config;
pub mod edges;
pub mod generator;
pub mod laser;
pub mod path;
pub mod silhouette;

pub use assembler::{assemble, assemble_piece, Piece, TabDepthLimit};
pub use clip::{clip_pieces, ClipOutcome, ClipSettings};
pub use config::{ConfigError, GeneratorConfig, ShapeSettings};
pub use edges::{
    CellCoord, Edge, EdgeCurve, EdgeId, EdgeKind, EdgeOrientation, EdgeOwners, EdgeParams,
    EdgeProfile, EdgeTable, TabSide,
};
pub use generator::{Generation, PuzzleGenerator, PuzzleLayout};
pub use laser::{serialize, validate_document, validate_path_data, LaserArtifact};
pub use path::{BoundaryPath, Point, Segment};
pub use silhouette::Silhouette;

pub use puzzlecut_core::{
    ImageRef, Material, OptionCatalog, PriceQuote, PuzzleError, PuzzleSpec, Shape, Size,
};
