pub mod catalog;
pub mod error;
pub mod grid;
pub mod pricing;
pub mod seed;
pub mod spec;

pub use catalog::{
    CatalogError, MaterialOption, Multiplier, OptionCatalog, PieceTier, Price, SizeOption,
};
pub use error::{OptionKind, PuzzleError};
pub use grid::{
    best_grid_for_count, partition, Footprint, GridChoice, GridDescriptor,
    DEFAULT_MAX_PIECE_COUNT, GRID_PIECE_RATIO_MAX,
};
pub use pricing::{quote, PriceQuote};
pub use seed::{edge_seed, rand_bit, rand_range, rand_unit, splitmix32};
pub use spec::{ImageRef, Material, PuzzleSpec, Shape, Size};
