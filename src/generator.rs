use puzzlecut_core::{
    partition, quote, GridDescriptor, OptionCatalog, PriceQuote, PuzzleError, PuzzleSpec,
};

use crate::assembler::{assemble, Piece, TabDepthLimit};
use crate::clip::{clip_pieces, ClipSettings};
use crate::config::{ConfigError, GeneratorConfig};
use crate::edges::{CellCoord, EdgeTable};
use crate::laser::{serialize, LaserArtifact};
use crate::silhouette::Silhouette;

#[derive(Clone, Debug, PartialEq)]
pub struct PuzzleLayout {
    pub grid: GridDescriptor,
    pub silhouette: Silhouette,
    pub limits: TabDepthLimit,
    pub edges: EdgeTable,
    pub pieces: Vec<Piece>,
    pub dropped: Vec<CellCoord>,
    pub merged: Vec<(CellCoord, CellCoord)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Generation {
    pub quote: PriceQuote,
    pub grid: GridDescriptor,
    pub artifact: LaserArtifact,
}

#[derive(Clone, Debug, Default)]
pub struct PuzzleGenerator {
    catalog: OptionCatalog,
    config: GeneratorConfig,
}

impl PuzzleGenerator {
    pub fn new(catalog: OptionCatalog, config: GeneratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { catalog, config })
    }

    pub fn catalog(&self) -> &OptionCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn quote(&self, spec: &PuzzleSpec) -> Result<PriceQuote, PuzzleError> {
        quote(&self.catalog, spec.size, spec.material, spec.piece_count)
    }

    /// Geometry only: grid, edges and the final piece outlines in grid units.
    /// Does not consult the piece-count tiers, so any count up to the
    /// configured maximum is accepted.
    pub fn layout(&self, spec: &PuzzleSpec) -> Result<PuzzleLayout, PuzzleError> {
        spec.validate(self.config.max_piece_count)?;
        let size = self.catalog.size(spec.size)?;
        let grid = partition(
            size.width_mm,
            size.height_mm,
            spec.shape,
            spec.piece_count,
            self.config.max_piece_count,
        )?;
        tracing::debug!(
            rows = grid.rows,
            cols = grid.cols,
            requested = grid.requested_count,
            cells = grid.cell_target,
            origin_x = grid.origin_x,
            origin_y = grid.origin_y,
            "grid chosen"
        );
        let parallel = self.config.parallel;
        let silhouette = Silhouette::for_grid(spec.shape, &grid, self.config.circle_segments);
        let limits = TabDepthLimit::for_grid(&grid, self.config.tab_depth_cap);
        let edges = EdgeTable::build(
            &grid,
            spec.seed,
            &silhouette,
            &self.config.shape,
            &limits,
            parallel,
        );
        let pieces = assemble(&grid, &edges, &limits, parallel);
        let clipped = clip_pieces(
            pieces,
            &silhouette,
            &ClipSettings {
                min_area_ratio: self.config.min_piece_area_ratio,
                flatten_steps: self.config.flatten_steps,
                merge_slivers: self.config.merge_slivers,
                parallel,
            },
        )?;
        if clipped.pieces.is_empty() {
            return Err(PuzzleError::InvalidSpec(
                "no piece survives clipping".to_string(),
            ));
        }
        Ok(PuzzleLayout {
            grid,
            silhouette,
            limits,
            edges,
            pieces: clipped.pieces,
            dropped: clipped.dropped,
            merged: clipped.merged,
        })
    }

    pub fn generate(&self, spec: &PuzzleSpec) -> Result<Generation, PuzzleError> {
        let span = tracing::info_span!(
            "generate",
            shape = %spec.shape,
            size = %spec.size,
            material = %spec.material,
            pieces = spec.piece_count,
            seed = spec.seed
        );
        let _guard = span.enter();

        spec.validate(self.config.max_piece_count)?;
        let quote = self.quote(spec)?;
        let layout = self.layout(spec)?;
        let artifact = serialize(
            &layout.pieces,
            &layout.grid,
            self.config.stroke_width_mm,
            self.config.precision,
        )?;
        tracing::info!(
            pieces = artifact.piece_count(),
            price = quote.final_price,
            "puzzle generated"
        );
        Ok(Generation {
            quote,
            grid: layout.grid,
            artifact,
        })
    }
}
