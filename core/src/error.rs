use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    Size,
    Material,
    PieceCount,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Size => f.write_str("size"),
            OptionKind::Material => f.write_str("material"),
            OptionKind::PieceCount => f.write_str("piece count"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PuzzleError {
    #[error("invalid puzzle spec: {0}")]
    InvalidSpec(String),
    #[error("piece at row {row}, col {col} cannot be clipped (area ratio {area_ratio:.3})")]
    UnclippablePiece { row: u32, col: u32, area_ratio: f64 },
    #[error("unsafe laser artifact: {0}")]
    UnsafeArtifact(String),
    #[error("unknown {kind} option: {value}")]
    UnknownOption { kind: OptionKind, value: String },
}

impl PuzzleError {
    pub fn unknown(kind: OptionKind, value: impl Into<String>) -> Self {
        PuzzleError::UnknownOption {
            kind,
            value: value.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, PuzzleError::UnclippablePiece { .. })
    }
}
