use thiserror::Error;

use crate::model::{IconId, LineId};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EditorError {
    #[error("unknown icon `{0}`")]
    UnknownIcon(IconId),
    #[error("unknown line {0}")]
    UnknownLine(LineId),
    #[error("no line at position {0}")]
    LineIndexOutOfRange(usize),
    #[error("line {line} has no vertex {index}")]
    VertexOutOfRange { line: LineId, index: usize },
    #[error("distance must be a positive number of meters, got `{0}`")]
    InvalidDistance(String),
    #[error("reference segment has zero length")]
    DegenerateReference,
    #[error("no reference segment is waiting for a distance")]
    NoPendingReference,
    #[error("PDF renderer unavailable ({0})")]
    PdfUnavailable(String),
    #[error("PDF render failed: {0}")]
    Pdf(String),
    #[error("image export failed: {0}")]
    Export(String),
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
