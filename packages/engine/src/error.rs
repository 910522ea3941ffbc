//! Engine error taxonomy.

use parcel_map_geometry::GeometryError;
use thiserror::Error;

/// Errors returned by parcel engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The parcel boundary failed validation.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),

    /// A parcel with this `parcel_id` already exists.
    #[error("Parcel ID already exists: {parcel_id}")]
    DuplicateParcelId { parcel_id: String },

    /// Malformed or degenerate bounding box.
    #[error("Invalid bbox format: {message}")]
    InvalidBoundingBox { message: String },

    /// Search field outside the permitted set.
    #[error("Invalid search field: {field}")]
    UnknownSearchField { field: String },

    /// No parcel with this `parcel_id`.
    #[error("Parcel not found: {parcel_id}")]
    NotFound { parcel_id: String },

    #[error("Region must not be empty")]
    EmptyRegion,

    #[error("Limit must be a positive integer")]
    InvalidLimit,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a caller should surface an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was malformed.
    ClientInput,
    /// The identified parcel does not exist.
    NotFound,
    /// A write was refused because it would break a store invariant.
    WriteRejected,
    Internal,
}

impl EngineError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidBoundingBox { .. }
            | Self::UnknownSearchField { .. }
            | Self::InvalidLimit => ErrorClass::ClientInput,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::InvalidGeometry(_) | Self::DuplicateParcelId { .. } | Self::EmptyRegion => {
                ErrorClass::WriteRejected
            }
            Self::Io(_) | Self::Json(_) => ErrorClass::Internal,
        }
    }

    pub(crate) fn invalid_bbox(message: impl Into<String>) -> Self {
        Self::InvalidBoundingBox {
            message: message.into(),
        }
    }
}
