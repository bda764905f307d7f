//! Charuco-style board description and detections.
//!
//! The board template comes from a template file with lengths in
//! millimeters; everything here is stored in meters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Pt2, Pt3, Real};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoardError {
    #[error("board needs at least 2x2 squares, got {squares_x}x{squares_y}")]
    TooFewSquares { squares_x: u32, squares_y: u32 },
    #[error("square length must be positive, got {0}")]
    NonPositiveSquare(Real),
    #[error("marker length {marker} must be positive and smaller than the square {square}")]
    InvalidMarker { marker: Real, square: Real },
    #[error("board has no corner with id {0}")]
    UnknownCorner(u32),
    #[error("detections carry {corners} corners but {ids} ids")]
    LengthMismatch { corners: usize, ids: usize },
}

/// Checkerboard with markers in the white squares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardTemplate {
    pub squares_x: u32,
    pub squares_y: u32,
    /// Square side in meters.
    pub square_length: Real,
    /// Marker side in meters.
    pub marker_length: Real,
    /// Marker dictionary name, e.g. `DICT_5X5_1000`.
    pub dictionary: String,
}

impl BoardTemplate {
    pub fn new(
        squares_x: u32,
        squares_y: u32,
        square_length: Real,
        marker_length: Real,
        dictionary: impl Into<String>,
    ) -> Result<Self, BoardError> {
        if squares_x < 2 || squares_y < 2 {
            return Err(BoardError::TooFewSquares {
                squares_x,
                squares_y,
            });
        }
        if !(square_length > 0.0) {
            return Err(BoardError::NonPositiveSquare(square_length));
        }
        if !(marker_length > 0.0) || marker_length >= square_length {
            return Err(BoardError::InvalidMarker {
                marker: marker_length,
                square: square_length,
            });
        }
        Ok(Self {
            squares_x,
            squares_y,
            square_length,
            marker_length,
            dictionary: dictionary.into(),
        })
    }

    /// Build from millimeter lengths as stored in template files.
    pub fn from_millimeters(
        squares_x: u32,
        squares_y: u32,
        square_length_mm: Real,
        marker_length_mm: Real,
        dictionary: impl Into<String>,
    ) -> Result<Self, BoardError> {
        Self::new(
            squares_x,
            squares_y,
            square_length_mm / 1000.0,
            marker_length_mm / 1000.0,
            dictionary,
        )
    }

    /// Number of interior chessboard corners.
    pub fn corner_count(&self) -> usize {
        ((self.squares_x - 1) * (self.squares_y - 1)) as usize
    }

    /// Board-frame positions of all interior corners, keyed by id.
    pub fn geometry(&self) -> BoardGeometry {
        let cols = self.squares_x - 1;
        let rows = self.squares_y - 1;
        let sq = self.square_length;
        let corners = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (row, col)))
            .map(|(row, col)| {
                let id = row * cols + col;
                let p = Pt3::new((col + 1) as Real * sq, (row + 1) as Real * sq, 0.0);
                (id, p)
            })
            .collect();
        BoardGeometry { corners }
    }
}

/// Ordered mapping from corner id to its 3D board-frame position (z = 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardGeometry {
    corners: BTreeMap<u32, Pt3>,
}

impl BoardGeometry {
    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    pub fn point(&self, id: u32) -> Option<&Pt3> {
        self.corners.get(&id)
    }

    /// Board points for the given ids, in the same order.
    pub fn points_for(&self, ids: &[u32]) -> Result<Vec<Pt3>, BoardError> {
        ids.iter()
            .map(|id| {
                self.corners
                    .get(id)
                    .copied()
                    .ok_or(BoardError::UnknownCorner(*id))
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Pt3)> {
        self.corners.iter().map(|(id, p)| (*id, p))
    }
}

/// Detected corner pixels and the board ids they belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetections {
    pub corners: Vec<Pt2>,
    pub ids: Vec<u32>,
}

impl MarkerDetections {
    pub fn new(corners: Vec<Pt2>, ids: Vec<u32>) -> Result<Self, BoardError> {
        if corners.len() != ids.len() {
            return Err(BoardError::LengthMismatch {
                corners: corners.len(),
                ids: ids.len(),
            });
        }
        Ok(Self { corners, ids })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
