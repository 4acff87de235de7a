//! Transform kinds offered to the user.
//!
//! Only the identity of a transform lives here: its key, display name and
//! output filename suffix. The pixel operations are supplied by whoever
//! builds the transform registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One of the image transformations a batch can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Grayscale,
    ScaleUp,
    ScaleDown,
    RotateClockwise,
    RotateCounterClockwise,
    EdgeDetection,
    Threshold,
    Blur,
}

impl TransformKind {
    /// Every kind, in the order they are presented to the user.
    pub const ALL: [TransformKind; 8] = [
        TransformKind::Grayscale,
        TransformKind::ScaleUp,
        TransformKind::ScaleDown,
        TransformKind::RotateClockwise,
        TransformKind::RotateCounterClockwise,
        TransformKind::EdgeDetection,
        TransformKind::Threshold,
        TransformKind::Blur,
    ];

    /// Stable snake_case key (matches the serde representation).
    pub fn key(self) -> &'static str {
        match self {
            TransformKind::Grayscale => "grayscale",
            TransformKind::ScaleUp => "scale_up",
            TransformKind::ScaleDown => "scale_down",
            TransformKind::RotateClockwise => "rotate_clockwise",
            TransformKind::RotateCounterClockwise => "rotate_counter_clockwise",
            TransformKind::EdgeDetection => "edge_detection",
            TransformKind::Threshold => "threshold",
            TransformKind::Blur => "blur",
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            TransformKind::Grayscale => "Grayscale",
            TransformKind::ScaleUp => "Scale to 200%",
            TransformKind::ScaleDown => "Scale to 50%",
            TransformKind::RotateClockwise => "Rotate 90° CW",
            TransformKind::RotateCounterClockwise => "Rotate 90° CCW",
            TransformKind::EdgeDetection => "Edge detection",
            TransformKind::Threshold => "Threshold",
            TransformKind::Blur => "Blur",
        }
    }

    /// Suffix appended to the input file stem when naming the output.
    pub fn suffix(self) -> &'static str {
        match self {
            TransformKind::Grayscale => "_gray",
            TransformKind::ScaleUp => "_x2",
            TransformKind::ScaleDown => "_half",
            TransformKind::RotateClockwise => "_cw90",
            TransformKind::RotateCounterClockwise => "_ccw90",
            TransformKind::EdgeDetection => "_edges",
            TransformKind::Threshold => "_binary",
            TransformKind::Blur => "_blur",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TransformKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TransformKind::ALL
            .into_iter()
            .find(|kind| kind.key() == wanted)
            .ok_or_else(|| CoreError::Validation(format!("Unknown transform kind: '{s}'")))
    }
}
