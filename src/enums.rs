use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RendererError;

/// Viewing plane of a 2D renderer.
///
/// Each plane looks down one volume axis:
///  - Sagittal looks down X (axis 0)
///  - Coronal looks down Y (axis 1)
///  - Axial looks down Z (axis 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

impl Orientation {
    /// Resolve an orientation name to its axis letter and axis index.
    ///
    /// Accepts `x`, `y`, `z`, `axial`, `sagittal` and `coronal` in any case.
    pub fn resolve(name: &str) -> Result<(char, usize), RendererError> {
        let orientation: Orientation = name.parse()?;
        Ok((orientation.letter(), orientation.axis_index()))
    }

    /// Orientation looking down the given axis letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Orientation::Sagittal),
            'Y' => Some(Orientation::Coronal),
            'Z' => Some(Orientation::Axial),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Orientation::Sagittal => 'X',
            Orientation::Coronal => 'Y',
            Orientation::Axial => 'Z',
        }
    }

    /// Index of the volume axis this plane looks down (X=0, Y=1, Z=2)
    pub fn axis_index(&self) -> usize {
        match self {
            Orientation::Sagittal => 0,
            Orientation::Coronal => 1,
            Orientation::Axial => 2,
        }
    }

    /// The pair of colors used by crosshair/slider affordances for the two
    /// in-plane axes (horizontal first).
    pub fn annotation_colors(&self) -> [AnnotationColor; 2] {
        match self {
            Orientation::Sagittal => [AnnotationColor::Green, AnnotationColor::Blue],
            Orientation::Coronal => [AnnotationColor::Red, AnnotationColor::Blue],
            Orientation::Axial => [AnnotationColor::Red, AnnotationColor::Green],
        }
    }
}

impl FromStr for Orientation {
    type Err = RendererError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_uppercase().as_str() {
            "X" | "SAGITTAL" => Ok(Orientation::Sagittal),
            "Y" | "CORONAL" => Ok(Orientation::Coronal),
            "Z" | "AXIAL" => Ok(Orientation::Axial),
            _ => Err(RendererError::InvalidOrientation(name.to_string())),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Color coding of an anatomical axis (X red, Y green, Z blue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationColor {
    Red,
    Green,
    Blue,
}

impl AnnotationColor {
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            AnnotationColor::Red => [255, 0, 0],
            AnnotationColor::Green => [0, 255, 0],
            AnnotationColor::Blue => [0, 0, 255],
        }
    }
}

/// Built-in colortables, selected by integer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ColortableId {
    #[default]
    Grayscale = 0,
    Categorical = 1,
    Heat = 2,
}

impl TryFrom<u8> for ColortableId {
    type Error = RendererError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(ColortableId::Grayscale),
            1 => Ok(ColortableId::Categorical),
            2 => Ok(ColortableId::Heat),
            other => Err(RendererError::UnknownColortable(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
