//! Operation selection types.
//!
//! User input arrives as loose strings (`"1500x1500"`, `"square-extend"`,
//! `"JPEG2000"`). It is parsed into these types once, at the boundary, so the
//! pipeline only ever sees a validated [`OperationSelection`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("invalid size '{0}': expected WIDTHxHEIGHT, e.g. 1500x1500")]
    InvalidSize(String),
    #[error("size '{0}' must have non-zero width and height")]
    ZeroSize(String),
    #[error("unknown shape '{0}': expected none, square-crop, square-extend or ratio-extend")]
    UnknownShape(String),
    #[error("unknown output format '{0}': expected JPEG, JPEG2000 or PNG")]
    UnknownFormat(String),
}

/// Exact output dimensions for the downscale-only resize step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResizeTarget {
    pub width: u32,
    pub height: u32,
}

impl ResizeTarget {
    pub fn new(width: u32, height: u32) -> Result<Self, SelectionError> {
        if width == 0 || height == 0 {
            return Err(SelectionError::ZeroSize(format!("{width}x{height}")));
        }
        Ok(Self { width, height })
    }

    /// Square target, the shape every preset in the stock config uses.
    pub fn square(side: u32) -> Result<Self, SelectionError> {
        Self::new(side, side)
    }
}

impl FromStr for ResizeTarget {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (w, h) = trimmed
            .split_once(['x', 'X'])
            .ok_or_else(|| SelectionError::InvalidSize(s.to_string()))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| SelectionError::InvalidSize(s.to_string()))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| SelectionError::InvalidSize(s.to_string()))?;
        Self::new(width, height).map_err(|_| SelectionError::ZeroSize(s.to_string()))
    }
}

impl TryFrom<String> for ResizeTarget {
    type Error = SelectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResizeTarget> for String {
    fn from(target: ResizeTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for ResizeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Canvas-level shape operation. At most one runs per image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shape {
    #[default]
    None,
    SquareCrop,
    SquareExtend,
    /// Pad vertically to a 3:4 (width:height) ratio.
    RatioExtend,
}

impl Shape {
    pub fn label(self) -> &'static str {
        match self {
            Shape::None => "none",
            Shape::SquareCrop => "square-crop",
            Shape::SquareExtend => "square-extend",
            Shape::RatioExtend => "ratio-extend",
        }
    }
}

impl FromStr for Shape {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "none" => Ok(Shape::None),
            "square-crop" | "crop" => Ok(Shape::SquareCrop),
            "square-extend" | "extend" => Ok(Shape::SquareExtend),
            "ratio-extend" | "rectangle-extend" => Ok(Shape::RatioExtend),
            _ => Err(SelectionError::UnknownShape(s.to_string())),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The operations a caller wants applied to every image of a batch.
///
/// Steps run in a fixed order regardless of how the selection was built:
/// resize, then the shape operation, then background removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationSelection {
    pub resize: Option<ResizeTarget>,
    pub shape: Shape,
    pub remove_background: bool,
}

impl OperationSelection {
    pub fn with_resize(mut self, target: ResizeTarget) -> Self {
        self.resize = Some(target);
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_background_removal(mut self) -> Self {
        self.remove_background = true;
        self
    }

    /// True when nothing but decode/encode would happen.
    pub fn is_passthrough(&self) -> bool {
        self.resize.is_none() && self.shape == Shape::None && !self.remove_background
    }
}

/// Channel layout of a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    Rgb,
    Rgba,
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Rgb => f.write_str("RGB"),
            ColorMode::Rgba => f.write_str("RGBA"),
        }
    }
}

/// Target encoding for processed images.
///
/// | Format | Extension | Color mode |
/// |---|---|---|
/// | `Jpeg` | `jpg` | RGB |
/// | `Jpeg2000` | `jpg` | RGBA |
/// | `Png` | `png` | unchanged |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    #[serde(rename = "JPEG")]
    Jpeg,
    #[serde(rename = "JPEG2000")]
    Jpeg2000,
    #[serde(rename = "PNG")]
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg | OutputFormat::Jpeg2000 => "jpg",
            OutputFormat::Png => "png",
        }
    }

    /// Color mode the encoder converts to, or `None` to keep the image's own.
    pub fn color_mode(self) -> Option<ColorMode> {
        match self {
            OutputFormat::Jpeg => Some(ColorMode::Rgb),
            OutputFormat::Jpeg2000 => Some(ColorMode::Rgba),
            OutputFormat::Png => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JPEG" | "JPG" => Ok(OutputFormat::Jpeg),
            "JPEG2000" | "JP2" => Ok(OutputFormat::Jpeg2000),
            "PNG" => Ok(OutputFormat::Png),
            _ => Err(SelectionError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Jpeg => f.write_str("JPEG"),
            OutputFormat::Jpeg2000 => f.write_str("JPEG2000"),
            OutputFormat::Png => f.write_str("PNG"),
        }
    }
}
