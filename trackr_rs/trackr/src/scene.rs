//! Backend-neutral snapshot of a chart panel at one instant.
//!
//! Coordinates of marks and ticks are relative to the plot origin; add
//! `origin` to place them on the full panel surface.

use serde::{Deserialize, Serialize};

use crate::scale::{AxisOrientation, Tick};
use crate::transition::Point;
use crate::{Color, Tooltip};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisFrame {
    pub orientation: AxisOrientation,
    pub length: f64,
    pub ticks: Vec<Tick>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointFrame {
    pub key: String,
    pub center: Point,
    pub radius: f64,
    pub color: Color,
    pub opacity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineFrame {
    pub key: String,
    pub vertices: Vec<Point>,
    pub color: Color,
    pub opacity: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TooltipDirection {
    /// To the right of the point.
    East,
    /// Above the point.
    North,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TooltipFrame {
    /// Panel-surface coordinates (origin already applied).
    pub anchor: Point,
    pub direction: TooltipDirection,
    pub content: Tooltip,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub container_id: String,
    pub width: f64,
    pub height: f64,
    pub origin: Point,
    pub x_axis: AxisFrame,
    pub y_axis: AxisFrame,
    pub points: Vec<PointFrame>,
    pub lines: Vec<LineFrame>,
    pub tooltip: Option<TooltipFrame>,
}

impl Scene {
    pub fn point(&self, key: &str) -> Option<&PointFrame> {
        self.points.iter().find(|p| p.key == key)
    }

    pub fn line(&self, key: &str) -> Option<&LineFrame> {
        self.lines.iter().find(|l| l.key == key)
    }
}
