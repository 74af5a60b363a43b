use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TrackrError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 20.0,
            bottom: 20.0,
            left: 35.0,
        }
    }
}

/// Geometry and timing shared by every chart panel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    pub transition_ms: u64,
    pub x_ticks: usize,
    pub y_ticks: usize,
    pub point_radius: f64,
    /// Points closer than this to the left edge get their tooltip on the east side.
    pub tooltip_flip_px: f64,
    pub tooltip_offset_px: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 300.0,
            margin: Margin::default(),
            transition_ms: 750,
            x_ticks: 7,
            y_ticks: 10,
            point_radius: 5.0,
            tooltip_flip_px: 150.0,
            tooltip_offset_px: 8.0,
        }
    }
}

impl ChartConfig {
    pub fn from_json(text: &str) -> Result<Self, TrackrError> {
        let config: ChartConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn inner_width(&self) -> f64 {
        self.width - self.margin.left - self.margin.right
    }

    pub fn inner_height(&self) -> f64 {
        self.height - self.margin.top - self.margin.bottom
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    pub fn validate(&self) -> Result<(), TrackrError> {
        if !(self.inner_width() > 0.0) || !(self.inner_height() > 0.0) {
            return Err(TrackrError::InvalidConfig(format!(
                "plot area {}x{} leaves no room inside the margins",
                self.width, self.height
            )));
        }
        if self.x_ticks == 0 || self.y_ticks == 0 {
            return Err(TrackrError::InvalidConfig("tick counts must be > 0".into()));
        }
        if !(self.point_radius > 0.0) {
            return Err(TrackrError::InvalidConfig(
                "point radius must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_inner_extent() {
        let config = ChartConfig::default();
        assert_eq!(config.inner_width(), 445.0);
        assert_eq!(config.inner_height(), 260.0);
        assert_eq!(config.transition(), Duration::from_millis(750));
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = ChartConfig::from_json(r#"{"width": 800, "transition_ms": 0}"#).unwrap();
        assert_eq!(config.width, 800.0);
        assert_eq!(config.transition_ms, 0);
        assert_eq!(config.height, 300.0);
        assert_eq!(config.margin, Margin::default());
    }

    #[test]
    fn test_rejects_degenerate_area() {
        let err = ChartConfig::from_json(r#"{"width": 40}"#).unwrap_err();
        assert!(matches!(err, TrackrError::InvalidConfig(_)));
    }
}
