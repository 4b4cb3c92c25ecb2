//! Run configuration for gridding and volume calculation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurfaceError};

/// Method used to interpolate inside the convex hull of the samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterpolationMethod {
    /// Linear interpolation on a Delaunay triangulation of the samples.
    #[default]
    #[serde(alias = "linear")]
    LinearTriangulated,
    /// Thin-plate spline radial basis function with a linear trend.
    #[serde(alias = "rbf")]
    RadialBasis,
}

impl InterpolationMethod {
    /// Parses a method name. Case insensitive.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "linear-triangulated" | "tin" => Some(Self::LinearTriangulated),
            "rbf" | "radial-basis" | "thin-plate" => Some(Self::RadialBasis),
            _ => None,
        }
    }
}

/// How nodes outside the convex hull of the samples are assigned a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtrapolationPolicy {
    /// Elevation of the nearest sample in plan.
    #[default]
    #[serde(alias = "nearest")]
    NearestNeighbor,
    /// Elevation of the closest point on the nearest hull edge.
    #[serde(alias = "flat")]
    FlatBoundary,
}

impl ExtrapolationPolicy {
    /// Parses a policy name. Case insensitive.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "nearest-neighbor" | "nearest-neighbour" => Some(Self::NearestNeighbor),
            "flat" | "flat-boundary" => Some(Self::FlatBoundary),
            _ => None,
        }
    }
}

/// Immutable settings threaded through grid construction and interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GridConfig {
    /// Grid resolution in drawing units.
    pub cell_size: f64,
    /// Padding added around the sample extents before gridding.
    pub margin: f64,
    pub interpolation_method: InterpolationMethod,
    pub extrapolation_policy: ExtrapolationPolicy,
    /// Leave cells touching extrapolated nodes out of the volume totals.
    pub exclude_extrapolated: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 2.0,
            margin: 0.0,
            interpolation_method: InterpolationMethod::default(),
            extrapolation_policy: ExtrapolationPolicy::default(),
            exclude_extrapolated: false,
        }
    }
}

impl GridConfig {
    /// Creates a configuration with the given cell size and defaults elsewhere.
    pub fn with_cell_size(cell_size: f64) -> Self {
        Self {
            cell_size,
            ..Self::default()
        }
    }

    pub fn method(mut self, method: InterpolationMethod) -> Self {
        self.interpolation_method = method;
        self
    }

    pub fn policy(mut self, policy: ExtrapolationPolicy) -> Self {
        self.extrapolation_policy = policy;
        self
    }

    pub fn margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn exclude_extrapolated(mut self, exclude: bool) -> Self {
        self.exclude_extrapolated = exclude;
        self
    }

    /// Checks the numeric settings.
    pub fn validate(&self) -> Result<()> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(SurfaceError::InvalidGridConfig(format!(
                "cell size must be a positive number, got {}",
                self.cell_size
            )));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(SurfaceError::InvalidGridConfig(format!(
                "margin must be zero or positive, got {}",
                self.margin
            )));
        }
        Ok(())
    }

    /// Reads a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file(path: &str) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> std::io::Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Writes the configuration as pretty printed JSON.
    pub fn write_json_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_cell_size() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = GridConfig::with_cell_size(bad).validate().unwrap_err();
            assert!(matches!(err, SurfaceError::InvalidGridConfig(_)));
        }
        assert!(GridConfig::with_cell_size(0.5).validate().is_ok());
    }

    #[test]
    fn rejects_negative_margin() {
        let cfg = GridConfig::with_cell_size(1.0).margin(-0.1);
        assert!(matches!(
            cfg.validate(),
            Err(SurfaceError::InvalidGridConfig(_))
        ));
    }

    #[test]
    fn json_uses_defaults_for_missing_keys() {
        let cfg = GridConfig::from_json_str(
            r#"{"cell_size": 5.0, "extrapolation_policy": "flat-boundary"}"#,
        )
        .unwrap();
        assert_eq!(cfg.cell_size, 5.0);
        assert_eq!(cfg.extrapolation_policy, ExtrapolationPolicy::FlatBoundary);
        assert_eq!(cfg.interpolation_method, InterpolationMethod::LinearTriangulated);
        assert_eq!(cfg.margin, 0.0);
    }

    #[test]
    fn json_accepts_short_names() {
        let cfg =
            GridConfig::from_json_str(r#"{"interpolation_method": "rbf", "extrapolation_policy": "nearest"}"#)
                .unwrap();
        assert_eq!(cfg.interpolation_method, InterpolationMethod::RadialBasis);
        assert_eq!(cfg.extrapolation_policy, ExtrapolationPolicy::NearestNeighbor);
    }

    #[test]
    fn malformed_json_is_invalid_data() {
        let err = GridConfig::from_json_str("{cell_size").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(
            InterpolationMethod::from_name("RBF"),
            Some(InterpolationMethod::RadialBasis)
        );
        assert_eq!(
            ExtrapolationPolicy::from_name("Flat"),
            Some(ExtrapolationPolicy::FlatBoundary)
        );
        assert!(InterpolationMethod::from_name("cubic").is_none());
    }
}
