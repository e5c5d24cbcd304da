//! Parameters for a decimation session.

use decicrate_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Target used when neither a face count nor a reduction fraction is given
pub const DEFAULT_TARGET_FACES: usize = 1000;

/// Lower bound applied to targets derived from a fraction or the default
pub const MIN_TARGET_FACES: usize = 4;

/// How the target face count is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetSpec {
    /// Keep at most this many faces. Must be at least 1.
    FaceCount(usize),
    /// Remove this fraction of the faces. Strictly between 0 and 1.
    ReductionFraction(f64),
    /// Aim for [`DEFAULT_TARGET_FACES`].
    #[default]
    Default,
}

/// Parameters for quadric edge collapse decimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimationParams {
    pub target: TargetSpec,

    /// Faces whose radius ratio falls below this are penalised. In (0, 1].
    pub quality_threshold: f64,

    /// Weight of the texture-coordinate term. Zero disables it.
    pub texture_weight: f64,

    /// Pin boundary vertices and add boundary constraint planes.
    pub preserve_boundary: bool,

    /// Multiplier for the boundary constraint planes.
    pub boundary_weight: f64,

    /// Solve for the error-minimising position instead of using the midpoint.
    pub optimal_position: bool,

    /// Reject collapses that rotate a face normal by more than `normal_threshold_deg`.
    pub preserve_normal: bool,

    pub normal_threshold_deg: f64,

    /// Down-weight quadrics of faces lying in flat regions.
    pub planar_simplification: bool,

    /// Merge close vertices and drop duplicate faces before decimating.
    pub pre_clean: bool,

    /// Merge distance as a fraction of the bounding box diagonal.
    pub merge_threshold_ratio: f64,

    /// Number of edge-flip passes after decimation.
    pub flip_iterations: usize,

    /// Maximum dihedral angle of a face pair considered for flipping.
    pub planar_threshold_deg: f64,
}

impl Default for DecimationParams {
    fn default() -> Self {
        Self {
            target: TargetSpec::Default,
            quality_threshold: 0.5,
            texture_weight: 1.0,
            preserve_boundary: true,
            boundary_weight: 1.0,
            optimal_position: true,
            preserve_normal: true,
            normal_threshold_deg: 60.0,
            planar_simplification: true,
            pre_clean: true,
            merge_threshold_ratio: 0.01,
            flip_iterations: 2,
            planar_threshold_deg: 1.0,
        }
    }
}

impl DecimationParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Params keeping at most `count` faces.
    #[must_use]
    pub fn with_target_faces(mut self, count: usize) -> Self {
        self.target = TargetSpec::FaceCount(count);
        self
    }

    /// Params removing `fraction` of the faces.
    #[must_use]
    pub fn with_reduction(mut self, fraction: f64) -> Self {
        self.target = TargetSpec::ReductionFraction(fraction);
        self
    }

    #[must_use]
    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_texture_weight(mut self, weight: f64) -> Self {
        self.texture_weight = weight;
        self
    }

    #[must_use]
    pub fn with_preserve_boundary(mut self, preserve: bool) -> Self {
        self.preserve_boundary = preserve;
        self
    }

    #[must_use]
    pub fn with_boundary_weight(mut self, weight: f64) -> Self {
        self.boundary_weight = weight;
        self
    }

    #[must_use]
    pub fn with_optimal_position(mut self, optimal: bool) -> Self {
        self.optimal_position = optimal;
        self
    }

    #[must_use]
    pub fn with_preserve_normal(mut self, preserve: bool) -> Self {
        self.preserve_normal = preserve;
        self
    }

    #[must_use]
    pub fn with_normal_threshold(mut self, degrees: f64) -> Self {
        self.normal_threshold_deg = degrees;
        self
    }

    #[must_use]
    pub fn with_planar_simplification(mut self, planar: bool) -> Self {
        self.planar_simplification = planar;
        self
    }

    #[must_use]
    pub fn with_pre_clean(mut self, pre_clean: bool) -> Self {
        self.pre_clean = pre_clean;
        self
    }

    #[must_use]
    pub fn with_flip_iterations(mut self, iterations: usize) -> Self {
        self.flip_iterations = iterations;
        self
    }

    /// Reject out-of-range or contradictory values.
    pub fn validate(&self) -> Result<()> {
        match self.target {
            TargetSpec::FaceCount(0) => {
                return Err(Error::InvalidParameters(
                    "Target face count must be at least 1".to_string(),
                ));
            }
            TargetSpec::ReductionFraction(f) if !(f > 0.0 && f < 1.0) => {
                return Err(Error::InvalidParameters(format!(
                    "Reduction fraction must be in (0, 1), got {}",
                    f
                )));
            }
            _ => {}
        }

        if !(self.quality_threshold > 0.0 && self.quality_threshold <= 1.0) {
            return Err(Error::InvalidParameters(format!(
                "Quality threshold must be in (0, 1], got {}",
                self.quality_threshold
            )));
        }
        check_non_negative("Texture weight", self.texture_weight)?;
        check_non_negative("Boundary weight", self.boundary_weight)?;
        check_non_negative("Merge threshold ratio", self.merge_threshold_ratio)?;

        if !(self.normal_threshold_deg > 0.0 && self.normal_threshold_deg <= 180.0) {
            return Err(Error::InvalidParameters(format!(
                "Normal threshold must be in (0, 180] degrees, got {}",
                self.normal_threshold_deg
            )));
        }
        if !(0.0..=180.0).contains(&self.planar_threshold_deg) {
            return Err(Error::InvalidParameters(format!(
                "Planar threshold must be in [0, 180] degrees, got {}",
                self.planar_threshold_deg
            )));
        }
        Ok(())
    }

    /// Target face count for a mesh that currently has `face_count` live faces.
    ///
    /// Fractions truncate toward zero. Only derived targets are clamped to
    /// [`MIN_TARGET_FACES`]; an explicit count is honoured as given.
    pub fn target_faces(&self, face_count: usize) -> usize {
        match self.target {
            TargetSpec::FaceCount(n) => n,
            TargetSpec::ReductionFraction(f) => {
                ((face_count as f64 * (1.0 - f)) as usize).max(MIN_TARGET_FACES)
            }
            TargetSpec::Default => DEFAULT_TARGET_FACES.max(MIN_TARGET_FACES),
        }
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameters(format!(
            "{} must be a finite non-negative number, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = DecimationParams::default();
        assert_eq!(params.target, TargetSpec::Default);
        assert!((params.quality_threshold - 0.5).abs() < 1e-12);
        assert!(params.preserve_boundary);
        assert!(params.pre_clean);
        assert_eq!(params.flip_iterations, 2);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let params = DecimationParams::new()
            .with_target_faces(20)
            .with_preserve_boundary(false)
            .with_texture_weight(0.0)
            .with_flip_iterations(0);
        assert_eq!(params.target, TargetSpec::FaceCount(20));
        assert!(!params.preserve_boundary);
        assert_eq!(params.texture_weight, 0.0);
        assert_eq!(params.flip_iterations, 0);
    }

    #[test]
    fn test_target_from_fraction_truncates() {
        let params = DecimationParams::new().with_reduction(0.75);
        assert_eq!(params.target_faces(1000), 250);
        // 0.5 * 7 = 3.5 truncates to 3, then the floor lifts it to 4
        assert_eq!(DecimationParams::new().with_reduction(0.5).target_faces(7), 4);
        assert_eq!(DecimationParams::new().with_reduction(0.3).target_faces(15), 10);
    }

    #[test]
    fn test_explicit_target_is_not_floored() {
        let params = DecimationParams::new().with_target_faces(2);
        assert_eq!(params.target_faces(8), 2);
    }

    #[test]
    fn test_default_target() {
        assert_eq!(DecimationParams::new().target_faces(5000), DEFAULT_TARGET_FACES);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(DecimationParams::new().with_target_faces(0).validate().is_err());
        assert!(DecimationParams::new().with_reduction(1.5).validate().is_err());
        assert!(DecimationParams::new().with_reduction(-0.1).validate().is_err());
        assert!(DecimationParams::new().with_reduction(f64::NAN).validate().is_err());
        assert!(DecimationParams::new().with_reduction(0.0).validate().is_err());
        assert!(DecimationParams::new().with_reduction(1.0).validate().is_err());
        assert!(DecimationParams::new().with_reduction(0.999).validate().is_ok());
        assert!(DecimationParams::new().with_quality_threshold(0.0).validate().is_err());
        assert!(DecimationParams::new().with_texture_weight(-1.0).validate().is_err());
        assert!(DecimationParams::new().with_boundary_weight(f64::INFINITY).validate().is_err());
        assert!(DecimationParams::new().with_normal_threshold(0.0).validate().is_err());

        let err = DecimationParams::new().with_target_faces(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
    }
}
