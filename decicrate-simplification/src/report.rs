//! Session statistics

use crate::cleanup::CleanReport;
use std::fmt;
use std::time::Duration;

/// Counts and flags describing one decimation session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecimationReport {
    pub original_faces: usize,
    pub original_vertices: usize,
    /// Live faces after cleanup, the count the target is derived from
    pub cleaned_faces: usize,
    pub target_faces: usize,
    pub final_faces: usize,
    pub final_vertices: usize,
    pub collapses_performed: usize,
    /// Candidates popped but failing a validity check
    pub collapses_rejected: usize,
    /// Candidates discarded because an endpoint changed after insertion
    pub stale_candidates: usize,
    pub flips: usize,
    /// Name of the strategy that produced the output
    pub strategy: &'static str,
    /// Texture-aware quadrics failed and the geometry-only strategy was used
    pub fallback_used: bool,
    /// The queue ran dry before the target was reached
    pub underfilled: bool,
    pub had_texture: bool,
    pub clean: Option<CleanReport>,
    /// Wall-clock time of the whole session
    pub elapsed: Duration,
}

impl DecimationReport {
    /// Fraction of the original faces removed
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_faces == 0 {
            return 0.0;
        }
        1.0 - self.final_faces as f64 / self.original_faces as f64
    }

    pub fn reduction_percent(&self) -> f64 {
        self.reduction_ratio() * 100.0
    }

    pub fn was_decimated(&self) -> bool {
        self.collapses_performed > 0
    }
}

impl fmt::Display for DecimationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Decimated {} -> {} faces ({} -> {} vertices, {:.1}% reduction, target {})",
            self.original_faces,
            self.final_faces,
            self.original_vertices,
            self.final_vertices,
            self.reduction_percent(),
            self.target_faces
        )?;
        if let Some(clean) = &self.clean {
            writeln!(f, "  cleanup: {}", clean)?;
        }
        writeln!(
            f,
            "  collapses: {} performed, {} rejected, {} stale; {} edge flips",
            self.collapses_performed, self.collapses_rejected, self.stale_candidates, self.flips
        )?;
        write!(
            f,
            "  strategy: {}{}",
            self.strategy,
            if self.had_texture { ", texture coordinates present" } else { "" }
        )?;
        if self.fallback_used {
            write!(f, " (fell back to geometry-only quadrics)")?;
        }
        if self.underfilled {
            write!(f, "\n  target not reached: no valid collapses left")?;
        }
        write!(f, "\n  completed in {:.3} seconds", self.elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reduction_ratio() {
        let report = DecimationReport {
            original_faces: 200,
            final_faces: 50,
            ..Default::default()
        };
        assert_relative_eq!(report.reduction_ratio(), 0.75);
        assert_relative_eq!(report.reduction_percent(), 75.0);
        assert_eq!(DecimationReport::default().reduction_ratio(), 0.0);
    }

    #[test]
    fn test_display_mentions_flags() {
        let report = DecimationReport {
            original_faces: 8,
            final_faces: 2,
            target_faces: 2,
            strategy: "geometry",
            fallback_used: true,
            underfilled: true,
            clean: Some(CleanReport::default()),
            elapsed: Duration::from_millis(1500),
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.contains("8 -> 2 faces"));
        assert!(text.contains("cleanup: no issues found"));
        assert!(text.contains("fell back"));
        assert!(text.contains("target not reached"));
        assert!(text.contains("completed in 1.500 seconds"));
    }
}
