//! Parameter file loading

use anyhow::{Context, Result};
use decicrate::simplification::DecimationParams;
use std::path::Path;

/// Read decimation parameters from a TOML file. Missing keys take their
/// default values.
///
/// ```toml
/// quality_threshold = 0.3
/// flip_iterations = 4
///
/// [target]
/// reduction_fraction = 0.75
/// ```
pub fn load_params(path: &Path) -> Result<DecimationParams> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_params(&text).with_context(|| format!("Invalid config file {}", path.display()))
}

pub fn parse_params(text: &str) -> Result<DecimationParams> {
    let params: DecimationParams = toml::from_str(text)?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use decicrate::simplification::TargetSpec;
    use std::io::Write;

    #[test]
    fn test_parse_partial_config() {
        let params = parse_params(
            r#"
            quality_threshold = 0.3
            preserve_normal = false

            [target]
            face_count = 250
            "#,
        )
        .unwrap();
        assert_eq!(params.target, TargetSpec::FaceCount(250));
        assert_eq!(params.quality_threshold, 0.3);
        assert!(!params.preserve_normal);
        assert!(params.preserve_boundary);
        assert_eq!(params.flip_iterations, 2);
    }

    #[test]
    fn test_parse_reduction_target() {
        let params = parse_params("target = { reduction_fraction = 0.5 }").unwrap();
        assert_eq!(params.target, TargetSpec::ReductionFraction(0.5));
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_params("").unwrap(), DecimationParams::default());
    }

    #[test]
    fn test_rejects_wrong_types() {
        assert!(parse_params("pre_clean = \"yes\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "texture_weight = 0.0").unwrap();
        let params = load_params(file.path()).unwrap();
        assert_eq!(params.texture_weight, 0.0);

        assert!(load_params(Path::new("/nonexistent/params.toml")).is_err());
    }
}
