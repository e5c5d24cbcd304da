//! Adapter for node-graph hosts
//!
//! Hosts hand over a mesh together with attributes the decimator does not
//! understand (device placement, normalisation transform, material maps) and
//! pass options as strings, booleans included. This module converts the
//! options, runs a session on the geometry and copies the attributes onto the
//! result as a separate step.

use decicrate_core::{Error, Point3f, Result, TriangleMesh};
use decicrate_simplification::{decimate, DecimationParams, DecimationReport};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A material map carried through decimation untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureMap {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<f32>,
}

/// Host-side attributes that do not take part in decimation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostAttributes {
    pub device: Option<String>,
    /// Centre the host subtracted when normalising the mesh
    pub center: Option<Point3f>,
    /// Scale the host applied when normalising the mesh
    pub scale: Option<f32>,
    pub albedo: Option<TextureMap>,
    pub metallic_roughness: Option<TextureMap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMesh {
    pub mesh: TriangleMesh,
    pub attributes: HostAttributes,
}

/// Node inputs as the host delivers them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostInputs {
    /// `"target_faces"` or `"percentage_reduction"`
    pub simplify_method: String,
    pub target_faces: usize,
    pub percentage_reduction: f64,
    pub quality_threshold: f64,
    pub texture_weight: f64,
    pub preserve_boundary: String,
    pub boundary_weight: f64,
    pub optimal_position: String,
    pub preserve_normal: String,
    pub planar_simplification: String,
    pub pre_clean: String,
}

impl Default for HostInputs {
    fn default() -> Self {
        Self {
            simplify_method: "target_faces".to_string(),
            target_faces: 1000,
            percentage_reduction: 0.75,
            quality_threshold: 0.5,
            texture_weight: 1.0,
            preserve_boundary: "True".to_string(),
            boundary_weight: 1.0,
            optimal_position: "True".to_string(),
            preserve_normal: "True".to_string(),
            planar_simplification: "True".to_string(),
            pre_clean: "True".to_string(),
        }
    }
}

impl HostInputs {
    /// Convert to typed parameters. Only the option selected by
    /// `simplify_method` is used as the target.
    pub fn to_params(&self) -> Result<DecimationParams> {
        let params = DecimationParams::new();
        let params = match self.simplify_method.as_str() {
            "target_faces" => params.with_target_faces(self.target_faces),
            "percentage_reduction" => params.with_reduction(self.percentage_reduction),
            other => {
                return Err(Error::InvalidParameters(format!(
                    "Unknown simplify method '{}'",
                    other
                )))
            }
        };
        let params = params
            .with_quality_threshold(self.quality_threshold)
            .with_texture_weight(self.texture_weight)
            .with_preserve_boundary(parse_host_bool(&self.preserve_boundary)?)
            .with_boundary_weight(self.boundary_weight)
            .with_optimal_position(parse_host_bool(&self.optimal_position)?)
            .with_preserve_normal(parse_host_bool(&self.preserve_normal)?)
            .with_planar_simplification(parse_host_bool(&self.planar_simplification)?)
            .with_pre_clean(parse_host_bool(&self.pre_clean)?);
        params.validate()?;
        Ok(params)
    }
}

/// Parse a host boolean, `"True"` or `"False"`.
pub fn parse_host_bool(value: &str) -> Result<bool> {
    match value {
        "True" => Ok(true),
        "False" => Ok(false),
        other => Err(Error::InvalidParameters(format!(
            "Expected \"True\" or \"False\", got '{}'",
            other
        ))),
    }
}

/// Decimate the geometry of a host mesh and reattach its attributes.
pub fn simplify_host_mesh(
    source: &HostMesh,
    params: &DecimationParams,
) -> Result<(HostMesh, DecimationReport)> {
    let outcome = decimate(&source.mesh, params)?;
    let simplified = reattach_attributes(source, outcome.mesh);
    Ok((simplified, outcome.report))
}

/// Copy the attributes of `source` onto a decimated mesh and recompute its
/// vertex normals.
pub fn reattach_attributes(source: &HostMesh, mut mesh: TriangleMesh) -> HostMesh {
    mesh.compute_vertex_normals();

    let attributes = source.attributes.clone();
    if attributes.albedo.is_some() {
        info!("Transferred albedo texture from original mesh");
    }
    if attributes.metallic_roughness.is_some() {
        info!("Transferred metallic-roughness map from original mesh");
    }
    HostMesh { mesh, attributes }
}
