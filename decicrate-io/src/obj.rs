//! OBJ format support
//!
//! Statements are parsed by the `obj` crate; this module turns the parsed
//! polygons into a [`TriangleMesh`]. Face corners may take any of the forms
//! `v`, `v/vt`, `v//vn` and `v/vt/vn`, negative indices count back from the
//! elements read so far, and polygons with more than three corners are
//! fan-triangulated. Grouping, smoothing and material statements are skipped.

use crate::{MeshReader, MeshWriter, ObjError};
use ::obj::{IndexTuple, ObjData};
use decicrate_core::{Error, Point3f, Result, TexCoord, TriangleMesh, Vector3f};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

pub struct ObjReader;
pub struct ObjWriter;

impl ObjReader {
    /// Parse OBJ text from any buffered reader
    pub fn read_from<R: BufRead>(reader: R) -> Result<TriangleMesh> {
        let text = read_text(reader)?;
        let data = ObjData::load_buf(text.as_bytes()).map_err(ObjError::from)?;
        Ok(build_mesh(&text, &data)?)
    }
}

/// Read the whole input, rejecting lines that are not valid UTF-8.
fn read_text<R: BufRead>(mut reader: R) -> Result<String> {
    let mut text = String::new();
    let mut buf = Vec::new();
    let mut line = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line += 1;
        let chunk = std::str::from_utf8(&buf).map_err(|_| ObjError::InvalidEncoding { line })?;
        text.push_str(chunk);
    }
    Ok(text)
}

/// 1-based line of the `n`-th statement starting with `keyword`, or 0 if
/// there is no such statement.
fn statement_line(text: &str, keyword: &str, n: usize) -> usize {
    text.lines()
        .enumerate()
        .filter(|(_, l)| l.split_whitespace().next() == Some(keyword))
        .nth(n)
        .map_or(0, |(i, _)| i + 1)
}

fn check_finite<const N: usize>(
    text: &str,
    keyword: &str,
    values: &[[f32; N]],
) -> std::result::Result<(), ObjError> {
    match values.iter().position(|v| v.iter().any(|x| !x.is_finite())) {
        Some(i) => Err(ObjError::InvalidNumber {
            line: statement_line(text, keyword, i),
            keyword: keyword.to_string(),
            token: format!("{:?}", values[i]),
        }),
        None => Ok(()),
    }
}

fn check_index(
    line: usize,
    kind: &'static str,
    index: usize,
    count: usize,
) -> std::result::Result<usize, ObjError> {
    if index < count {
        Ok(index)
    } else {
        Err(ObjError::IndexOutOfRange {
            line,
            kind,
            index: index as i64 + 1,
            count,
        })
    }
}

fn build_mesh(text: &str, data: &ObjData) -> std::result::Result<TriangleMesh, ObjError> {
    check_finite(text, "v", &data.position)?;
    check_finite(text, "vt", &data.texture)?;
    check_finite(text, "vn", &data.normal)?;

    let vertex_count = data.position.len();
    let mut faces: Vec<[usize; 3]> = Vec::new();
    let mut face_tex: Vec<[usize; 3]> = Vec::new();
    let mut corner_normals: Vec<(usize, usize)> = Vec::new();
    // Decided by the first face: either every face has texture indices or none does
    let mut textured: Option<bool> = None;

    let polygons = data
        .objects
        .iter()
        .flat_map(|object| object.groups.iter())
        .flat_map(|group| group.polys.iter());

    for (face_no, poly) in polygons.enumerate() {
        let corners: &[IndexTuple] = &poly.0;
        let line = statement_line(text, "f", face_no);
        if corners.len() < 3 {
            return Err(ObjError::MissingValues {
                line,
                keyword: "f".to_string(),
                expected: 3,
                found: corners.len(),
            });
        }

        let mut vertices = Vec::with_capacity(corners.len());
        let mut tex = Vec::with_capacity(corners.len());
        for &IndexTuple(v, t, n) in corners {
            vertices.push(check_index(line, "vertex", v, vertex_count)?);
            tex.push(match t {
                Some(t) => Some(check_index(line, "texture", t, data.texture.len())?),
                None => None,
            });
            if let Some(n) = n {
                corner_normals.push((v, check_index(line, "normal", n, data.normal.len())?));
            }
        }

        let has_tex = tex[0].is_some();
        if tex.iter().any(|t| t.is_some() != has_tex) {
            return Err(ObjError::InconsistentAttributes {
                line,
                message: "face mixes corners with and without texture coordinates".to_string(),
            });
        }
        match textured {
            None => textured = Some(has_tex),
            Some(expected) if expected != has_tex => {
                return Err(ObjError::InconsistentAttributes {
                    line,
                    message: "texture coordinates present on some faces but not others"
                        .to_string(),
                });
            }
            Some(_) => {}
        }

        // Fan triangulation around the first corner
        for i in 1..vertices.len() - 1 {
            faces.push([vertices[0], vertices[i], vertices[i + 1]]);
            if let (Some(t0), Some(t1), Some(t2)) = (tex[0], tex[i], tex[i + 1]) {
                face_tex.push([t0, t1, t2]);
            }
        }
    }

    let positions: Vec<Point3f> = data
        .position
        .iter()
        .map(|p| Point3f::new(p[0], p[1], p[2]))
        .collect();
    let normal_pool: Vec<Vector3f> = data
        .normal
        .iter()
        .map(|n| Vector3f::new(n[0], n[1], n[2]))
        .collect();
    let mut mesh = TriangleMesh::from_vertices_and_faces(positions, faces);

    if !corner_normals.is_empty() {
        // First corner that mentions a vertex decides its normal
        let mut normals: Vec<Option<Vector3f>> = vec![None; vertex_count];
        for (v, n) in corner_normals {
            if normals[v].is_none() {
                normals[v] = Some(normal_pool[n]);
            }
        }
        if normals.iter().all(Option::is_some) {
            mesh.set_normals(normals.into_iter().flatten().collect());
        } else {
            debug!("Dropping normals: not every vertex is referenced with a normal");
        }
    } else if !normal_pool.is_empty() && normal_pool.len() == vertex_count {
        mesh.set_normals(normal_pool);
    }

    if textured == Some(true) {
        let tex_coords: Vec<TexCoord> = data.texture.clone();
        mesh.set_texture(tex_coords, face_tex);
    }

    debug!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        textured = mesh.has_texture(),
        objects = data.objects.len(),
        "Parsed OBJ"
    );

    Ok(mesh)
}

impl ObjWriter {
    /// Write a mesh as OBJ text. Indices are written 1-based.
    pub fn write_to<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<()> {
        mesh.validate()?;

        let texture = match (&mesh.tex_coords, &mesh.face_tex) {
            (Some(coords), Some(indices)) => {
                if let Some(bad) = indices.iter().flatten().find(|&&t| t >= coords.len()) {
                    return Err(Error::InvalidData(format!(
                        "Texture index {} out of range ({} texture coordinates)",
                        bad,
                        coords.len()
                    )));
                }
                Some((coords, indices))
            }
            _ => None,
        };

        writeln!(writer, "# decicrate OBJ export")?;
        writeln!(writer, "# Vertices: {}", mesh.vertex_count())?;
        writeln!(writer, "# Faces: {}", mesh.face_count())?;

        for v in &mesh.vertices {
            writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
        }

        if let Some((coords, _)) = texture {
            for tc in coords {
                writeln!(writer, "vt {} {}", tc[0], tc[1])?;
            }
        }

        let has_normals = mesh.normals.is_some();
        if let Some(ref normals) = mesh.normals {
            for n in normals {
                writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
            }
        }

        for (fi, face) in mesh.faces.iter().enumerate() {
            write!(writer, "f")?;
            for k in 0..3 {
                let v = face[k] + 1;
                match (texture.map(|(_, indices)| indices[fi][k] + 1), has_normals) {
                    (Some(t), true) => write!(writer, " {}/{}/{}", v, t, v)?,
                    (Some(t), false) => write!(writer, " {}/{}", v, t)?,
                    (None, true) => write!(writer, " {}//{}", v, v)?,
                    (None, false) => write!(writer, " {}", v)?,
                }
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(mesh, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
