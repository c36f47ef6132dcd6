//! OBJ models to [`MeshCollection`].
//!
//! Each sub-mesh of the file becomes one [`Mesh`]. Attributes the file does
//! not provide are filled in: white vertex colour, face normals, and a
//! tangent frame derived from positions and texture coordinates.

use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use log::{debug, info, warn};
use thiserror::Error;

use crate::render::{
    backend::GpuBackend,
    mesh::{Mesh, MeshError},
    mesh_collection::{MeshCollection, RejectedMesh},
    vertex::Vertex,
};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to load model {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("Model {0} contains no meshes")]
    Empty(PathBuf),
    #[error("Index {index} out of range in sub-mesh {name}")]
    IndexOutOfRange { name: String, index: u32 },
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

const WHITE: [f32; 4] = [1.0; 4];

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Parses `path` and appends one mesh per sub-mesh to `collection`.
///
/// On error the meshes already added stay in `collection`; the caller owns
/// their destruction.
pub fn load_mesh_from_file<P: AsRef<Path>>(
    path: P,
    backend: &mut impl GpuBackend,
    collection: &mut MeshCollection,
) -> Result<(), ModelError> {
    let path = path.as_ref();
    let (models, _materials) =
        tobj::load_obj(path, &load_options()).map_err(|source| ModelError::Load {
            path: path.to_path_buf(),
            source,
        })?;

    let added = add_models(&models, backend, collection)?;
    if added == 0 {
        return Err(ModelError::Empty(path.to_path_buf()));
    }

    info!("Loaded model {} ({} meshes)", path.display(), added);

    Ok(())
}

/// Same as [`load_mesh_from_file`] for an OBJ document already in memory.
/// Material libraries are not resolved.
#[cfg(test)]
pub fn load_mesh_from_reader(
    reader: &mut impl std::io::BufRead,
    backend: &mut impl GpuBackend,
    collection: &mut MeshCollection,
) -> Result<(), ModelError> {
    let path = PathBuf::from("<memory>");
    let (models, _materials) =
        tobj::load_obj_buf(reader, &load_options(), |_| Err(tobj::LoadError::OpenFileFailed))
            .map_err(|source| ModelError::Load {
                path: path.clone(),
                source,
            })?;

    if add_models(&models, backend, collection)? == 0 {
        return Err(ModelError::Empty(path));
    }

    Ok(())
}

fn add_models(
    models: &[tobj::Model],
    backend: &mut impl GpuBackend,
    collection: &mut MeshCollection,
) -> Result<usize, ModelError> {
    let mut added = 0;

    for model in models {
        if model.mesh.indices.is_empty() {
            warn!("Skipping empty sub-mesh {}", model.name);
            continue;
        }

        let vertices = build_vertices(&model.name, &model.mesh)?;
        let mesh = Mesh::from_slices(backend, &vertices, &model.mesh.indices)?;
        debug!(
            "Sub-mesh {}: {} vertices, {} triangles",
            model.name,
            mesh.vertex_count(),
            mesh.index_count() / 3
        );

        if let Err(RejectedMesh { reason, mut mesh }) = collection.add_mesh(mesh) {
            mesh.destroy(backend);
            return Err(reason.into());
        }
        added += 1;
    }

    Ok(added)
}

fn build_vertices(name: &str, mesh: &tobj::Mesh) -> Result<Vec<Vertex>, ModelError> {
    let vertex_count = mesh.positions.len() / 3;

    if let Some(&index) = mesh
        .indices
        .iter()
        .find(|&&index| index as usize >= vertex_count)
    {
        return Err(ModelError::IndexOutOfRange {
            name: name.to_string(),
            index,
        });
    }

    let mut vertices: Vec<Vertex> = (0..vertex_count)
        .map(|i| {
            let position = Vec3::from_slice(&mesh.positions[i * 3..i * 3 + 3]);

            // OBJ texture origin is bottom-left
            let tex_coord = mesh
                .texcoords
                .get(i * 2..i * 2 + 2)
                .map(|uv| Vec2::new(uv[0], 1.0 - uv[1]))
                .unwrap_or(Vec2::ZERO);

            let normal = mesh
                .normals
                .get(i * 3..i * 3 + 3)
                .map(Vec3::from_slice)
                .unwrap_or(Vec3::ZERO);

            let color = mesh
                .vertex_color
                .get(i * 3..i * 3 + 3)
                .map(|rgb| [rgb[0], rgb[1], rgb[2], 1.0])
                .unwrap_or(WHITE);

            Vertex::new(position, color, tex_coord, normal)
        })
        .collect();

    if mesh.normals.is_empty() {
        compute_normals(&mut vertices, &mesh.indices);
    }
    compute_tangent_space(&mut vertices, &mesh.indices);

    Ok(vertices)
}

/// Area weighted vertex normals from the triangle list.
pub fn compute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut normals = vec![Vec3::ZERO; vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let face_normal = (vertices[b].position - vertices[a].position)
            .cross(vertices[c].position - vertices[a].position);

        for i in [a, b, c] {
            normals[i] += face_normal;
        }
    }

    for (vertex, normal) in vertices.iter_mut().zip(normals) {
        vertex.normal = normal.normalize_or_zero();
    }
}

/// Per-vertex tangent and bitangent accumulated from each triangle's UV
/// gradients. Triangles with degenerate UVs contribute nothing.
pub fn compute_tangent_space(vertices: &mut [Vertex], indices: &[u32]) {
    let mut tangents = vec![Vec3::ZERO; vertices.len()];
    let mut bitangents = vec![Vec3::ZERO; vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);

        let edge1 = vertices[b].position - vertices[a].position;
        let edge2 = vertices[c].position - vertices[a].position;
        let delta_uv1 = vertices[b].tex_coord - vertices[a].tex_coord;
        let delta_uv2 = vertices[c].tex_coord - vertices[a].tex_coord;

        let determinant = delta_uv1.x * delta_uv2.y - delta_uv2.x * delta_uv1.y;
        if determinant.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / determinant;

        let tangent = (edge1 * delta_uv2.y - edge2 * delta_uv1.y) * r;
        let bitangent = (edge2 * delta_uv1.x - edge1 * delta_uv2.x) * r;

        for i in [a, b, c] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
        }
    }

    for ((vertex, tangent), bitangent) in vertices.iter_mut().zip(tangents).zip(bitangents) {
        vertex.tangent = tangent.normalize_or_zero();
        vertex.bitangent = bitangent.normalize_or_zero();
    }
}
