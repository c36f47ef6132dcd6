use log::debug;
use thiserror::Error;

use super::{
    backend::GpuBackend,
    mesh::{Mesh, MeshError},
};

/// A mesh [`MeshCollection::add_mesh`] refused, handed back so its handles
/// can still be destroyed.
#[derive(Error, Debug)]
#[error("Mesh rejected by collection: {reason}")]
pub struct RejectedMesh {
    pub reason: MeshError,
    pub mesh: Mesh,
}

/// Ordered owner of the meshes that make up one model.
///
/// Insertion order is draw order.
#[derive(Debug, Default)]
pub struct MeshCollection {
    meshes: Vec<Mesh>,
}

impl MeshCollection {
    pub fn new() -> MeshCollection {
        Default::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> Result<(), RejectedMesh> {
        if !mesh.is_initialized() {
            return Err(RejectedMesh {
                reason: MeshError::NotInitialized,
                mesh,
            });
        }

        self.meshes.push(mesh);
        Ok(())
    }

    /// Renders every mesh in order, stopping at the first failure.
    pub fn render(&self, backend: &mut impl GpuBackend) -> Result<(), MeshError> {
        for mesh in &self.meshes {
            mesh.render(backend)?;
        }

        Ok(())
    }

    pub fn destroy(&mut self, backend: &mut impl GpuBackend) {
        if self.is_empty() {
            return;
        }

        debug!("Destroying {} meshes", self.meshes.len());

        for mut mesh in self.meshes.drain(..) {
            mesh.destroy(backend);
        }
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mesh> {
        self.meshes.iter()
    }

    pub fn index_count(&self) -> u64 {
        self.iter().map(|mesh| mesh.index_count() as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::render::{recording_backend::RecordingBackend, vertex::Vertex};

    fn triangle_mesh(backend: &mut RecordingBackend, triangles: u32) -> Mesh {
        let vertices: Vec<Vertex> = (0..3)
            .map(|i| Vertex::new(Vec3::new(i as f32, 0.0, 0.0), [1.0; 4], Vec2::ZERO, Vec3::Y))
            .collect();
        let indices: Vec<u32> = (0..triangles).flat_map(|_| [0, 1, 2]).collect();

        Mesh::from_slices(backend, &vertices, &indices).unwrap()
    }

    #[test]
    fn renders_in_insertion_order() {
        let mut backend = RecordingBackend::new();
        let mut collection = MeshCollection::new();

        let first = triangle_mesh(&mut backend, 1);
        let second = triangle_mesh(&mut backend, 4);
        let (first_array, second_array) =
            (first.vertex_array().unwrap(), second.vertex_array().unwrap());

        collection.add_mesh(first).unwrap();
        collection.add_mesh(second).unwrap();

        backend.clear_calls();
        collection.render(&mut backend).unwrap();

        assert_eq!(backend.draws(), vec![(first_array, 3), (second_array, 12)]);
        assert_eq!(collection.index_count(), 15);

        collection.destroy(&mut backend);
    }

    #[test]
    fn destroy_releases_each_mesh_once() {
        let mut backend = RecordingBackend::new();
        let mut collection = MeshCollection::new();
        let mut arrays = Vec::new();

        for _ in 0..3 {
            let mesh = triangle_mesh(&mut backend, 1);
            arrays.push(mesh.vertex_array().unwrap());
            collection.add_mesh(mesh).unwrap();
        }

        collection.destroy(&mut backend);
        collection.destroy(&mut backend);

        assert!(collection.is_empty());
        for array in arrays {
            assert_eq!(backend.deletions_of(array), 1);
        }
        assert_eq!(backend.live_resources(), 0);
        assert_eq!(backend.invalid_deletes(), 0);
    }

    #[test]
    fn empty_collection_draws_nothing() {
        let mut backend = RecordingBackend::new();
        let mut collection = MeshCollection::new();

        collection.render(&mut backend).unwrap();
        collection.destroy(&mut backend);

        assert!(backend.calls().is_empty());
        assert_eq!(collection.len(), 0);
    }

    #[test]
    fn rejects_uninitialized_mesh() {
        let mut collection = MeshCollection::new();

        let rejected = collection.add_mesh(Mesh::new()).unwrap_err();
        assert_eq!(rejected.reason, MeshError::NotInitialized);
        assert!(collection.is_empty());
    }

    #[test]
    fn rejected_partial_mesh_can_still_be_destroyed() {
        let mut backend = RecordingBackend::new();
        let mut collection = MeshCollection::new();

        backend.fail_allocations_after(2);
        let mut mesh = Mesh::new();
        assert!(mesh.init(&mut backend).is_err());

        let RejectedMesh { reason, mut mesh } = collection.add_mesh(mesh).unwrap_err();
        assert_eq!(reason, MeshError::NotInitialized);
        assert_eq!(backend.live_resources(), 2);

        mesh.destroy(&mut backend);
        collection.destroy(&mut backend);

        assert_eq!(backend.live_resources(), 0);
        assert_eq!(backend.invalid_deletes(), 0);
    }

    #[test]
    fn render_stops_at_first_failing_mesh() {
        let mut backend = RecordingBackend::new();
        let mut collection = MeshCollection::new();

        let mut pending = Mesh::new();
        pending.init(&mut backend).unwrap();

        collection.add_mesh(triangle_mesh(&mut backend, 1)).unwrap();
        collection.add_mesh(pending).unwrap();
        collection.add_mesh(triangle_mesh(&mut backend, 2)).unwrap();

        backend.clear_calls();
        assert_eq!(collection.render(&mut backend), Err(MeshError::NotUploaded));
        assert_eq!(backend.draws().len(), 1);

        collection.destroy(&mut backend);
        assert_eq!(backend.live_resources(), 0);
    }
}
