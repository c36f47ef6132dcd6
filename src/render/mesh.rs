use bytemuck::cast_slice;
use log::{debug, warn};
use thiserror::Error;

use super::{
    backend::{BufferHandle, BufferKind, GpuBackend, ResourceError, VertexArrayHandle},
    vertex::Vertex,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("Mesh has not been initialized")]
    NotInitialized,
    #[error("Mesh is already initialized")]
    AlreadyInitialized,
    #[error("Mesh has no uploaded buffer data")]
    NotUploaded,
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// One GPU resident drawable: a vertex array plus its vertex and index buffers.
///
/// Lifecycle is `init` -> `copy_buffer_data` -> `render`* -> `destroy`.
/// `destroy` is valid in every state and may be repeated.
#[derive(Debug, Default)]
pub struct Mesh {
    vertex_array: Option<VertexArrayHandle>,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    vertex_count: u32,
    index_count: u32,
    uploaded: bool,
}

impl Mesh {
    pub fn new() -> Mesh {
        Default::default()
    }

    /// Creates, initializes and fills a mesh in one go.
    pub fn from_slices(
        backend: &mut impl GpuBackend,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<Mesh, MeshError> {
        let mut mesh = Mesh::new();

        let result = match mesh.init(backend) {
            Ok(()) => mesh.copy_buffer_data(backend, vertices, indices),
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => Ok(mesh),
            Err(err) => {
                mesh.destroy(backend);
                Err(err)
            }
        }
    }

    /// Acquires the vertex array first, then the vertex and index buffers.
    pub fn init(&mut self, backend: &mut impl GpuBackend) -> Result<(), MeshError> {
        if self.holds_resources() {
            return Err(MeshError::AlreadyInitialized);
        }

        self.vertex_array = Some(backend.create_vertex_array()?);
        self.vertex_buffer = Some(backend.create_buffer(BufferKind::Vertex)?);
        self.index_buffer = Some(backend.create_buffer(BufferKind::Index)?);

        Ok(())
    }

    /// Replaces the buffer contents and redeclares the vertex layout.
    ///
    /// A failed upload leaves the mesh in the not-uploaded state.
    pub fn copy_buffer_data(
        &mut self,
        backend: &mut impl GpuBackend,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<(), MeshError> {
        let (vertex_array, vertex_buffer, index_buffer) =
            self.handles().ok_or(MeshError::NotInitialized)?;

        let vertex_count = count_of(vertices.len(), BufferKind::Vertex)?;
        let index_count = count_of(indices.len(), BufferKind::Index)?;

        self.uploaded = false;

        backend.upload_buffer(vertex_buffer, BufferKind::Vertex, cast_slice(vertices))?;
        backend.upload_buffer(index_buffer, BufferKind::Index, cast_slice(indices))?;
        backend.check_error()?;

        self.vertex_count = vertex_count;
        self.index_count = index_count;

        backend.bind_vertex_layout(vertex_array, vertex_buffer, index_buffer, &Vertex::layout())?;
        self.uploaded = true;

        debug!(
            "Uploaded mesh {:?}: {} vertices, {} indices",
            vertex_array, vertex_count, index_count
        );

        Ok(())
    }

    pub fn render(&self, backend: &mut impl GpuBackend) -> Result<(), MeshError> {
        let vertex_array = self.vertex_array.ok_or(MeshError::NotInitialized)?;
        if !self.is_uploaded() {
            return Err(MeshError::NotUploaded);
        }

        backend.draw_indexed(vertex_array, self.index_count)?;

        Ok(())
    }

    pub fn destroy(&mut self, backend: &mut impl GpuBackend) {
        if let Some(vertex_array) = self.vertex_array.take() {
            backend.delete_vertex_array(vertex_array);
            debug!("Destroyed mesh {:?}", vertex_array);
        }
        if let Some(vertex_buffer) = self.vertex_buffer.take() {
            backend.delete_buffer(vertex_buffer);
        }
        if let Some(index_buffer) = self.index_buffer.take() {
            backend.delete_buffer(index_buffer);
        }

        self.vertex_count = 0;
        self.index_count = 0;
        self.uploaded = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.handles().is_some()
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    #[cfg(test)]
    pub fn vertex_array(&self) -> Option<VertexArrayHandle> {
        self.vertex_array
    }

    fn handles(&self) -> Option<(VertexArrayHandle, BufferHandle, BufferHandle)> {
        Some((self.vertex_array?, self.vertex_buffer?, self.index_buffer?))
    }

    fn holds_resources(&self) -> bool {
        self.vertex_array.is_some() || self.vertex_buffer.is_some() || self.index_buffer.is_some()
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        if self.holds_resources() {
            warn!(
                "Mesh {:?} dropped without destroy, its GPU buffers are leaked",
                self.vertex_array
            );
        }
    }
}

fn count_of(len: usize, kind: BufferKind) -> Result<u32, ResourceError> {
    u32::try_from(len).map_err(|_| ResourceError::UploadFailed {
        kind,
        message: format!("{len} elements do not fit a 32-bit count"),
    })
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::render::{
        recording_backend::{Call, RecordingBackend},
        vertex::VertexAttribute,
    };

    fn quad() -> (Vec<Vertex>, Vec<u32>) {
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let vertices = corners
            .iter()
            .map(|&(x, y)| Vertex::new(Vec3::new(x, y, 0.0), [1.0; 4], Vec2::new(x, y), Vec3::Z))
            .collect();

        (vertices, vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn init_acquires_array_before_buffers() {
        let mut backend = RecordingBackend::new();
        let mut mesh = Mesh::new();
        mesh.init(&mut backend).unwrap();

        assert!(matches!(backend.calls()[0], Call::CreateVertexArray(_)));
        assert!(matches!(backend.calls()[1], Call::CreateBuffer(_, BufferKind::Vertex)));
        assert!(matches!(backend.calls()[2], Call::CreateBuffer(_, BufferKind::Index)));
        assert!(mesh.is_initialized());
        assert!(!mesh.is_uploaded());

        mesh.destroy(&mut backend);
    }

    #[test]
    fn second_init_is_rejected() {
        let mut backend = RecordingBackend::new();
        let mut mesh = Mesh::new();
        mesh.init(&mut backend).unwrap();

        assert_eq!(mesh.init(&mut backend), Err(MeshError::AlreadyInitialized));
        assert_eq!(backend.live_resources(), 3);

        mesh.destroy(&mut backend);
    }

    #[test]
    fn render_draws_every_index() {
        let mut backend = RecordingBackend::new();
        let (vertices, indices) = quad();
        let mut mesh = Mesh::from_slices(&mut backend, &vertices, &indices).unwrap();

        backend.clear_calls();
        mesh.render(&mut backend).unwrap();

        assert_eq!(backend.draws(), vec![(mesh.vertex_array().unwrap(), 6)]);

        mesh.destroy(&mut backend);
    }

    #[test]
    fn upload_binds_fixed_attribute_layout() {
        let mut backend = RecordingBackend::new();
        let (vertices, indices) = quad();
        let mut mesh = Mesh::from_slices(&mut backend, &vertices, &indices).unwrap();

        let layout = backend.layout_of(mesh.vertex_array().unwrap()).unwrap();
        assert_eq!(layout.stride, 72);
        assert_eq!(layout.attribute(VertexAttribute::Position).offset, 0);
        assert_eq!(layout.attribute(VertexAttribute::Color).offset, 12);
        assert_eq!(layout.attribute(VertexAttribute::TexCoord).offset, 28);
        assert_eq!(layout.attribute(VertexAttribute::Normal).offset, 36);
        assert_eq!(layout.attribute(VertexAttribute::Tangent).offset, 48);
        assert_eq!(layout.attribute(VertexAttribute::Bitangent).offset, 60);

        assert!(backend.calls().contains(&Call::Upload {
            buffer: BufferHandle(2),
            kind: BufferKind::Vertex,
            bytes: 4 * 72,
        }));
        assert!(backend.calls().contains(&Call::Upload {
            buffer: BufferHandle(3),
            kind: BufferKind::Index,
            bytes: 6 * 4,
        }));

        mesh.destroy(&mut backend);
    }

    #[test]
    fn reupload_replaces_draw_count() {
        let mut backend = RecordingBackend::new();
        let (vertices, indices) = quad();
        let mut mesh = Mesh::from_slices(&mut backend, &vertices, &indices).unwrap();

        mesh.copy_buffer_data(&mut backend, &vertices[..3], &[0, 1, 2])
            .unwrap();

        let binds: Vec<&Call> = backend
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::BindLayout { .. }))
            .collect();
        assert_eq!(binds.len(), 2);
        assert_eq!(binds[0], binds[1]);
        assert_eq!(backend.layout_of(mesh.vertex_array().unwrap()), Some(&Vertex::layout()));

        backend.clear_calls();
        mesh.render(&mut backend).unwrap();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(backend.drawn_indices(), 3);

        mesh.destroy(&mut backend);
    }

    #[test]
    fn empty_upload_renders_zero_indices() {
        let mut backend = RecordingBackend::new();
        let mut mesh = Mesh::from_slices(&mut backend, &[], &[]).unwrap();

        mesh.render(&mut backend).unwrap();
        assert_eq!(backend.draws(), vec![(mesh.vertex_array().unwrap(), 0)]);

        mesh.destroy(&mut backend);
    }

    #[test]
    fn render_before_upload_fails_fast() {
        let mut backend = RecordingBackend::new();
        let mut mesh = Mesh::new();
        assert_eq!(mesh.render(&mut backend), Err(MeshError::NotInitialized));

        mesh.init(&mut backend).unwrap();
        assert_eq!(mesh.render(&mut backend), Err(MeshError::NotUploaded));
        assert!(backend.draws().is_empty());

        mesh.destroy(&mut backend);
    }

    #[test]
    fn copy_before_init_fails() {
        let mut backend = RecordingBackend::new();
        let (vertices, indices) = quad();
        let mut mesh = Mesh::new();

        assert_eq!(
            mesh.copy_buffer_data(&mut backend, &vertices, &indices),
            Err(MeshError::NotInitialized)
        );
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn device_error_after_upload_surfaces_as_resource_error() {
        let mut backend = RecordingBackend::new();
        let (vertices, indices) = quad();
        let mut mesh = Mesh::new();
        mesh.init(&mut backend).unwrap();
        backend.fail_uploads();

        let result = mesh.copy_buffer_data(&mut backend, &vertices, &indices);

        assert!(matches!(
            result,
            Err(MeshError::Resource(ResourceError::Device(_)))
        ));
        assert!(!mesh.is_uploaded());
        assert_eq!(mesh.render(&mut backend), Err(MeshError::NotUploaded));

        mesh.destroy(&mut backend);
    }

    #[test]
    fn failed_from_slices_releases_handles() {
        let mut backend = RecordingBackend::new();
        backend.fail_uploads();
        let (vertices, indices) = quad();

        assert!(Mesh::from_slices(&mut backend, &vertices, &indices).is_err());
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn partial_init_is_released_by_destroy() {
        let mut backend = RecordingBackend::new();
        backend.fail_allocations_after(2);
        let mut mesh = Mesh::new();

        assert_eq!(
            mesh.init(&mut backend),
            Err(MeshError::Resource(ResourceError::AllocationFailed("buffer")))
        );
        assert!(!mesh.is_initialized());
        assert_eq!(backend.live_resources(), 2);

        mesh.destroy(&mut backend);
        assert_eq!(backend.live_resources(), 0);
        assert_eq!(backend.invalid_deletes(), 0);
    }

    #[test]
    fn failed_allocation_in_from_slices_leaks_nothing() {
        let mut backend = RecordingBackend::new();
        backend.fail_allocations_after(1);
        let (vertices, indices) = quad();

        assert!(Mesh::from_slices(&mut backend, &vertices, &indices).is_err());
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn destroy_twice_is_a_no_op() {
        let mut backend = RecordingBackend::new();
        let (vertices, indices) = quad();
        let mut mesh = Mesh::from_slices(&mut backend, &vertices, &indices).unwrap();
        let vertex_array = mesh.vertex_array().unwrap();

        mesh.destroy(&mut backend);
        mesh.destroy(&mut backend);

        assert_eq!(backend.deletions_of(vertex_array), 1);
        assert_eq!(backend.invalid_deletes(), 0);
        assert_eq!(backend.live_resources(), 0);
        assert!(mesh.vertex_array().is_none());
        assert!(!mesh.is_initialized());
        assert_eq!(mesh.index_count(), 0);
    }

    #[test]
    fn destroy_on_fresh_mesh_is_safe() {
        let mut backend = RecordingBackend::new();
        let mut mesh = Mesh::new();
        mesh.destroy(&mut backend);

        assert!(backend.calls().is_empty());
    }
}
