//! Handle based GPU abstraction used by [`Mesh`](super::mesh::Mesh).
//!
//! Meshes never touch wgpu directly. They allocate, fill, bind and release
//! resources through [`GpuBackend`], which lets the same mesh code drive the
//! real device in the application and a capturing backend in tests.

use thiserror::Error;

use super::vertex::VertexLayout;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Failed to allocate {0}")]
    AllocationFailed(&'static str),
    #[error("Failed to upload {kind:?} buffer data: {message}")]
    UploadFailed { kind: BufferKind, message: String },
    #[error("Unknown vertex array handle {0:?}")]
    UnknownVertexArray(VertexArrayHandle),
    #[error("Unknown buffer handle {0:?}")]
    UnknownBuffer(BufferHandle),
    #[error("Vertex array {0:?} has no bound buffers")]
    UnboundVertexArray(VertexArrayHandle),
    #[error("Vertex layout does not match the bound pipeline")]
    LayoutMismatch,
    #[error("GPU reported an error: {0}")]
    Device(String),
}

pub type ResourceResult<T> = Result<T, ResourceError>;

/// Handle to the attribute layout and buffer bindings of one drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayHandle(pub(crate) u32);

/// Handle to a vertex or index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Graphics calls the mesh layer depends on.
///
/// All calls happen on the thread owning the rendering context; the trait is
/// used through `&mut` so a backend is never shared while a call is running.
pub trait GpuBackend {
    fn create_vertex_array(&mut self) -> ResourceResult<VertexArrayHandle>;

    fn create_buffer(&mut self, kind: BufferKind) -> ResourceResult<BufferHandle>;

    /// Replaces the whole content of `buffer` with `data` as static storage.
    fn upload_buffer(
        &mut self,
        buffer: BufferHandle,
        kind: BufferKind,
        data: &[u8],
    ) -> ResourceResult<()>;

    /// Records the buffers and attribute layout used when drawing `array`.
    fn bind_vertex_layout(
        &mut self,
        array: VertexArrayHandle,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> ResourceResult<()>;

    /// Issues an indexed triangle-list draw of `index_count` `u32` indices.
    fn draw_indexed(&mut self, array: VertexArrayHandle, index_count: u32) -> ResourceResult<()>;

    fn delete_vertex_array(&mut self, array: VertexArrayHandle);

    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Drains any error the device reported since the last check.
    fn check_error(&mut self) -> ResourceResult<()>;
}
