use std::collections::HashMap;

use log::warn;
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    Buffer, BufferUsages, Device, ErrorFilter, IndexFormat, Queue, RenderPass,
};

use super::{
    backend::{
        BufferHandle, BufferKind, GpuBackend, ResourceError, ResourceResult, VertexArrayHandle,
    },
    vertex::VertexLayout,
};

#[derive(Clone, Copy, Default)]
struct VertexArrayState {
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
}

/// Indexed draw recorded during the frame and replayed inside the render pass.
#[derive(Clone, Copy, Debug)]
pub struct DrawCommand {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: u32,
}

/// [`GpuBackend`] on top of a wgpu device.
///
/// wgpu buffers have a fixed size, so an upload replaces the buffer stored
/// under the handle. Draws are buffered because a wgpu render pass borrows
/// every resource it touches until it ends.
pub struct WgpuBackend {
    device: Device,
    queue: Queue,
    pipeline_layout: VertexLayout,

    vertex_arrays: HashMap<VertexArrayHandle, VertexArrayState>,
    buffers: HashMap<BufferHandle, Option<Buffer>>,
    next_id: u32,

    draw_commands: Vec<DrawCommand>,
    pending_error: Option<String>,
}

impl WgpuBackend {
    pub fn new(device: Device, queue: Queue, pipeline_layout: VertexLayout) -> WgpuBackend {
        WgpuBackend {
            device,
            queue,
            pipeline_layout,
            vertex_arrays: HashMap::new(),
            buffers: HashMap::new(),
            next_id: 1,
            draw_commands: Vec::new(),
            pending_error: None,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn take_draw_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.draw_commands)
    }

    /// Encodes `commands` into `pass`. The pipeline and bind groups must
    /// already be set.
    pub fn replay<'a>(&'a self, commands: &[DrawCommand], pass: &mut RenderPass<'a>) {
        for command in commands {
            let (Some(Some(vertex_buffer)), Some(Some(index_buffer))) = (
                self.buffers.get(&command.vertex_buffer),
                self.buffers.get(&command.index_buffer),
            ) else {
                warn!("Skipping draw of released buffers {:?}", command);
                continue;
            };

            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.set_index_buffer(index_buffer.slice(..), IndexFormat::Uint32);
            pass.draw_indexed(0..command.index_count, 0, 0..1);
        }
    }

    fn next_id(&mut self, what: &'static str) -> ResourceResult<u32> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or(ResourceError::AllocationFailed(what))?;
        Ok(id)
    }

    fn usage(kind: BufferKind) -> BufferUsages {
        match kind {
            BufferKind::Vertex => BufferUsages::VERTEX | BufferUsages::COPY_DST,
            BufferKind::Index => BufferUsages::INDEX | BufferUsages::COPY_DST,
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn create_vertex_array(&mut self) -> ResourceResult<VertexArrayHandle> {
        let handle = VertexArrayHandle(self.next_id("vertex array")?);
        self.vertex_arrays.insert(handle, VertexArrayState::default());
        Ok(handle)
    }

    fn create_buffer(&mut self, _kind: BufferKind) -> ResourceResult<BufferHandle> {
        let handle = BufferHandle(self.next_id("buffer")?);
        self.buffers.insert(handle, None);
        Ok(handle)
    }

    fn upload_buffer(
        &mut self,
        buffer: BufferHandle,
        kind: BufferKind,
        data: &[u8],
    ) -> ResourceResult<()> {
        let slot = self
            .buffers
            .get_mut(&buffer)
            .ok_or(ResourceError::UnknownBuffer(buffer))?;

        self.device.push_error_scope(ErrorFilter::OutOfMemory);
        self.device.push_error_scope(ErrorFilter::Validation);

        let new_buffer = self.device.create_buffer_init(&BufferInitDescriptor {
            label: None,
            contents: data,
            usage: Self::usage(kind),
        });

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        if let Some(err) = validation.or(out_of_memory) {
            self.pending_error = Some(err.to_string());
        }

        if let Some(old_buffer) = slot.replace(new_buffer) {
            old_buffer.destroy();
        }

        Ok(())
    }

    fn bind_vertex_layout(
        &mut self,
        array: VertexArrayHandle,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> ResourceResult<()> {
        layout.ensure_matches(&self.pipeline_layout)?;
        for buffer in [vertex_buffer, index_buffer] {
            if !self.buffers.contains_key(&buffer) {
                return Err(ResourceError::UnknownBuffer(buffer));
            }
        }

        let state = self
            .vertex_arrays
            .get_mut(&array)
            .ok_or(ResourceError::UnknownVertexArray(array))?;

        state.vertex_buffer = Some(vertex_buffer);
        state.index_buffer = Some(index_buffer);

        Ok(())
    }

    fn draw_indexed(&mut self, array: VertexArrayHandle, index_count: u32) -> ResourceResult<()> {
        let state = self
            .vertex_arrays
            .get(&array)
            .ok_or(ResourceError::UnknownVertexArray(array))?;

        let (Some(vertex_buffer), Some(index_buffer)) = (state.vertex_buffer, state.index_buffer)
        else {
            return Err(ResourceError::UnboundVertexArray(array));
        };

        // zero-sized buffers cannot be sliced
        if index_count == 0 {
            return Ok(());
        }

        self.draw_commands.push(DrawCommand {
            vertex_buffer,
            index_buffer,
            index_count,
        });

        Ok(())
    }

    fn delete_vertex_array(&mut self, array: VertexArrayHandle) {
        self.vertex_arrays.remove(&array);
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(Some(buffer)) = self.buffers.remove(&buffer) {
            buffer.destroy();
        }
    }

    fn check_error(&mut self) -> ResourceResult<()> {
        match self.pending_error.take() {
            Some(message) => Err(ResourceError::Device(message)),
            None => Ok(()),
        }
    }
}
