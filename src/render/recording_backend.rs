//! Capturing [`GpuBackend`] for unit tests.

use std::collections::{HashMap, HashSet};

use super::{
    backend::{
        BufferHandle, BufferKind, GpuBackend, ResourceError, ResourceResult, VertexArrayHandle,
    },
    vertex::VertexLayout,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateVertexArray(VertexArrayHandle),
    CreateBuffer(BufferHandle, BufferKind),
    Upload {
        buffer: BufferHandle,
        kind: BufferKind,
        bytes: usize,
    },
    BindLayout {
        array: VertexArrayHandle,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
    },
    DrawIndexed {
        array: VertexArrayHandle,
        index_count: u32,
    },
    DeleteVertexArray(VertexArrayHandle),
    DeleteBuffer(BufferHandle),
}

#[derive(Default)]
pub struct RecordingBackend {
    next_id: u32,
    calls: Vec<Call>,
    live_arrays: HashSet<VertexArrayHandle>,
    live_buffers: HashSet<BufferHandle>,
    layouts: HashMap<VertexArrayHandle, VertexLayout>,
    invalid_deletes: usize,
    pending_error: Option<String>,
    fail_uploads: bool,
    allocation_budget: Option<usize>,
}

impl RecordingBackend {
    pub fn new() -> RecordingBackend {
        RecordingBackend {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Makes every following upload report a device error on the next check.
    pub fn fail_uploads(&mut self) {
        self.fail_uploads = true;
    }

    /// Lets `count` more handles be created, then fails every allocation.
    pub fn fail_allocations_after(&mut self, count: usize) {
        self.allocation_budget = Some(count);
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn draws(&self) -> Vec<(VertexArrayHandle, u32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::DrawIndexed { array, index_count } => Some((*array, *index_count)),
                _ => None,
            })
            .collect()
    }

    pub fn drawn_indices(&self) -> u32 {
        self.draws().iter().map(|(_, count)| count).sum()
    }

    pub fn deletions_of(&self, array: VertexArrayHandle) -> usize {
        self.calls
            .iter()
            .filter(|call| **call == Call::DeleteVertexArray(array))
            .count()
    }

    pub fn layout_of(&self, array: VertexArrayHandle) -> Option<&VertexLayout> {
        self.layouts.get(&array)
    }

    pub fn live_resources(&self) -> usize {
        self.live_arrays.len() + self.live_buffers.len()
    }

    pub fn invalid_deletes(&self) -> usize {
        self.invalid_deletes
    }

    fn next_id(&mut self, what: &'static str) -> ResourceResult<u32> {
        if let Some(budget) = self.allocation_budget.as_mut() {
            if *budget == 0 {
                return Err(ResourceError::AllocationFailed(what));
            }
            *budget -= 1;
        }

        let id = self.next_id.max(1);
        self.next_id = id + 1;
        Ok(id)
    }
}

impl GpuBackend for RecordingBackend {
    fn create_vertex_array(&mut self) -> ResourceResult<VertexArrayHandle> {
        let handle = VertexArrayHandle(self.next_id("vertex array")?);
        self.live_arrays.insert(handle);
        self.calls.push(Call::CreateVertexArray(handle));
        Ok(handle)
    }

    fn create_buffer(&mut self, kind: BufferKind) -> ResourceResult<BufferHandle> {
        let handle = BufferHandle(self.next_id("buffer")?);
        self.live_buffers.insert(handle);
        self.calls.push(Call::CreateBuffer(handle, kind));
        Ok(handle)
    }

    fn upload_buffer(
        &mut self,
        buffer: BufferHandle,
        kind: BufferKind,
        data: &[u8],
    ) -> ResourceResult<()> {
        if !self.live_buffers.contains(&buffer) {
            return Err(ResourceError::UnknownBuffer(buffer));
        }
        if self.fail_uploads {
            self.pending_error = Some(String::from("out of memory"));
        }

        self.calls.push(Call::Upload {
            buffer,
            kind,
            bytes: data.len(),
        });
        Ok(())
    }

    fn bind_vertex_layout(
        &mut self,
        array: VertexArrayHandle,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> ResourceResult<()> {
        if !self.live_arrays.contains(&array) {
            return Err(ResourceError::UnknownVertexArray(array));
        }

        self.layouts.insert(array, *layout);
        self.calls.push(Call::BindLayout {
            array,
            vertex_buffer,
            index_buffer,
        });
        Ok(())
    }

    fn draw_indexed(&mut self, array: VertexArrayHandle, index_count: u32) -> ResourceResult<()> {
        if !self.live_arrays.contains(&array) {
            return Err(ResourceError::UnknownVertexArray(array));
        }

        self.calls.push(Call::DrawIndexed { array, index_count });
        Ok(())
    }

    fn delete_vertex_array(&mut self, array: VertexArrayHandle) {
        if !self.live_arrays.remove(&array) {
            self.invalid_deletes += 1;
        }
        self.layouts.remove(&array);
        self.calls.push(Call::DeleteVertexArray(array));
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if !self.live_buffers.remove(&buffer) {
            self.invalid_deletes += 1;
        }
        self.calls.push(Call::DeleteBuffer(buffer));
    }

    fn check_error(&mut self) -> ResourceResult<()> {
        match self.pending_error.take() {
            Some(message) => Err(ResourceError::Device(message)),
            None => Ok(()),
        }
    }
}
