pub mod backend;
pub mod mesh;
pub mod mesh_collection;
#[cfg(test)]
pub mod recording_backend;
pub mod render_manager;
pub mod scene;
pub mod shader;
pub mod texture;
pub mod vertex;
pub mod wgpu_backend;
