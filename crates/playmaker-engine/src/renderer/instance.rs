use bytemuck::{Pod, Zeroable};

/// Per-entity draw data read by the browser canvas renderer.
/// Must match the host protocol: 8 floats = 32 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct RenderInstance {
    /// Top-left x in canvas units.
    pub x: f32,
    /// Top-left y in canvas units.
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// 0.0 = invisible, 1.0 = opaque.
    pub opacity: f32,
    /// Index into the sprite registry's source list.
    pub sprite: f32,
    /// 1.0 when the entity is selected for editing (draw the outline and handle).
    pub selected: f32,
    pub _pad: f32,
}

impl RenderInstance {
    pub const FLOATS: usize = 8;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

/// Draw list for one frame, in draw order.
#[derive(Debug, Default)]
pub struct RenderBuffer {
    pub instances: Vec<RenderInstance>,
}

impl RenderBuffer {
    pub fn new() -> Self {
        Self {
            instances: Vec::with_capacity(64),
        }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn push(&mut self, instance: RenderInstance) {
        self.instances.push(instance);
    }

    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    /// Raw pointer to instance data for reads from WASM memory.
    pub fn instances_ptr(&self) -> *const f32 {
        self.instances.as_ptr() as *const f32
    }

    /// The instances as a flat float slice.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.instances)
    }
}
