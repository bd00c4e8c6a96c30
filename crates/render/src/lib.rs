//! Host rendering model: graphics state, renderer traits, the renderer registry.
//!
//! # Invariants
//! - Every draw receives the host's primary transform stack and geometry buffer
//!   through one `GraphicsContext`.
//! - Renderers that draw items do so through a replaceable `ItemCapability`.

mod graphics;
mod registry;
mod renderer;
pub mod stock;

pub use graphics::{
    GeometryBuffer, GraphicsContext, GraphicsError, MatrixStack, TransformStack, VertexBuffer,
};
pub use registry::RendererRegistry;
pub use renderer::{
    BlockRenderer, CapabilityAccess, EntityRenderer, ItemCapability, ItemRenderer, NullRenderer,
    RenderError,
};

pub fn crate_info() -> &'static str {
    "drawguard-render v0.1.0"
}
