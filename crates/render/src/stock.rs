//! Stock host renderers used by the client and the simulator.

use std::rc::Rc;

use drawguard_common::{BlockState, EntityId, ItemStack};
use glam::Vec3;

use crate::graphics::GraphicsContext;
use crate::renderer::{
    BlockRenderer, CapabilityAccess, EntityRenderer, ItemCapability, ItemRenderer, RenderError,
};

/// Corners of a unit quad, one quad emitted per item drawn.
const QUAD: [Vec3; 4] = [
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
];

/// Draws an item stack as a flat quad per item, capped at a handful.
#[derive(Debug, Default)]
pub struct StandardItemRenderer;

impl StandardItemRenderer {
    const MAX_LAYERS: u32 = 5;

    pub fn new() -> Self {
        Self
    }
}

impl ItemRenderer for StandardItemRenderer {
    fn name(&self) -> &str {
        "standard_item"
    }

    fn render_item(&self, gfx: &mut GraphicsContext, stack: &ItemStack) -> Result<(), RenderError> {
        gfx.transforms_mut().push();
        gfx.buffer_mut().begin()?;
        for layer in 0..stack.count.min(Self::MAX_LAYERS) {
            let z = Vec3::new(0.0, 0.0, layer as f32 * 0.0625);
            for corner in QUAD {
                gfx.buffer_mut().vertex(corner + z)?;
            }
        }
        gfx.buffer_mut().end_build()?;
        gfx.transforms_mut().pop()?;
        Ok(())
    }
}

/// Draws every block as a unit cube outline.
#[derive(Debug, Default)]
pub struct StandardBlockRenderer;

impl StandardBlockRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl BlockRenderer for StandardBlockRenderer {
    fn render_block(
        &self,
        gfx: &mut GraphicsContext,
        state: &BlockState,
    ) -> Result<(), RenderError> {
        let origin = Vec3::new(
            state.position[0] as f32,
            state.position[1] as f32,
            state.position[2] as f32,
        );
        gfx.transforms_mut().push();
        gfx.buffer_mut().begin()?;
        for corner in QUAD {
            gfx.buffer_mut().vertex(origin + corner)?;
            gfx.buffer_mut().vertex(origin + corner + Vec3::Z)?;
        }
        gfx.buffer_mut().end_build()?;
        gfx.transforms_mut().pop()?;
        Ok(())
    }
}

/// Renderer for dropped item entities: draws the carried stack through its item capability.
#[derive(Debug)]
pub struct ItemEntityRenderer {
    items: ItemCapability,
}

impl ItemEntityRenderer {
    pub fn new(items: Rc<dyn ItemRenderer>) -> Self {
        Self {
            items: ItemCapability::new(items),
        }
    }
}

impl EntityRenderer for ItemEntityRenderer {
    fn texture(&self) -> Option<&str> {
        Some("textures/atlas/items.png")
    }

    fn render(
        &self,
        gfx: &mut GraphicsContext,
        _id: EntityId,
        held: Option<&ItemStack>,
    ) -> Result<(), RenderError> {
        let Some(stack) = held else {
            return Ok(());
        };
        gfx.transforms_mut().push();
        let result = self.items.render_item(gfx, stack);
        gfx.transforms_mut().pop()?;
        result
    }

    fn item_capability(&mut self) -> CapabilityAccess<'_> {
        CapabilityAccess::Slot(&mut self.items)
    }
}

/// Renderer for a mob that carries no items.
#[derive(Debug)]
pub struct ModelEntityRenderer {
    texture: String,
}

impl ModelEntityRenderer {
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
        }
    }
}

impl EntityRenderer for ModelEntityRenderer {
    fn texture(&self) -> Option<&str> {
        Some(&self.texture)
    }

    fn render(
        &self,
        gfx: &mut GraphicsContext,
        _id: EntityId,
        _held: Option<&ItemStack>,
    ) -> Result<(), RenderError> {
        gfx.transforms_mut().push();
        gfx.buffer_mut().begin()?;
        for corner in QUAD {
            gfx.buffer_mut().vertex(corner * 2.0)?;
        }
        gfx.buffer_mut().end_build()?;
        gfx.transforms_mut().pop()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::graphics::{GeometryBuffer, GraphicsError, MatrixStack, VertexBuffer};

    /// Vertex buffer that records the size of every finished build.
    struct CountingBuffer {
        inner: VertexBuffer,
        builds: Rc<RefCell<Vec<usize>>>,
    }

    impl GeometryBuffer for CountingBuffer {
        fn begin(&mut self) -> Result<(), GraphicsError> {
            self.inner.begin()
        }

        fn vertex(&mut self, position: Vec3) -> Result<(), GraphicsError> {
            self.inner.vertex(position)
        }

        fn is_building(&self) -> bool {
            self.inner.is_building()
        }

        fn end_build(&mut self) -> Result<usize, GraphicsError> {
            let count = self.inner.end_build()?;
            self.builds.borrow_mut().push(count);
            Ok(count)
        }
    }

    fn counting_context() -> (GraphicsContext, Rc<RefCell<Vec<usize>>>) {
        let builds = Rc::new(RefCell::new(Vec::new()));
        let buffer = CountingBuffer {
            inner: VertexBuffer::new(),
            builds: builds.clone(),
        };
        (
            GraphicsContext::new(Box::new(MatrixStack::new()), Box::new(buffer)),
            builds,
        )
    }

    #[test]
    fn item_renderer_leaves_state_balanced() {
        let mut gfx = GraphicsContext::default();
        StandardItemRenderer::new()
            .render_item(&mut gfx, &ItemStack::new("apple", 3))
            .unwrap();
        assert_eq!(gfx.transforms().depth(), 1);
        assert!(!gfx.buffer().is_building());
    }

    #[test]
    fn item_renderer_caps_layers() {
        let (mut gfx, builds) = counting_context();
        let renderer = StandardItemRenderer::new();
        renderer
            .render_item(&mut gfx, &ItemStack::new("cobble", 64))
            .unwrap();
        renderer
            .render_item(&mut gfx, &ItemStack::new("apple", 2))
            .unwrap();

        let quad = QUAD.len();
        let capped = StandardItemRenderer::MAX_LAYERS as usize * quad;
        assert_eq!(*builds.borrow(), vec![capped, 2 * quad]);
    }

    #[test]
    fn block_renderer_balanced() {
        let mut gfx = GraphicsContext::default();
        let state = BlockState {
            block: "stone".into(),
            position: [4, 5, 6],
        };
        StandardBlockRenderer::new()
            .render_block(&mut gfx, &state)
            .unwrap();
        assert_eq!(gfx.transforms().depth(), 1);
    }

    #[test]
    fn item_entity_draws_held_stack_through_capability() {
        let mut gfx = GraphicsContext::default();
        let mut renderer = ItemEntityRenderer::new(Rc::new(StandardItemRenderer::new()));
        renderer
            .render(&mut gfx, EntityId::new(), Some(&ItemStack::new("apple", 1)))
            .unwrap();
        assert_eq!(gfx.transforms().depth(), 1);
        assert!(matches!(
            renderer.item_capability(),
            CapabilityAccess::Slot(_)
        ));
    }

    #[test]
    fn model_renderer_has_no_item_capability() {
        let mut renderer = ModelEntityRenderer::new("textures/entity/pig.png");
        assert_eq!(renderer.texture(), Some("textures/entity/pig.png"));
        assert!(matches!(
            renderer.item_capability(),
            CapabilityAccess::Absent
        ));
    }
}
