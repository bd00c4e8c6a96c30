use std::rc::Rc;

use drawguard_common::{BlockState, EntityId, ItemStack};

use crate::graphics::{GraphicsContext, GraphicsError};

/// Failure raised by a render call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Graphics(#[from] GraphicsError),
    #[error("{renderer} failed: {message}")]
    Failed { renderer: String, message: String },
}

impl RenderError {
    pub fn failed(renderer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            renderer: renderer.into(),
            message: message.into(),
        }
    }
}

/// Draws item stacks. Entity renderers delegate to one through their [`ItemCapability`].
pub trait ItemRenderer {
    fn name(&self) -> &str;

    fn render_item(&self, gfx: &mut GraphicsContext, stack: &ItemStack) -> Result<(), RenderError>;
}

/// Draws one block state.
pub trait BlockRenderer {
    fn render_block(&self, gfx: &mut GraphicsContext, state: &BlockState)
    -> Result<(), RenderError>;
}

/// Renderer bound to one entity type in the host renderer map.
///
/// Renderers that draw items expose the slot holding their item renderer
/// through [`EntityRenderer::item_capability`], so it can be swapped after
/// construction without knowing the concrete renderer type.
pub trait EntityRenderer {
    /// Texture bound before drawing, if any.
    fn texture(&self) -> Option<&str>;

    fn render(
        &self,
        gfx: &mut GraphicsContext,
        id: EntityId,
        held: Option<&ItemStack>,
    ) -> Result<(), RenderError>;

    fn item_capability(&mut self) -> CapabilityAccess<'_> {
        CapabilityAccess::Absent
    }
}

/// Result of asking a renderer for its item capability.
pub enum CapabilityAccess<'a> {
    /// The renderer never draws items.
    Absent,
    /// The slot the renderer draws items through.
    Slot(&'a mut ItemCapability),
    /// The renderer draws items but cannot hand out its slot.
    Incompatible(&'static str),
}

/// Replaceable item-rendering capability embedded in a renderer.
#[derive(Clone)]
pub struct ItemCapability {
    renderer: Rc<dyn ItemRenderer>,
}

impl ItemCapability {
    pub fn new(renderer: Rc<dyn ItemRenderer>) -> Self {
        Self { renderer }
    }

    /// Install `renderer`, returning the one it replaced.
    pub fn replace(&mut self, renderer: Rc<dyn ItemRenderer>) -> Rc<dyn ItemRenderer> {
        std::mem::replace(&mut self.renderer, renderer)
    }

    /// Whether this slot holds exactly the given instance.
    pub fn points_to(&self, renderer: &Rc<dyn ItemRenderer>) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.renderer), Rc::as_ptr(renderer))
    }

    pub fn render_item(
        &self,
        gfx: &mut GraphicsContext,
        stack: &ItemStack,
    ) -> Result<(), RenderError> {
        self.renderer.render_item(gfx, stack)
    }
}

impl std::fmt::Debug for ItemCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ItemCapability")
            .field(&self.renderer.name())
            .finish()
    }
}

/// Placeholder renderer: no texture, draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl NullRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl EntityRenderer for NullRenderer {
    fn texture(&self) -> Option<&str> {
        None
    }

    fn render(
        &self,
        _gfx: &mut GraphicsContext,
        _id: EntityId,
        _held: Option<&ItemStack>,
    ) -> Result<(), RenderError> {
        Ok(())
    }
}
