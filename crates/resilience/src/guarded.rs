use std::rc::Rc;

use drawguard_common::{ItemStack, RenderKind};
use drawguard_render::{GraphicsContext, ItemRenderer, RenderError};

use crate::guard::RenderGuard;

/// The shared item renderer installed into every entity renderer.
///
/// Draws through the host's default item renderer, with each call wrapped by
/// the render guard as an `Item` render. A swallowed failure looks like a
/// successful draw of nothing.
pub struct GuardedItemRenderer {
    inner: Rc<dyn ItemRenderer>,
    guard: Rc<RenderGuard>,
}

impl GuardedItemRenderer {
    pub fn new(inner: Rc<dyn ItemRenderer>, guard: Rc<RenderGuard>) -> Self {
        Self { inner, guard }
    }

    pub fn inner(&self) -> &Rc<dyn ItemRenderer> {
        &self.inner
    }

    pub fn guard(&self) -> &Rc<RenderGuard> {
        &self.guard
    }
}

impl ItemRenderer for GuardedItemRenderer {
    fn name(&self) -> &str {
        "guarded_item"
    }

    fn render_item(&self, gfx: &mut GraphicsContext, stack: &ItemStack) -> Result<(), RenderError> {
        self.guard
            .guard(RenderKind::Item, stack, gfx, |gfx| {
                self.inner.render_item(gfx, stack)
            })
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawguard_config::GuardPolicy;
    use drawguard_render::stock::StandardItemRenderer;

    struct Exploding;

    impl ItemRenderer for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        fn render_item(&self, gfx: &mut GraphicsContext, _: &ItemStack) -> Result<(), RenderError> {
            gfx.transforms_mut().push();
            Err(RenderError::failed("exploding", "always fails"))
        }
    }

    #[test]
    fn delegates_successful_draws() {
        let guard = Rc::new(RenderGuard::new(GuardPolicy::default()));
        let renderer =
            GuardedItemRenderer::new(Rc::new(StandardItemRenderer::new()), guard.clone());
        let mut gfx = GraphicsContext::default();

        renderer
            .render_item(&mut gfx, &ItemStack::new("apple", 2))
            .unwrap();
        assert_eq!(guard.stats().rendered, 1);
        assert_eq!(renderer.inner().name(), "standard_item");
    }

    #[test]
    fn swallowed_failure_is_ok() {
        let guard = Rc::new(RenderGuard::new(GuardPolicy {
            attempt_recovery: true,
            notify_player: false,
            ..GuardPolicy::default()
        }));
        let renderer = GuardedItemRenderer::new(Rc::new(Exploding), guard.clone());
        let mut gfx = GraphicsContext::default();

        renderer
            .render_item(&mut gfx, &ItemStack::new("apple", 1))
            .unwrap();
        assert_eq!(gfx.transforms().depth(), 1);
        assert_eq!(guard.stats().recovered, 1);
    }

    #[test]
    fn uncaught_failure_is_returned() {
        let guard = Rc::new(RenderGuard::new(GuardPolicy {
            catch_item_exceptions: false,
            ..GuardPolicy::default()
        }));
        let renderer = GuardedItemRenderer::new(Rc::new(Exploding), guard);
        let mut gfx = GraphicsContext::default();

        let err = renderer
            .render_item(&mut gfx, &ItemStack::new("apple", 1))
            .unwrap_err();
        assert_eq!(err, RenderError::failed("exploding", "always fails"));
    }
}
