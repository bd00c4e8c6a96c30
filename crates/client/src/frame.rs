use std::rc::Rc;

use drawguard_common::{RenderKind, RenderTarget};
use drawguard_render::{
    BlockRenderer, GraphicsContext, ItemRenderer, RenderError, RendererRegistry,
};
use drawguard_resilience::{GuardStats, RenderGuard};
use serde::Serialize;

/// What happened while drawing one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    /// Objects handed to the frame.
    pub objects: usize,
    /// Guarded calls that drew normally.
    pub rendered: u64,
    /// Guarded calls whose failure was swallowed.
    pub suppressed: u64,
    /// Swallowed failures after which graphics state was restored.
    pub recovered: u64,
    /// Entities with no renderer bound to their type.
    pub skipped: usize,
}

impl FrameReport {
    pub fn failures(&self) -> u64 {
        self.suppressed + self.recovered
    }

    /// Add another frame's counts to this one.
    pub fn accumulate(&mut self, other: &FrameReport) {
        self.objects += other.objects;
        self.rendered += other.rendered;
        self.suppressed += other.suppressed;
        self.recovered += other.recovered;
        self.skipped += other.skipped;
    }
}

impl std::fmt::Display for FrameReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "objects={} rendered={} suppressed={} recovered={} skipped={}",
            self.objects, self.rendered, self.suppressed, self.recovered, self.skipped
        )
    }
}

/// Per-frame draw loop: one guarded call per block and item, entities through their renderer.
pub struct FrameRenderer {
    guard: Rc<RenderGuard>,
    blocks: Box<dyn BlockRenderer>,
    items: Rc<dyn ItemRenderer>,
}

impl FrameRenderer {
    /// `items` is expected to be the guarded override, so loose items are guarded too.
    pub fn new(
        guard: Rc<RenderGuard>,
        blocks: Box<dyn BlockRenderer>,
        items: Rc<dyn ItemRenderer>,
    ) -> Self {
        Self {
            guard,
            blocks,
            items,
        }
    }

    pub fn guard(&self) -> &RenderGuard {
        &self.guard
    }

    /// Draw every target in order.
    ///
    /// A failure the guard propagates ends the frame and is returned as is.
    pub fn draw_frame(
        &self,
        gfx: &mut GraphicsContext,
        registry: &RendererRegistry,
        targets: &[RenderTarget],
    ) -> Result<FrameReport, RenderError> {
        let _span = tracing::debug_span!("draw_frame", objects = targets.len()).entered();
        let before = self.guard.stats();
        let mut skipped = 0;

        for target in targets {
            match target {
                RenderTarget::Block(state) => {
                    let outcome = self.guard.guard(RenderKind::Block, target, gfx, |gfx| {
                        self.blocks.render_block(gfx, state)
                    })?;
                    if !outcome.is_rendered() {
                        tracing::trace!(%target, ?outcome, "block left out of frame");
                    }
                }
                RenderTarget::Item(stack) => self.items.render_item(gfx, stack)?,
                RenderTarget::Entity { id, type_id, held } => match registry.get(type_id) {
                    Some(renderer) => renderer.render(gfx, *id, held.as_ref())?,
                    None => {
                        tracing::trace!(%type_id, "no renderer bound, entity skipped");
                        skipped += 1;
                    }
                },
            }
        }

        Ok(frame_report(targets.len(), skipped, before, self.guard.stats()))
    }
}

fn frame_report(
    objects: usize,
    skipped: usize,
    before: GuardStats,
    after: GuardStats,
) -> FrameReport {
    FrameReport {
        objects,
        rendered: after.rendered - before.rendered,
        suppressed: after.suppressed - before.suppressed,
        recovered: after.recovered - before.recovered,
        skipped,
    }
}

impl std::fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("items", &self.items.name())
            .field("guard", &self.guard)
            .finish()
    }
}
