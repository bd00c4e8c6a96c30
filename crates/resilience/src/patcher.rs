use std::rc::Rc;

use drawguard_common::ObjectTypeId;
use drawguard_render::{CapabilityAccess, ItemRenderer, RendererRegistry};

/// The one-time patch could not complete.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("renderer for '{type_id}' draws items but its capability cannot be replaced: {reason}")]
    Incompatible {
        type_id: ObjectTypeId,
        reason: &'static str,
    },
}

/// Result of one `patch_all` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchSummary {
    /// Renderers whose item capability now points at the override.
    pub patched: usize,
    /// Renderers that draw no items.
    pub skipped: usize,
    /// The patch had already run; nothing was touched.
    pub already_applied: bool,
}

/// Installs one shared item renderer into every registered entity renderer, once.
///
/// The "already applied" flag lives here, so its lifetime is that of the startup
/// sequencer owning the patcher.
#[derive(Debug, Default)]
pub struct CapabilityPatcher {
    applied: bool,
}

impl CapabilityPatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Point the item capability of every renderer in `registry` at `shared`.
    ///
    /// A no-op after the first successful call. Renderers without an item
    /// capability are skipped; one that cannot expose its capability aborts the
    /// pass, which leaves the flag unset.
    pub fn patch_all(
        &mut self,
        registry: &mut RendererRegistry,
        shared: &Rc<dyn ItemRenderer>,
    ) -> Result<PatchSummary, PatchError> {
        if self.applied {
            tracing::trace!("item capability patch already applied");
            return Ok(PatchSummary {
                already_applied: true,
                ..PatchSummary::default()
            });
        }

        let _span =
            tracing::debug_span!("patch_item_capabilities", renderers = registry.len()).entered();
        let mut summary = PatchSummary::default();
        for (type_id, renderer) in registry.iter_mut() {
            match renderer.item_capability() {
                CapabilityAccess::Absent => summary.skipped += 1,
                CapabilityAccess::Slot(slot) => {
                    let previous = slot.replace(shared.clone());
                    tracing::debug!(
                        %type_id,
                        previous = previous.name(),
                        "item capability replaced"
                    );
                    summary.patched += 1;
                }
                CapabilityAccess::Incompatible(reason) => {
                    return Err(PatchError::Incompatible {
                        type_id: type_id.clone(),
                        reason,
                    });
                }
            }
        }

        self.applied = true;
        tracing::info!(
            patched = summary.patched,
            skipped = summary.skipped,
            "item capability patch applied"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drawguard_common::{EntityId, ItemStack};
    use drawguard_render::stock::{ItemEntityRenderer, ModelEntityRenderer, StandardItemRenderer};
    use drawguard_render::{
        EntityRenderer, GraphicsContext, ItemCapability, NullRenderer, RenderError,
    };

    struct Sealed;

    impl EntityRenderer for Sealed {
        fn texture(&self) -> Option<&str> {
            None
        }

        fn render(
            &self,
            _: &mut GraphicsContext,
            _: EntityId,
            _: Option<&ItemStack>,
        ) -> Result<(), RenderError> {
            Ok(())
        }

        fn item_capability(&mut self) -> CapabilityAccess<'_> {
            CapabilityAccess::Incompatible("capability is baked into the model")
        }
    }

    fn slot_of<'a>(registry: &'a mut RendererRegistry, name: &str) -> &'a mut ItemCapability {
        match registry.get_mut(&name.into()).unwrap().item_capability() {
            CapabilityAccess::Slot(slot) => slot,
            _ => panic!("{name} has no item slot"),
        }
    }

    fn registry() -> RendererRegistry {
        let default_items: Rc<dyn ItemRenderer> = Rc::new(StandardItemRenderer::new());
        let mut registry = RendererRegistry::new();
        registry.register("item", Box::new(ItemEntityRenderer::new(default_items.clone())));
        registry.register("item_frame", Box::new(ItemEntityRenderer::new(default_items)));
        registry.register("pig", Box::new(ModelEntityRenderer::new("pig.png")));
        registry.register("placeholder", Box::new(NullRenderer));
        registry
    }

    #[test]
    fn patches_every_item_capability() {
        let mut registry = registry();
        let shared: Rc<dyn ItemRenderer> = Rc::new(StandardItemRenderer::new());
        let mut patcher = CapabilityPatcher::new();

        let summary = patcher.patch_all(&mut registry, &shared).unwrap();
        assert_eq!(summary.patched, 2);
        assert_eq!(summary.skipped, 2);
        assert!(patcher.is_applied());
        assert!(slot_of(&mut registry, "item").points_to(&shared));
        assert!(slot_of(&mut registry, "item_frame").points_to(&shared));
    }

    #[test]
    fn second_call_is_noop() {
        let mut registry = registry();
        let shared: Rc<dyn ItemRenderer> = Rc::new(StandardItemRenderer::new());
        let other: Rc<dyn ItemRenderer> = Rc::new(StandardItemRenderer::new());
        let mut patcher = CapabilityPatcher::new();

        patcher.patch_all(&mut registry, &shared).unwrap();
        let second = patcher.patch_all(&mut registry, &other).unwrap();

        assert!(second.already_applied);
        assert_eq!(second.patched, 0);
        assert!(slot_of(&mut registry, "item").points_to(&shared));
        assert!(slot_of(&mut registry, "item_frame").points_to(&shared));
        // The registry holds the override plus the two slots.
        assert_eq!(Rc::strong_count(&shared), 3);
    }

    #[test]
    fn incompatible_renderer_fails_and_leaves_flag_unset() {
        let mut registry = registry();
        registry.register("sealed", Box::new(Sealed));
        let shared: Rc<dyn ItemRenderer> = Rc::new(StandardItemRenderer::new());
        let mut patcher = CapabilityPatcher::new();

        let err = patcher.patch_all(&mut registry, &shared).unwrap_err();
        assert!(matches!(
            err,
            PatchError::Incompatible { ref type_id, .. } if type_id.as_str() == "sealed"
        ));
        assert!(!patcher.is_applied());
    }

    #[test]
    fn empty_registry_patches_nothing() {
        let mut registry = RendererRegistry::new();
        let shared: Rc<dyn ItemRenderer> = Rc::new(StandardItemRenderer::new());
        let mut patcher = CapabilityPatcher::new();
        let summary = patcher.patch_all(&mut registry, &shared).unwrap();
        assert_eq!(summary, PatchSummary::default());
        assert!(patcher.is_applied());
    }
}
