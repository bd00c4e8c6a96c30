use std::collections::BTreeMap;

use drawguard_common::ObjectTypeId;

use crate::renderer::EntityRenderer;

/// Host renderer map: one renderer per object type.
///
/// Uses BTreeMap so iteration (and therefore patching and logging) happens in a
/// stable order.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: BTreeMap<ObjectTypeId, Box<dyn EntityRenderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a renderer to a type, returning the renderer it displaced.
    pub fn register(
        &mut self,
        type_id: impl Into<ObjectTypeId>,
        renderer: Box<dyn EntityRenderer>,
    ) -> Option<Box<dyn EntityRenderer>> {
        let type_id = type_id.into();
        tracing::trace!(%type_id, "renderer registered");
        self.renderers.insert(type_id, renderer)
    }

    pub fn get(&self, type_id: &ObjectTypeId) -> Option<&dyn EntityRenderer> {
        self.renderers.get(type_id).map(|r| r.as_ref())
    }

    pub fn get_mut(&mut self, type_id: &ObjectTypeId) -> Option<&mut Box<dyn EntityRenderer>> {
        self.renderers.get_mut(type_id)
    }

    /// Remove and return the renderer bound to a type.
    pub fn take(&mut self, type_id: &ObjectTypeId) -> Option<Box<dyn EntityRenderer>> {
        self.renderers.remove(type_id)
    }

    /// Unbind a type. Returns whether a renderer was bound.
    pub fn remove(&mut self, type_id: &ObjectTypeId) -> bool {
        self.take(type_id).is_some()
    }

    pub fn contains(&self, type_id: &ObjectTypeId) -> bool {
        self.renderers.contains_key(type_id)
    }

    pub fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = (&ObjectTypeId, &mut Box<dyn EntityRenderer>)> {
        self.renderers.iter_mut()
    }

    pub fn type_ids(&self) -> impl Iterator<Item = &ObjectTypeId> {
        self.renderers.keys()
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.renderers.keys()).finish()
    }
}
