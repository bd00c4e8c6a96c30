use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an entity present in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell entities apart in logs.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of an object type, used as the key of the host renderer map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectTypeId(pub String);

impl ObjectTypeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectTypeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for ObjectTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A block in a given state, as handed to the block render dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub block: String,
    pub position: [i32; 3],
}

/// A stack of items, as handed to the item renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, count: u32) -> Self {
        Self {
            item: item.into(),
            count,
        }
    }
}

impl std::fmt::Display for ItemStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item {} x{}", self.item, self.count)
    }
}

/// The thing being drawn by one render call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderTarget {
    Block(BlockState),
    Item(ItemStack),
    Entity {
        id: EntityId,
        type_id: ObjectTypeId,
        /// Item carried or displayed by the entity, drawn through its item capability.
        held: Option<ItemStack>,
    },
}

impl std::fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block(state) => write!(
                f,
                "block {} at ({}, {}, {})",
                state.block, state.position[0], state.position[1], state.position[2]
            ),
            Self::Item(stack) => write!(f, "{stack}"),
            Self::Entity { id, type_id, .. } => write!(f, "entity {type_id} [{}]", id.short()),
        }
    }
}

/// Which guard policy flag governs a failed render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderKind {
    Block,
    Item,
}

impl std::fmt::Display for RenderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block => f.write_str("block"),
            Self::Item => f.write_str("item"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn entity_id_short_form() {
        let id = EntityId::new();
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn target_display_names_the_object() {
        let block = RenderTarget::Block(BlockState {
            block: "stone".into(),
            position: [1, 2, 3],
        });
        assert_eq!(block.to_string(), "block stone at (1, 2, 3)");

        let item = RenderTarget::Item(ItemStack::new("apple", 4));
        assert_eq!(item.to_string(), "item apple x4");

        let entity = RenderTarget::Entity {
            id: EntityId::new(),
            type_id: "item_entity".into(),
            held: None,
        };
        assert!(entity.to_string().starts_with("entity item_entity ["));
    }

    #[test]
    fn kind_display() {
        assert_eq!(RenderKind::Block.to_string(), "block");
        assert_eq!(RenderKind::Item.to_string(), "item");
    }
}
