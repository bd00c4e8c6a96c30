//! Client layer: startup sequencing and the guarded per-frame draw loop.
//!
//! # Invariants
//! - Startup phases run once each, in order: config, pre-init, init, post-init.
//! - The item capability patch is applied before the first frame is drawn.
//! - A failure the policy catches never aborts a frame.

mod frame;
mod startup;

pub use frame::{FrameRenderer, FrameReport};
pub use startup::{
    ITEM_ENTITY_TYPE, PLACEHOLDER_TYPE, StartupError, StartupPhase, StartupSequencer,
    WrappedItemEntityRenderer,
};
