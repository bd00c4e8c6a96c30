//! Render resilience: isolates failures of individual render calls.
//!
//! A `RenderGuard` runs each per-object draw, swallows or propagates its
//! failure according to the `GuardPolicy`, optionally repairs the shared
//! graphics state from a `GraphicsStateSnapshot`, reports every failure once
//! and lets a `RateLimitedNotifier` decide whether the player hears about it.
//! `CapabilityPatcher` routes every entity renderer's item drawing through the
//! guarded override at startup.
//!
//! # Invariants
//! - A caught failure never escapes the draw call of the object that raised it.
//! - An uncaught failure reaches the caller unchanged.
//! - Restoring graphics state only pops and ends; it never pushes or begins.
//! - The capability patch runs at most once per patcher.
//! - Everything here belongs to the render thread (`!Send`, `!Sync`).

mod guard;
mod guarded;
mod notifier;
mod patcher;
mod snapshot;

pub use guard::{
    Disposition, FailureReport, FailureReporter, GuardStats, RenderGuard, RenderOutcome,
    TracingReporter,
};
pub use guarded::GuardedItemRenderer;
pub use notifier::{
    Clock, LogMessageSink, ManualClock, MessageSink, NOTIFICATION_COOLDOWN, RateLimitedNotifier,
    SystemClock,
};
pub use patcher::{CapabilityPatcher, PatchError, PatchSummary};
pub use snapshot::{GraphicsStateSnapshot, RestoreReport};
