use drawguard_common::RenderKind;
use serde::{Deserialize, Serialize};

/// Flags deciding what the render guard does with a failed draw.
///
/// Read once from configuration, then only copied. Every field falls back to
/// its default when absent from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardPolicy {
    /// Swallow failures raised while drawing blocks; the block is not drawn.
    pub catch_block_exceptions: bool,
    /// Swallow failures raised while drawing items.
    pub catch_item_exceptions: bool,
    /// After a swallowed item failure, unwind the transform stack and release the geometry buffer.
    pub attempt_recovery: bool,
    /// Tell the player about swallowed failures, at most once per notification window.
    pub notify_player: bool,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            catch_block_exceptions: true,
            catch_item_exceptions: true,
            attempt_recovery: false,
            notify_player: true,
        }
    }
}

/// Operator-facing description of one configuration option.
#[derive(Debug, Clone, Copy)]
pub struct OptionDoc {
    pub key: &'static str,
    pub default: bool,
    pub lines: &'static [&'static str],
}

impl GuardPolicy {
    pub const OPTIONS: [OptionDoc; 4] = [
        OptionDoc {
            key: "catch_block_exceptions",
            default: true,
            lines: &[
                "Catch every failure raised while rendering blocks.",
                "A block whose render call failed is simply not drawn.",
            ],
        },
        OptionDoc {
            key: "catch_item_exceptions",
            default: true,
            lines: &[
                "Catch every failure raised while rendering items.",
                "Graphics state is left as the failed call left it unless",
                "'attempt_recovery' is enabled as well.",
            ],
        },
        OptionDoc {
            key: "attempt_recovery",
            default: false,
            lines: &[
                "Attempt to recover item rendering after a caught failure.",
                "Only enable this while a known bug in some renderer awaits a fix.",
                "The transform stack is popped back to its depth before the call and",
                "the primary geometry buffer is released if the call left it building.",
                "Other graphics state and buffers owned by third-party renderers are",
                "not recovered and may later fail with 'already building'.",
            ],
        },
        OptionDoc {
            key: "notify_player",
            default: true,
            lines: &[
                "Message the player when a block or item render failure is caught.",
                "Messages are rate limited to one per 5 seconds while failures continue.",
            ],
        },
    ];

    /// Whether failures of the given kind are swallowed.
    pub fn catches(&self, kind: RenderKind) -> bool {
        match kind {
            RenderKind::Block => self.catch_block_exceptions,
            RenderKind::Item => self.catch_item_exceptions,
        }
    }
}

impl std::fmt::Display for GuardPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "catch_block_exceptions={} catch_item_exceptions={} attempt_recovery={} notify_player={}",
            self.catch_block_exceptions,
            self.catch_item_exceptions,
            self.attempt_recovery,
            self.notify_player
        )
    }
}
