use std::path::Path;
use std::rc::Rc;

use drawguard_common::{EntityId, ItemStack, ObjectTypeId};
use drawguard_config::{ConfigError, ConfigStore, GuardPolicy};
use drawguard_render::{
    BlockRenderer, CapabilityAccess, EntityRenderer, GraphicsContext, ItemRenderer, NullRenderer,
    RenderError, RendererRegistry,
};
use drawguard_resilience::{
    CapabilityPatcher, GuardedItemRenderer, PatchError, PatchSummary, RenderGuard,
};

use crate::frame::FrameRenderer;

/// Type the placeholder renderer is bound to between pre-init and post-init.
pub const PLACEHOLDER_TYPE: &str = "drawguard:placeholder";

/// Type of dropped item entities. The host must bind a renderer to it.
pub const ITEM_ENTITY_TYPE: &str = "item";

/// Startup phases, in the order they run.
///
/// `Failed` is terminal: a phase that returned an error leaves the sequencer
/// there and every later phase is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPhase {
    Created,
    ConfigLoaded,
    PreInitialized,
    Initialized,
    PostInitialized,
    Failed,
}

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unable to patch entity renderers: {0}")]
    Patch(#[from] PatchError),
    #[error("no renderer is bound to '{0}'; the host renderer map is incomplete")]
    MissingItemEntityRenderer(ObjectTypeId),
    #[error("cannot enter {attempted:?} from {current:?}")]
    OutOfOrder {
        attempted: StartupPhase,
        current: StartupPhase,
    },
    #[error("startup already failed; cannot enter {attempted:?}")]
    Aborted { attempted: StartupPhase },
}

/// Item entity renderer installed at post-init around the host's own.
///
/// Drawing is delegated unchanged; the wrapper exists so that the renderer bound
/// to item entities is known to draw its items through the guarded override,
/// even if it was registered after the capability patch ran.
pub struct WrappedItemEntityRenderer {
    inner: Box<dyn EntityRenderer>,
}

impl WrappedItemEntityRenderer {
    pub fn new(inner: Box<dyn EntityRenderer>) -> Self {
        Self { inner }
    }
}

impl EntityRenderer for WrappedItemEntityRenderer {
    fn texture(&self) -> Option<&str> {
        self.inner.texture()
    }

    fn render(
        &self,
        gfx: &mut GraphicsContext,
        id: EntityId,
        held: Option<&ItemStack>,
    ) -> Result<(), RenderError> {
        self.inner.render(gfx, id, held)
    }

    fn item_capability(&mut self) -> CapabilityAccess<'_> {
        self.inner.item_capability()
    }
}

/// Runs the client startup phases and owns the state they produce.
///
/// The capability patch flag lives in the patcher owned here, so it is reset
/// only by building a new sequencer.
pub struct StartupSequencer {
    phase: StartupPhase,
    config: ConfigStore,
    guard: Rc<RenderGuard>,
    default_items: Rc<dyn ItemRenderer>,
    items: Option<Rc<dyn ItemRenderer>>,
    patcher: CapabilityPatcher,
}

impl StartupSequencer {
    /// `default_items` is the host's own item renderer; `guard` wraps every draw.
    pub fn new(default_items: Rc<dyn ItemRenderer>, guard: RenderGuard) -> Self {
        Self {
            phase: StartupPhase::Created,
            config: ConfigStore::in_memory(),
            guard: Rc::new(guard),
            default_items,
            items: None,
            patcher: CapabilityPatcher::new(),
        }
    }

    pub fn phase(&self) -> StartupPhase {
        self.phase
    }

    pub fn guard(&self) -> &Rc<RenderGuard> {
        &self.guard
    }

    pub fn policy(&self) -> GuardPolicy {
        self.guard.policy()
    }

    /// The shared guarded item renderer, once init has built it.
    pub fn item_renderer(&self) -> Option<&Rc<dyn ItemRenderer>> {
        self.items.as_ref()
    }

    /// Read the guard policy from `path` and hand it to the guard.
    pub fn load_config(&mut self, path: impl AsRef<Path>) -> Result<GuardPolicy, StartupError> {
        self.expect_phase(StartupPhase::Created, StartupPhase::ConfigLoaded)?;
        self.config = ConfigStore::load(path).map_err(|err| self.abort(err.into()))?;
        self.advance(StartupPhase::ConfigLoaded);
        self.apply_policy();
        Ok(self.config.policy())
    }

    /// Use the default policy without reading a file.
    pub fn use_default_config(&mut self) -> Result<GuardPolicy, StartupError> {
        self.expect_phase(StartupPhase::Created, StartupPhase::ConfigLoaded)?;
        self.advance(StartupPhase::ConfigLoaded);
        self.config = ConfigStore::in_memory();
        self.apply_policy();
        Ok(self.config.policy())
    }

    /// Re-read the configuration file. The guard only sees the new policy if
    /// the read succeeds.
    pub fn reload_config(&mut self) -> Result<GuardPolicy, StartupError> {
        let policy = self.config.reload()?;
        self.apply_policy();
        Ok(policy)
    }

    /// Bind the placeholder renderer.
    pub fn pre_init(&mut self, registry: &mut RendererRegistry) -> Result<(), StartupError> {
        let _span = tracing::info_span!("pre_init").entered();
        self.expect_phase(StartupPhase::ConfigLoaded, StartupPhase::PreInitialized)?;
        registry.register(PLACEHOLDER_TYPE, Box::new(NullRenderer::new()));
        self.advance(StartupPhase::PreInitialized);
        Ok(())
    }

    /// Build the guarded item renderer and patch it into every registered renderer.
    ///
    /// A renderer that cannot take the override aborts startup.
    pub fn init(&mut self, registry: &mut RendererRegistry) -> Result<PatchSummary, StartupError> {
        let _span = tracing::info_span!("init").entered();
        self.expect_phase(StartupPhase::PreInitialized, StartupPhase::Initialized)?;
        let items: Rc<dyn ItemRenderer> = Rc::new(GuardedItemRenderer::new(
            self.default_items.clone(),
            self.guard.clone(),
        ));
        self.items = Some(items);
        let summary = self.sanitize_renderers(registry)?;
        self.advance(StartupPhase::Initialized);
        Ok(summary)
    }

    /// Apply the capability patch. Safe to call again when the host rebuilds its
    /// renderer map: only the first successful call patches anything. A patch
    /// failure aborts startup.
    pub fn sanitize_renderers(
        &mut self,
        registry: &mut RendererRegistry,
    ) -> Result<PatchSummary, StartupError> {
        let Some(items) = self.items.as_ref() else {
            return Err(StartupError::OutOfOrder {
                attempted: StartupPhase::Initialized,
                current: self.phase,
            });
        };
        let patched = self.patcher.patch_all(registry, items);
        patched.map_err(|err| self.abort(err.into()))
    }

    /// Wrap the item entity renderer and unbind the placeholder.
    pub fn post_init(&mut self, registry: &mut RendererRegistry) -> Result<(), StartupError> {
        let _span = tracing::info_span!("post_init").entered();
        self.expect_phase(StartupPhase::Initialized, StartupPhase::PostInitialized)?;
        let item_type = ObjectTypeId::new(ITEM_ENTITY_TYPE);
        let Some(inner) = registry.take(&item_type) else {
            return Err(self.abort(StartupError::MissingItemEntityRenderer(item_type)));
        };
        let mut wrapped = WrappedItemEntityRenderer::new(inner);

        let mut incompatible = None;
        if let Some(items) = self.items.as_ref() {
            match wrapped.item_capability() {
                CapabilityAccess::Slot(slot) if !slot.points_to(items) => {
                    tracing::debug!(
                        "item entity renderer registered after patch; installing override"
                    );
                    slot.replace(items.clone());
                }
                CapabilityAccess::Slot(_) => {}
                CapabilityAccess::Absent => {
                    tracing::warn!("item entity renderer draws no items through a capability");
                }
                CapabilityAccess::Incompatible(reason) => incompatible = Some(reason),
            }
        }

        registry.register(item_type.clone(), Box::new(wrapped));
        if let Some(reason) = incompatible {
            let err = PatchError::Incompatible {
                type_id: item_type,
                reason,
            };
            return Err(self.abort(err.into()));
        }
        registry.remove(&ObjectTypeId::new(PLACEHOLDER_TYPE));
        self.advance(StartupPhase::PostInitialized);
        Ok(())
    }

    /// Run every phase in order with the configuration at `config_path`.
    pub fn run(
        &mut self,
        config_path: Option<&Path>,
        registry: &mut RendererRegistry,
    ) -> Result<(), StartupError> {
        match config_path {
            Some(path) => self.load_config(path)?,
            None => self.use_default_config()?,
        };
        self.pre_init(registry)?;
        self.init(registry)?;
        self.post_init(registry)?;
        tracing::info!(policy = %self.policy(), "client startup complete");
        Ok(())
    }

    /// Draw loop for a fully started client.
    pub fn frame_renderer(
        &self,
        blocks: Box<dyn BlockRenderer>,
    ) -> Result<FrameRenderer, StartupError> {
        match (self.phase, self.items.as_ref()) {
            (StartupPhase::PostInitialized, Some(items)) => Ok(FrameRenderer::new(
                self.guard.clone(),
                blocks,
                items.clone(),
            )),
            (StartupPhase::Failed, _) => Err(StartupError::Aborted {
                attempted: StartupPhase::PostInitialized,
            }),
            _ => Err(StartupError::OutOfOrder {
                attempted: StartupPhase::PostInitialized,
                current: self.phase,
            }),
        }
    }

    fn apply_policy(&self) {
        self.guard.replace_policy(self.config.policy());
    }

    fn expect_phase(
        &self,
        required: StartupPhase,
        next: StartupPhase,
    ) -> Result<(), StartupError> {
        match self.phase {
            StartupPhase::Failed => Err(StartupError::Aborted { attempted: next }),
            current if current != required => Err(StartupError::OutOfOrder {
                attempted: next,
                current,
            }),
            _ => Ok(()),
        }
    }

    fn advance(&mut self, next: StartupPhase) {
        tracing::debug!(from = ?self.phase, to = ?next, "startup phase");
        self.phase = next;
    }

    /// Park the sequencer in `Failed` and hand `err` back to the caller.
    fn abort(&mut self, err: StartupError) -> StartupError {
        tracing::error!(phase = ?self.phase, error = %err, "client startup aborted");
        self.phase = StartupPhase::Failed;
        self.items = None;
        err
    }
}
