use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use drawguard_client::{FrameReport, ITEM_ENTITY_TYPE, StartupSequencer};
use drawguard_common::{BlockState, EntityId, ItemStack, RenderTarget};
use drawguard_config::{ConfigStore, GuardPolicy};
use drawguard_render::stock::{
    ItemEntityRenderer, ModelEntityRenderer, StandardBlockRenderer, StandardItemRenderer,
};
use drawguard_render::{GraphicsContext, ItemRenderer, RenderError, RendererRegistry};
use drawguard_resilience::{
    LogMessageSink, ManualClock, MessageSink, RateLimitedNotifier, RenderGuard, TracingReporter,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Simulated frame length (60 frames per second).
const FRAME_TIME: Duration = Duration::from_micros(16_667);

#[derive(Parser)]
#[command(name = "drawguard-cli", about = "CLI tool for drawguard operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the effective guard policy and what each option does
    Config {
        /// Configuration file
        #[arg(short, long, default_value = "drawguard.yaml")]
        path: PathBuf,
    },
    /// Draw simulated frames through a faulty item renderer
    Simulate {
        /// Configuration file (defaults are used when absent)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of frames to draw
        #[arg(short, long, default_value = "120")]
        frames: u32,
        /// Objects drawn per frame
        #[arg(short, long, default_value = "12")]
        objects: usize,
        /// Every Nth item draw fails (0 disables failures)
        #[arg(long, default_value = "7")]
        fail_every: u64,
        /// Failing draws leave a transform pushed and the geometry buffer building
        #[arg(long)]
        leak: bool,
        /// Force attempt_recovery on
        #[arg(long)]
        recovery: bool,
        /// Force both catch flags off
        #[arg(long)]
        no_catch: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Item renderer that fails on every Nth call.
struct FlakyItems {
    every: u64,
    leak: bool,
    calls: Cell<u64>,
}

impl ItemRenderer for FlakyItems {
    fn name(&self) -> &str {
        "flaky_items"
    }

    fn render_item(&self, gfx: &mut GraphicsContext, stack: &ItemStack) -> Result<(), RenderError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if self.every == 0 || call % self.every != 0 {
            return StandardItemRenderer::new().render_item(gfx, stack);
        }
        if self.leak {
            gfx.transforms_mut().push();
            gfx.buffer_mut().begin()?;
        }
        Err(RenderError::failed(
            "flaky_items",
            format!("simulated failure on call {call}"),
        ))
    }
}

/// Counts messages shown to the player and forwards them to the log.
#[derive(Default)]
struct CountingSink {
    shown: Cell<u64>,
}

impl MessageSink for CountingSink {
    fn show(&self, message: &str) {
        self.shown.set(self.shown.get() + 1);
        LogMessageSink.show(message);
    }
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    frames: u32,
    simulated_seconds: f64,
    policy: GuardPolicy,
    totals: FrameReport,
    messages_shown: u64,
    messages_dropped: u64,
    final_stack_depth: usize,
    buffer_left_building: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("drawguard-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", drawguard_render::crate_info());
            println!("defaults: {}", GuardPolicy::default());
        }
        Commands::Config { path } => {
            let store = ConfigStore::load(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            println!("# {}", path.display());
            println!("client:");
            let policy = store.policy();
            let values = [
                policy.catch_block_exceptions,
                policy.catch_item_exceptions,
                policy.attempt_recovery,
                policy.notify_player,
            ];
            for (doc, value) in GuardPolicy::OPTIONS.iter().zip(values) {
                for line in doc.lines {
                    println!("  # {line}");
                }
                println!("  # default: {}", doc.default);
                println!("  {}: {value}", doc.key);
            }
        }
        Commands::Simulate {
            config,
            frames,
            objects,
            fail_every,
            leak,
            recovery,
            no_catch,
            json,
        } => {
            let summary = simulate(
                config,
                frames,
                objects,
                FlakyItems {
                    every: fail_every,
                    leak,
                    calls: Cell::new(0),
                },
                |policy| GuardPolicy {
                    attempt_recovery: policy.attempt_recovery || recovery,
                    catch_block_exceptions: policy.catch_block_exceptions && !no_catch,
                    catch_item_exceptions: policy.catch_item_exceptions && !no_catch,
                    ..policy
                },
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Simulated {} frames ({:.1}s)",
                    summary.frames, summary.simulated_seconds
                );
                println!("Totals: {}", summary.totals);
                println!(
                    "Player messages: shown={} dropped={}",
                    summary.messages_shown, summary.messages_dropped
                );
                println!(
                    "Graphics state: depth={} building={}",
                    summary.final_stack_depth, summary.buffer_left_building
                );
            }
        }
    }

    Ok(())
}

fn simulate(
    config: Option<PathBuf>,
    frames: u32,
    objects: usize,
    items: FlakyItems,
    adjust: impl FnOnce(GuardPolicy) -> GuardPolicy,
) -> anyhow::Result<SimulationSummary> {
    let clock = Rc::new(ManualClock::new());
    let sink = Rc::new(CountingSink::default());
    let notifier =
        RateLimitedNotifier::with_clock(Box::new(clock.clone()), Box::new(sink.clone()));
    let guard =
        RenderGuard::with_parts(GuardPolicy::default(), notifier, Box::new(TracingReporter));

    let default_items: Rc<dyn ItemRenderer> = Rc::new(items);
    let mut registry = RendererRegistry::new();
    registry.register(
        ITEM_ENTITY_TYPE,
        Box::new(ItemEntityRenderer::new(default_items.clone())),
    );
    registry.register("pig", Box::new(ModelEntityRenderer::new("textures/entity/pig.png")));

    let mut sequencer = StartupSequencer::new(default_items, guard);
    sequencer
        .run(config.as_deref(), &mut registry)
        .context("client startup failed")?;
    let policy = adjust(sequencer.policy());
    sequencer.guard().replace_policy(policy);
    let renderer = sequencer.frame_renderer(Box::new(StandardBlockRenderer::new()))?;

    let targets = scene(objects);
    let mut gfx = GraphicsContext::default();
    let mut totals = FrameReport::default();
    for frame in 0..frames {
        let report = renderer
            .draw_frame(&mut gfx, &registry, &targets)
            .with_context(|| format!("frame {frame} aborted by an uncaught render failure"))?;
        tracing::debug!(frame, %report, "frame drawn");
        totals.accumulate(&report);
        clock.advance(FRAME_TIME);
    }

    Ok(SimulationSummary {
        frames,
        simulated_seconds: FRAME_TIME.as_secs_f64() * f64::from(frames),
        policy,
        totals,
        messages_shown: sink.shown.get(),
        messages_dropped: renderer.guard().notifier().dropped(),
        final_stack_depth: gfx.transforms().depth(),
        buffer_left_building: gfx.buffer().is_building(),
    })
}

/// A repeating mix of blocks, loose items, item entities and a mob.
fn scene(objects: usize) -> Vec<RenderTarget> {
    (0..objects)
        .map(|i| match i % 4 {
            0 => RenderTarget::Block(BlockState {
                block: "stone".into(),
                position: [i as i32, 64, 0],
            }),
            1 => RenderTarget::Item(ItemStack::new("apple", 1 + i as u32 % 3)),
            2 => RenderTarget::Entity {
                id: EntityId::new(),
                type_id: ITEM_ENTITY_TYPE.into(),
                held: Some(ItemStack::new("stick", 4)),
            },
            _ => RenderTarget::Entity {
                id: EntityId::new(),
                type_id: "pig".into(),
                held: None,
            },
        })
        .collect()
}
