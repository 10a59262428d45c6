//! `handlink` – glove telemetry to hand rig, headless.
//!
//! This binary wires the whole pipeline together against an in-process
//! [`SimScene`]:
//!
//! 1. Loads `~/.handlink/config.toml`, or asks for the glove address and
//!    writes one on first run.
//! 2. Connects the [`TelemetryLink`] to the glove.  Decoded records flow into
//!    the ingest queue on the I/O context.
//! 3. Runs the [`HandSession`] tick at the configured fixed rate until
//!    **Ctrl-C**, then closes the link, drains what is left and prints a
//!    session summary.
//!
//! The link never reconnects on its own; a dropped glove shows up as a state
//! change and the tick keeps running without input.

mod config;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use handlink_hal::SimScene;
use handlink_middleware::{EventBus, EventKind, TelemetryLink, ingest_queue};
use handlink_runtime::gesture::Outcome;
use handlink_runtime::{Bindings, HandSession, TickReport, init_tracing};
use handlink_types::{LinkPayload, LinkState};

fn main() {
    let _tracing = init_tracing("handlink");

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – closing the glove link …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; stop the process another way");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };

    let summary = runtime.block_on(run(cfg, shutdown));
    summary.print();
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

async fn run(cfg: config::Config, shutdown: Arc<AtomicBool>) -> Summary {
    let (producer, consumer) = ingest_queue();
    let bus = Arc::new(EventBus::default());
    spawn_link_reporter(&bus);

    let link = TelemetryLink::new(cfg.decoder(), producer, Arc::clone(&bus));
    let mut scene = SimScene::builder().with_hand_rig(cfg.bone_segments).build();
    let bindings = Bindings::hand_rig(cfg.bone_segments);
    let mut session = HandSession::new(consumer, bindings, cfg.session);
    let mut summary = Summary::default();

    let endpoint = cfg.endpoint();
    println!("  Connecting to glove at {} …", endpoint.to_string().bold());
    if let Err(e) = link.connect(&endpoint) {
        println!("{}: {}", "Link error".red(), e);
    }

    let period = Duration::from_secs_f64(1.0 / f64::from(cfg.tick_hz.max(1)));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(tick_hz = cfg.tick_hz, "simulation loop started");

    while !shutdown.load(Ordering::SeqCst) {
        interval.tick().await;
        summary.record(&session.tick(&mut scene, link.state()));
    }

    link.close();
    if tokio::time::timeout(Duration::from_secs(2), link.wait_for(LinkState::Disconnected))
        .await
        .is_err()
    {
        warn!("link did not close within 2s");
    }
    // Records already queued before the close still get applied.
    summary.record(&session.tick(&mut scene, link.state()));

    summary.objects_left = session.registry().len();
    summary
}

/// Print link state changes and errors as they happen.
fn spawn_link_reporter(bus: &EventBus) {
    let mut states = bus.subscribe_kind(EventKind::State);
    let mut errors = bus.subscribe_kind(EventKind::Error);
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                e = states.recv() => e,
                e = errors.recv() => e,
            };
            match event.map(|e| e.payload) {
                Some(LinkPayload::StateChanged(LinkState::Connected)) => {
                    println!("  {} glove connected", "●".green());
                }
                Some(LinkPayload::StateChanged(LinkState::Disconnected)) => {
                    println!("  {} glove disconnected", "●".red());
                }
                Some(LinkPayload::StateChanged(state)) => {
                    println!("  {} link {}", "●".yellow(), state);
                }
                Some(LinkPayload::Error(e)) => println!("  {} {}", "✗".red(), e),
                Some(LinkPayload::Frame(_)) => {}
                None => break,
            }
        }
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Summary
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, PartialEq)]
struct Summary {
    ticks: u64,
    records: usize,
    spawned: usize,
    cleared: usize,
    pushes: usize,
    objects_left: usize,
}

impl Summary {
    fn record(&mut self, report: &TickReport) {
        self.ticks = report.tick;
        self.records += report.drained;
        for firing in report.gestures.iter().flat_map(|g| g.fired.iter()) {
            match firing.outcome {
                Outcome::Spawned(_) => self.spawned += 1,
                Outcome::Cleared(n) => self.cleared += n,
                Outcome::Pushed(n) => self.pushes += n,
                Outcome::SpawnFailed => {}
            }
        }
    }

    fn print(&self) {
        println!();
        println!("  {}", "Session summary".bold());
        for (label, value) in [
            ("ticks", self.ticks as usize),
            ("records", self.records),
            ("objects spawned", self.spawned),
            ("objects cleared", self.cleared),
            ("impulses", self.pushes),
            ("objects left", self.objects_left),
        ] {
            println!("    {:<16} {}", label, value);
        }
        println!();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║       handlink First-Run Setup       ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Where is the glove?\n");

    let mut cfg = config::Config::default();

    cfg.glove.host = prompt_line(
        &format!("  Glove host [{}]: ", cfg.glove.host),
        &cfg.glove.host,
    );

    let port_str = prompt_line(
        &format!("  Glove WebSocket port [{}]: ", cfg.glove.port),
        &cfg.glove.port.to_string(),
    );
    if let Ok(p) = port_str.trim().parse::<u16>() {
        cfg.glove.port = p;
    }

    let mode_str = prompt_line(
        &format!("  Gesture trigger mode, level or edge [{}]: ", cfg.session.gestures.trigger_mode),
        &cfg.session.gestures.trigger_mode.to_string(),
    );
    match mode_str.parse() {
        Ok(mode) => cfg.session.gestures.trigger_mode = mode,
        Err(e) => println!("  {} keeping {}", e.yellow(), cfg.session.gestures.trigger_mode),
    }

    config::apply_env_overrides(&mut cfg);

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   __                    ____     __  "#.bold().cyan());
    println!("{}", r#"  / /  ___ ____  ___/ / (_)__  / /__"#.bold().cyan());
    println!("{}", r#" / _ \/ _ `/ _ \/ _  / / / _ \/  '_/"#.bold().cyan());
    println!("{}", r#"/_//_/\_,_/_//_/\_,_/_/_/_//_/_/\_\ "#.bold().cyan());
    println!();
    println!("  {} {}",
        "handlink".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Sensor glove telemetry for hand rigs");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
