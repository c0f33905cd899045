//! A headless render tree node.
//!
//! Listens for scene protocol messages, applies them to a local tree and relays
//! every resulting mutation onward. With `--demo` it also acts as a master,
//! spawning fading shapes of its own.

use clap::Parser;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use resonant_field::{
    config::Config,
    osc::{OscListener, OscSender},
    scene::{Color, FadeIn, FadeOut, ModuleKind, RenderTree, Shape, Sink, TraceGraphics, TreeMessage, Vec3},
};
use std::{
    path::PathBuf,
    sync::mpsc,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const REPORT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(author, version, about = "Mirror and relay a render tree over OSC")]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// UDP port to listen on. Overrides the config.
    #[arg(long)]
    port: Option<u16>,

    /// Extra `host:port` to relay to. May be repeated.
    #[arg(long)]
    relay: Vec<String>,

    /// Spawn shapes locally instead of only mirroring.
    #[arg(long)]
    demo: bool,
}

/// Spawns a sinking, fading shape every few frames.
struct Demo {
    rng: SmallRng,
    countdown: u32,
}

impl Demo {
    fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
            countdown: 0,
        }
    }

    fn frame(&mut self, tree: &mut RenderTree) {
        if self.countdown > 0 {
            self.countdown -= 1;
            return;
        }
        self.countdown = self.rng.gen_range(10..40);

        let shape = match self.rng.gen_range(0..3) {
            0 => Shape::Cube,
            1 => Shape::Sphere,
            _ => Shape::Plane,
        };
        let Some(key) = tree.create_module(ModuleKind::Shape(shape)) else {
            return;
        };
        let position = Vec3::new(self.rng.gen_range(-4.0..4.0), self.rng.gen_range(-2.0..2.0), -5.0);
        tree.set_position(key, position);
        tree.set_color(key, Color::rgb(self.rng.gen(), self.rng.gen(), self.rng.gen()));
        tree.add_behavior(key, FadeIn::new(20));
        tree.add_behavior(key, Sink::z(240, -10.0));
        tree.add_behavior(key, FadeOut::new(120, self.rng.gen_range(60..180)));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?.scene;

    let mut tree = RenderTree::new();
    for addr in config.relay.iter().chain(&args.relay) {
        tree.relayer_mut().add_relay_address(addr.as_str())?;
    }

    let (tx, rx) = mpsc::channel();
    let port = args.port.unwrap_or(config.listen_port);
    let _listener = OscListener::spawn(("0.0.0.0", port), move |msg, from| {
        match TreeMessage::decode(&msg, from) {
            Some(message) => {
                tx.send(message).ok();
            }
            None => debug!(addr = %msg.addr, %from, "ignoring scene message"),
        }
    })?;
    let replies = OscSender::new()?;

    let frame = Duration::from_secs_f32(1.0 / config.frame_rate);
    let mut graphics = TraceGraphics::default();
    let mut demo = args.demo.then(Demo::new);
    info!(port, relays = tree.relayer_mut().len(), fps = config.frame_rate, demo = args.demo, "scene node running");

    let mut next_frame = Instant::now();
    let mut last_report = Instant::now();
    loop {
        while let Ok(message) = rx.try_recv() {
            let reply_to = match &message {
                TreeMessage::ListModules { reply_to } => Some(*reply_to),
                _ => None,
            };
            let out = tree.handle_message(message);
            if let Some(addr) = reply_to {
                for reply in &out {
                    if let Err(err) = replies.send_to(reply, addr) {
                        warn!(%addr, %err, "failed to send module listing");
                        break;
                    }
                }
            }
        }

        if let Some(demo) = demo.as_mut() {
            demo.frame(&mut tree);
        }
        tree.render(&mut graphics, frame.as_secs_f32());

        if last_report.elapsed() >= REPORT_INTERVAL {
            last_report = Instant::now();
            info!(modules = tree.len(), draws = graphics.draws(), "scene");
        }

        next_frame += frame;
        let now = Instant::now();
        match next_frame.checked_duration_since(now) {
            Some(wait) => std::thread::sleep(wait),
            // Fell behind, don't try to catch up
            None => next_frame = now,
        }
    }
}
