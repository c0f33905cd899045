use basedrop::Collector;
use clap::Parser;
use resonant_field::{
    audio::device::OutputDevice,
    config::Config,
    control::ControlSurface,
    engine::{self, EngineSetup},
    midi::{self, MidiEvent},
    note::Note,
    osc::OscListener,
    synth::{PresetKey, PresetStore, SynthPreset},
};
use std::{path::PathBuf, sync::mpsc, time::Duration, time::Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONTROL_INTERVAL: Duration = Duration::from_millis(5);
const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Polyphonic synthesiser driven by MIDI and OSC.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// MIDI channel to listen on, 1-16. All channels when omitted.
    channel: Option<u8>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;
    let channel = match args.channel {
        Some(user) => Some(midi::channel_from_user(user).ok_or("MIDI channel must be between 1 and 16")?),
        None => None,
    };

    // Open the output first, everything else is sized by it
    let device = OutputDevice::open_default(config.audio.channels)?;
    let channels = device.channels();
    let setup = EngineSetup {
        channels,
        partials: config.synth.partials,
        block_size: config.audio.block_size,
        queue_capacity: config.synth.queue_capacity,
    };

    let presets = match &config.synth.presets {
        Some(path) => PresetStore::load(path)?,
        None => PresetStore::new(),
    };
    let initial = match &config.synth.preset {
        Some(name) => presets.recall(&PresetKey::Name(name.clone()))?.clone(),
        None => presets
            .recall(&PresetKey::Index(0))
            .cloned()
            .unwrap_or_else(|_| SynthPreset::harmonic("default", config.synth.partials, channels)),
    };
    info!(kind = ?config.synth.kind, voices = config.synth.voices, preset = %initial.name, presets = presets.len(), "starting synth");

    let mut collector = Collector::new();
    let instrument = config.synth.kind.build(
        config.synth.voices,
        config.synth.partials,
        device.sample_rate(),
        (0..channels).collect(),
        config.synth.seed.unwrap_or_else(rand::random),
    );
    let (controller, engine) = engine::channel(instrument, &setup, initial, &collector.handle());
    let _stream = device.play(engine)?;
    let mut surface = ControlSurface::new(controller, presets);

    // OSC control
    let (osc_tx, osc_rx) = mpsc::channel();
    let _listener = match config.osc.port {
        Some(port) => Some(OscListener::spawn(("0.0.0.0", port), move |msg, _| {
            osc_tx.send(msg).ok();
        })?),
        None => None,
    };

    // Get or generate MIDI input
    let (midi_tx, midi_rx) = mpsc::channel();
    let _connection = match midi::connect_first_port(midi_tx.clone(), channel) {
        Ok(Some(connection)) => Some(connection),
        Ok(None) => {
            warn!("no MIDI input ports available, playing a test pattern");
            spawn_arpeggio(midi_tx, channel.unwrap_or(0));
            None
        }
        Err(err) => {
            warn!(%err, "MIDI unavailable, playing a test pattern");
            spawn_arpeggio(midi_tx, channel.unwrap_or(0));
            None
        }
    };

    // Control loop
    let mut last_tick = Instant::now();
    let mut last_stats = Instant::now();
    let mut reported_drops = 0;
    loop {
        while let Ok(event) = midi_rx.try_recv() {
            surface.handle_midi(event);
        }
        while let Ok(msg) = osc_rx.try_recv() {
            surface.handle_message(&msg);
        }

        let now = Instant::now();
        surface.tick(now.duration_since(last_tick).as_secs_f32());
        last_tick = now;
        collector.collect();

        if now.duration_since(last_stats) >= STATS_INTERVAL {
            last_stats = now;
            let dropped = surface.controller().dropped_triggers();
            if dropped > reported_drops {
                warn!(dropped = dropped - reported_drops, "notes dropped, no free voice");
                reported_drops = dropped;
            }
            info!(active = surface.controller().active_voices(), "voices");
        }

        std::thread::sleep(CONTROL_INTERVAL);
    }
}

/// Plays a major arpeggio from middle C forever, for sound checks without a keyboard.
fn spawn_arpeggio(tx: mpsc::Sender<MidiEvent>, channel: u8) {
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(2000));
        loop {
            for i in [0, 4, 7, 4] {
                let note = Note::middle_c().transpose(i);
                let on = MidiEvent::NoteOn {
                    channel,
                    note,
                    velocity: 127,
                };
                let off = MidiEvent::NoteOff {
                    channel,
                    note,
                    velocity: 0,
                };
                if tx.send(on).is_err() {
                    return;
                }
                std::thread::sleep(Duration::from_millis(50));
                tx.send(off).ok();
                std::thread::sleep(Duration::from_millis(450));
            }
        }
    });
}
