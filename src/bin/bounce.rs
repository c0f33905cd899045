//! Renders a fixed arpeggio through one of the synthesisers into a multichannel
//! 32-bit float WAV file, without touching any audio device.

use basedrop::Collector;
use clap::Parser;
use hound::{SampleFormat, WavSpec, WavWriter};
use resonant_field::{
    config::Config,
    engine::{self, EngineSetup},
    note::Note,
    synth::{PresetKey, PresetStore, SynthKind, SynthPreset},
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PATTERN: [i8; 4] = [0, 4, 7, 12];

#[derive(Parser, Debug)]
#[command(author, version, about = "Render a test arpeggio to a WAV file")]
struct Args {
    /// Output WAV path.
    output: PathBuf,

    /// Synthesiser to render: additive, modal or chaos. Overrides the config.
    #[arg(long, value_parser = parse_kind)]
    kind: Option<SynthKind>,

    /// Number of output channels.
    #[arg(long, default_value_t = 2)]
    channels: usize,

    #[arg(long, default_value_t = 48000)]
    sample_rate: u32,

    /// Seconds between note onsets.
    #[arg(long, default_value_t = 0.5)]
    step: f32,

    /// Seconds each note is held.
    #[arg(long, default_value_t = 0.25)]
    gate: f32,

    /// Times the pattern is played.
    #[arg(long, default_value_t = 2)]
    repeats: usize,

    /// Seconds rendered after the last release.
    #[arg(long, default_value_t = 4.0)]
    tail: f32,

    /// TOML configuration file for voices, partials and presets.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_kind(name: &str) -> Result<SynthKind, String> {
    match name {
        "additive" => Ok(SynthKind::Additive),
        "modal" => Ok(SynthKind::Modal),
        "chaos" => Ok(SynthKind::Chaos),
        other => Err(format!("unknown synth kind '{other}'")),
    }
}

/// One note event at a frame offset.
struct Event {
    frame: usize,
    note: Note,
    on: bool,
}

fn schedule(args: &Args) -> Vec<Event> {
    let rate = args.sample_rate as f32;
    let step = (args.step.max(0.0) * rate) as usize;
    let gate = (args.gate.max(0.0) * rate) as usize;
    let mut events: Vec<Event> = PATTERN
        .iter()
        .cycle()
        .take(PATTERN.len() * args.repeats)
        .enumerate()
        .flat_map(|(i, offset)| {
            let note = Note::middle_c().transpose(*offset);
            let start = i * step;
            [
                Event {
                    frame: start,
                    note,
                    on: true,
                },
                Event {
                    frame: start + gate,
                    note,
                    on: false,
                },
            ]
        })
        .collect();
    events.sort_by_key(|e| e.frame);
    events
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;
    if args.channels == 0 {
        return Err("at least one channel is required".into());
    }
    let kind = args.kind.unwrap_or(config.synth.kind);

    let presets = match &config.synth.presets {
        Some(path) => PresetStore::load(path)?,
        None => PresetStore::new(),
    };
    let preset = match &config.synth.preset {
        Some(name) => presets.recall(&PresetKey::Name(name.clone()))?.clone(),
        None => SynthPreset::harmonic("bounce", config.synth.partials, args.channels),
    };

    let setup = EngineSetup {
        channels: args.channels,
        partials: config.synth.partials,
        block_size: config.audio.block_size,
        queue_capacity: config.synth.queue_capacity,
    };
    let mut collector = Collector::new();
    let instrument = kind.build(
        config.synth.voices,
        config.synth.partials,
        args.sample_rate as f32,
        (0..args.channels).collect(),
        config.synth.seed.unwrap_or(0),
    );
    let (mut controller, mut engine) = engine::channel(instrument, &setup, preset, &collector.handle());

    let events = schedule(&args);
    let last = events.last().map_or(0, |e| e.frame);
    let total = last + (args.tail.max(0.0) * args.sample_rate as f32) as usize;

    let spec = WavSpec {
        channels: args.channels as u16,
        sample_rate: args.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&args.output, spec)?;
    info!(?kind, path = %args.output.display(), seconds = total as f32 / args.sample_rate as f32, "bouncing");

    let mut pending = events.iter().peekable();
    let mut frame = 0;
    let mut peak = 0.0f32;
    while frame < total {
        while let Some(event) = pending.next_if(|e| e.frame <= frame) {
            let sent = if event.on {
                controller.note_on(event.note, 100)
            } else {
                controller.note_off(event.note)
            };
            if let Err(err) = sent {
                warn!(%err, note = %event.note, "note event dropped");
            }
        }

        let frames = engine.block_size().min(total - frame);
        let block = engine.render(frames);
        peak = peak.max(block.peak());
        for i in 0..frames {
            for ch in 0..args.channels {
                writer.write_sample(block.channel(ch)[i])?;
            }
        }
        frame += frames;
        collector.collect();
    }
    writer.finalize()?;

    let dropped = controller.dropped_triggers();
    if dropped > 0 {
        warn!(dropped, "notes dropped, no free voice");
    }
    info!(peak, frames = total, "done");
    Ok(())
}
