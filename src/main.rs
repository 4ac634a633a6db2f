//! tonebox - toy instrument sounds from the terminal

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tonebox::config::{self, ToneboxConfig, DEFAULT_CONFIG_FILE};
use tonebox::engine::player::{default_device_name, device_sample_rate, list_output_devices};
use tonebox::engine::{Completion, FnSink, ManualClock, Player, PlayerOptions, SystemClock, WavExporter};
use tonebox::practice::{Attempt, PracticeSession};
use tonebox::synth::Pad;
use tonebox::{play_and_drive, Sequence, Studio};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config: config_path,
            sequence,
        } => {
            let cfg = config::load_or_default(&config_path)?;
            let sequence = Sequence::load(&sequence)?;
            println!("Playing \"{}\" ({} events)...", sequence.title, sequence.len());

            let rt = tokio::runtime::Runtime::new()?;
            let outcome = rt.block_on(async {
                let (studio, mut player) = open_studio(&cfg)?;
                let sink = FnSink::new(print_progress, || println!());
                let outcome = play_and_drive(studio, &sequence, Box::new(sink), tick_interval(&cfg)).await;
                player.stop();
                Ok::<_, anyhow::Error>(outcome)
            })?;

            match outcome {
                Completion::Finished => println!("Done."),
                Completion::Stopped => println!("Stopped."),
            }
        }

        Commands::Render {
            config: config_path,
            sequence,
            output,
        } => {
            let cfg = config::load_or_default(&config_path)?;
            let sequence = Sequence::load(&sequence)?;
            let sample_rate = cfg.audio.sample_rate;

            println!("Rendering \"{}\" to {:?}...", sequence.title, output);

            let clock = ManualClock::new();
            let mut studio = Studio::from_config(&cfg, sample_rate as f64, Arc::new(clock.clone()));
            let mut exporter = WavExporter::create(&output, sample_rate)?;

            let tick_ms = cfg.playback.tick_interval_ms;
            let frames = (sample_rate as u64 * tick_ms / 1000).max(1) as usize;
            let sink = FnSink::new(print_progress, || println!());
            studio.play_sequence(&sequence, Box::new(sink));

            while !studio.is_idle() {
                exporter.write_from(&mut studio, frames)?;
                clock.advance_ms(tick_ms as f64);
                studio.tick();
            }

            let secs = exporter.duration_secs();
            exporter.finalize()?;
            println!("Rendered {:.2}s to {:?}", secs, output);
        }

        Commands::Practice {
            config: config_path,
            level,
        } => {
            let cfg = config::load_or_default(&config_path)?;
            let mut session = PracticeSession::new(level, &mut rand::thread_rng());
            let pads: Vec<&str> = Pad::ALL.iter().map(|p| p.id()).collect();
            println!("Pads: {}", pads.join(", "));

            let rt = tokio::runtime::Runtime::new()?;
            let (studio, mut player) = rt.block_on(async { open_studio(&cfg) })?;

            let stdin = std::io::stdin();
            let mut lines = stdin.lock().lines();
            'round: loop {
                println!("Watch the pads...");
                rt.block_on(play_and_drive(
                    studio.clone(),
                    &session.demo_sequence(),
                    Box::new(tonebox::engine::NullSink),
                    tick_interval(&cfg),
                ));
                println!("Your turn! Type one pad per line.");

                loop {
                    print!("> ");
                    std::io::stdout().flush()?;
                    let Some(line) = lines.next() else {
                        break 'round;
                    };
                    let key = line?.trim().to_lowercase();
                    if key.is_empty() {
                        continue;
                    }

                    if let Ok(mut guard) = studio.lock() {
                        guard.hit_pad(&key);
                    }
                    match session.check(&key) {
                        Attempt::Advanced => {}
                        Attempt::Perfect => {
                            println!("PERFECT!");
                            break 'round;
                        }
                        Attempt::Mistake => {
                            println!("Try again.");
                            continue 'round;
                        }
                        Attempt::Ignored => break 'round,
                    }
                }
            }

            std::thread::sleep(Duration::from_millis(500));
            player.stop();
        }

        Commands::Kits { config: config_path } => {
            let cfg = config::load_or_default(&config_path)?;
            let studio = Studio::from_config(&cfg, cfg.audio.sample_rate as f64, Arc::new(ManualClock::new()));

            println!("Drum kits:\n");
            for kit in studio.kits().iter() {
                let marker = if kit.name == studio.kit().name { " (selected)" } else { "" };
                println!("{}{}", kit.name, marker);
                for pad in Pad::ALL {
                    println!("  {:<6} {}", pad.id(), kit.label(pad));
                }
            }
        }

        Commands::Devices => {
            println!("Available audio devices:\n");

            if let Some(name) = default_device_name() {
                println!("Default output: {}\n", name);
            }

            println!("Output devices:");
            let devices = list_output_devices();
            if devices.is_empty() {
                println!("  (none found)");
            }
            for (name, config) in devices {
                println!("  - {} ({} Hz, {} ch)", name, config.sample_rate.0, config.channels);
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Buffer size: {}", cfg.audio.buffer_size);
                    println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
                    println!("  Kit: {}", cfg.instrument.kit);
                    println!("  Tone: {}", cfg.instrument.tone);
                    println!("  Sustain: {}", if cfg.instrument.sustain { "on" } else { "off" });
                    println!("  Tick interval: {} ms", cfg.playback.tick_interval_ms);
                    println!(
                        "  Mixer: {} tracks, {:.1}s loop",
                        cfg.mixer.tracks, cfg.mixer.loop_duration_secs
                    );
                    println!("  Custom kits: {}", cfg.kits.len());
                    for kit in &cfg.kits {
                        println!("    - {}", kit.name);
                    }
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../tonebox.example.yaml");

            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                println!("{} already exists. Not overwriting.", DEFAULT_CONFIG_FILE);
            } else {
                std::fs::write(path, example_config)?;
                println!("Created {} with example configuration.", DEFAULT_CONFIG_FILE);
            }
        }
    }

    Ok(())
}

/// Build a studio at the device's rate and start pulling audio from it.
/// Ctrl-C silences the studio, which ends any `drive` loop.
fn open_studio(cfg: &ToneboxConfig) -> Result<(Arc<Mutex<Studio>>, Player)> {
    let sample_rate = device_sample_rate(cfg.audio.device.as_deref())?;
    let studio = Arc::new(Mutex::new(Studio::from_config(
        cfg,
        sample_rate as f64,
        Arc::new(SystemClock::new()),
    )));

    let mut player = Player::new();
    let options = PlayerOptions {
        device: cfg.audio.device.clone(),
        buffer_size: Some(cfg.audio.buffer_size),
    };
    player.start_with(studio.clone(), &options)?;

    let handle = studio.clone();
    ctrlc::set_handler(move || {
        if let Ok(mut studio) = handle.lock() {
            studio.stop_all();
        }
    })
    .context("failed to install Ctrl-C handler")?;

    Ok((studio, player))
}

fn tick_interval(cfg: &ToneboxConfig) -> Duration {
    Duration::from_millis(cfg.playback.tick_interval_ms)
}

fn print_progress(percent: f64) {
    print!("\r  Progress: {:>3.0}%", percent);
    let _ = std::io::stdout().flush();
}
