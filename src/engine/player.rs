//! Real-time audio playback using cpal

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use super::Render;

/// Output stream options
#[derive(Debug, Clone, Default)]
pub struct PlayerOptions {
    /// Output device name; the host default when unset
    pub device: Option<String>,
    /// Frames per callback; the device default when unset
    pub buffer_size: Option<u32>,
}

/// Real-time audio player
pub struct Player {
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
    sample_rate: Option<u32>,
}

impl Player {
    pub fn new() -> Self {
        Self {
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
            sample_rate: None,
        }
    }

    /// Start pulling audio from `source` on the default device
    pub fn start<R: Render + 'static>(&mut self, source: Arc<Mutex<R>>) -> Result<()> {
        self.start_with(source, &PlayerOptions::default())
    }

    /// Start pulling audio from `source`
    pub fn start_with<R: Render + 'static>(
        &mut self,
        source: Arc<Mutex<R>>,
        options: &PlayerOptions,
    ) -> Result<()> {
        let device = find_device(options.device.as_deref())?;

        let config = device
            .default_output_config()
            .context("failed to query output config")?;
        let sample_format = config.sample_format();
        let mut stream_config: StreamConfig = config.into();
        if let Some(frames) = options.buffer_size {
            stream_config.buffer_size = BufferSize::Fixed(frames);
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32, R>(&device, &stream_config, source, running)?,
            SampleFormat::I16 => build_stream::<i16, R>(&device, &stream_config, source, running)?,
            SampleFormat::U16 => build_stream::<u16, R>(&device, &stream_config, source, running)?,
            other => return Err(anyhow!("Unsupported sample format: {:?}", other)),
        };

        stream.play()?;
        info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate = stream_config.sample_rate.0,
            "Audio output started"
        );
        self.sample_rate = Some(stream_config.sample_rate.0);
        self.stream = Some(stream);

        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream = None;
    }

    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sample rate of the open stream
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample rate the output device will run at
pub fn device_sample_rate(name: Option<&str>) -> Result<u32> {
    let device = find_device(name)?;
    let config = device
        .default_output_config()
        .context("failed to query output config")?;
    Ok(config.sample_rate().0)
}

fn find_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match name {
        Some(wanted) => host
            .output_devices()
            .context("failed to enumerate output devices")?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| anyhow!("Output device not found: {}", wanted)),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available")),
    }
}

fn build_stream<T, R>(
    device: &Device,
    config: &StreamConfig,
    source: Arc<Mutex<R>>,
    running: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
    R: Render + 'static,
{
    let channels = config.channels as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if !running.load(Ordering::SeqCst) {
                for sample in data.iter_mut() {
                    *sample = T::from_sample(0.0f32);
                }
                return;
            }

            // Never block the audio thread; emit silence when contended
            if let Ok(mut src) = source.try_lock() {
                for frame in data.chunks_mut(channels) {
                    let sample = src.render_sample() as f32;
                    for channel_sample in frame.iter_mut() {
                        *channel_sample = T::from_sample(sample);
                    }
                }
            } else {
                for sample in data.iter_mut() {
                    *sample = T::from_sample(0.0f32);
                }
            }
        },
        |err| {
            error!("Audio stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}
