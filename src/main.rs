pub(crate) mod colorutils;
pub(crate) mod config;
pub(crate) mod effects;
pub(crate) mod framepacer;
pub(crate) mod imagefield;
pub(crate) mod layout;
pub(crate) mod opcoutput;
pub(crate) mod renderer;
pub(crate) mod sampler;
pub(crate) mod transform;
pub(crate) mod weather;

use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::{FixedOffset, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::colorutils::Color;
use crate::config::{Config, ConfigError};
use crate::effects::{FrameContext, LightingEffect};
use crate::framepacer::FramePacer;
use crate::opcoutput::{OpcOutput, PixelSink, SinkError, OUTPUT_SCALE};
use crate::renderer::Renderer;
use crate::weather::WeatherMonitor;

#[derive(Parser)]
#[command(about = "Renders light effects over a pixel layout and streams them to an OPC server")]
struct Cli {
    /// Layout file with the pixel coordinates
    #[arg(short, long, value_name = "FILE")]
    layout: PathBuf,

    /// ip and port of the OPC server [default: 127.0.0.1:7890]
    #[arg(short, long, value_name = "HOST:PORT")]
    server: Option<String>,

    /// Frames per second [default: 20]
    #[arg(short, long)]
    fps: Option<f32>,

    /// TOML config file with the effect list and tuning
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long, value_name = "COUNT")]
    frames: Option<u64>,
}

fn load_config(args: &Cli) -> Result<Config, ConfigError> {
    let mut config = match args.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(server) = &args.server {
        config.server = server.clone();
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }

    config.validate()?;
    Ok(config)
}

fn unix_seconds() -> f64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(since_epoch) => since_epoch.as_secs_f64(),
        Err(_) => 0.0,
    }
}

fn create_weather_monitor(config: &Config) -> Result<Option<WeatherMonitor>, ConfigError> {
    let offset = match FixedOffset::east_opt(config.utc_offset_minutes * 60) {
        Some(offset) => offset,
        None => {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_minutes out of range: {}",
                config.utc_offset_minutes
            )))
        }
    };

    Ok(config.weather_file.as_ref().map(|path| {
        WeatherMonitor::new(
            path.clone(),
            Duration::from_secs(config.weather_refresh_secs),
            offset,
        )
    }))
}

fn scale_output(pixels: &[Color], output: &mut Vec<Color>) {
    output.clear();
    output.extend(pixels.iter().map(|c| colorutils::scale(*c, OUTPUT_SCALE)));
}

/// Decides when frames happen and at which wall-clock time.
trait FrameDriver {
    /// Wall-clock seconds for frame number `frame`, or `None` to stop.
    fn next_frame(&mut self, frame: u64) -> Option<f64>;

    /// Runs after the frame was sent.
    fn end_frame(&mut self);
}

/// Follows the system clock, paces frames and stops on ctrl-c or the frame
/// limit.
struct LiveDriver {
    running: Arc<AtomicBool>,
    frame_limit: Option<u64>,
    pacer: FramePacer,
    weather: Option<WeatherMonitor>,
}

impl FrameDriver for LiveDriver {
    fn next_frame(&mut self, frame: u64) -> Option<f64> {
        if !self.running.load(Ordering::SeqCst) {
            return None;
        }
        if self.frame_limit.map_or(false, |limit| frame >= limit) {
            return None;
        }

        if let Some(weather) = self.weather.as_mut() {
            weather.poll(Instant::now(), Utc::now());
        }

        Some(unix_seconds())
    }

    fn end_frame(&mut self) {
        self.pacer.sleep_until_next_frame();
    }
}

/// Tracks whether the pixel server accepts frames, so an outage is reported
/// once instead of every frame.
#[derive(Default)]
struct SinkHealth {
    failing: bool,
}

impl SinkHealth {
    /// Logs the outcome of one send. Returns true when the state changed.
    fn record(&mut self, result: Result<(), SinkError>) -> bool {
        match result {
            Ok(()) if self.failing => {
                log::info!("Pixel server is back");
                self.failing = false;
                true
            }
            Ok(()) => false,
            Err(err) if self.failing => {
                log::debug!("{err}");
                false
            }
            Err(err) => {
                log::warn!("{err}");
                self.failing = true;
                true
            }
        }
    }
}

/// Renders and sends frames until the driver stops. Sink errors never end
/// the loop. Returns the number of frames rendered.
fn run_frames(
    renderer: &mut Renderer,
    effects: &mut [Box<dyn LightingEffect>],
    sink: &mut dyn PixelSink,
    channel: u8,
    driver: &mut dyn FrameDriver,
    start_time: f64,
) -> u64 {
    let mut output = Vec::with_capacity(renderer.pixel_count());
    let mut health = SinkHealth::default();
    let mut frame = 0u64;

    while let Some(wall_time) = driver.next_frame(frame) {
        let context = FrameContext::new(frame, wall_time, start_time);
        log::trace!("Frame {} at {:.3} s", context.frame, context.elapsed);
        let pixels = renderer.render(effects, &context);
        scale_output(pixels, &mut output);

        health.record(sink.put_pixels(channel, &output));

        frame += 1;
        driver.end_frame();
    }

    frame
}

fn run(args: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args)?;

    let coordinates = layout::load_layout(&args.layout)?;
    log::info!(
        "Parsed {} pixels from {}",
        coordinates.len(),
        args.layout.display()
    );

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut effects = effects::build_effects(&config.effects, coordinates.len(), &mut rng)?;
    let mut renderer = Renderer::new(coordinates);

    let mut sink = OpcOutput::new(&config.server);
    if let Err(err) = sink.connect() {
        // keep running in case the server appears later
        log::warn!("{err}");
    }

    let running = Arc::new(AtomicBool::new(true));
    let handler_running = Arc::clone(&running);
    ctrlc::set_handler(move || handler_running.store(false, Ordering::SeqCst))?;

    let mut driver = LiveDriver {
        running,
        frame_limit: args.frames,
        pacer: FramePacer::new(config.fps, config.filter_gain),
        weather: create_weather_monitor(&config)?,
    };

    log::info!("Sending pixels (ctrl-c to exit)");

    let frames = run_frames(
        &mut renderer,
        &mut effects,
        &mut sink,
        config.channel,
        &mut driver,
        unix_seconds(),
    );

    log::info!("Stopped after {frames} frames");
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    if let Err(err) = run(args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
