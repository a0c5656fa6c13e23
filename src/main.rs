//! CCD Camera CLI
//!
//! Command-line interface for querying the camera, acquiring frames and
//! running driver scripts.

use ccd_camera::{
    capture::{Camera, DriverKind, FileConfig},
    driver::{Driver, SimulatedConfig, SimulatedDriver},
    metrics::{MetricsRegistry, MetricsSnapshot},
    Error, Roi,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print camera name, sensor size and camera count.
    Info,
    /// Acquire one or more frames.
    Acquire {
        /// First row of the region.
        #[arg(long, default_value_t = 0)]
        top: i32,
        /// First column of the region.
        #[arg(long, default_value_t = 0)]
        left: i32,
        /// Row past the end of the region. Full frame when omitted.
        #[arg(long)]
        bottom: Option<i32>,
        /// Column past the end of the region. Full frame when omitted.
        #[arg(long)]
        right: Option<i32>,
        /// Binning factor. Configured default when omitted.
        #[arg(long)]
        binning: Option<u32>,
        /// Exposure in seconds. Configured default when omitted.
        #[arg(long)]
        exposure: Option<f64>,
        /// Ask the vendor software to display the image.
        #[arg(long)]
        display: bool,
        /// Acquire integer counts into a local buffer.
        #[arg(long)]
        int: bool,
        /// Number of frames to acquire.
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Print session metrics in Prometheus format afterwards.
        #[arg(long)]
        metrics: bool,
    },
    /// Forward a script to the vendor runtime.
    Script {
        /// Script text.
        command: String,
    },
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("CCD camera v{}", ccd_camera::VERSION);

    let config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };

    let result = match config.driver.kind {
        DriverKind::Simulated => {
            let [width, height] = config.camera.dimensions;
            let driver = SimulatedDriver::new(SimulatedConfig::with_dimensions(
                width as i32,
                height as i32,
            ));
            Camera::from_config(driver, &config).and_then(|camera| run(camera, args.command))
        }
        kind => run_vendor(kind, &config, args.command),
    };

    if let Err(e) = result {
        eprintln!("Error (status {}): {}", e.status(), e);
        std::process::exit(1);
    }
}

#[cfg(feature = "vendor")]
fn run_vendor(kind: DriverKind, config: &FileConfig, command: Command) -> Result<(), Error> {
    use ccd_camera::driver::{VendorDriver, VendorLibrary};

    let library = match kind {
        DriverKind::Gatan => VendorLibrary::Gatan,
        _ => VendorLibrary::Simulation,
    };
    let driver = VendorDriver::load(library, &config.driver.library_dir)?;
    let camera = Camera::from_config(driver, config)?;
    run(camera, command)
}

#[cfg(not(feature = "vendor"))]
fn run_vendor(kind: DriverKind, _config: &FileConfig, _command: Command) -> Result<(), Error> {
    warn!("Driver {:?} requires building with the `vendor` feature", kind);
    Err(ccd_camera::driver::DriverError::Unsupported("vendor library").into())
}

fn run<D: Driver>(camera: Camera<D>, command: Command) -> Result<(), Error> {
    match command {
        Command::Info => {
            let session = camera.session();
            println!("Camera:      {}", camera.name());
            println!("Driver:      {}", session.driver_label());
            println!("Info:        {}", session.is_camera_info_available()?);
            match session.camera_dimensions() {
                Ok(dims) => println!("Dimensions:  {}", dims),
                Err(e) => println!("Dimensions:  unavailable ({})", e),
            }
            println!("Cameras:     {}", session.camera_count()?);
        }
        Command::Acquire {
            top,
            left,
            bottom,
            right,
            binning,
            exposure,
            display,
            int,
            count,
            metrics,
        } => {
            let region = match (bottom, right) {
                (Some(bottom), Some(right)) => Some(Roi::new(top, left, bottom, right)),
                _ => None,
            };

            let stop = Arc::new(AtomicBool::new(false));
            let flag = stop.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
                warn!("Failed to install Ctrl-C handler: {}", e);
            }

            if int {
                for _ in 0..count {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let (counts, size) = camera.get_counts(exposure, binning, region, display)?;
                    let min = counts.iter().min().copied().unwrap_or_default();
                    let max = counts.iter().max().copied().unwrap_or_default();
                    println!("Counts {}: min {} max {}", size, min, max);
                }
            } else {
                let mut movie = camera.movie(count as usize, exposure, binning, region, display)?;
                while !stop.load(Ordering::SeqCst) {
                    let Some(frame) = movie.next() else {
                        break;
                    };
                    let frame = frame?;
                    match frame.statistics() {
                        Some((min, max, mean)) => println!(
                            "Frame {}: {} at {}, min {:.1} max {:.1} mean {:.2}",
                            frame.sequence(),
                            frame.dimensions(),
                            frame.captured_at().format("%H:%M:%S%.3f"),
                            min,
                            max,
                            mean
                        ),
                        None => println!("Frame {}: empty", frame.sequence()),
                    }
                }
            }
            if stop.load(Ordering::SeqCst) {
                warn!("Interrupted by Ctrl-C");
            }

            let stats = camera.session().stats();
            info!(
                "Acquired {} frames ({} failed, {} rejected)",
                stats.acquisitions, stats.failed_acquisitions, stats.rejected_requests
            );

            if metrics {
                match MetricsRegistry::new() {
                    Ok(registry) => {
                        registry.update(&MetricsSnapshot::from(&stats));
                        match registry.encode() {
                            Ok(text) => print!("{}", text),
                            Err(e) => warn!("Failed to encode metrics: {}", e),
                        }
                    }
                    Err(e) => warn!("Failed to create metrics registry: {}", e),
                }
            }
        }
        Command::Script { command } => {
            let status = camera.session().execute_script(&command)?;
            println!("Script status: {}", status);
        }
    }

    camera.close();
    Ok(())
}
