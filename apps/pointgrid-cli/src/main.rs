use anyhow::Context;
use clap::{Parser, Subcommand};
use pointgrid_common::Viewport;
use pointgrid_render_wgpu::shaders;
use pointgrid_runtime::{HeadlessHost, Sketch, SketchConfig, StepOutcome, StopSignal};
use pointgrid_scene::build_grid;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pointgrid-cli", about = "CLI tool for pointgrid operations")]
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
    /// Build the grid attribute buffers and print their layout
    Grid {
        /// Grid side length
        #[arg(short, long, default_value = "512")]
        size: u32,
        /// Number of leading vertices to print
        #[arg(long, default_value = "4")]
        head: usize,
    },
    /// Run the sketch against a headless surface with simulated resizes
    Simulate {
        /// JSON sketch configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Frame callbacks to run after the first frame
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// Milliseconds between frame callbacks
        #[arg(long, default_value = "16")]
        frame_ms: u64,
        /// Resize events as `at_ms:WIDTHxHEIGHT`, e.g. `100:1024x768`
        #[arg(long = "resize")]
        resizes: Vec<String>,
    },
}

/// A resize signal scheduled at a fixed offset from the simulation start.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ResizeEvent {
    at: Duration,
    viewport: Viewport,
}

fn parse_resize(spec: &str) -> anyhow::Result<ResizeEvent> {
    let (at, size) = spec
        .split_once(':')
        .with_context(|| format!("resize `{spec}` is not `at_ms:WIDTHxHEIGHT`"))?;
    let (w, h) = size
        .split_once('x')
        .with_context(|| format!("resize size `{size}` is not `WIDTHxHEIGHT`"))?;
    Ok(ResizeEvent {
        at: Duration::from_millis(at.trim().parse().context("invalid resize offset")?),
        viewport: Viewport::new(
            w.trim().parse().context("invalid resize width")?,
            h.trim().parse().context("invalid resize height")?,
        ),
    })
}

/// Offset of the `n`th frame callback from the simulation start.
fn frame_time(frame_ms: u64, n: u64) -> Duration {
    Duration::from_millis(frame_ms.saturating_mul(n))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("pointgrid-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", pointgrid_common::crate_info());
            println!("scene: {}", pointgrid_scene::crate_info());
            println!("runtime: {}", pointgrid_runtime::crate_info());
            let config = SketchConfig::default();
            println!(
                "defaults: grid={}x{} fov={} near={} far={} distance={} debounce={}ms",
                config.grid_side,
                config.grid_side,
                config.camera.fov_degrees,
                config.camera.near,
                config.camera.far,
                config.camera.distance,
                config.resize_debounce_ms
            );
        }
        Commands::Grid { size, head } => {
            let grid = build_grid(size)?;
            let count = grid.point_count();
            println!("Grid {size}x{size}: {count} points, {} floats per buffer", grid.positions.len());

            let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
            for k in 0..count {
                let [x, _, _] = grid.positions.get_xyz(k);
                min_x = min_x.min(x);
                max_x = max_x.max(x);
            }
            println!("Position extent: x in [{min_x}, {max_x}]");

            for k in 0..head.min(count) {
                let (i, j) = grid.grid_index(k);
                let p = grid.positions.get_xyz(k);
                let c = grid.coordinates.get_xyz(k);
                println!(
                    "  [{k}] ({i}, {j}) position=({}, {}, {}) coordinates=({}, {}, {})",
                    p[0], p[1], p[2], c[0], c[1], c[2]
                );
            }
        }
        Commands::Simulate {
            config,
            frames,
            frame_ms,
            resizes,
        } => {
            let config = match config {
                Some(path) => SketchConfig::load(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => SketchConfig::default(),
            };
            let mut events = resizes
                .iter()
                .map(|s| parse_resize(s))
                .collect::<anyhow::Result<Vec<_>>>()?;
            events.sort_by_key(|e| e.at);

            let host = HeadlessHost::new(Viewport::default()).with_container(config.container_id.clone());
            let mut sketch = Sketch::new(host, &config, shaders::bundled(), StopSignal::new())?;

            // Virtual clock: nothing sleeps, timestamps are offsets from t0.
            let t0 = Instant::now();
            let mut pending = events.into_iter().peekable();

            for n in 1..=frames {
                let now = t0 + frame_time(frame_ms, n);
                while let Some(event) = pending.next_if(|e| t0 + e.at <= now) {
                    sketch.host_mut().set_viewport(event.viewport);
                    sketch.on_resize(t0 + event.at);
                    tracing::info!(at_ms = event.at.as_millis() as u64, "resize signal");
                }
                if sketch.poll(now) {
                    tracing::info!(
                        at_ms = (now - t0).as_millis() as u64,
                        aspect = sketch.camera().aspect,
                        "resize settled"
                    );
                }
                if sketch.on_frame()? == StepOutcome::Halted {
                    break;
                }
            }

            println!("Frames rendered: {}", sketch.frames());
            println!("Resize settles: {}", sketch.resize_settles());
            println!("Camera aspect: {:.4}", sketch.camera().aspect);
            print!("{}", sketch.surface().describe());

            sketch.dispose();
        }
    }

    Ok(())
}
