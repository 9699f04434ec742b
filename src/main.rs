use anyhow::{Context, Result};
use camrng::{CaptureSource, Range, Session, SessionOptions, StubDevice};
use clap::Parser;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Preview polls per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Number of preview polls before capturing
    #[arg(long, default_value_t = 90)]
    preview_frames: u32,

    /// Upper bound on a single device read, in milliseconds
    #[arg(long, default_value_t = 500)]
    read_timeout_ms: u64,

    /// Smallest number to generate
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    min: i32,

    /// Largest number to generate
    #[arg(long, default_value_t = 1000, allow_negative_numbers = true)]
    max: i32,

    /// How many numbers to generate
    #[arg(short, long, default_value_t = 1)]
    count: u32,

    /// Use a synthetic noise source instead of a camera
    #[arg(long)]
    stub: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("camrng starting");
    tracing::info!("Range: [{}, {}]", args.min, args.max);
    tracing::info!("Preview: {} frames at {} fps", args.preview_frames, args.fps);

    let range = Range::new(args.min, args.max).context("Invalid range")?;

    let options = SessionOptions {
        read_timeout: Duration::from_millis(args.read_timeout_ms),
    };

    let session = if args.stub {
        tracing::info!("Using synthetic capture source");
        let source = CaptureSource::new(options.read_timeout);
        source
            .open_with(|| Ok(StubDevice::pattern(320, 240)))
            .context("Failed to open capture device")?;
        Session::with_source(source)
    } else {
        Session::open(args.input_device, options).context("Failed to open capture device")?
    };

    let result = run(&session, &args, range);
    session.stop();
    result
}

fn run(session: &Session, args: &Args, range: Range) -> Result<()> {
    run_preview(session, args.preview_frames, args.fps)?;

    let (frame, digest) = session.capture().context("Failed to capture frame")?;
    println!("Captured {}x{} frame", frame.width(), frame.height());
    println!("Hash: {digest}");

    for _ in 0..args.count {
        match session.generate_number(range) {
            Ok(value) => println!("Generated Number: {value}"),
            Err(err) => tracing::error!("Failed to generate number: {}", err),
        }
    }

    Ok(())
}

/// Stand-in for a UI timer: poll the preview at a fixed cadence
fn run_preview(session: &Session, frames: u32, target_fps: u32) -> Result<()> {
    if frames == 0 {
        return Ok(());
    }

    let frame_duration = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
    let mut shown = 0u64;
    let mut missed = 0u64;
    let mut total_read_time = Duration::ZERO;

    tracing::info!("Starting preview loop");

    for tick in 1..=frames {
        let loop_start = Instant::now();

        let preview = session
            .refresh_preview()
            .context("Failed to refresh preview")?;
        total_read_time += loop_start.elapsed();

        match preview {
            Some(frame) => {
                shown += 1;
                tracing::debug!("Preview {}: checksum {}", tick, frame.checksum());
            }
            None => missed += 1,
        }

        // Log stats every 30 frames
        if tick % 30 == 0 {
            let avg_read_ms = total_read_time.as_secs_f64() * 1000.0 / tick as f64;
            tracing::info!(
                "Frame {}: read={:.1}ms, shown={}, missed={}",
                tick,
                avg_read_ms,
                shown,
                missed
            );
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }

    Ok(())
}
