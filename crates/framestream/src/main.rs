use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

use framestream::config::{DecodeMode, PlayerConfig, PresentPreference};
use framestream::present::cpu::{CpuSurface, DeferredBackend};
use framestream::source::memory::{MemoryClip, MemoryLibrary};
use framestream::Player;

const CLIP_PATH: &str = "pattern.mov";

struct DemoArgs {
    ticks: u32,
    speed: Option<f64>,
    frames: u32,
    fps: f64,
    no_loop: bool,
    sync: bool,
    direct: bool,
}

fn parse_args() -> Result<DemoArgs> {
    let mut parsed = DemoArgs {
        ticks: 180,
        speed: None,
        frames: 60,
        fps: 30.0,
        no_loop: false,
        sync: false,
        direct: false,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .with_context(|| format!("{name} needs a value"))
        };
        match arg.as_str() {
            "--ticks" => parsed.ticks = value("--ticks")?.parse().context("--ticks")?,
            "--speed" => parsed.speed = Some(value("--speed")?.parse().context("--speed")?),
            "--frames" => parsed.frames = value("--frames")?.parse().context("--frames")?,
            "--fps" => parsed.fps = value("--fps")?.parse().context("--fps")?,
            "--no-loop" => parsed.no_loop = true,
            "--sync" => parsed.sync = true,
            "--direct" => parsed.direct = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    if parsed.frames == 0 || parsed.fps <= 0.0 {
        bail!("--frames and --fps must be positive");
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;

    let mut config = PlayerConfig::load();
    if let Some(speed) = args.speed {
        config.speed = speed;
    }
    if args.no_loop {
        config.looping = false;
    }
    if args.sync {
        config.decode_mode = DecodeMode::Sync;
    }
    if args.direct {
        config.present_mode = PresentPreference::DirectCopy;
    }
    let tick_rate = config.nominal_tick_rate;

    let library = Arc::new(MemoryLibrary::new());
    library.insert(CLIP_PATH, MemoryClip::pattern(256, 144, args.frames, args.fps));

    let mut player = Player::new(library, config);
    player.open(CLIP_PATH)?;

    let mut backend = DeferredBackend::default();
    let mut surface = CpuSurface::default();
    let tick = Duration::from_secs_f64(1.0 / tick_rate);
    let started = Instant::now();
    let mut last_index = None;

    for n in 0..args.ticks {
        let tick_start = Instant::now();
        player.update(1.0 / tick_rate, &mut backend, &mut surface);
        backend.service(&mut surface);

        if surface.index != last_index {
            log::debug!(
                "tick {n}: t={:.3}s frame {:?} (upload #{})",
                player.time(),
                surface.index,
                surface.uploads
            );
            last_index = surface.index;
        }
        if let Some(pipeline) = player.pipeline()
            && n % tick_rate.max(1.0) as u32 == 0
        {
            log::info!(
                "t={:.2}s frame {:?} decoded={} pool={:?}",
                player.time(),
                surface.index,
                pipeline.decoded_frames(),
                pipeline.stats()
            );
        }

        if let Some(rest) = tick.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    log::info!(
        "Played {} ticks in {:.2}s, {} uploads",
        args.ticks,
        started.elapsed().as_secs_f64(),
        surface.uploads
    );
    Ok(())
}
