use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use log::info;

use aetheric_animator::platform::{EngineShell, ShellDriver};
use aetheric_animator::{Engine, EngineBuilder};

#[derive(Parser, Debug)]
#[command(name = "aetheric-player", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a file in a window.
    Play(PlayArgs),
    /// Render frames headless and write the last one as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct SceneArgs {
    /// Input animation file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// State machine to activate instead of the default.
    #[arg(long)]
    state_machine: Option<String>,

    /// Render iterations per second.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Background colour as 0xAARRGGBB.
    #[arg(long, value_parser = parse_argb, default_value = "0xff404040")]
    background: u32,

    /// Use the wgpu device instead of the software one (needs the `gpu` feature).
    #[arg(long)]
    gpu: bool,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Initial window width (logical pixels).
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Initial window height (logical pixels).
    #[arg(long, default_value_t = 600)]
    height: u32,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Number of frames to advance before capturing.
    #[arg(long, default_value_t = 1)]
    frames: u64,

    /// Render width in pixels.
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Render height in pixels.
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Play(args) => cmd_play(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn parse_argb(value: &str) -> Result<u32, String> {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid colour '{value}': {e}"))
}

fn build_engine(args: &SceneArgs) -> anyhow::Result<Engine> {
    anyhow::ensure!(args.fps > 0.0, "--fps must be positive");
    let builder = EngineBuilder::new().with_fps(args.fps).with_clear_color(args.background);

    #[cfg(not(feature = "gpu"))]
    anyhow::ensure!(!args.gpu, "built without the `gpu` feature");

    #[cfg(feature = "gpu")]
    let builder = if args.gpu {
        builder.with_device_factory(aetheric_animator::platform::GpuDeviceFactory::new())
    } else {
        builder
    };

    Ok(builder.build())
}

fn load(engine: &Engine, args: &SceneArgs) -> anyhow::Result<()> {
    engine
        .try_load_file(&args.in_path)
        .with_context(|| format!("load '{}'", args.in_path.display()))?;

    if let Some(name) = &args.state_machine {
        anyhow::ensure!(
            engine.set_active_state_machine_by_name(name),
            "no state machine named '{name}' (available: {})",
            engine
                .enumerate_state_machines()
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    info!(
        "Loaded {} (artboard: {}, scene: {:?})",
        args.in_path.display(),
        engine.artboard_name().unwrap_or_default(),
        engine.active_scene_kind()
    );
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let engine = Arc::new(build_engine(&args.scene)?);
    load(&engine, &args.scene)?;

    let title = args
        .scene
        .in_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "aetheric-player".to_string());

    ShellDriver::new(EngineShell::new(engine))
        .with_title(title)
        .with_size(args.width, args.height)
        .run()?;
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let engine = build_engine(&args.scene)?;
    engine.try_initialize(args.width, args.height)?;
    load(&engine, &args.scene)?;

    for _ in 0..args.frames.max(1) {
        engine.step_frame();
    }

    let frame = engine
        .get_visual()
        .snapshot()
        .context("no frame was presented")?;

    write_png(&args.out, frame.to_straight_rgba(), frame.width, frame.height)?;
    eprintln!("wrote {}", args.out.display());
    engine.shutdown();
    Ok(())
}

fn write_png(path: &Path, rgba: Vec<u8>, width: u32, height: u32) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let img = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| anyhow::anyhow!("invalid rgba buffer size"))?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))
}
