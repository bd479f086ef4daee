use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "reenact", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a storyboard JSON without playing it.
    Validate(ValidateArgs),
    /// Play a storyboard and write the mutation trace as JSON.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input storyboard JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Input storyboard JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Optional asset manifest JSON (scene id -> element id -> file path).
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Output playback JSON path.
    #[arg(long)]
    out: PathBuf,

    /// Rendering strategy.
    #[arg(long, value_enum, default_value_t = ModeChoice::Screenshot)]
    mode: ModeChoice,

    /// Seed for typing jitter; omit for entropy.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Screenshot,
    Reconstructed,
    Hybrid,
}

impl From<ModeChoice> for reenact::RenderMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Screenshot => Self::ScreenshotOnly,
            ModeChoice::Reconstructed => Self::ReconstructedOnly,
            ModeChoice::Hybrid => Self::Hybrid,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn read_storyboard(path: &Path) -> anyhow::Result<reenact::Storyboard> {
    let f = File::open(path).with_context(|| format!("open storyboard '{}'", path.display()))?;
    let r = BufReader::new(f);
    let board: reenact::Storyboard =
        serde_json::from_reader(r).with_context(|| "parse storyboard JSON")?;
    Ok(board)
}

fn read_manifest(path: &Path) -> anyhow::Result<reenact::AssetManifest> {
    let f = File::open(path).with_context(|| format!("open manifest '{}'", path.display()))?;
    let r = BufReader::new(f);
    let manifest: reenact::AssetManifest =
        serde_json::from_reader(r).with_context(|| "parse manifest JSON")?;
    Ok(manifest)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let board = read_storyboard(&args.in_path)?;
    board.validate()?;
    eprintln!(
        "ok: {} scene(s), {} action(s)",
        board.scenes.len(),
        board.actions.len()
    );
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let board = read_storyboard(&args.in_path)?;
    board.validate()?;

    let opts = reenact::PlayerOptions {
        mode: args.mode.into(),
        seed: args.seed,
        ..reenact::PlayerOptions::default()
    };

    let mut player = reenact::Player::new(&board, opts);
    if let Some(path) = &args.assets {
        player = player.with_assets(read_manifest(path)?);
    }
    let playback = player.play()?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let f = File::create(&args.out)
        .with_context(|| format!("create output '{}'", args.out.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), &playback)
        .with_context(|| "write playback JSON")?;

    eprintln!(
        "wrote {} ({} mutations, {:.2}s)",
        args.out.display(),
        playback.trace.len(),
        playback.duration_secs
    );
    Ok(())
}
