use log::{LevelFilter, error, info};
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;
use stepsync::config::{CONFIG_PATH, Config};
use stepsync::game::chart::build_chart;
use stepsync::game::gameplay::GameSession;
use stepsync::game::song::SongData;
use stepsync::parsing::simfile::load_simfile;

const USAGE: &str = "usage: stepsync <song.sm> [mode-id] [--list] [--config <file.ini>] [--audio-duration <seconds>]";

struct Args {
    simfile: PathBuf,
    mode_id: Option<usize>,
    list_only: bool,
    config_path: PathBuf,
    audio_duration_sec: Option<f64>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, Box<dyn Error>> {
    let mut simfile = None;
    let mut mode_id = None;
    let mut list_only = false;
    let mut config_path = PathBuf::from(CONFIG_PATH);
    let mut audio_duration_sec = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--list" => list_only = true,
            "--config" => {
                config_path = args.next().ok_or("--config needs a path")?.into();
            }
            "--audio-duration" => {
                let value = args.next().ok_or("--audio-duration needs a value")?;
                audio_duration_sec = Some(value.parse::<f64>()?);
            }
            _ if simfile.is_none() => simfile = Some(PathBuf::from(arg)),
            _ if mode_id.is_none() => mode_id = Some(arg.parse::<usize>()?),
            _ => return Err(format!("unexpected argument '{}'\n{}", arg, USAGE).into()),
        }
    }

    Ok(Args {
        simfile: simfile.ok_or(USAGE)?,
        mode_id,
        list_only,
        config_path,
        audio_duration_sec,
    })
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = Config::load(&args.config_path);
    let simfile = load_simfile(&args.simfile)?;
    let song = SongData::from_simfile(&simfile);

    println!("{} - {} ({} BPM)", song.artist, song.title, song.formatted_display_bpm());
    for mode in &song.modes {
        println!("  [{}] {} {} {}", mode.id, mode.chart_type, mode.difficulty, mode.meter);
    }
    if args.list_only {
        return Ok(());
    }

    let mode_id = match args.mode_id {
        Some(id) => id,
        None => song.modes.first().map(|m| m.id).ok_or("simfile has no charts")?,
    };
    let chart = build_chart(&simfile, mode_id)?;
    println!(
        "Playing [{}] {} {} ({}), {} tracks",
        mode_id,
        chart.chart_type,
        chart.difficulty,
        chart.short_hash,
        chart.num_tracks()
    );

    let mut session = GameSession::new(&config, chart);
    session.set_audio_duration(args.audio_duration_sec);
    let results = session.run_autoplay(Instant::now());

    println!("Results ({} notes):", results.total_notes);
    for entry in &results.counts {
        println!("  {:<10} {}", entry.name, entry.count);
    }
    if let (Some(mean), Some(std_dev)) = (results.mean_ms, results.std_dev_ms) {
        println!("  mean {:.2} ms, std dev {:.2} ms", mean, std_dev);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    // --- Logging Setup ---
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("stepsync::parsing", LevelFilter::Info)
        .filter_module("stepsync::game::judgment", LevelFilter::Warn)
        .init();

    info!("stepsync starting...");

    let args = parse_args(std::env::args().skip(1))?;
    if let Err(e) = run(args) {
        error!("stepsync exited with error: {}", e);
        return Err(e);
    }

    info!("stepsync exited gracefully.");
    Ok(())
}
