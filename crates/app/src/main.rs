use std::fmt;
use std::time::Duration;

use progress_core::model::{LessonId, NextLesson, VideoQuality};
use services::aggregate::next_lesson;
use services::{AppServices, SortKey, StatusFilter, TrackerConfig};
use storage::{InMemoryProgressStore, ProgressStore, StoreConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "services=info,storage=info,app=info";

#[derive(Debug, PartialEq)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidValue { flag: &'static str, raw: String },
    MissingLesson,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::MissingLesson => write!(f, "watch requires --lesson <id>"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_value<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let raw = require_value(args, flag)?;
    raw.parse::<T>()
        .map_err(|_| ArgsError::InvalidValue { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app dashboard   [--sort last_accessed|title|completion] [--filter all|in_progress|completed]");
    eprintln!("  app preferences [--speed <x>] [--quality auto|360p|480p|720p|1080p]");
    eprintln!("  app watch       --lesson <id> [--duration <secs>] [--from <secs>] [--remote]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_API_BASE_URL, LEARN_API_TOKEN, LEARN_API_TIMEOUT_SECS,");
    eprintln!("  LEARN_SAVE_INTERVAL_SECS, RUST_LOG");
}

#[derive(Debug, PartialEq)]
enum Command {
    Dashboard {
        sort: SortKey,
        filter: StatusFilter,
    },
    Preferences {
        speed: Option<f64>,
        quality: Option<VideoQuality>,
    },
    Watch {
        lesson_id: LessonId,
        duration: f64,
        from: Option<f64>,
        remote: bool,
    },
}

/// Returns `Ok(None)` when help was requested.
fn parse_command(argv: Vec<String>) -> Result<Option<Command>, ArgsError> {
    let mut args = argv.into_iter();
    let Some(first) = args.next() else {
        return Ok(Some(Command::Dashboard {
            sort: SortKey::default(),
            filter: StatusFilter::default(),
        }));
    };

    match first.as_str() {
        "--help" | "-h" | "help" => Ok(None),
        "dashboard" => {
            let mut sort = SortKey::default();
            let mut filter = StatusFilter::default();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--sort" => sort = parse_value(&mut args, "--sort")?,
                    "--filter" => filter = parse_value(&mut args, "--filter")?,
                    "--help" | "-h" => return Ok(None),
                    _ => return Err(ArgsError::UnknownArg(arg)),
                }
            }
            Ok(Some(Command::Dashboard { sort, filter }))
        }
        "preferences" => {
            let mut speed = None;
            let mut quality = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--speed" => speed = Some(parse_value(&mut args, "--speed")?),
                    "--quality" => quality = Some(parse_value(&mut args, "--quality")?),
                    "--help" | "-h" => return Ok(None),
                    _ => return Err(ArgsError::UnknownArg(arg)),
                }
            }
            Ok(Some(Command::Preferences { speed, quality }))
        }
        "watch" => {
            let mut lesson_id = None;
            let mut duration = 30.0;
            let mut from = None;
            let mut remote = false;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--lesson" => lesson_id = Some(parse_value(&mut args, "--lesson")?),
                    "--duration" => {
                        let raw = require_value(&mut args, "--duration")?;
                        duration = raw
                            .parse::<f64>()
                            .ok()
                            .filter(|secs| secs.is_finite() && *secs > 0.0)
                            .ok_or(ArgsError::InvalidValue {
                                flag: "--duration",
                                raw,
                            })?;
                    }
                    "--from" => from = Some(parse_value(&mut args, "--from")?),
                    "--remote" => remote = true,
                    "--help" | "-h" => return Ok(None),
                    _ => return Err(ArgsError::UnknownArg(arg)),
                }
            }
            Ok(Some(Command::Watch {
                lesson_id: lesson_id.ok_or(ArgsError::MissingLesson)?,
                duration,
                from,
                remote,
            }))
        }
        other => Err(ArgsError::UnknownCommand(other.to_string())),
    }
}

fn tracker_config_from_env() -> Result<TrackerConfig, ArgsError> {
    let mut config = TrackerConfig::default();
    if let Ok(raw) = std::env::var("LEARN_SAVE_INTERVAL_SECS") {
        let secs = raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ArgsError::InvalidValue {
                flag: "LEARN_SAVE_INTERVAL_SECS",
                raw,
            })?;
        config.save_interval = Duration::from_secs(secs);
    }
    Ok(config)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_dashboard(
    app: &AppServices,
    sort: SortKey,
    filter: StatusFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = match app.dashboard().load().await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            if err.is_retryable() {
                eprintln!("{err} (temporary; run the command again to retry)");
            }
            return Err(err.into());
        }
    };

    for course in snapshot.view(sort, filter) {
        let next = match next_lesson(&course) {
            NextLesson::Lesson {
                lesson_id: Some(id),
                ..
            } => format!("lesson {id}"),
            NextLesson::Lesson { .. } | NextLesson::Course { .. } => "course page".to_string(),
        };
        println!(
            "{:<36} {:>6.1}%  {:>3}/{:<3} lessons  last {}  next: {}",
            course.course_title,
            course.overall_progress,
            course.completed_lessons,
            course.total_lessons,
            course.last_accessed.format("%Y-%m-%d %H:%M"),
            next,
        );
    }

    let stats = &snapshot.dashboard.stats;
    println!(
        "\n{} courses ({} completed, {} in progress), {}/{} lessons, {} quiz attempts, average score {}%",
        stats.courses_enrolled,
        stats.courses_completed,
        stats.courses_in_progress,
        stats.lessons_completed,
        stats.total_lessons,
        stats.quiz_attempts,
        stats.average_quiz_score,
    );
    Ok(())
}

async fn run_preferences(
    app: &AppServices,
    speed: Option<f64>,
    quality: Option<VideoQuality>,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = app.preferences();
    controller.load().await;

    let mut pending = Vec::new();
    if let Some(speed) = speed {
        pending.push(controller.set_speed(speed)?);
    }
    if let Some(quality) = quality {
        pending.push(controller.set_quality(quality)?);
    }
    for write in pending {
        write.await?;
    }

    let current = controller.current();
    println!("speed:      {}x", current.playback_speed);
    println!("quality:    {}", current.preferred_quality);
    println!("autoplay:   {}", current.auto_play_next);
    println!(
        "captions:   {} ({})",
        if current.show_captions { "on" } else { "off" },
        current.caption_language
    );
    Ok(())
}

/// Drive a tracker with a simulated player advancing one second per second.
async fn run_watch(
    app: &AppServices,
    store: &dyn ProgressStore,
    lesson_id: LessonId,
    duration: f64,
    from: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = app.tracker().with_on_complete(std::sync::Arc::new(|lesson_id: LessonId| {
        println!("lesson {lesson_id} completed");
    }));
    tracker.start(lesson_id, from)?;

    let mut position = from.unwrap_or(0.0);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    while position < duration {
        ticker.tick().await;
        position = (position + 1.0).min(duration);
        tracker.on_time_update(position, duration);
        if let Some(chapter) = tracker.current_chapter() {
            tracing::debug!(chapter = %chapter.title, position, "playing");
        }
    }

    if let Some(flush) = tracker.stop() {
        flush.await?;
    }
    match store.get_progress(lesson_id).await {
        Ok(Some(record)) => println!(
            "lesson {lesson_id}: {:.1}% watched, completed: {}",
            record.completion_percentage, record.completed
        ),
        Ok(None) => println!("lesson {lesson_id}: no progress stored"),
        Err(err) => eprintln!("could not read back progress: {err}"),
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_command(argv) {
        Ok(Some(command)) => command,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            print_usage();
            return Err(err.into());
        }
    };

    init_tracing();
    let tracker_config = tracker_config_from_env()?;

    match command {
        Command::Dashboard { sort, filter } => {
            let app = AppServices::new_http(StoreConfig::from_env()?, tracker_config)?;
            run_dashboard(&app, sort, filter).await
        }
        Command::Preferences { speed, quality } => {
            let app = AppServices::new_http(StoreConfig::from_env()?, tracker_config)?;
            run_preferences(&app, speed, quality).await
        }
        Command::Watch {
            lesson_id,
            duration,
            from,
            remote,
        } => {
            if remote {
                let store = storage::HttpProgressStore::new(StoreConfig::from_env()?)?;
                let app = AppServices::from_parts(
                    std::sync::Arc::new(store.clone()),
                    std::sync::Arc::new(store.clone()),
                    tracker_config,
                );
                run_watch(&app, &store, lesson_id, duration, from).await
            } else {
                let store = InMemoryProgressStore::new();
                let app = AppServices::new_in_memory(store.clone(), tracker_config);
                run_watch(&app, &store, lesson_id, duration, from).await
            }
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
