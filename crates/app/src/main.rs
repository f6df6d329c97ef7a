use std::fmt;
use std::io::Write as _;

use study_core::metrics::{LeaderboardMetric, UserStats};
use study_core::model::{LessonId, TopicId, UserId};
use services::lesson_service::MIN_LESSON_DWELL_SECS;
use services::quiz::CheckOutcome;
use services::{AppServices, Clock, LessonError, LessonTarget, QuizAdvance, QuizError};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUserId { raw: String },
    InvalidTopicId { raw: String },
    InvalidLessonId { raw: String },
    InvalidDwell { raw: String },
    InvalidLimit { raw: String },
    InvalidBoard { raw: String },
    InvalidGrade { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "missing required flag: {flag}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidTopicId { raw } => write!(f, "invalid --topic-id value: {raw}"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid --lesson-id value: {raw}"),
            ArgsError::InvalidDwell { raw } => write!(f, "invalid --dwell-secs value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidBoard { raw } => {
                write!(f, "invalid --board value (streak|hours|topics|score): {raw}")
            }
            ArgsError::InvalidGrade { raw } => write!(f, "invalid --grade value: {raw}"),
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Quiz,
    Lesson,
    Stats,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "quiz" => Some(Self::Quiz),
            "lesson" => Some(Self::Lesson),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    user_id: Option<UserId>,
    topic_id: Option<TopicId>,
    lesson_id: Option<LessonId>,
    dwell_secs: Option<u32>,
    board: Option<LeaderboardMetric>,
    limit: usize,
    topic_name: String,
    grade: u8,
    subject: String,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("STUDY_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://study.sqlite3".into(), normalize_sqlite_url);
        let mut user_id = std::env::var("STUDY_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut topic_id = None;
        let mut lesson_id = None;
        let mut dwell_secs = None;
        let mut board = None;
        let mut limit = 10;
        let mut topic_name = "Fractions".to_string();
        let mut grade = 5;
        let mut subject = "math".to_string();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user-id" => {
                    let value = require_value(args, "--user-id")?;
                    let parsed = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    user_id = Some(parsed);
                }
                "--topic-id" => {
                    let value = require_value(args, "--topic-id")?;
                    let parsed = value
                        .parse::<TopicId>()
                        .map_err(|_| ArgsError::InvalidTopicId { raw: value.clone() })?;
                    topic_id = Some(parsed);
                }
                "--lesson-id" => {
                    let value = require_value(args, "--lesson-id")?;
                    let parsed = value
                        .parse::<LessonId>()
                        .map_err(|_| ArgsError::InvalidLessonId { raw: value.clone() })?;
                    lesson_id = Some(parsed);
                }
                "--dwell-secs" => {
                    let value = require_value(args, "--dwell-secs")?;
                    let parsed = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDwell { raw: value.clone() })?;
                    dwell_secs = Some(parsed);
                }
                "--board" => {
                    let value = require_value(args, "--board")?;
                    let parsed = LeaderboardMetric::parse(&value)
                        .ok_or(ArgsError::InvalidBoard { raw: value.clone() })?;
                    board = Some(parsed);
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse::<usize>()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                "--topic-name" => {
                    topic_name = require_value(args, "--topic-name")?;
                }
                "--grade" => {
                    let value = require_value(args, "--grade")?;
                    grade = value
                        .parse::<u8>()
                        .map_err(|_| ArgsError::InvalidGrade { raw: value.clone() })?;
                }
                "--subject" => {
                    subject = require_value(args, "--subject")?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            topic_id,
            lesson_id,
            dwell_secs,
            board,
            limit,
            topic_name,
            grade,
            subject,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- stats  [--board <streak|hours|topics|score>] [--limit <n>]");
    eprintln!("  cargo run -p app -- quiz   --topic-id <uuid>");
    eprintln!("  cargo run -p app -- lesson --topic-id <uuid> --lesson-id <uuid> --dwell-secs <n>");
    eprintln!("  cargo run -p app -- seed   [--topic-name <name>] [--grade <n>] [--subject <name>]");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>    SQLite URL (default: sqlite://study.sqlite3)");
    eprintln!("  --user-id <uuid>     Learner to act as (default: first stored profile)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_USER_ID, RUST_LOG");
    eprintln!("  STUDY_AI_API_KEY, STUDY_AI_BASE_URL, STUDY_AI_MODEL (generated seed content)");
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: showing the dashboard when no subcommand is given.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Stats,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Stats,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup so core/services stay free of file glue.
    prepare_sqlite_file(&args.db_url)?;
    let services =
        AppServices::new_sqlite(&args.db_url, Clock::default_clock(), args.user_id).await?;
    if services.created_profile() {
        println!(
            "created profile {}; set STUDY_USER_ID to keep using it",
            services.user_id()
        );
    }

    match cmd {
        Command::Seed => cmd_seed(&services, &args).await,
        Command::Quiz => {
            let topic = args
                .topic_id
                .ok_or_else(|| usage_err(ArgsError::MissingFlag { flag: "--topic-id" }))?;
            cmd_quiz(&services, topic).await
        }
        Command::Lesson => {
            let topic = args
                .topic_id
                .ok_or_else(|| usage_err(ArgsError::MissingFlag { flag: "--topic-id" }))?;
            let lesson = args
                .lesson_id
                .ok_or_else(|| usage_err(ArgsError::MissingFlag { flag: "--lesson-id" }))?;
            let dwell = args
                .dwell_secs
                .ok_or_else(|| usage_err(ArgsError::MissingFlag { flag: "--dwell-secs" }))?;
            cmd_lesson(&services, topic, lesson, dwell).await
        }
        Command::Stats => cmd_stats(&services, args.board, args.limit).await,
    }
}

fn usage_err(err: ArgsError) -> ArgsError {
    eprintln!("{err}");
    print_usage();
    err
}

async fn cmd_seed(
    services: &AppServices,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = services.catalog();
    let topic = catalog.create_topic(&args.topic_name).await?;

    let content_gen = services.content_gen();
    if content_gen.enabled() {
        let generated = content_gen
            .generate_topic(args.grade, &args.subject, &args.topic_name)
            .await?;
        catalog
            .add_lesson(topic.id(), &args.topic_name, &generated.lesson_body)
            .await?;
        let mut added = 0_u32;
        for question in &generated.questions {
            match catalog
                .add_question(
                    topic.id(),
                    &question.prompt,
                    &question.answer,
                    &question.explanation,
                )
                .await
            {
                Ok(_) => added += 1,
                Err(err) => tracing::warn!("skipping generated question: {err}"),
            }
        }
        println!(
            "seeded topic {} ({}) with a generated lesson and {added} questions",
            topic.id(),
            topic.name()
        );
        return Ok(());
    }

    let lessons = [
        (
            "What is a fraction",
            "A fraction names part of a whole. The top number counts the parts you \
             have, the bottom number says how many equal parts make the whole.",
        ),
        (
            "Adding fractions",
            "Fractions with the same bottom number add by adding the tops. With \
             different bottoms, rewrite them over a shared bottom number first.",
        ),
    ];
    for (title, body) in lessons {
        catalog.add_lesson(topic.id(), title, body).await?;
    }

    let questions = [
        ("What is 1/2 + 1/4?", "3/4", "Rewrite 1/2 as 2/4, then add the quarters."),
        ("How many quarters make a whole?", "4", "Four quarters of equal size fill the whole."),
        ("Which is larger, 2/3 or 3/5?", "2/3", "Over fifteenths they are 10/15 and 9/15."),
    ];
    for (prompt, answer, explanation) in questions {
        catalog
            .add_question(topic.id(), prompt, answer, explanation)
            .await?;
    }

    println!(
        "seeded topic {} ({}) with {} lessons and {} questions",
        topic.id(),
        topic.name(),
        lessons.len(),
        questions.len()
    );
    Ok(())
}

async fn cmd_quiz(
    services: &AppServices,
    topic: TopicId,
) -> Result<(), Box<dyn std::error::Error>> {
    let runner = services.quiz();
    let user = services.user_id();

    let mut session = match runner.start(user, topic).await {
        Ok(session) => session,
        Err(QuizError::Unavailable) => {
            println!("this topic has no questions yet; run seed first");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if session.progress().answered > 0 {
        println!(
            "resuming at question {} of {}",
            session.current_index() + 1,
            session.total_questions()
        );
    }

    let stdin = std::io::stdin();
    loop {
        let index = session.current_index() + 1;
        let total = session.total_questions();
        let Some(question) = session.current_question() else {
            break;
        };
        println!();
        println!("[{index}/{total}] {}", question.prompt());

        if let Some(restored) = session.checked() {
            println!("(answered before the interruption)");
            print_check(restored);
        } else {
            let Some(answer) = prompt_line(&stdin, "answer> ")? else {
                println!("input closed; progress is saved after every check");
                return Ok(());
            };
            if answer.trim().is_empty() {
                println!("an empty answer cannot be checked");
                continue;
            }
            let Some(working) = prompt_line(&stdin, "working (enter to skip)> ")? else {
                println!("input closed; progress is saved after every check");
                return Ok(());
            };

            session.set_answer(answer);
            session.set_working(working);
            match runner.check_current(&mut session).await {
                Ok(outcome) => print_check(&outcome),
                Err(QuizError::EmptyAnswer) => {
                    println!("an empty answer cannot be checked");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }

        match runner.advance(&mut session).await? {
            QuizAdvance::Next => {}
            QuizAdvance::Finished(outcome) => {
                println!();
                println!(
                    "score {}/{} ({}%), {} study minutes recorded",
                    outcome.attempt.score(),
                    outcome.attempt.total_questions(),
                    outcome.attempt.percentage(),
                    outcome.minutes_recorded
                );
                if outcome.topic_completed {
                    println!("topic completed!");
                }
                for code in &outcome.unlocked {
                    println!("achievement unlocked: {code}");
                }
                break;
            }
        }
    }
    Ok(())
}

async fn cmd_lesson(
    services: &AppServices,
    topic: TopicId,
    requested: LessonId,
    dwell_secs: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = services.user_id();
    let state = services.session_state();

    let target = state.resolve_lesson(user, topic, requested).await;
    if let LessonTarget::Saved(saved) = target {
        println!("picking up the saved lesson {saved} instead of {requested}");
    }
    let lesson = target.lesson_id();
    state.save_lesson_position(user, topic, lesson).await;

    match services
        .lessons()
        .complete_lesson(user, topic, lesson, dwell_secs)
        .await
    {
        Ok(outcome) => {
            if outcome.newly_completed {
                println!(
                    "lesson completed, {} study minutes recorded",
                    outcome.minutes_recorded
                );
            } else {
                println!(
                    "lesson read again, {} study minutes recorded",
                    outcome.minutes_recorded
                );
            }
            println!(
                "topic progress: {}%{}",
                outcome.topic_percent,
                if outcome.topic_completed {
                    " (completed)"
                } else {
                    ""
                }
            );
            Ok(())
        }
        Err(LessonError::DwellTooShort { seconds }) => {
            println!("{seconds}s is too short to count; stay at least {MIN_LESSON_DWELL_SECS}s");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn cmd_stats(
    services: &AppServices,
    board: Option<LeaderboardMetric>,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = services.user_id();
    let stats = services.progress().refresh_stats(user).await;

    println!("streak:          {} days", stats.streak_days);
    println!("study time:      {:.1} h", stats.total_hours());
    println!("average score:   {}%", stats.average_score);
    println!("quizzes taken:   {}", stats.quiz_count);
    println!("topics complete: {}", stats.topics_completed);

    let unlocked = services.achievements().unlocked(user).await?;
    if !unlocked.is_empty() {
        let codes: Vec<&str> = unlocked.iter().map(|row| row.code.as_str()).collect();
        println!("achievements:    {}", codes.join(", "));
    }

    if let Some(metric) = board {
        let board = services.progress().leaderboard(metric, limit, user).await;
        println!();
        println!("leaderboard by {}", metric.as_str());
        for entry in &board.entries {
            println!(
                "{:>3}. {:<20} {}",
                entry.rank,
                entry.display_name,
                metric_cell(metric, &entry.stats)
            );
        }
        if let Some(viewer) = &board.viewer {
            println!(
                "{:>3}. {:<20} {}  (you)",
                viewer.rank,
                viewer.display_name,
                metric_cell(metric, &viewer.stats)
            );
        }
    }
    Ok(())
}

fn metric_cell(metric: LeaderboardMetric, stats: &UserStats) -> String {
    match metric {
        LeaderboardMetric::StreakDays => format!("{} days", stats.streak_days),
        LeaderboardMetric::TotalHours => format!("{:.1} h", stats.total_hours()),
        LeaderboardMetric::TopicsCompleted => format!("{} topics", stats.topics_completed),
        LeaderboardMetric::AverageScore => format!("{}%", stats.average_score),
    }
}

fn print_check(outcome: &CheckOutcome) {
    if outcome.correct {
        println!("correct!");
    } else {
        println!("not quite. expected: {}", outcome.expected);
        if !outcome.explanation.is_empty() {
            println!("  {}", outcome.explanation);
        }
    }
}

fn prompt_line(stdin: &std::io::Stdin, prompt: &str) -> std::io::Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "app=info,services=info,storage=info".to_owned());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
