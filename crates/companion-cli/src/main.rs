use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use companion::{CompanionConfig, CompanionMetric, CompanionService, CompanionSettings, ConversationTurn};
use database::{conversation, reminder, sqlite_url_from_path, Database, Reminder};
use reminder_scheduler::{DeliveryQueue, DeliveryWorker, LoggingSender, ReminderQueue, WorkerConfig};
use tracing::{info, warn};

/// How many earlier exchanges `reflect` looks at.
const HISTORY_LIMIT: i64 = 10;

#[derive(Debug, Parser)]
#[command(name = "companion")]
#[command(about = "Companion reflections, sparks and reminders")]
struct Args {
    /// Chat to act on
    #[arg(long, default_value = "cli_local")]
    chat_id: String,

    /// SQLite database path or URL
    #[arg(long, env = "SQLITE_PATH", default_value = "./data/companion.db")]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show or set the companion level (off|light|standard)
    Mode { level: Option<String> },

    /// Show or set the spark cadence (off|on|weekly|standard)
    Nudge { choice: Option<String> },

    /// Set quiet hours, both as HH:MM
    Quiet { start: String, end: String },

    /// List recently shown reflections
    Report {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Run one exchange through the companion and print the reply
    Reflect {
        #[arg(long)]
        message: String,
        #[arg(long)]
        reply: String,
    },

    /// Ask a blind-spot question for a topic
    Blindspot { topic: String },

    /// Queue a reminder for an RFC 3339 time
    Remind {
        #[arg(long)]
        at: String,
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// List reminders and sparks still waiting for delivery
    Pending,

    /// Deliver due reminders and sparks until interrupted
    Worker,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let database = open_database(&args.db).await?;
    let chat_id = args.chat_id.as_str();

    match args.command {
        Command::Mode { level } => {
            let service = build_service(&database);
            if let Some(level) = level {
                service.set_companion_level(chat_id, &level).await?;
                report_schedule(&service, chat_id).await;
            }
            println!("{}", status_line(&service.settings(chat_id).await?));
        }
        Command::Nudge { choice } => {
            let service = build_service(&database);
            if let Some(choice) = choice {
                service.set_nudge_frequency(chat_id, &choice).await?;
                report_schedule(&service, chat_id).await;
            }
            println!("{}", status_line(&service.settings(chat_id).await?));
        }
        Command::Quiet { start, end } => {
            let service = build_service(&database);
            let settings = service.set_quiet_hours(chat_id, &start, &end).await?;
            println!("{}", status_line(&settings));
        }
        Command::Report { limit } => {
            let service = build_service(&database);
            let metrics = service.recent_metrics(chat_id, limit).await?;
            for line in report_lines(&metrics) {
                println!("{}", line);
            }
        }
        Command::Reflect { message, reply } => {
            let service = build_service(&database);
            let recent: Vec<ConversationTurn> =
                conversation::recent_exchanges(database.pool(), chat_id, HISTORY_LIMIT)
                    .await?
                    .into_iter()
                    .map(ConversationTurn::from)
                    .collect();

            let composed = service.wrap_reply(chat_id, &message, &reply, &recent).await;
            conversation::store_exchange(database.pool(), chat_id, &message, &composed).await?;
            println!("{}", composed);
        }
        Command::Blindspot { topic } => {
            let service = build_service(&database);
            match service.blindspot(topic.trim()) {
                Some(question) => println!("{}", question),
                None => println!("No blind-spot questions for {}", topic.trim()),
            }
        }
        Command::Remind { at, text } => {
            let fire_at = DateTime::parse_from_rfc3339(&at)?.with_timezone(&Utc);
            let queue = ReminderQueue::new(database.clone());
            if queue.enqueue(chat_id, &text.join(" "), fire_at).await? {
                println!("Reminder queued for {}", fire_at.format("%a %H:%M UTC"));
            } else {
                println!("Reminder rejected");
            }
        }
        Command::Pending => {
            let pending = reminder::list_pending(database.pool(), chat_id).await?;
            for line in pending_lines(&pending) {
                println!("{}", line);
            }
        }
        Command::Worker => {
            let config = WorkerConfig::from_env()?;
            let mut worker = DeliveryWorker::new(database.clone(), Arc::new(LoggingSender), config);
            worker.start();
            info!("Delivery worker running, press Ctrl-C to stop");

            tokio::signal::ctrl_c().await?;
            worker.stop().await;
        }
    }

    database.close().await;
    Ok(())
}

async fn open_database(path: &str) -> Result<Database, Box<dyn std::error::Error>> {
    if !path.starts_with("sqlite:") {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    let database = Database::connect(&sqlite_url_from_path(path)).await?;
    database.migrate().await?;
    Ok(database)
}

fn build_service(database: &Database) -> CompanionService {
    CompanionService::from_config(database.clone(), &CompanionConfig::from_env())
}

async fn report_schedule(service: &CompanionService, chat_id: &str) {
    match service.schedule_next(chat_id).await {
        Ok(next) => println!("{}", describe_schedule(next)),
        Err(err) => {
            warn!("Failed to schedule spark for {}: {}", chat_id, err);
            println!("{}", describe_schedule(None));
        }
    }
}

fn describe_schedule(next: Option<DateTime<Utc>>) -> String {
    match next {
        Some(at) => format!("Next spark queued for {}", at.format("%a %H:%M UTC")),
        None => "No spark scheduled".to_string(),
    }
}

fn status_line(settings: &CompanionSettings) -> String {
    let next = settings
        .last_nudge_at
        .map(|at| at.format("%a %H:%M UTC").to_string())
        .unwrap_or_else(|| "none".to_string());
    format!(
        "Companion: {} | nudges: {} | quiet: {}-{} | next spark: {}",
        settings.companion_level,
        settings.nudge_frequency,
        settings.quiet_hours_start,
        settings.quiet_hours_end,
        next
    )
}

fn report_lines(metrics: &[CompanionMetric]) -> Vec<String> {
    if metrics.is_empty() {
        return vec!["No companion reflections logged yet".to_string()];
    }
    metrics
        .iter()
        .map(|metric| {
            format!(
                "{} | template={} | lines={}",
                metric.shown_at.to_rfc3339(),
                metric.template_id.as_deref().unwrap_or("-"),
                metric.line_count
            )
        })
        .collect()
}

fn pending_lines(reminders: &[Reminder]) -> Vec<String> {
    if reminders.is_empty() {
        return vec!["No pending reminders".to_string()];
    }
    reminders
        .iter()
        .map(|reminder| {
            format!(
                "{} | attempts={} | {}",
                reminder.fire_at.format("%a %Y-%m-%d %H:%M UTC"),
                reminder.attempts,
                reminder.message
            )
        })
        .collect()
}
