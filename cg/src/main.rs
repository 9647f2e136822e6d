//! CampaignGenie - campaign request to live Yektanet campaign
//!
//! CLI entry point: run the consumer daemon, submit requests, and
//! approve or reject plans.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use campaigngenie::cli::{get_log_path, Cli, Command};
use campaigngenie::config::Config;
use campaigngenie::consumer::{Consumer, PollPolicy};
use campaigngenie::domain::{generate_id, CampaignPlan, CampaignRequest, RequestIntake, Task, TaskStatus};
use campaigngenie::knowledge::{Document, KnowledgeBase, StoreKnowledgeBase};
use campaigngenie::llm::create_client;
use campaigngenie::planner::LlmPlanner;
use campaigngenie::yektanet::YektanetClient;
use campaigngenie::{Filter, IndexValue, Record, Store};

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("campaigngenie")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config log-level > INFO
    let level = match cli_log_level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(log_dir.join("campaigngenie.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Open the document store at the configured path, creating parents
fn open_store(config: &Config) -> Result<Arc<Store>> {
    if let Some(parent) = config.storage.path.parent() {
        fs::create_dir_all(parent).context("Failed to create storage directory")?;
    }
    let store = Store::open(&config.storage.path)
        .with_context(|| format!("Failed to open store at {}", config.storage.path.display()))?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref().or(config.log_level.as_deref()))
        .context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Daemon => cmd_daemon(&config).await,
        Command::Request { file, session } => cmd_request(&config, &file, session).await,
        Command::Tasks { status } => cmd_tasks(&config, status.as_deref()).await,
        Command::Approve { task_id } => cmd_approve(&config, &task_id).await,
        Command::Reject { task_id, feedback } => cmd_reject(&config, &task_id, &feedback).await,
        Command::Plan { session_id } => cmd_plan(&config, &session_id).await,
        Command::Learn { file, content_type } => cmd_learn(&config, &file, &content_type).await,
        Command::Logs { lines } => cmd_logs(lines).await,
    }
}

/// Run the consumer loop in the foreground
async fn cmd_daemon(config: &Config) -> Result<()> {
    debug!("cmd_daemon: called");
    config.validate()?;

    let store = open_store(config)?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let planner = Arc::new(LlmPlanner::new(llm, config.llm.max_tokens));
    let platform = Arc::new(YektanetClient::from_config(&config.yektanet).context("Failed to create Yektanet client")?);
    let knowledge = Arc::new(StoreKnowledgeBase::new(store.clone()));

    let policy = PollPolicy {
        poll_interval: std::time::Duration::from_millis(config.consumer.poll_interval_ms),
        error_backoff: std::time::Duration::from_millis(config.consumer.error_backoff_ms),
    };

    let consumer = Consumer::new(
        store,
        planner,
        platform,
        knowledge,
        policy,
        config.consumer.max_ad_retries,
    );

    println!("CampaignGenie consumer running. Press Ctrl+C to stop.");
    tokio::select! {
        result = consumer.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
            println!("\nStopped.");
            Ok(())
        }
    }
}

/// Submit a campaign request and enqueue plan generation
async fn cmd_request(config: &Config, file: &PathBuf, session: Option<String>) -> Result<()> {
    debug!(?file, ?session, "cmd_request: called");
    let store = open_store(config)?;

    let content = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let intake: RequestIntake = serde_json::from_str(&content).context("Failed to parse intake JSON")?;

    let session_id = session.unwrap_or_else(|| generate_id("session", &intake.business.name));
    let request = CampaignRequest::new(&session_id, intake).map_err(|e| eyre::eyre!("Invalid request: {}", e))?;
    store.create(&request)?;

    let task = Task::generate_campaign_plan(
        &session_id,
        &request.id,
        format!("plan campaign for {}", request.business.name),
    );
    store.create(&task)?;

    println!("{} Request submitted: {}", "✓".green(), request.id.cyan());
    println!("  Session: {}", session_id);
    println!("  Task:    {}", task.id);
    Ok(())
}

/// List tasks, newest last
async fn cmd_tasks(config: &Config, status: Option<&str>) -> Result<()> {
    debug!(?status, "cmd_tasks: called");
    let store = open_store(config)?;

    let filters = match status {
        Some(s) => vec![Filter::eq("status", IndexValue::from(s.to_string()))],
        None => vec![],
    };

    // Raw listing so documents with unrecognized type tags still show up
    let rows = store.list_raw(Task::collection_name(), &filters)?;
    if rows.is_empty() {
        println!(
            "No tasks found{}",
            status.map(|s| format!(" with status '{}'", s)).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{:<40} {:<26} {:<18} {:<17} DESCRIPTION", "ID", "TYPE", "STATUS", "UPDATED");
    println!("{}", "-".repeat(110));
    for row in rows {
        let task_type = row.data["type"].as_str().unwrap_or("?");
        let status = row.data["status"].as_str().unwrap_or("?");
        let description = row.data["description"].as_str().unwrap_or("");
        let updated = row.data["updated_at"]
            .as_i64()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());
        let status_colored = match status {
            "completed" => status.green(),
            "failed" => status.red(),
            "pending_confirm" => status.yellow(),
            _ => status.normal(),
        };
        println!(
            "{:<40} {:<26} {:<18} {:<17} {}",
            row.id, task_type, status_colored, updated, description
        );
    }
    Ok(())
}

/// Approve a pending plan
async fn cmd_approve(config: &Config, task_id: &str) -> Result<()> {
    debug!(%task_id, "cmd_approve: called");
    let store = open_store(config)?;

    let Some(mut task) = store.get::<Task>(task_id)? else {
        eprintln!("{} Task '{}' not found", "✗".red(), task_id);
        return Ok(());
    };
    if task.status != TaskStatus::PendingConfirm {
        eprintln!(
            "{} Task '{}' is {}, only pending_confirm tasks can be approved",
            "✗".red(),
            task_id,
            task.status
        );
        return Ok(());
    }

    task.set_status(TaskStatus::Confirmed);
    store.update(&task)?;
    println!("{} Approved: {} (pending_confirm -> confirmed)", "✓".green(), task_id.cyan());
    Ok(())
}

/// Reject a pending plan with feedback
async fn cmd_reject(config: &Config, task_id: &str, feedback: &str) -> Result<()> {
    debug!(%task_id, "cmd_reject: called");
    let store = open_store(config)?;

    let Some(mut task) = store.get::<Task>(task_id)? else {
        eprintln!("{} Task '{}' not found", "✗".red(), task_id);
        return Ok(());
    };
    if task.status != TaskStatus::PendingConfirm {
        eprintln!(
            "{} Task '{}' is {}, only pending_confirm tasks can be rejected",
            "✗".red(),
            task_id,
            task.status
        );
        return Ok(());
    }
    if !task.append_feedback(feedback) {
        eprintln!("{} Task '{}' does not accept feedback", "✗".red(), task_id);
        return Ok(());
    }

    task.set_status(TaskStatus::RetryWithFeedback);
    store.update(&task)?;
    println!(
        "{} Rejected: {} (pending_confirm -> retry_with_feedback)",
        "✓".green(),
        task_id.cyan()
    );
    Ok(())
}

/// Show the plan for a session
async fn cmd_plan(config: &Config, session_id: &str) -> Result<()> {
    debug!(%session_id, "cmd_plan: called");
    let store = open_store(config)?;

    let plan: Option<CampaignPlan> =
        store.find_one(&[Filter::eq("session_id", IndexValue::from(session_id.to_string()))])?;
    let Some(plan) = plan else {
        println!("No plan found for session '{}'", session_id);
        return Ok(());
    };

    println!("{} ({})", plan.name.bold(), plan.id);
    println!("  Type:     {}", plan.campaign_type);
    println!("  Budget:   {} toman/day, bid {} toman ({})", plan.budget, plan.bid_toman, plan.bidding_strategy);
    println!("  Audience: {}", plan.target_audience_description);
    if !plan.targeting_config.keywords.is_empty() {
        println!("  Keywords: {}", plan.targeting_config.keywords.join(", "));
    }
    if !plan.targeting_config.categories.is_empty() {
        println!("  Categories: {}", plan.targeting_config.categories.join(", "));
    }
    if !plan.targeting_config.user_segments.is_empty() {
        println!("  Segments: {}", plan.targeting_config.user_segments.join(", "));
    }
    println!("  Ads:");
    for ad in &plan.ads_description {
        let marker = if ad.created_ad_id.is_some() {
            "✓".green()
        } else {
            "·".normal()
        };
        println!("    {} {} [{}] -> {}", marker, ad.title, ad.call_to_action, ad.landing_url);
    }
    Ok(())
}

/// Ingest a reference document into the knowledge base
async fn cmd_learn(config: &Config, file: &PathBuf, content_type: &str) -> Result<()> {
    debug!(?file, %content_type, "cmd_learn: called");
    let store = open_store(config)?;
    let knowledge = StoreKnowledgeBase::new(store);

    let content = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());

    let doc = Document::new(name, content, content_type);
    let doc_id = doc.id.clone();
    knowledge.add_document(doc).await?;
    println!("{} Learned document: {}", "✓".green(), doc_id.cyan());
    Ok(())
}

/// Show the daemon log
async fn cmd_logs(lines: usize) -> Result<()> {
    debug!(lines, "cmd_logs: called");
    let log_path = get_log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        println!("The daemon may not have been started yet.");
        return Ok(());
    }

    let file = fs::File::open(&log_path).context("Failed to open log file")?;
    let reader = BufReader::new(file);
    let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

    let start = all_lines.len().saturating_sub(lines);
    for line in &all_lines[start..] {
        println!("{}", line);
    }
    Ok(())
}
