// Main entry point
use clap::Parser;
use colored::Colorize;
use folio::application::maintenance;
use folio::domain::error::RequestError;
use folio::domain::model::{Attachment, ContactForm, FetchOptions, Fetched, Preferences};
use folio::infrastructure;
use folio::infrastructure::config::load_config;
use folio::infrastructure::network::connectivity::run_probe;
use folio::infrastructure::storage::db;
use folio::interfaces::cli::{media_type_for, Cli, Command, ContactArgs};
use folio::presentation::render::{
    format_file_size, format_section, notice, source_notice, NoticeKind,
};
use folio::presentation::theme::Theme;
use folio::state::AppState;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup graceful shutdown handler
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for shutdown signal: {}", e);
        } else {
            eprintln!("\nInterrupted, shutting down...");
            let _ = shutdown_tx.send(());
        }
    });

    let cli = Cli::parse();
    let config = load_config()?;

    if config.logging.enable {
        init_logging(&config.logging)?;
    }

    if cli.generate_config {
        infrastructure::config::generate_config_sample()?;
        return Ok(());
    }
    if cli.edit_config {
        if let Some(config_path) = infrastructure::config::get_config_path() {
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
            let config_path_clone = config_path.clone();
            tokio::task::spawn_blocking(move || {
                std::process::Command::new(editor)
                    .arg(&config_path_clone)
                    .status()
            })
            .await??;
        } else {
            eprintln!("{}", "Config file not found".red());
        }
        return Ok(());
    }

    let db_path = infrastructure::config::get_database_path(&config);
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let db_conn = db::init_database(&db_path).await?;
    let state = AppState::new(db_conn, config.clone())?;

    let prefs = db::load_preferences(
        &state.db,
        Preferences {
            theme: config.theme.clone(),
            ..Preferences::default()
        },
    )
    .await?;
    let theme_name = cli.theme.clone().unwrap_or_else(|| prefs.theme.clone());
    let theme = Theme::from_name(&theme_name);

    if config.cache.persist {
        maintenance::hydrate(&state.cache, &state.db).await;
    }
    spawn_background(&state, cli.offline);

    let outcome = tokio::select! {
        result = run(&cli, &state, &theme, prefs) => result,
        _ = shutdown_rx => {
            eprintln!("{}", notice(&theme, NoticeKind::Warning, "Cancelled; queued requests were dropped"));
            Ok(130)
        }
    };

    // runs before any non-zero exit so a --clear-cache is never undone
    if config.cache.persist {
        if let Err(e) = maintenance::flush(&state.cache, &state.db).await {
            tracing::warn!(error = %e, "final cache snapshot failed");
        }
    }

    match outcome? {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}

fn spawn_background(state: &AppState, offline: bool) {
    let config = &state.config;

    tokio::spawn(Arc::clone(&state.queue).run());
    tokio::spawn(maintenance::run_sweeper(
        Arc::clone(&state.cache),
        Duration::from_secs(config.cache.sweep_interval_secs.max(1)),
    ));
    if config.cache.persist {
        tokio::spawn(maintenance::run_persister(
            Arc::clone(&state.cache),
            Arc::clone(&state.db),
            Duration::from_millis(config.cache.persist_debounce_ms),
        ));
    }

    if offline {
        state.connectivity.set_online(false);
    } else if config.connectivity.probe_interval_secs > 0 {
        tokio::spawn(run_probe(
            Arc::clone(&state.transport),
            state.connectivity.clone(),
            config.endpoint.clone(),
            Duration::from_secs(config.connectivity.probe_interval_secs),
            Duration::from_millis(config.connectivity.probe_timeout_ms),
        ));
    }
}

/// Returns the process exit code.
async fn run(cli: &Cli, state: &AppState, theme: &Theme, prefs: Preferences) -> anyhow::Result<i32> {
    if cli.clear_cache {
        let removed = state.api.clear_cache();
        println!(
            "{}",
            notice(theme, NoticeKind::Success, &format!("Cache cleared ({} entries)", removed))
        );
    }

    let code = match &cli.command {
        Some(command) => run_command(command, state, theme, prefs, cli.offline).await?,
        None if !cli.clear_cache && !cli.status => {
            eprintln!("{}", "Please provide a command (see --help)".red());
            return Ok(1);
        }
        None => 0,
    };

    if cli.status {
        print_status(state).await?;
    }

    Ok(code)
}

async fn run_command(
    command: &Command,
    state: &AppState,
    theme: &Theme,
    prefs: Preferences,
    offline: bool,
) -> anyhow::Result<i32> {
    match command {
        Command::Fetch {
            action,
            params,
            priority,
            refresh,
            json,
        } => {
            // nothing can bring the connection back under --offline
            if offline {
                return match state.api.cached(action, params) {
                    Some(fetched) if !*refresh => print_fetched(theme, action, &fetched, *json),
                    _ => Ok(not_cached(theme, action)),
                };
            }
            if !state.connectivity.is_online() {
                eprintln!(
                    "{}",
                    notice(theme, NoticeKind::Warning, "You are offline. Uncached requests will wait for the connection (Ctrl-C to give up).")
                );
            }
            state
                .analytics
                .track_interaction("fetch", json!({ "action": action }))
                .await;
            let options = FetchOptions {
                priority: *priority,
                force_refresh: *refresh,
                ttl: None,
            };
            return match state.api.fetch_data(action, params, options).await {
                Ok(fetched) => print_fetched(theme, action, &fetched, *json),
                Err(e) => Ok(report_failure(theme, &e)),
            };
        }
        Command::Sections { json } => {
            let results = if offline {
                state
                    .config
                    .sections
                    .iter()
                    .map(|action| {
                        let result = state.api.cached(action, &[]).ok_or_else(|| {
                            RequestError::Network("not cached and --offline is set".to_string())
                        });
                        (action.clone(), result)
                    })
                    .collect::<Vec<_>>()
            } else {
                state.analytics.track_page_view("sections").await;
                state.api.load_sections(&state.config.sections).await
            };
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            if *json {
                let map: serde_json::Map<String, serde_json::Value> = results
                    .into_iter()
                    .map(|(action, result)| {
                        let value = match result {
                            Ok(fetched) => fetched.value,
                            Err(e) => json!({ "error": e.to_string() }),
                        };
                        (action, value)
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (action, result) in results {
                    match result {
                        Ok(fetched) => {
                            if let Some(line) = source_notice(theme, fetched.source) {
                                eprintln!("{}", line);
                            }
                            println!("{}", format_section(theme, &action, &fetched));
                        }
                        Err(e) => eprintln!(
                            "{}",
                            notice(theme, NoticeKind::Error, &format!("{}: {}", action, e))
                        ),
                    }
                }
            }
            if failed > 0 {
                return Ok(1);
            }
        }
        Command::Contact(args) => {
            let form = read_contact_form(args).await?;
            let files = form.attachments.len();
            eprintln!("{}", notice(theme, NoticeKind::Info, "Sending your message..."));
            match state.contact.submit(form).await {
                Ok(_) => {
                    let uploaded = if files > 0 {
                        format!(" {} file(s) uploaded.", files)
                    } else {
                        String::new()
                    };
                    println!(
                        "{}",
                        notice(theme, NoticeKind::Success, &format!("Message sent successfully!{}", uploaded))
                    );
                }
                Err(RequestError::Validation { message, .. }) => {
                    eprintln!("{}", notice(theme, NoticeKind::Error, &message));
                    return Ok(2);
                }
                Err(e) => {
                    eprintln!(
                        "{}",
                        notice(
                            theme,
                            NoticeKind::Error,
                            &format!("Error: {}. Please try again or contact me directly.", e)
                        )
                    );
                    return Ok(1);
                }
            }
        }
        Command::Prefs {
            set_theme,
            language,
        } => {
            let mut updated = prefs;
            if let Some(t) = set_theme {
                updated.theme = t.clone();
            }
            if let Some(l) = language {
                updated.language = l.clone();
            }
            if set_theme.is_some() || language.is_some() {
                db::save_preferences(&state.db, &updated).await?;
                println!("{}", notice(theme, NoticeKind::Success, "Preferences saved"));
            }
            println!("theme: {}", updated.theme);
            println!("language: {}", updated.language);
        }
    }

    Ok(0)
}

fn print_fetched(theme: &Theme, action: &str, fetched: &Fetched, json: bool) -> anyhow::Result<i32> {
    if let Some(line) = source_notice(theme, fetched.source) {
        eprintln!("{}", line);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&fetched.value)?);
    } else {
        print!("{}", format_section(theme, action, fetched));
    }
    Ok(0)
}

fn not_cached(theme: &Theme, action: &str) -> i32 {
    eprintln!(
        "{}",
        notice(
            theme,
            NoticeKind::Error,
            &format!("{} is not cached; run without --offline to fetch it", action)
        )
    );
    1
}

fn report_failure(theme: &Theme, error: &RequestError) -> i32 {
    let message = if error.is_retryable() {
        format!("{} (gave up after retries)", error)
    } else {
        error.to_string()
    };
    eprintln!("{}", notice(theme, NoticeKind::Error, &message));
    1
}

async fn read_contact_form(args: &ContactArgs) -> anyhow::Result<ContactForm> {
    let mut attachments = Vec::with_capacity(args.attachments.len());
    for path in &args.attachments {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        attachments.push(Attachment::new(file_name, media_type_for(path), bytes));
    }

    Ok(ContactForm {
        name: args.name.clone(),
        email: args.email.clone(),
        phone: args.phone.clone(),
        company: args.company.clone(),
        subject: args.subject.clone(),
        message: args.message.clone(),
        service: args.service.clone(),
        budget: args.budget.clone(),
        timeline: args.timeline.clone(),
        urgency: args.urgency.clone(),
        attachments,
    })
}

/// Initialize logging with path and level configuration
fn init_logging(logging: &infrastructure::config::Logging) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter_directive()));

    if let Some(path) = &logging.path {
        if !path.is_empty() {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .init();
            return Ok(());
        }
    }

    // stderr keeps stdout clean for --json
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

async fn print_status(state: &AppState) -> anyhow::Result<()> {
    println!("{}", "folio Status".green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("Endpoint: {}", state.config.endpoint);
    println!(
        "Connectivity: {}",
        if state.connectivity.is_online() {
            "online"
        } else {
            "offline"
        }
    );
    println!("Memory Cache: {} entries", state.cache.len());

    let db_path = infrastructure::config::get_database_path(&state.config);
    let persisted = db::snapshot_len(&state.db).await?;
    println!("Snapshot: {} ({} rows)", db_path.display(), persisted);

    let stats = state.queue.stats();
    println!(
        "Queue: {} pending, {} attempts, {} resolved, {} requeued, {} rejected",
        state.queue.len(),
        stats.attempts,
        stats.resolved,
        stats.requeued,
        stats.rejected
    );

    println!(
        "Config: {}",
        infrastructure::config::get_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not found".to_string())
    );
    println!(
        "Upload limits: {} per file, {} total, {} files",
        format_file_size(state.config.contact.max_file_size),
        format_file_size(state.config.contact.max_total_size),
        state.config.contact.max_files
    );

    let recent = state.api_log.recent();
    if !recent.is_empty() {
        println!("Recent requests:");
        for record in recent.iter().rev().take(10) {
            println!(
                "  {} {} {}ms {}",
                record.at.format("%H:%M:%S"),
                record.action,
                record.elapsed_ms,
                record.outcome
            );
        }
    }

    Ok(())
}
