use crate::domain::model::Priority;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Cached, offline-aware client for a portfolio endpoint.")]
#[command(version)]
pub struct Cli {
    /// Treat the network as unreachable (requests wait in the queue)
    #[arg(long, global = true)]
    pub offline: bool,

    /// Choose color theme
    #[arg(short = 'T', long, global = true)]
    pub theme: Option<String>,

    /// Remove every cached response
    #[arg(long)]
    pub clear_cache: bool,

    /// Generate config sample
    #[arg(long)]
    pub generate_config: bool,

    /// Edit configuration file
    #[arg(long)]
    pub edit_config: bool,

    /// Show status
    #[arg(long)]
    pub status: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch one action from the endpoint
    Fetch {
        /// Action name, e.g. getProjects
        action: String,

        /// Extra query parameters as key=value
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        #[arg(long, default_value = "normal")]
        priority: Priority,

        /// Bypass the cache and overwrite it
        #[arg(short = 'r', long)]
        refresh: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load every configured page section
    Sections {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send the contact form
    Contact(ContactArgs),

    /// Show or change UI preferences
    Prefs {
        #[arg(long)]
        set_theme: Option<String>,

        #[arg(long)]
        language: Option<String>,
    },
}

#[derive(Args)]
pub struct ContactArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub message: String,
    /// Service the enquiry is about
    #[arg(long)]
    pub service: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub company: String,
    #[arg(long, default_value = "")]
    pub budget: String,
    #[arg(long, default_value = "")]
    pub timeline: String,
    #[arg(long, default_value = "")]
    pub urgency: String,
    /// File to attach (repeatable)
    #[arg(short = 'a', long = "attach")]
    pub attachments: Vec<PathBuf>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))
}

/// Guess a media type from the file extension.
pub fn media_type_for(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
