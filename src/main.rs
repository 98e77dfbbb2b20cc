//! Purpose: `vitrine` CLI entry point and command dispatch bootstrap.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (human or JSON by flags).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All document mutations go through the edit session + gateway.

use std::path::{Path, PathBuf};

use clap::{error::ErrorKind as ClapErrorKind, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::aot::Shell;
use serde_json::{json, Map, Value};

mod color_json;
mod command_dispatch;
mod export;
mod serve;
mod summary_json;

use color_json::colorize_json;
use vitrine::api::{to_exit_code, Error, ErrorKind};
use vitrine::site_paths::{admin_session_path, default_state_dir};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(err.to_string().lines().next().unwrap_or("bad usage").trim())
                        .with_hint("Run `vitrine --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let state_dir = cli.state_dir.unwrap_or_else(default_state_dir);
    let color_mode = cli.color;
    let overrides = RemoteOverrides {
        remote_url: cli.remote,
        site: cli.site,
        token: cli.token,
    };

    command_dispatch::dispatch_command(cli.command, state_dir, color_mode, overrides)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "vitrine",
    version,
    about = "Self-editable portfolio content engine",
    long_about = None,
    before_help = r#"The public page reads the document; admin mode edits it in place.

Mental model:
  - `show` renders the current document (remote, then cache, then defaults)
  - `edit` changes one field and saves (cache first, then cloud)
  - `serve` hosts the document/asset store the remote tier talks to
"#,
    after_help = r#"EXAMPLES
  $ vitrine show --summary
  $ vitrine admin unlock --password ...
  $ vitrine edit set name "Avery Quinn"
  $ vitrine edit highlight move 2 up
  $ vitrine serve --bind 127.0.0.1:9720

LEARN MORE
  $ vitrine <command> --help"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, help = "State directory (default: ~/.vitrine)")]
    state_dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,
    #[arg(long, help = "Remote store base URL (overrides settings.json)")]
    remote: Option<String>,
    #[arg(long, help = "Remote site name (overrides settings.json)")]
    site: Option<String>,
    #[arg(long, help = "Remote bearer token (overrides settings.json)")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Clone, Debug)]
struct RemoteOverrides {
    remote_url: Option<String>,
    site: Option<String>,
    token: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(about = "Load and print the document")]
    Show {
        #[arg(long, help = "Print a short summary instead of the full document")]
        summary: bool,
    },
    #[command(about = "Fetch the freshest document and refresh the local cache")]
    Pull,
    #[command(about = "Push the local working copy to the cloud store")]
    Save,
    #[command(about = "Delete the local cache and return to the built-in defaults")]
    Reset {
        #[arg(long, help = "Required; reset cannot be undone")]
        confirm: bool,
    },
    #[command(about = "Export the full document to a pretty-printed JSON backup")]
    Export {
        file: PathBuf,
    },
    #[command(about = "Replace the document with an imported JSON backup and save")]
    Import {
        file: PathBuf,
        #[arg(long, help = "Required; import overwrites the current document")]
        confirm: bool,
    },
    #[command(about = "Admin-mode gate")]
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    #[command(about = "Remote site provisioning")]
    Site {
        #[command(subcommand)]
        command: SiteCommand,
    },
    #[command(about = "Client settings")]
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    #[command(about = "Edit the document field by field")]
    Edit {
        #[command(subcommand)]
        command: EditCommand,
    },
    #[command(about = "Uploaded image assets")]
    Asset {
        #[command(subcommand)]
        command: AssetCommand,
    },
    #[command(about = "Host the document/asset store")]
    Serve {
        #[command(flatten)]
        run: ServeRunArgs,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    #[command(about = "Unlock admin mode for this state directory")]
    Unlock {
        #[arg(long, help = "The shared admin secret, when one is configured")]
        password: Option<String>,
    },
    #[command(about = "Lock admin mode")]
    Lock,
    #[command(about = "Show whether admin mode is unlocked")]
    Status,
}

#[derive(Subcommand)]
enum SiteCommand {
    #[command(about = "Provision a site on the remote store")]
    Create { name: String },
}

#[derive(Subcommand)]
enum SettingsCommand {
    #[command(about = "Print the effective settings")]
    Show,
    #[command(about = "Update settings.json")]
    Set {
        #[arg(long)]
        remote_url: Option<String>,
        #[arg(long)]
        site: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        admin_secret: Option<String>,
    },
}

#[derive(Subcommand)]
enum EditCommand {
    #[command(about = "Set a profile field (name, role, bio-content, ...)")]
    Set { field: String, value: String },
    #[command(about = "Set a site config field (toc-title, hero-layout-swapped, ...)")]
    Config { field: String, value: String },
    #[command(about = "Set a contact/social field (phone, email, facebook, tiktok)")]
    Social { field: String, value: String },
    #[command(about = "Edit the highlight cards")]
    Highlight {
        #[command(subcommand)]
        command: ListCommand,
    },
    #[command(about = "Edit the portfolio projects")]
    Project {
        #[command(subcommand)]
        command: ListCommand,
    },
    #[command(about = "Edit a project's image gallery")]
    Gallery {
        #[command(subcommand)]
        command: GalleryCommand,
    },
    #[command(about = "Edit navigation items")]
    Nav {
        #[command(subcommand)]
        command: ListCommand,
    },
    #[command(about = "Per-element text style overrides")]
    Style {
        #[command(subcommand)]
        command: StyleCommand,
    },
    #[command(about = "Change an image slot via URL, upload, or the asset library")]
    Image {
        #[arg(help = "avatar | logo | project:<i>:image | project:<i>:logo | gallery:<i>:<j>")]
        target: String,
        #[arg(long, help = "Set the image URL directly")]
        url: Option<String>,
        #[arg(long, help = "Upload a local file and use its URL")]
        upload: Option<PathBuf>,
        #[arg(long, help = "Pick from the asset library by index (newest first)")]
        pick: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ListCommand {
    #[command(about = "Append a new entry with default content")]
    Add,
    #[command(about = "Remove the entry at INDEX")]
    Remove { index: usize },
    #[command(about = "Swap the entry at INDEX with its neighbor (boundary moves are no-ops)")]
    Move { index: usize, direction: String },
    #[command(about = "Set one field of the entry at INDEX")]
    Set {
        index: usize,
        field: String,
        value: String,
    },
}

#[derive(Subcommand)]
enum GalleryCommand {
    #[command(about = "Set one gallery image URL")]
    Set {
        project: usize,
        index: usize,
        url: String,
    },
    #[command(about = "Append a placeholder image (bounded)")]
    Add { project: usize },
    #[command(about = "Remove one gallery image")]
    Remove { project: usize, index: usize },
}

#[derive(Subcommand)]
enum StyleCommand {
    #[command(about = "Merge style properties into the override for KEY")]
    Set {
        key: String,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        size: Option<String>,
        #[arg(long, help = "sans | serif | mono | display | handwriting")]
        font: Option<String>,
        #[arg(long, help = "thin | light | normal | medium | bold | black")]
        weight: Option<String>,
        #[arg(long, help = "true | false")]
        italic: Option<String>,
        #[arg(long, help = "true | false")]
        uppercase: Option<String>,
        #[arg(long, help = "left | center | right | justify")]
        align: Option<String>,
        #[arg(long)]
        letter_spacing: Option<String>,
    },
    #[command(about = "Drop the override for KEY (inherit the default style)")]
    Clear { key: String },
}

#[derive(Subcommand)]
enum AssetCommand {
    #[command(about = "Upload a binary asset and print its URL")]
    Upload { file: PathBuf },
    #[command(about = "List uploaded assets, newest first")]
    List,
}

#[derive(Args)]
struct ServeRunArgs {
    #[arg(long, default_value = "127.0.0.1:9720", help = "host:port to bind")]
    bind: String,
    #[arg(long, help = "Store directory (default: <state-dir>/store)")]
    data_dir: Option<PathBuf>,
    #[arg(long, help = "Bearer token required for writes")]
    serve_token: Option<String>,
    #[arg(long, help = "Read the write token from a file")]
    token_file: Option<PathBuf>,
    #[arg(long, default_value = "read-write", value_enum)]
    access: ServeAccess,
    #[arg(long, help = "Allow binding to a non-loopback address")]
    allow_non_loopback: bool,
    #[arg(long, default_value_t = 8 * 1024 * 1024, help = "Request body limit in bytes")]
    max_body_bytes: u64,
    #[arg(long = "cors-origin", help = "Allowed CORS origin (repeatable)")]
    cors_origins: Vec<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ServeAccess {
    ReadOnly,
    ReadWrite,
}

// --- shared emission helpers ---

fn use_color(color_mode: ColorMode, stderr: bool) -> bool {
    use std::io::IsTerminal;
    match color_mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            if stderr {
                std::io::stderr().is_terminal()
            } else {
                std::io::stdout().is_terminal()
            }
        }
    }
}

fn emit_json(value: Value, color_mode: ColorMode) {
    println!("{}", colorize_json(&value, use_color(color_mode, false)));
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    eprintln!(
        "{}",
        colorize_json(&error_json(err), use_color(color_mode, true))
    );
}

fn error_json(err: &Error) -> Value {
    let mut body = Map::new();
    body.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    body.insert(
        "message".to_string(),
        json!(err.message().unwrap_or("error")),
    );
    if let Some(hint) = err.hint() {
        body.insert("hint".to_string(), json!(hint));
    }
    if let Some(site) = err.site() {
        body.insert("site".to_string(), json!(site));
    }
    if let Some(path) = err.path() {
        body.insert("path".to_string(), json!(path.display().to_string()));
    }
    json!({ "error": Value::Object(body) })
}

// --- admin session marker ---

fn admin_unlocked(state_dir: &Path) -> bool {
    admin_session_path(state_dir).exists()
}

fn write_admin_marker(state_dir: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(state_dir).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to create state directory")
            .with_path(state_dir)
            .with_source(err)
    })?;
    let path = admin_session_path(state_dir);
    std::fs::write(&path, format!("{}\n", now_rfc3339())).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write admin session marker")
            .with_path(&path)
            .with_source(err)
    })
}

fn remove_admin_marker(state_dir: &Path) -> Result<(), Error> {
    let path = admin_session_path(state_dir);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::new(ErrorKind::Io)
            .with_message("failed to remove admin session marker")
            .with_path(&path)
            .with_source(err)),
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{error_json, Cli};
    use clap::CommandFactory;
    use vitrine::api::{Error, ErrorKind};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn error_json_carries_kind_and_hint() {
        let err = Error::new(ErrorKind::NotConfigured)
            .with_message("no remote store is configured")
            .with_hint("Set remote_url in settings.json.");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "NotConfigured");
        assert!(value["error"]["hint"]
            .as_str()
            .expect("hint")
            .contains("settings.json"));
    }
}
