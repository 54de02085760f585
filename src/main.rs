use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recipebox::capture::CloudinaryConnector;
use recipebox::cli_style::{self, colors, get_styles};
use recipebox::config::{AppConfig, CliConfig, FileConfig};
use recipebox::terminal::{ShellScanner, SidecarTextRecognizer, TerminalPresenter};
use recipebox::{
    fields, App, AppOptions, Capabilities, FirestoreConnector, ImageData, SqliteLocalStore,
};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles(), version)]
struct CliArgs {
    /// Directory holding the recipe database.
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// TOML config file, its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Numeric passcode required to change settings.
    #[clap(long)]
    pub settings_passcode: Option<String>,

    /// How many mirror calls may wait for the remote store.
    #[clap(long, default_value_t = 64)]
    pub mirror_queue_capacity: usize,

    /// Timeout in seconds for remote store and upload requests.
    #[clap(long, default_value_t = 30)]
    pub remote_timeout_sec: u64,

    /// Documents per page when listing remote records.
    #[clap(long, default_value_t = 100)]
    pub remote_page_size: usize,

    /// Firestore endpoint, e.g. a local emulator.
    #[clap(long)]
    pub firestore_endpoint: Option<String>,

    /// Cloudinary API endpoint.
    #[clap(long)]
    pub cloudinary_endpoint: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            data_dir: self.data_dir.clone(),
            settings_passcode: self.settings_passcode.clone(),
            mirror_queue_capacity: self.mirror_queue_capacity,
            remote_timeout_sec: self.remote_timeout_sec,
            remote_page_size: self.remote_page_size,
            firestore_endpoint: self.firestore_endpoint.clone(),
            cloudinary_endpoint: self.cloudinary_endpoint.clone(),
        }
    }
}

#[derive(Parser)]
#[command(styles=get_styles(), name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Starts the scanner.
    Scan,

    /// Hands a code to the running scanner, as if the camera read it.
    Decode { code: String },

    /// Leaves the scanner or the editor without saving.
    Cancel,

    /// Starts a new recipe with a typed key.
    New { key: String },

    /// Edits the recipe on display.
    Edit,

    /// Sets the title of the recipe being edited.
    Title {
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Sets the notes of the recipe being edited.
    Notes {
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Attaches a photo from disk to the recipe being edited.
    Photo { file: PathBuf },

    /// Fills the notes with text read from the photo.
    Ocr,

    /// Saves the recipe being edited.
    Save,

    /// Shows a stored recipe.
    Show { key: String },

    /// Lists stored recipes, newest first.
    List,

    /// Deletes a stored recipe.
    Delete { key: String },

    /// Shows the connection settings.
    Settings,

    /// Unlocks settings changes.
    Unlock { passcode: String },

    /// Locks settings changes again.
    Lock,

    /// Sets a settings field.
    Set { name: String, value: String },

    /// Removes a settings field.
    Unset { name: String },

    /// Pulls records and settings from the remote store.
    Sync,

    /// Shows capture, sync and upload state.
    Status,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

struct Shell {
    app: App,
    scanner: Arc<ShellScanner>,
    recognizer: Arc<SidecarTextRecognizer>,
}

fn joined(words: Vec<String>) -> String {
    words.join(" ")
}

async fn execute_command(line: String, shell: &mut Shell) -> CommandExecutionResult {
    if line.trim().is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    let command = match cli {
        Ok(cli) => cli.command,
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
            return CommandExecutionResult::Ok;
        }
    };

    let app = &mut shell.app;
    let result = match command {
        InnerCommand::Scan => app.begin_scan(),
        InnerCommand::Decode { code } => {
            if !shell.scanner.feed(&code) {
                return CommandExecutionResult::Error(
                    "The scanner is not running, use `scan` first.".to_string(),
                );
            }
            app.poll_decode().map(|_| ())
        }
        InnerCommand::Cancel => {
            app.cancel();
            Ok(())
        }
        InnerCommand::New { key } => app.begin_manual_entry(&key),
        InnerCommand::Edit => app.edit_current(),
        InnerCommand::Title { words } => app.set_draft_title(&joined(words)),
        InnerCommand::Notes { words } => app.set_draft_notes(&joined(words)),
        InnerCommand::Photo { file } => {
            let bytes = match std::fs::read(&file) {
                Ok(bytes) => bytes,
                Err(e) => {
                    return CommandExecutionResult::Error(format!(
                        "Could not read {}: {}",
                        file.display(),
                        e
                    ))
                }
            };
            let image = ImageData::from_bytes(bytes);
            if !image.mime_type.starts_with("image/") {
                cli_style::print_warning(&format!(
                    "{} does not look like an image ({})",
                    file.display(),
                    image.mime_type
                ));
            }
            app.set_draft_photo(image)
                .map(|_| shell.recognizer.set_source(&file))
        }
        InnerCommand::Ocr => match app.recognize_notes().await {
            Ok(Some(text)) => {
                cli_style::print_success("Notes filled from photo:");
                println!("{}", text);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        },
        InnerCommand::Save => app.save_draft().await.map(|_| ()),
        InnerCommand::Show { key } => app.show_record(&key).map(|found| {
            if !found {
                cli_style::print_empty_list(&format!("No recipe with key {}", key));
            }
        }),
        InnerCommand::List => app.list_records().map(|records| {
            cli_style::print_section_header("Recipes");
            if records.is_empty() {
                cli_style::print_empty_list("nothing saved yet");
            }
            for record in records {
                cli_style::print_list_item(
                    &format!(
                        "{}  {}  {}",
                        record.updated_at.format("%Y-%m-%d"),
                        cli_style::truncate(&record.key, 16),
                        cli_style::truncate(&record.title, 36)
                    ),
                    colors::WHITE,
                );
            }
            cli_style::print_section_footer();
        }),
        InnerCommand::Delete { key } => app.delete_record(&key).map(|deleted| {
            if deleted {
                cli_style::print_success(&format!("Deleted {}", key));
            } else {
                cli_style::print_empty_list(&format!("No recipe with key {}", key));
            }
        }),
        InnerCommand::Settings => {
            print_settings(app);
            Ok(())
        }
        InnerCommand::Unlock { passcode } => {
            if app.unlock_settings(&passcode) {
                cli_style::print_success("Settings unlocked");
                Ok(())
            } else {
                return CommandExecutionResult::Error("Wrong passcode.".to_string());
            }
        }
        InnerCommand::Lock => {
            app.lock_settings();
            Ok(())
        }
        InnerCommand::Set { name, value } => {
            if !fields::ALL.contains(&name.as_str()) {
                cli_style::print_warning(&format!("{} is not a known settings field", name));
            }
            app.update_settings([(name, value)]).map(|_| ())
        }
        InnerCommand::Unset { name } => app.remove_setting(&name).map(|_| ()),
        InnerCommand::Sync => {
            let report = app.pull().await;
            if !report.remote_available {
                cli_style::print_warning("Remote store not configured");
            } else {
                cli_style::print_success(&format!(
                    "Pulled {} recipes, settings merged: {}",
                    report.records_pulled, report.settings_merged
                ));
            }
            Ok(())
        }
        InnerCommand::Status => {
            print_status(app);
            Ok(())
        }
        InnerCommand::Exit => return CommandExecutionResult::Exit,
    };

    match result {
        Ok(()) => CommandExecutionResult::Ok,
        Err(e) => CommandExecutionResult::Error(e.to_string()),
    }
}

fn print_settings(app: &App) {
    let settings = app.settings();
    cli_style::print_section_header("Settings");
    for name in fields::ALL {
        let value = match settings.get(name) {
            Some(v) if *name == fields::FB_API_KEY => format!("{}…", cli_style::truncate(v, 5)),
            Some(v) => v.to_string(),
            None => "(unset)".to_string(),
        };
        cli_style::print_key_value(name, &value);
    }
    for (name, value) in settings.iter() {
        if !fields::ALL.contains(&name) {
            cli_style::print_key_value(name, value);
        }
    }
    let lock_state = if app.is_settings_unlocked() {
        "unlocked"
    } else {
        "locked"
    };
    cli_style::print_key_value("Changes", lock_state);
    cli_style::print_section_footer();
}

fn print_status(app: &App) {
    let stats = app.mirror_stats();
    let on_off = |enabled: bool| if enabled { "on" } else { "off" };
    cli_style::print_section_header("Status");
    cli_style::print_key_value("Capture", app.capture_phase().as_str());
    cli_style::print_key_value("Camera", on_off(app.scanner_active()));
    cli_style::print_key_value("Remote sync", on_off(app.is_remote_configured()));
    cli_style::print_key_value("Photo upload", on_off(app.is_upload_configured()));
    cli_style::print_key_value("Mirror pending", &app.pending_mirrors().to_string());
    cli_style::print_key_value(
        "Mirror done/failed/dropped",
        &format!("{}/{}/{}", stats.completed, stats.failed, stats.dropped),
    );
    if let Some(err) = stats.last_error {
        cli_style::print_key_value("Last mirror error", &err);
    }
    cli_style::print_section_footer();
}

#[derive(rustyline_derive::Hinter)]
struct ShellHelper {
    commands_names: Vec<String>,
}

impl ShellHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        ShellHelper { commands_names }
    }
}

impl Completer for ShellHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            // Field names for `set` and `unset`.
            let mut parts = line.splitn(2, ' ');
            let command = parts.next().unwrap_or_default();
            let rest = parts.next().unwrap_or_default();
            if (command == "set" || command == "unset") && !rest.contains(' ') {
                let matches = fields::ALL
                    .iter()
                    .filter(|f| f.starts_with(rest))
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>();
                return Ok((command.len() + 1, matches));
            }
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for ShellHelper {}
impl Validator for ShellHelper {}
impl Helper for ShellHelper {}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let db_path = config.db_path();
    info!("Opening recipe database at {:?}...", db_path);
    let store = Arc::new(
        SqliteLocalStore::open(&db_path)
            .with_context(|| format!("Cannot open the recipe database at {:?}", db_path))?,
    );

    let scanner = Arc::new(ShellScanner::new());
    let recognizer = Arc::new(SidecarTextRecognizer::new());
    let capabilities = Capabilities {
        scanner: scanner.clone(),
        recognizer: recognizer.clone(),
        presenter: Arc::new(TerminalPresenter),
        uploader_connector: Arc::new(CloudinaryConnector::new(
            config.cloudinary_endpoint.clone(),
            config.remote_timeout(),
        )),
        remote_connector: Arc::new(FirestoreConnector::new(config.remote_options())),
    };
    let app = App::new(
        store,
        capabilities,
        AppOptions {
            mirror_queue_capacity: config.mirror_queue_capacity,
            settings_passcode: config.settings_passcode.clone(),
        },
    )?;

    let report = app.start().await;
    info!(
        "Startup sync: remote={} pulled={} failed={} settings_merged={}",
        report.remote_available,
        report.records_pulled,
        report.records_failed,
        report.settings_merged
    );

    cli_style::print_welcome(
        &db_path.display().to_string(),
        app.is_remote_configured(),
        app.is_upload_configured(),
    );

    let mut shell = Shell {
        app,
        scanner,
        recognizer,
    };

    let rl_config = Config::builder()
        .completion_type(CompletionType::List)
        .build();
    let mut rl = Editor::<ShellHelper, FileHistory>::with_config(rl_config)?;
    rl.set_helper(Some(ShellHelper::new()));

    loop {
        let prompt = cli_style::get_prompt(shell.app.capture_phase().as_str());
        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &mut shell).await {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => break,
                    CommandExecutionResult::Error(err) => cli_style::print_error(&err),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }

    let pending = shell.app.pending_mirrors();
    if pending > 0 {
        info!("Waiting for {} mirror calls...", pending);
    }
    if tokio::time::timeout(Duration::from_secs(10), shell.app.shutdown())
        .await
        .is_err()
    {
        warn!("Gave up waiting for mirror calls");
    }
    cli_style::print_goodbye();
    Ok(())
}
