// Outreach CLI - personalized emails from a spreadsheet of companies

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use outreach_ai::{ChatClient, OracleError};
use outreach_cli::exit_codes::{
    EXIT_AI_MISSING_KEY, EXIT_ERROR, EXIT_NOT_FOUND, EXIT_SCHEMA, EXIT_SUCCESS, EXIT_USAGE,
};
use outreach_cli::generator::EmailGenerator;
use outreach_cli::processor::{Run, RunError, RunOptions};
use outreach_config::ai::{AIDiagnostics, ResolvedAIConfig};
use outreach_config::settings::{ModeSetting, Settings};
use outreach_engine::resolve::ColumnMode;
use outreach_io::TableFormat;

#[derive(Parser)]
#[command(name = "outreach")]
#[command(about = "Draft a personalized email for every company in a spreadsheet")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one email per row and save an updated copy of the spreadsheet
    #[command(after_help = "\
Examples:
  outreach run companies.xlsx --template-file pitch.txt
  outreach run leads.csv --template 'Dear Team, ...' --limit 5
  outreach run leads.csv --template-file pitch.txt --dry-run
  outreach run companies.xlsx --mode label --description-column About --output-column Draft")]
    Run {
        /// Spreadsheet to read (prompted for when omitted)
        file: Option<PathBuf>,

        /// Generic email template (prompted for when omitted)
        #[arg(long, short = 't', conflicts_with = "template_file")]
        template: Option<String>,

        /// Read the email template from a file
        #[arg(long)]
        template_file: Option<PathBuf>,

        /// Input format (default: inferred from extension)
        #[arg(long, short = 'f')]
        format: Option<Format>,

        /// Locate columns by header label or by position (default: label for xlsx, position otherwise)
        #[arg(long)]
        mode: Option<Mode>,

        /// Label mode: header of the company description column
        #[arg(long)]
        description_column: Option<String>,

        /// Label mode: header of the column receiving drafts
        #[arg(long)]
        output_column: Option<String>,

        /// Label mode: header of the company name column (rows without a name are skipped)
        #[arg(long)]
        name_column: Option<String>,

        /// Position mode: header for the draft column when the table has only four columns
        #[arg(long)]
        default_output: Option<String>,

        /// Worksheet to read (xlsx only; default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Inserted before the extension of the output file
        #[arg(long)]
        suffix: Option<String>,

        /// Model identifier
        #[arg(long)]
        model: Option<String>,

        /// Chat-completions API base URL
        #[arg(long, env = "OUTREACH_ENDPOINT")]
        endpoint: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Settings file (default: ~/.config/outreach/settings.json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print each row's prompt instead of calling the model; writes nothing
        #[arg(long)]
        dry_run: bool,

        /// Process at most N rows that have the required values
        #[arg(long)]
        limit: Option<usize>,

        /// Only log warnings and errors
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// AI provider commands
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
}

#[derive(Subcommand)]
enum AiCommands {
    /// Show the resolved AI configuration
    Doctor {
        /// Output as JSON for machine parsing
        #[arg(long)]
        json: bool,

        /// Settings file (default: ~/.config/outreach/settings.json)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Tsv,
    Xlsx,
}

impl From<Format> for TableFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => TableFormat::Csv,
            Format::Tsv => TableFormat::Tsv,
            Format::Xlsx => TableFormat::Xlsx,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Label,
    Position,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  outreach-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let quiet = matches!(cli.command, Some(Commands::Run { quiet: true, .. }));
    init_logging(quiet);

    let result = match cli.command {
        None => {
            eprintln!("Usage: outreach <command> [options]");
            eprintln!("       outreach --help for more information");
            Ok(())
        }
        Some(Commands::Run {
            file,
            template,
            template_file,
            format,
            mode,
            description_column,
            output_column,
            name_column,
            default_output,
            sheet,
            suffix,
            model,
            endpoint,
            timeout,
            config,
            dry_run,
            limit,
            quiet: _,
        }) => cmd_run(RunArgs {
            file,
            template,
            template_file,
            format,
            mode,
            description_column,
            output_column,
            name_column,
            default_output,
            sheet,
            suffix,
            model,
            endpoint,
            timeout,
            config,
            dry_run,
            limit,
        }),
        Some(Commands::Ai { command }) => match command {
            AiCommands::Doctor { json, config } => cmd_ai_doctor(json, config),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Progress goes to stderr. `RUST_LOG` wins over the default level.
fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<RunError> for CliError {
    fn from(err: RunError) -> Self {
        let code = err.exit_code();
        let hint = match code {
            EXIT_SCHEMA => Some(
                "use --mode, --description-column or --output-column to match the spreadsheet".to_string(),
            ),
            EXIT_USAGE => Some("save the workbook as .xlsx, or pass --format".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

struct RunArgs {
    file: Option<PathBuf>,
    template: Option<String>,
    template_file: Option<PathBuf>,
    format: Option<Format>,
    mode: Option<Mode>,
    description_column: Option<String>,
    output_column: Option<String>,
    name_column: Option<String>,
    default_output: Option<String>,
    sheet: Option<String>,
    suffix: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    timeout: Option<u64>,
    config: Option<PathBuf>,
    dry_run: bool,
    limit: Option<usize>,
}

fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut settings = Settings::load(args.config.as_deref());

    // Flags override the settings file
    if let Some(model) = args.model {
        settings.ai.model = model;
    }
    if let Some(endpoint) = args.endpoint {
        settings.ai.endpoint = Some(endpoint);
    }
    if let Some(timeout) = args.timeout {
        settings.ai.timeout_secs = timeout;
    }
    let pipeline = &mut settings.pipeline;
    if let Some(mode) = args.mode {
        pipeline.mode = match mode {
            Mode::Label => ModeSetting::Label,
            Mode::Position => ModeSetting::Position,
        };
    }
    if let Some(label) = args.description_column {
        pipeline.description_column = label;
    }
    if let Some(label) = args.output_column {
        pipeline.output_column = label;
    }
    if args.name_column.is_some() {
        pipeline.name_column = args.name_column;
    }
    if let Some(label) = args.default_output {
        pipeline.default_output_column = label;
    }
    if args.sheet.is_some() {
        pipeline.sheet = args.sheet;
    }
    if let Some(suffix) = args.suffix {
        pipeline.output_suffix = suffix;
    }

    let input = match args.file {
        Some(path) => path,
        None => PathBuf::from(clean_path(&prompt_line("Enter the path to the spreadsheet: ")?)),
    };
    if input.as_os_str().is_empty() {
        return Err(CliError::args("no spreadsheet path given"));
    }

    let format = match args.format {
        Some(f) => f.into(),
        None => TableFormat::from_path(&input)
            .map_err(|e| CliError::args(e.to_string()).with_hint("pass --format csv|tsv|xlsx"))?,
    };

    let template = match (args.template, args.template_file) {
        (Some(text), _) => text,
        (None, Some(path)) => read_template(&path)?,
        (None, None) => prompt_line("Enter the generic email template: ")?,
    };
    if template.trim().is_empty() {
        return Err(CliError::args("email template is empty"));
    }

    let mode = column_mode(&settings, format);

    let config = ResolvedAIConfig::from_settings(&settings.ai);
    let client = chat_client(&config, args.dry_run)?;
    let generator = EmailGenerator::new(template, config.model.clone(), &client);

    log::debug!(
        "{} via {} ({}), {} mode",
        config.model,
        config.provider_name(),
        config.endpoint,
        mode.as_str()
    );

    let options = RunOptions {
        input,
        format,
        sheet: settings.pipeline.sheet.clone(),
        mode,
        output_suffix: settings.pipeline.output_suffix.clone(),
        dry_run: args.dry_run,
        limit: args.limit,
    };

    let summary = Run::new(options, &generator).execute()?;

    log::info!(
        "Processed {} rows ({} skipped, {} failed)",
        summary.processed,
        summary.skipped,
        summary.failed
    );
    if let Some(output) = &summary.output {
        log::info!("Spreadsheet customization complete: {}", output.display());
    }
    Ok(())
}

/// Build the model client. A dry run never calls the model, so it may
/// proceed without a key.
fn chat_client(config: &ResolvedAIConfig, dry_run: bool) -> Result<ChatClient, CliError> {
    let client = if dry_run {
        ChatClient::new(config.endpoint.clone(), config.api_key.clone(), config.timeout)
    } else {
        ChatClient::from_config(config)
    };

    client.map_err(|e| match e {
        OracleError::MissingKey => CliError {
            code: EXIT_AI_MISSING_KEY,
            message: config
                .blocking_reason
                .clone()
                .unwrap_or_else(|| e.to_string()),
            hint: Some("put the key in a .env file, or run with --dry-run to preview prompts".to_string()),
        },
        other => CliError::io(other.to_string()),
    })
}

/// Turn the merged settings into a concrete column mode for `format`.
fn column_mode(settings: &Settings, format: TableFormat) -> ColumnMode {
    let pipeline = &settings.pipeline;
    let use_labels = match pipeline.mode {
        ModeSetting::Label => true,
        ModeSetting::Position => false,
        ModeSetting::Auto => format.is_workbook(),
    };
    if use_labels {
        ColumnMode::Label {
            description: pipeline.description_column.clone(),
            output: pipeline.output_column.clone(),
            name: pipeline.name_column.clone(),
        }
    } else {
        ColumnMode::Position {
            default_output: pipeline.default_output_column.clone(),
        }
    }
}

fn read_template(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| {
        let code = if e.kind() == io::ErrorKind::NotFound { EXIT_NOT_FOUND } else { EXIT_ERROR };
        CliError {
            code,
            message: format!("cannot read template {}: {}", path.display(), e),
            hint: None,
        }
    })
}

/// Print `prompt` and read one line from stdin, without the line ending.
fn prompt_line(prompt: &str) -> Result<String, CliError> {
    print!("{}", prompt);
    io::stdout().flush().map_err(|e| CliError::io(e.to_string()))?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| CliError::io(format!("failed to read stdin: {}", e)))?;
    if read == 0 {
        return Err(CliError::args("no input on stdin").with_hint("pass the value as an argument instead"));
    }
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Strip whitespace and the quotes terminals add to dropped paths.
fn clean_path(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(trimmed);
    unquoted.to_string()
}

fn cmd_ai_doctor(json: bool, config: Option<PathBuf>) -> Result<(), CliError> {
    let settings = Settings::load(config.as_deref());
    let resolved = ResolvedAIConfig::from_settings(&settings.ai);
    let diag = AIDiagnostics::from_resolved(&resolved);

    if json {
        let output = serde_json::to_string_pretty(&diag.to_json())
            .map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", output);
    } else {
        print!("{}", diag);
        if diag.blocking_reason.is_some() {
            println!();
            println!("Fix: export OUTREACH_OPENAI_KEY=... or add it to a .env file");
        }
    }

    if diag.status.is_ready() {
        Ok(())
    } else {
        let reason = diag.blocking_reason.unwrap_or_else(|| "unknown".to_string());
        Err(CliError {
            code: EXIT_AI_MISSING_KEY,
            message: format!("AI misconfigured: {}", reason),
            hint: None,
        })
    }
}
