use crate::{
    config::Config,
    dates::{apply_default_date, today_local},
    document::ReportDocument,
    form::FormData,
    render::HttpRenderer,
    store::PreferenceStore,
    submit::{Outcome, SubmitHandler},
    theme::{effective_theme, system_prefers_dark, toggle_theme},
    util::{ensure_dir, now_rfc3339},
};
use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "ndt-report")]
#[command(about = "Submit NDT inspection reports to a PDF rendering service")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./ndt-report.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct FormArgs {
    /// Form file (TOML, or JSON when the extension is .json).
    #[arg(long)]
    pub form: Option<PathBuf>,

    /// Extra field as name=value. Repeatable; later values win.
    #[arg(long = "field", value_name = "NAME=VALUE")]
    pub fields: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send the report and save the returned PDF.
    Submit {
        #[command(flatten)]
        form: FormArgs,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Print the JSON document that would be sent.
    Preview {
        #[command(flatten)]
        form: FormArgs,
    },
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ThemeAction {
    Show,
    Toggle,
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Submit { form, out_dir } => submit(&cfg, form, out_dir.as_deref()),
        Command::Preview { form } => preview(&cfg, form),
        Command::Theme { action } => theme(&cfg, action),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("ndt-report.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.output.out_dir).join("ndt-report.log"))
}

/// Form entries as they stand when the form is shown: file values, then overrides,
/// then the inspection date default.
pub fn load_form(cfg: &Config, args: &FormArgs) -> Result<FormData> {
    let mut form = match &args.form {
        Some(path) => FormData::load(path)?,
        None => FormData::new(),
    };
    for raw in &args.fields {
        form.push_assignment(raw)?;
    }
    if cfg.form.default_date {
        apply_default_date(&mut form, &cfg.form.date_field, today_local());
    }
    Ok(form)
}

fn submit(cfg: &Config, args: &FormArgs, out_override: Option<&Path>) -> Result<()> {
    let form = load_form(cfg, args)?;
    let out_dir = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.output.out_dir));

    let renderer = HttpRenderer::new(cfg)?;
    info!("endpoint={} out={}", renderer.endpoint(), out_dir.display());

    let store = PreferenceStore::new(&cfg.appearance.state_file);
    let mut handler = SubmitHandler::new(cfg, renderer, store)
        .with_observer(|control| debug!("submit control: {:?} \"{}\"", control.state(), control.label()));

    let started = now_rfc3339();
    let outcome = handler.submit(&form, &out_dir);

    if cfg.output.print_summary {
        let (status, path) = match &outcome {
            Outcome::Success { path } => ("ok", Some(path.clone())),
            Outcome::Failure { .. } => ("failed", None),
            Outcome::Rejected { .. } => ("rejected", None),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "started": started,
                "finished": now_rfc3339(),
                "status": status,
                "path": path,
                "message": outcome.user_message(),
            }))?
        );
    }

    if outcome.is_success() && cfg.output.print_summary {
        return Ok(());
    }
    write_outcome(&outcome, &mut std::io::stdout(), &mut std::io::stderr())?;
    if outcome.is_success() {
        Ok(())
    } else {
        Err(AlreadyReported.into())
    }
}

/// Error returned once the failure message has already been shown to the user.
#[derive(Debug)]
pub struct AlreadyReported;

impl fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("submission failed")
    }
}

impl std::error::Error for AlreadyReported {}

/// Success goes to `out`, failures and rejections to `err`.
pub fn write_outcome<O: Write, E: Write>(outcome: &Outcome, out: &mut O, err: &mut E) -> io::Result<()> {
    if outcome.is_success() {
        writeln!(out, "{}", outcome.user_message())
    } else {
        writeln!(err, "{}", outcome.user_message())
    }
}

fn preview(cfg: &Config, args: &FormArgs) -> Result<()> {
    let form = load_form(cfg, args)?;
    let doc = ReportDocument::from_form(&form);
    println!("{}", doc.to_json_pretty()?);
    Ok(())
}

fn theme(cfg: &Config, action: &ThemeAction) -> Result<()> {
    let store = PreferenceStore::new(&cfg.appearance.state_file);
    let prefers_dark = system_prefers_dark(cfg.appearance.system_prefers_dark);
    let current = match action {
        ThemeAction::Show => effective_theme(&store, prefers_dark)?,
        ThemeAction::Toggle => toggle_theme(&store, prefers_dark)?,
    };
    println!("{current}");
    Ok(())
}
