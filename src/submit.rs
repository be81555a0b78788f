use crate::{
    config::Config,
    document::ReportDocument,
    form::FormData,
    guard::{self, GuardContext},
    render::Renderer,
    store::PreferenceStore,
    util::{current_hostname, ensure_dir},
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{error, info, warn};

pub const SUCCESS_MESSAGE: &str = "PDF report generated successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Idle,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Submit,
    Settle,
}

impl ControlState {
    /// `None` when the event is not valid in this state.
    pub fn next(self, event: ControlEvent) -> Option<ControlState> {
        match (self, event) {
            (ControlState::Idle, ControlEvent::Submit) => Some(ControlState::Submitting),
            (ControlState::Submitting, ControlEvent::Settle) => Some(ControlState::Idle),
            _ => None,
        }
    }
}

/// The submit button: its label follows the state, and it is disabled while submitting.
#[derive(Debug, Clone)]
pub struct SubmitControl {
    state: ControlState,
    idle_label: String,
    busy_label: String,
    enable_count: u32,
}

impl SubmitControl {
    pub fn new(idle_label: impl Into<String>, busy_label: impl Into<String>) -> Self {
        Self {
            state: ControlState::Idle,
            idle_label: idle_label.into(),
            busy_label: busy_label.into(),
            enable_count: 0,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.form.submit_label, &cfg.form.busy_label)
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn label(&self) -> &str {
        match self.state {
            ControlState::Idle => &self.idle_label,
            ControlState::Submitting => &self.busy_label,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.state == ControlState::Submitting
    }

    /// How many times the control went back to enabled.
    pub fn enable_count(&self) -> u32 {
        self.enable_count
    }

    /// Returns false if the event was ignored.
    pub fn apply(&mut self, event: ControlEvent) -> bool {
        match self.state.next(event) {
            Some(next) => {
                if next == ControlState::Idle {
                    self.enable_count += 1;
                }
                self.state = next;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { path: PathBuf },
    Failure { message: String },
    /// Stopped by a guard before any request was made.
    Rejected { message: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// The text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Outcome::Success { .. } => SUCCESS_MESSAGE.to_string(),
            Outcome::Failure { message } => {
                format!("Error generating PDF report: {message}. Please try again.")
            }
            Outcome::Rejected { message } => message.clone(),
        }
    }
}

/// Called with the control after every state change.
pub type ControlObserver<'a> = Box<dyn Fn(&SubmitControl) + 'a>;

pub struct SubmitHandler<'a, R: Renderer> {
    cfg: &'a Config,
    renderer: R,
    store: PreferenceStore,
    control: SubmitControl,
    observer: Option<ControlObserver<'a>>,
}

impl<'a, R: Renderer> SubmitHandler<'a, R> {
    pub fn new(cfg: &'a Config, renderer: R, store: PreferenceStore) -> Self {
        Self {
            cfg,
            renderer,
            store,
            control: SubmitControl::from_config(cfg),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl Fn(&SubmitControl) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn control(&self) -> &SubmitControl {
        &self.control
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Runs one submission and writes the PDF into `out_dir` on success.
    pub fn submit(&mut self, form: &FormData, out_dir: &Path) -> Outcome {
        if let Err(message) = self.check_guards(form) {
            warn!("submission rejected: {message}");
            return Outcome::Rejected { message };
        }
        self.record_submission();

        let doc = ReportDocument::from_form(form);
        let report_id = doc.report_id().unwrap_or_default();
        info!(
            "submitting report_id={report_id} fields={} probes={}",
            doc.fields.len(),
            doc.probes.len()
        );

        self.transition(ControlEvent::Submit);
        let result = self.render_and_save(&doc, out_dir);
        self.transition(ControlEvent::Settle);

        match result {
            Ok(path) => {
                info!("report saved to {}", path.display());
                Outcome::Success { path }
            }
            Err(err) => {
                error!("error generating PDF: {:#}", err);
                Outcome::Failure {
                    message: format!("{:#}", err),
                }
            }
        }
    }

    fn transition(&mut self, event: ControlEvent) {
        if self.control.apply(event) {
            if let Some(observer) = &self.observer {
                observer(&self.control);
            }
        }
    }

    fn render_and_save(&self, doc: &ReportDocument, out_dir: &Path) -> Result<PathBuf> {
        let bytes = self.renderer.render(doc)?;
        let filename = doc.download_filename(
            &self.cfg.form.date_field,
            &self.cfg.output.filename_prefix,
            &self.cfg.output.fallback_stem,
        );
        save_pdf(out_dir, &filename, &bytes)
    }

    fn check_guards(&self, form: &FormData) -> std::result::Result<(), String> {
        if !self.cfg.guards.enabled {
            return Ok(());
        }
        let last_accepted = match self.store.load() {
            Ok(p) => p.last_submission_at,
            Err(err) => {
                warn!("ignoring unreadable preferences: {:#}", err);
                None
            }
        };
        let ctx = GuardContext {
            interactions: form.filled_count(),
            hostname: current_hostname(),
            now: OffsetDateTime::now_utc(),
            last_accepted,
        };
        guard::check(&self.cfg.guards, &ctx).map_err(|r| r.message())
    }

    /// Starts the interval throttle as soon as the guards accept a submission.
    fn record_submission(&self) {
        if !self.cfg.guards.enabled {
            return;
        }
        let now = OffsetDateTime::now_utc();
        if let Err(err) = self.store.update(|p| p.last_submission_at = Some(now)) {
            warn!("could not record submission time: {:#}", err);
        }
    }
}

/// Writes through a staging file so a partial PDF never appears under the final name.
pub fn save_pdf(out_dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    ensure_dir(out_dir)?;
    let target = out_dir.join(filename);
    let staging = out_dir.join(format!(".{filename}.part"));

    let written = std::fs::write(&staging, bytes)
        .with_context(|| format!("writing {}", staging.display()))
        .and_then(|_| {
            std::fs::rename(&staging, &target)
                .with_context(|| format!("renaming to {}", target.display()))
        });

    if let Err(err) = written {
        let _ = std::fs::remove_file(&staging);
        return Err(err);
    }
    Ok(target)
}
