use anyhow::{anyhow, Result};
use ndt_report::{
    config::Config,
    document::ReportDocument,
    form::FormData,
    render::Renderer,
    store::PreferenceStore,
    submit::{ControlEvent, ControlState, Outcome, SubmitControl, SubmitHandler},
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

enum Reply {
    Pdf,
    Status(u16),
    Network,
}

struct FakeRenderer {
    reply: Reply,
    calls: Cell<u32>,
    seen: RefCell<Vec<ReportDocument>>,
}

impl FakeRenderer {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Cell::new(0),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Renderer for FakeRenderer {
    fn render(&self, doc: &ReportDocument) -> Result<Vec<u8>> {
        self.calls.set(self.calls.get() + 1);
        self.seen.borrow_mut().push(doc.clone());
        match self.reply {
            Reply::Pdf => Ok(b"%PDF-1.7\n%fake\n".to_vec()),
            Reply::Status(code) => Err(anyhow!(
                "HTTP error! Status: {code}. Details: renderer exploded"
            )),
            Reply::Network => Err(anyhow!("error sending request: connection refused")),
        }
    }
}

fn dated_form(date: &str) -> FormData {
    FormData::from_pairs([
        ("inspection_date", date),
        ("client", "Acme"),
        ("probe_angle_1", "45"),
    ])
}

fn pdf_files(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(".pdf"))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn success_writes_dated_pdf_and_restores_control() {
    let cfg = Config::default();
    let tmp = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(tmp.path().join("state.json"));
    let mut handler = SubmitHandler::new(&cfg, FakeRenderer::new(Reply::Pdf), store);

    let outcome = handler.submit(&dated_form("2024-03-01"), tmp.path());

    let expected = tmp.path().join("NDT_Report_2024-03-01.pdf");
    assert_eq!(outcome, Outcome::Success { path: expected.clone() });
    assert_eq!(outcome.user_message(), "PDF report generated successfully!");
    assert!(std::fs::read(&expected).unwrap().starts_with(b"%PDF"));
    assert!(!tmp.path().join(".NDT_Report_2024-03-01.pdf.part").exists());

    let control = handler.control();
    assert_eq!(control.state(), ControlState::Idle);
    assert!(!control.is_disabled());
    assert_eq!(control.label(), "Generate PDF Report");
    assert_eq!(control.enable_count(), 1);

    let renderer = handler.renderer();
    assert_eq!(renderer.calls.get(), 1);
    let sent = &renderer.seen.borrow()[0];
    assert_eq!(sent.probes.len(), 1);
    assert!(sent.get("probe_angle_1").is_none());
}

#[test]
fn empty_date_uses_fallback_name() {
    let cfg = Config::default();
    let tmp = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(tmp.path().join("state.json"));
    let mut handler = SubmitHandler::new(&cfg, FakeRenderer::new(Reply::Pdf), store);

    let outcome = handler.submit(&dated_form(""), tmp.path());
    assert_eq!(
        outcome,
        Outcome::Success {
            path: tmp.path().join("NDT_Report_report.pdf")
        }
    );
}

#[test]
fn non_success_status_reports_failure_without_download() {
    let cfg = Config::default();
    let tmp = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(tmp.path().join("state.json"));
    let mut handler = SubmitHandler::new(&cfg, FakeRenderer::new(Reply::Status(502)), store);

    let outcome = handler.submit(&dated_form("2024-03-01"), tmp.path());

    match &outcome {
        Outcome::Failure { message } => assert!(message.contains("Status: 502")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(outcome
        .user_message()
        .starts_with("Error generating PDF report: HTTP error! Status: 502"));
    assert!(outcome.user_message().ends_with("Please try again."));
    assert!(pdf_files(tmp.path()).is_empty());
    assert_eq!(handler.control().label(), "Generate PDF Report");
    assert!(!handler.control().is_disabled());
    assert_eq!(handler.control().enable_count(), 1);
}

#[test]
fn network_error_recovers_the_same_way() {
    let cfg = Config::default();
    let tmp = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(tmp.path().join("state.json"));
    let mut handler = SubmitHandler::new(&cfg, FakeRenderer::new(Reply::Network), store);

    let outcome = handler.submit(&dated_form("2024-03-01"), tmp.path());

    assert!(matches!(outcome, Outcome::Failure { .. }));
    assert!(pdf_files(tmp.path()).is_empty());
    assert_eq!(handler.control().state(), ControlState::Idle);
    assert_eq!(handler.renderer().calls.get(), 1);
}

#[test]
fn control_reenabled_once_per_cycle() {
    let cfg = Config::default();
    let tmp = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(tmp.path().join("state.json"));
    let mut handler = SubmitHandler::new(&cfg, FakeRenderer::new(Reply::Status(500)), store);

    for round in 1..=3 {
        handler.submit(&dated_form("2024-03-01"), tmp.path());
        assert_eq!(handler.control().enable_count(), round);
        assert!(!handler.control().is_disabled());
    }
    assert_eq!(handler.renderer().calls.get(), 3);
}

#[test]
fn control_transitions() {
    assert_eq!(
        ControlState::Idle.next(ControlEvent::Submit),
        Some(ControlState::Submitting)
    );
    assert_eq!(
        ControlState::Submitting.next(ControlEvent::Settle),
        Some(ControlState::Idle)
    );
    assert_eq!(ControlState::Submitting.next(ControlEvent::Submit), None);
    assert_eq!(ControlState::Idle.next(ControlEvent::Settle), None);

    let mut control = SubmitControl::new("Send", "Busy");
    assert!(control.apply(ControlEvent::Submit));
    assert!(control.is_disabled());
    assert_eq!(control.label(), "Busy");
    assert!(!control.apply(ControlEvent::Submit));
    assert!(control.apply(ControlEvent::Settle));
    assert_eq!(control.label(), "Send");
    assert_eq!(control.enable_count(), 1);
}

#[test]
fn guard_rejection_makes_no_request() {
    let mut cfg = Config::default();
    cfg.guards.enabled = true;
    cfg.guards.min_interactions = 10;
    let tmp = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(tmp.path().join("state.json"));
    let mut handler = SubmitHandler::new(&cfg, FakeRenderer::new(Reply::Pdf), store);

    let outcome = handler.submit(&dated_form("2024-03-01"), tmp.path());

    assert!(matches!(outcome, Outcome::Rejected { .. }));
    assert_eq!(handler.renderer().calls.get(), 0);
    assert_eq!(handler.control().enable_count(), 0);
    assert!(pdf_files(tmp.path()).is_empty());
}

#[test]
fn accepted_submission_starts_interval_guard() {
    let mut cfg = Config::default();
    cfg.guards.enabled = true;
    cfg.guards.min_interactions = 1;
    cfg.guards.min_interval_seconds = 3600;
    let tmp = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(tmp.path().join("state.json"));
    let mut handler = SubmitHandler::new(&cfg, FakeRenderer::new(Reply::Pdf), store.clone());

    assert!(handler.submit(&dated_form("2024-03-01"), tmp.path()).is_success());
    assert!(store.load().unwrap().last_submission_at.is_some());

    let second = handler.submit(&dated_form("2024-03-02"), tmp.path());
    assert!(matches!(second, Outcome::Rejected { .. }));
    assert_eq!(handler.renderer().calls.get(), 1);
}

struct WatchingRenderer {
    current: Rc<RefCell<(ControlState, String)>>,
    during_render: RefCell<Vec<(ControlState, String)>>,
}

impl Renderer for WatchingRenderer {
    fn render(&self, _doc: &ReportDocument) -> Result<Vec<u8>> {
        self.during_render
            .borrow_mut()
            .push(self.current.borrow().clone());
        Err(anyhow!("HTTP error! Status: 503. Details: busy"))
    }
}

#[test]
fn control_is_disabled_while_request_pending() {
    let cfg = Config::default();
    let tmp = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(tmp.path().join("state.json"));
    let current = Rc::new(RefCell::new((ControlState::Idle, String::new())));
    let renderer = WatchingRenderer {
        current: Rc::clone(&current),
        during_render: RefCell::new(Vec::new()),
    };

    let watch = Rc::clone(&current);
    let mut handler = SubmitHandler::new(&cfg, renderer, store).with_observer(move |control| {
        *watch.borrow_mut() = (control.state(), control.label().to_string());
    });

    handler.submit(&dated_form("2024-03-01"), tmp.path());

    assert_eq!(
        *handler.renderer().during_render.borrow(),
        vec![(ControlState::Submitting, "Generating PDF...".to_string())]
    );
    assert_eq!(
        *current.borrow(),
        (ControlState::Idle, "Generate PDF Report".to_string())
    );
}

#[test]
fn failed_request_still_starts_interval_guard() {
    let mut cfg = Config::default();
    cfg.guards.enabled = true;
    cfg.guards.min_interactions = 1;
    cfg.guards.min_interval_seconds = 3600;
    let tmp = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(tmp.path().join("state.json"));
    let mut handler = SubmitHandler::new(&cfg, FakeRenderer::new(Reply::Network), store.clone());

    assert!(matches!(
        handler.submit(&dated_form("2024-03-01"), tmp.path()),
        Outcome::Failure { .. }
    ));
    assert!(store.load().unwrap().last_submission_at.is_some());

    let second = handler.submit(&dated_form("2024-03-01"), tmp.path());
    assert!(matches!(second, Outcome::Rejected { .. }));
    assert_eq!(handler.renderer().calls.get(), 1);
}
