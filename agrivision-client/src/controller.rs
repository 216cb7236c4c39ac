//! UI State Controller
//!
//! An immutable [`UiState`] record advanced by the pure [`UiState::reduce`].
//! The reducer never performs I/O; it returns [`Effect`]s describing the
//! dispatches to start or cancel, and the session carries them out.
//!
//! # States
//! `{LoggedOut, LoggedIn} × {Vision, Soil} × {Idle, Loading, Done, Errored}`
//!
//! # Rules
//! - Changing any input resets the previous result and error
//! - `Submit` is ignored while a dispatch is in flight
//! - A completion is accepted only for the ticket currently loading
//! - Logging in or out resets all transient state and forces vision view
//! - Soil view requires a signed-in user

use crate::image::ImageFile;
use crate::request::{Input, Outcome};
use agrivision_common::auth::Identity;
use agrivision_common::soil::{SoilForm, SoilSample};
use agrivision_common::validation::{UrlPolicy, NO_INPUT_MESSAGE};
use agrivision_common::{AdviceTranscript, Mode};
use std::sync::Arc;

/// Identifies one dispatch; completions for any other ticket are stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    LoggedOut,
    LoggedIn(Identity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Vision,
    Soil,
}

/// Lifecycle of the current prediction
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Loading(Ticket),
    Done(Outcome),
    Errored(String),
}

/// Lifecycle of the advisory chat for the current result
#[derive(Debug, Clone, PartialEq)]
pub enum AdvicePhase {
    Idle,
    Loading(Ticket),
    Ready(AdviceTranscript),
    Errored(String),
}

/// What the preview pane shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// Selected local file, held until superseded
    LocalFile { name: String, mime: &'static str },
    /// Valid remote URL
    Remote(String),
}

#[derive(Debug, Clone)]
pub enum Action {
    LoggedIn(Identity),
    LoggedOut,
    SwitchView(View),
    /// `None` clears the selection
    SelectFile(Option<ImageFile>),
    UrlChanged(String),
    SoilChanged(SoilForm),
    Submit,
    Completed {
        ticket: Ticket,
        result: Result<Outcome, String>,
    },
    RequestAdvice,
    AdviceCompleted {
        ticket: Ticket,
        result: Result<AdviceTranscript, String>,
    },
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Dispatch {
        ticket: Ticket,
        input: Input,
        mode: Mode,
    },
    Advise {
        ticket: Ticket,
        label: String,
    },
    Cancel(Ticket),
}

/// Complete UI state
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    auth: Auth,
    view: View,
    file: Option<Arc<ImageFile>>,
    url_text: String,
    soil: SoilForm,
    preview: Option<Preview>,
    phase: Phase,
    advice: AdvicePhase,
    url_policy: UrlPolicy,
    next_ticket: u64,
}

impl UiState {
    pub fn new(url_policy: UrlPolicy) -> Self {
        Self {
            auth: Auth::LoggedOut,
            view: View::Vision,
            file: None,
            url_text: String::new(),
            soil: SoilForm::from(SoilSample::default()),
            preview: None,
            phase: Phase::Idle,
            advice: AdvicePhase::Idle,
            url_policy,
            next_ticket: 1,
        }
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.auth, Auth::LoggedIn(_))
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn file(&self) -> Option<&ImageFile> {
        self.file.as_deref()
    }

    pub fn url_text(&self) -> &str {
        &self.url_text
    }

    pub fn soil(&self) -> &SoilForm {
        &self.soil
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn advice(&self) -> &AdvicePhase {
        &self.advice
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading(_))
    }

    /// Backend the next submit would target
    pub fn mode(&self) -> Mode {
        match (self.view, self.is_logged_in()) {
            (View::Soil, _) => Mode::Soil,
            (View::Vision, true) => Mode::Cloud,
            (View::Vision, false) => Mode::Local,
        }
    }

    /// Whether the submit control is enabled
    pub fn can_submit(&self) -> bool {
        if self.is_loading() {
            return false;
        }
        match self.view {
            View::Vision => self.file.is_some() || self.url_policy.is_valid(&self.url_text),
            View::Soil => self.soil.complete().is_ok(),
        }
    }

    /// Next state plus the effects the transition requires
    pub fn reduce(&self, action: Action) -> (UiState, Vec<Effect>) {
        let mut next = self.clone();
        let mut effects = Vec::new();

        match action {
            Action::LoggedIn(identity) => {
                next.reset_all(&mut effects);
                next.auth = Auth::LoggedIn(identity);
            }
            Action::LoggedOut => {
                next.reset_all(&mut effects);
                next.auth = Auth::LoggedOut;
            }
            Action::SwitchView(view) => {
                if view == next.view || (view == View::Soil && !next.is_logged_in()) {
                    return (next, effects);
                }
                next.reset_transient(&mut effects);
                next.view = view;
            }
            Action::SelectFile(selected) => {
                next.reset_transient(&mut effects);
                match selected {
                    Some(image) => {
                        next.preview = Some(Preview::LocalFile {
                            name: image.name.clone(),
                            mime: image.mime,
                        });
                        next.file = Some(Arc::new(image));
                        next.url_text.clear();
                    }
                    None => {
                        next.file = None;
                        next.preview = None;
                    }
                }
            }
            Action::UrlChanged(text) => {
                next.reset_transient(&mut effects);
                next.file = None;
                next.preview = next.url_policy.accept(&text).map(Preview::Remote);
                next.url_text = text;
            }
            Action::SoilChanged(form) => {
                next.reset_transient(&mut effects);
                next.soil = form;
            }
            Action::Submit => {
                if next.is_loading() {
                    return (next, effects);
                }
                next.advice = AdvicePhase::Idle;
                match next.submission() {
                    Ok(input) => {
                        let ticket = next.issue_ticket();
                        effects.push(Effect::Dispatch {
                            ticket,
                            input,
                            mode: next.mode(),
                        });
                        next.phase = Phase::Loading(ticket);
                    }
                    Err(message) => next.phase = Phase::Errored(message),
                }
            }
            Action::Completed { ticket, result } => {
                if next.phase != Phase::Loading(ticket) {
                    return (next, effects);
                }
                next.phase = match result {
                    Ok(outcome) => Phase::Done(outcome),
                    Err(message) => Phase::Errored(message),
                };
            }
            Action::RequestAdvice => {
                if matches!(next.advice, AdvicePhase::Loading(_)) {
                    return (next, effects);
                }
                let label = match &next.phase {
                    Phase::Done(outcome) => outcome.top_label().map(str::to_string),
                    _ => None,
                };
                match label {
                    Some(label) => {
                        let ticket = next.issue_ticket();
                        effects.push(Effect::Advise { ticket, label });
                        next.advice = AdvicePhase::Loading(ticket);
                    }
                    None => {
                        next.advice =
                            AdvicePhase::Errored("Run a prediction before asking for advice.".to_string())
                    }
                }
            }
            Action::AdviceCompleted { ticket, result } => {
                if next.advice != AdvicePhase::Loading(ticket) {
                    return (next, effects);
                }
                next.advice = match result {
                    Ok(transcript) => AdvicePhase::Ready(transcript),
                    Err(message) => AdvicePhase::Errored(message),
                };
            }
        }

        (next, effects)
    }

    /// Input for the current view, or the message to show instead
    fn submission(&self) -> Result<Input, String> {
        match self.view {
            View::Vision => {
                if let Some(file) = &self.file {
                    Ok(Input::File(Arc::clone(file)))
                } else if let Some(url) = self.url_policy.accept(&self.url_text) {
                    Ok(Input::Url(url))
                } else {
                    Err(NO_INPUT_MESSAGE.to_string())
                }
            }
            View::Soil => self
                .soil
                .complete()
                .map(Input::Soil)
                .map_err(|e| e.to_string()),
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    /// Drop result, error and advice, cancelling whatever is in flight
    fn reset_transient(&mut self, effects: &mut Vec<Effect>) {
        if let Phase::Loading(ticket) = self.phase {
            effects.push(Effect::Cancel(ticket));
        }
        if let AdvicePhase::Loading(ticket) = self.advice {
            effects.push(Effect::Cancel(ticket));
        }
        self.phase = Phase::Idle;
        self.advice = AdvicePhase::Idle;
    }

    fn reset_all(&mut self, effects: &mut Vec<Effect>) {
        self.reset_transient(effects);
        self.view = View::Vision;
        self.file = None;
        self.url_text.clear();
        self.soil = SoilForm::from(SoilSample::default());
        self.preview = None;
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new(UrlPolicy::default())
    }
}
