//! Session: drives the controller and runs the work it asks for
//!
//! [`Session::apply`] feeds an action through the reducer and turns the
//! resulting effects into [`Job`]s. Every job owns a [`CancellationToken`];
//! a `Cancel` effect fires the token so the dispatcher drops the in-flight
//! request. Jobs are `'static` and may be spawned, and their completion
//! action is fed back through `apply`.

use crate::controller::{Action, Effect, Phase, Ticket, UiState};
use crate::dispatcher::Dispatcher;
use crate::request::{Outcome, RequestContext};
use agrivision_common::auth::CredentialVerifier;
use agrivision_common::validation::UrlPolicy;
use agrivision_common::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Unit of asynchronous work requested by the controller
#[derive(Debug)]
pub enum Job {
    Predict {
        ticket: Ticket,
        ctx: RequestContext,
        cancel: CancellationToken,
        dispatcher: Arc<Dispatcher>,
    },
    Advise {
        ticket: Ticket,
        label: String,
        cancel: CancellationToken,
        dispatcher: Arc<Dispatcher>,
    },
}

impl Job {
    pub fn ticket(&self) -> Ticket {
        match self {
            Job::Predict { ticket, .. } | Job::Advise { ticket, .. } => *ticket,
        }
    }

    /// Run to completion and return the action reporting the result
    pub async fn run(self) -> Action {
        match self {
            Job::Predict {
                ticket,
                ctx,
                cancel,
                dispatcher,
            } => {
                let result = dispatcher
                    .dispatch(&ctx, &cancel)
                    .await
                    .and_then(Outcome::from_raw)
                    .map_err(|e| e.to_string());
                Action::Completed { ticket, result }
            }
            Job::Advise {
                ticket,
                label,
                cancel,
                dispatcher,
            } => {
                let result = dispatcher
                    .advise(&label, &cancel)
                    .await
                    .map_err(|e| e.to_string());
                Action::AdviceCompleted { ticket, result }
            }
        }
    }
}

/// One user's interactive session
pub struct Session {
    state: UiState,
    dispatcher: Arc<Dispatcher>,
    verifier: Arc<dyn CredentialVerifier>,
    in_flight: HashMap<Ticket, CancellationToken>,
}

impl Session {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        verifier: Arc<dyn CredentialVerifier>,
        url_policy: UrlPolicy,
    ) -> Self {
        Self {
            state: UiState::new(url_policy),
            dispatcher,
            verifier,
            in_flight: HashMap::new(),
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Number of jobs started and neither completed nor cancelled
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Advance the state and return the jobs the transition started
    pub fn apply(&mut self, action: Action) -> Vec<Job> {
        match &action {
            Action::Completed { ticket, .. } | Action::AdviceCompleted { ticket, .. } => {
                if self.in_flight.remove(ticket).is_none() {
                    debug!(ticket = ticket.0, "Discarding result of superseded request");
                }
            }
            _ => {}
        }

        let (next, effects) = self.state.reduce(action);
        self.state = next;

        let mut jobs = Vec::new();
        for effect in effects {
            match effect {
                Effect::Cancel(ticket) => {
                    if let Some(token) = self.in_flight.remove(&ticket) {
                        debug!(ticket = ticket.0, "Cancelling in-flight request");
                        token.cancel();
                    }
                }
                Effect::Dispatch {
                    ticket,
                    input,
                    mode,
                } => {
                    let cancel = self.track(ticket);
                    jobs.push(Job::Predict {
                        ticket,
                        ctx: RequestContext::new(input, mode),
                        cancel,
                        dispatcher: Arc::clone(&self.dispatcher),
                    });
                }
                Effect::Advise { ticket, label } => {
                    let cancel = self.track(ticket);
                    jobs.push(Job::Advise {
                        ticket,
                        label,
                        cancel,
                        dispatcher: Arc::clone(&self.dispatcher),
                    });
                }
            }
        }
        jobs
    }

    /// Run jobs in order, feeding each completion back into the state
    pub async fn drive(&mut self, jobs: Vec<Job>) {
        let mut queue = jobs;
        while !queue.is_empty() {
            let mut spawned = Vec::new();
            for job in queue {
                let completion = job.run().await;
                spawned.extend(self.apply(completion));
            }
            queue = spawned;
        }
    }

    /// Verify credentials and switch to the signed-in state
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        match self.verifier.verify(username, password).await {
            Ok(identity) => {
                info!(user = %identity.username, "Logged in");
                self.apply(Action::LoggedIn(identity));
                Ok(())
            }
            Err(e) => {
                warn!(user = username, error = %e, "Login rejected");
                Err(e)
            }
        }
    }

    pub fn logout(&mut self) {
        info!("Logged out");
        self.apply(Action::LoggedOut);
    }

    /// Submit the current input and wait for its result
    pub async fn submit(&mut self) -> &Phase {
        let jobs = self.apply(Action::Submit);
        self.drive(jobs).await;
        self.state.phase()
    }

    /// Ask the advisory chat about the current result and wait for it
    pub async fn request_advice(&mut self) {
        let jobs = self.apply(Action::RequestAdvice);
        self.drive(jobs).await;
    }

    fn track(&mut self, ticket: Ticket) -> CancellationToken {
        let token = CancellationToken::new();
        self.in_flight.insert(ticket, token.clone());
        token
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for token in self.in_flight.values() {
            token.cancel();
        }
    }
}
