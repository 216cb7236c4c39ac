//! Session integration tests: controller, dispatcher and backend together

mod helpers;

use agrivision_client::controller::{Action, AdvicePhase, Phase, View};
use agrivision_client::dispatcher::Dispatcher;
use agrivision_client::image::ImageFile;
use agrivision_client::render::render_state;
use agrivision_client::request::Outcome;
use agrivision_client::session::{Job, Session};
use agrivision_common::auth::{CredentialVerifier, Identity, StaticCredentialVerifier};
use agrivision_common::config::Endpoints;
use agrivision_common::soil::{SoilForm, SoilSample};
use agrivision_common::validation::{UrlPolicy, NO_INPUT_MESSAGE};
use agrivision_common::{CropRecommendation, Error, Mode, Result};
use async_trait::async_trait;
use helpers::{endpoints_for, png_bytes, Backend, Reply};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn session_with(endpoints: Endpoints) -> Session {
    Session::new(
        Arc::new(Dispatcher::new(endpoints).unwrap()),
        Arc::new(StaticCredentialVerifier::default()),
        UrlPolicy::default(),
    )
}

fn predictions(label: &str) -> Reply {
    Reply::json(json!({
        "predictions": [
            { "tagName": label, "probability": 0.5 },
            { "tagName": "Quince", "probability": 0.3 },
            { "tagName": "Plum", "probability": 0.01 }
        ]
    }))
}

fn chat() -> Reply {
    Reply::json(json!({
        "fruit": "rice",
        "responses": [
            { "agent": "Botanist", "content": "Oryza sativa." },
            { "agent": "Chef", "content": "Risotto." }
        ]
    }))
}

#[tokio::test]
async fn anonymous_url_prediction_uses_local_model() {
    let backend = Backend::start(vec![("/url", predictions("Apple"))]).await;
    let mut session = session_with(endpoints_for(&backend));

    session.apply(Action::UrlChanged("https://x.test/apple.jpg".into()));
    let phase = session.submit().await.clone();

    match phase {
        Phase::Done(Outcome::Vision(results)) => {
            let names: Vec<_> = results.iter().map(|r| (r.name.as_str(), r.probability)).collect();
            assert_eq!(names, vec![("Apple", 50), ("Quince", 30)]);
        }
        other => panic!("unexpected phase {:?}", other),
    }
    assert_eq!(backend.last().path, "/url");
    assert_eq!(session.in_flight(), 0);

    let text = render_state(session.state());
    assert!(text.contains("[Multiple Matches]"));
    assert!(text.contains("Our AI is 50% sure this is a Apple."));
}

#[tokio::test]
async fn signed_in_file_prediction_uses_cloud_model() {
    let backend = Backend::start(vec![("/cloud/image", predictions("Pear"))]).await;
    let mut session = session_with(endpoints_for(&backend));

    session.login("admin", "admin").await.unwrap();
    let image = ImageFile::from_bytes("pear.png", png_bytes()).unwrap();
    session.apply(Action::SelectFile(Some(image)));
    let phase = session.submit().await.clone();

    assert!(matches!(phase, Phase::Done(Outcome::Vision(_))));
    let seen = backend.last();
    assert_eq!(seen.path, "/cloud/image");
    assert_eq!(seen.header("prediction-key"), Some("test-key"));
}

#[tokio::test]
async fn soil_analysis_then_advice() {
    let backend = Backend::start(vec![
        ("/score", Reply::json(json!({ "Results": ["rice"] }))),
        ("/chat", chat()),
    ])
    .await;
    let mut session = session_with(endpoints_for(&backend));

    session.login("admin", "admin").await.unwrap();
    session.apply(Action::SwitchView(View::Soil));
    assert_eq!(session.state().mode(), Mode::Soil);

    let phase = session.submit().await.clone();
    assert_eq!(phase, Phase::Done(Outcome::Crop(CropRecommendation::new("rice"))));

    session.request_advice().await;
    match session.state().advice() {
        AdvicePhase::Ready(transcript) => assert_eq!(transcript.responses.len(), 2),
        other => panic!("unexpected advice phase {:?}", other),
    }
    assert_eq!(backend.last().json(), json!({ "fruit": "rice" }));

    let text = render_state(session.state());
    assert!(text.contains("Recommended crop: rice"));
    assert!(text.contains("[Botanist]\nOryza sativa."));
    assert!(text.contains("[Chef]\nRisotto."));
}

#[tokio::test]
async fn anonymous_user_cannot_reach_soil_view() {
    let backend = Backend::start(vec![("/score", Reply::json(json!(["rice"])))]).await;
    let mut session = session_with(endpoints_for(&backend));

    session.apply(Action::SwitchView(View::Soil));
    assert_eq!(session.state().view(), View::Vision);

    let phase = session.submit().await.clone();
    assert_eq!(phase, Phase::Errored(NO_INPUT_MESSAGE.to_string()));
    assert!(backend.seen().is_empty());
}

#[tokio::test]
async fn incomplete_soil_form_never_reaches_backend() {
    let backend = Backend::start(vec![("/score", Reply::json(json!(["rice"])))]).await;
    let mut session = session_with(endpoints_for(&backend));

    session.login("admin", "admin").await.unwrap();
    session.apply(Action::SwitchView(View::Soil));
    session.apply(Action::SoilChanged(SoilForm {
        rainfall: None,
        ..SoilForm::from(SoilSample::default())
    }));

    let phase = session.submit().await.clone();
    assert!(matches!(phase, Phase::Errored(ref m) if m.contains("rainfall")));
    assert!(backend.seen().is_empty());
}

#[tokio::test]
async fn backend_error_is_shown_verbatim() {
    let backend = Backend::start(vec![("/url", Reply::status(503, "warming up"))]).await;
    let mut session = session_with(endpoints_for(&backend));

    session.apply(Action::UrlChanged("https://x.test/a.jpg".into()));
    let phase = session.submit().await.clone();

    assert_eq!(phase, Phase::Errored("API error (503): warming up".to_string()));
}

#[tokio::test]
async fn superseded_request_is_cancelled_and_its_result_discarded() {
    let backend = Backend::start(vec![(
        "/url",
        predictions("Apple").delayed(Duration::from_secs(5)),
    )])
    .await;
    let mut session = session_with(endpoints_for(&backend));

    session.apply(Action::UrlChanged("https://x.test/a.jpg".into()));
    let mut jobs = session.apply(Action::Submit);
    assert_eq!(jobs.len(), 1);
    let job = jobs.remove(0);
    let ticket = job.ticket();
    let running = tokio::spawn(job.run());

    // Give the request time to reach the backend
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.apply(Action::UrlChanged("https://x.test/b.jpg".into()));
    assert_eq!(session.in_flight(), 0);

    let completion = tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("cancelled job should finish promptly")
        .unwrap();
    match &completion {
        Action::Completed { ticket: t, result } => {
            assert_eq!(*t, ticket);
            assert!(matches!(result, Err(m) if m == "Request cancelled"));
        }
        other => panic!("unexpected completion {:?}", other),
    }

    session.apply(completion);
    assert_eq!(session.state().phase(), &Phase::Idle);
    assert_eq!(session.state().url_text(), "https://x.test/b.jpg");
}

#[tokio::test]
async fn late_completion_after_resubmit_is_ignored() {
    let backend = Backend::start(vec![("/url", predictions("Apple"))]).await;
    let mut session = session_with(endpoints_for(&backend));

    session.apply(Action::UrlChanged("https://x.test/a.jpg".into()));
    let first: Vec<Job> = session.apply(Action::Submit);
    let stale = first.into_iter().next().unwrap().run().await;

    // Input changes, a new request is issued and finishes first
    session.apply(Action::UrlChanged("https://x.test/b.jpg".into()));
    let phase = session.submit().await.clone();
    assert!(matches!(phase, Phase::Done(_)));

    let before = session.state().clone();
    session.apply(stale);
    assert_eq!(session.state(), &before);
}

#[tokio::test]
async fn logout_cancels_in_flight_work() {
    let backend = Backend::start(vec![(
        "/cloud/url",
        predictions("Apple").delayed(Duration::from_secs(5)),
    )])
    .await;
    let mut session = session_with(endpoints_for(&backend));

    session.login("admin", "admin").await.unwrap();
    session.apply(Action::UrlChanged("https://x.test/a.jpg".into()));
    let jobs = session.apply(Action::Submit);
    let cancel = match &jobs[0] {
        Job::Predict { cancel, .. } => cancel.clone(),
        other => panic!("unexpected job {:?}", other),
    };

    session.logout();
    assert!(cancel.is_cancelled());
    assert_eq!(session.state().phase(), &Phase::Idle);
}

/// Verifier standing in for an external identity provider
struct AllowList(Vec<&'static str>);

#[async_trait]
impl CredentialVerifier for AllowList {
    async fn verify(&self, username: &str, _password: &str) -> Result<Identity> {
        if self.0.iter().any(|allowed| *allowed == username) {
            Ok(Identity {
                username: username.to_string(),
            })
        } else {
            Err(Error::Unauthorized)
        }
    }
}

#[tokio::test]
async fn credential_verifier_is_pluggable() {
    let dispatcher = Arc::new(Dispatcher::new(Endpoints::default()).unwrap());
    let mut session = Session::new(
        dispatcher,
        Arc::new(AllowList(vec!["agronomist"])),
        UrlPolicy::default(),
    );

    assert!(matches!(
        session.login("admin", "admin").await,
        Err(Error::Unauthorized)
    ));
    session.login("agronomist", "anything").await.unwrap();
    assert!(session.state().is_logged_in());
}
