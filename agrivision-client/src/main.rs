//! AgriVision command-line client
//!
//! Classifies fruit images (local file or URL), recommends a crop from a soil
//! analysis, and asks the advisory chat about the result.
//!
//! Anonymous users get the local vision model. Signing in with
//! `--username`/`--password` switches vision to the cloud model and unlocks
//! soil analysis.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agrivision_client::controller::{Action, AdvicePhase, Phase, UiState, View};
use agrivision_client::dispatcher::Dispatcher;
use agrivision_client::image::ImageFile;
use agrivision_client::render;
use agrivision_client::session::Session;
use agrivision_common::auth::{hash_password, CredentialVerifier, StaticCredentialVerifier};
use agrivision_common::config::{self, EndpointOverrides, Endpoints, TomlConfig};
use agrivision_common::soil::{SoilForm, SoilSample};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Log level until the config file has been read
const BOOTSTRAP_LEVEL: &str = "info";

/// Command-line arguments for agrivision
#[derive(Parser, Debug)]
#[command(name = "agrivision")]
#[command(about = "Fruit recognition and crop recommendation client")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/agrivision/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides config; RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true, env = "AGRIVISION_USERNAME")]
    username: Option<String>,

    #[arg(long, global = true, env = "AGRIVISION_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(flatten)]
    endpoints: EndpointArgs,

    #[command(subcommand)]
    command: Command,
}

/// Endpoint overrides; environment and config file fill the gaps
#[derive(Args, Debug, Default)]
struct EndpointArgs {
    /// Local vision model base URL
    #[arg(long, global = true)]
    local_url: Option<String>,

    /// Cloud vision model base URL
    #[arg(long, global = true)]
    cloud_url: Option<String>,

    /// Cloud vision API key
    #[arg(long, global = true)]
    prediction_key: Option<String>,

    /// Crop model scoring URL
    #[arg(long, global = true)]
    scoring_url: Option<String>,

    /// Crop model bearer token
    #[arg(long, global = true)]
    scoring_token: Option<String>,

    /// Advisory chat base URL
    #[arg(long, global = true)]
    chat_url: Option<String>,
}

impl From<EndpointArgs> for EndpointOverrides {
    fn from(args: EndpointArgs) -> Self {
        Self {
            local_vision_url: args.local_url,
            cloud_vision_url: args.cloud_url,
            prediction_key: args.prediction_key,
            scoring_url: args.scoring_url,
            scoring_token: args.scoring_token,
            chat_url: args.chat_url,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Identify the fruit in an image
    Predict {
        /// Local image file
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        file: Option<PathBuf>,

        /// Remote image URL (http:// or https://)
        #[arg(long)]
        url: Option<String>,

        /// Also ask the advisory chat about the top match
        #[arg(long)]
        advice: bool,
    },

    /// Recommend a crop from a soil analysis (requires sign-in)
    Soil {
        #[command(flatten)]
        soil: SoilArgs,

        /// Also ask the advisory chat about the recommended crop
        #[arg(long)]
        advice: bool,
    },

    /// Ask the advisory chat about a fruit or crop
    Advice {
        /// Label to ask about
        name: String,
    },

    /// Print the SHA-256 digest to put in `[auth] password_sha256`
    HashPassword { password: String },

    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Soil measurements; omitted values take the sample defaults
#[derive(Args, Debug, Default)]
struct SoilArgs {
    /// Nitrogen
    #[arg(long = "n")]
    nitrogen: Option<f64>,
    /// Phosphorus
    #[arg(long = "p")]
    phosphorus: Option<f64>,
    /// Potassium
    #[arg(long = "k")]
    potassium: Option<f64>,
    /// Degrees Celsius
    #[arg(long)]
    temperature: Option<f64>,
    /// Percent
    #[arg(long)]
    humidity: Option<f64>,
    #[arg(long)]
    ph: Option<f64>,
    /// Millimetres
    #[arg(long)]
    rainfall: Option<f64>,
}

impl SoilArgs {
    fn into_form(self) -> SoilForm {
        let d = SoilSample::default();
        SoilForm {
            nitrogen: Some(self.nitrogen.unwrap_or(d.nitrogen)),
            phosphorus: Some(self.phosphorus.unwrap_or(d.phosphorus)),
            potassium: Some(self.potassium.unwrap_or(d.potassium)),
            temperature: Some(self.temperature.unwrap_or(d.temperature)),
            humidity: Some(self.humidity.unwrap_or(d.humidity)),
            ph: Some(self.ph.unwrap_or(d.ph)),
            rainfall: Some(self.rainfall.unwrap_or(d.rainfall)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config carries the log level, so start at the bootstrap level and
    // switch once the file is read
    let filter = init_tracing(cli.log_level.as_deref().unwrap_or(BOOTSTRAP_LEVEL));
    let toml_config = match cli.command {
        Command::HashPassword { .. } | Command::InitConfig { .. } => TomlConfig::default(),
        _ => config::load_config(cli.config.as_deref())?,
    };
    if let Some(level) = configured_level(cli.log_level.as_deref(), &toml_config.logging.level) {
        if let Err(e) = filter.reload(level_filter(level)) {
            warn!("Could not apply log level {}: {}", level, e);
        }
    }

    info!(
        "Starting agrivision v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    debug!("User agent {}", agrivision_client::dispatcher::USER_AGENT);

    tokio::select! {
        result = run(cli, toml_config) => result,
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, abandoning request");
            Ok(())
        }
    }
}

/// RUST_LOG if set, otherwise `level`
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_tracing(level: &str) -> reload::Handle<EnvFilter, Registry> {
    let (filter, handle) = reload::Layer::new(level_filter(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

/// Level from the config file, when it should replace the bootstrap level
fn configured_level<'a>(cli_level: Option<&str>, config_level: &'a str) -> Option<&'a str> {
    let config_level = config_level.trim();
    if cli_level.is_some() || config_level.is_empty() || config_level == BOOTSTRAP_LEVEL {
        None
    } else {
        Some(config_level)
    }
}

async fn run(cli: Cli, toml_config: TomlConfig) -> Result<()> {
    let Cli {
        config: config_path,
        json,
        username,
        password,
        endpoints,
        command,
        ..
    } = cli;

    match command {
        Command::HashPassword { password } => {
            println!("{}", hash_password(&password));
            Ok(())
        }
        Command::InitConfig { force } => init_config(config_path.as_deref(), force),
        Command::Advice { name } => {
            let endpoints = Endpoints::resolve(&endpoints.into(), &toml_config);
            let dispatcher = Dispatcher::new(endpoints)?;
            let transcript = dispatcher.advise(&name, &CancellationToken::new()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&transcript)?);
            } else {
                print!("{}", render::render_advice(&transcript));
            }
            Ok(())
        }
        Command::Predict { file, url, advice } => {
            let mut session = open_session(&toml_config, endpoints, username, password).await?;
            let action = match (file, url) {
                (Some(path), _) => {
                    let image = ImageFile::load(&path)
                        .await
                        .with_context(|| format!("Cannot use {}", path.display()))?;
                    Action::SelectFile(Some(image))
                }
                (None, Some(url)) => Action::UrlChanged(url),
                (None, None) => bail!("Provide --file or --url"),
            };
            session.apply(action);
            finish(&mut session, advice, json).await
        }
        Command::Soil { soil, advice } => {
            let mut session = open_session(&toml_config, endpoints, username, password).await?;
            session.apply(Action::SwitchView(View::Soil));
            if session.state().view() != View::Soil {
                bail!("Soil analysis requires signing in (--username and --password)");
            }
            session.apply(Action::SoilChanged(soil.into_form()));
            finish(&mut session, advice, json).await
        }
    }
}

/// Resolve endpoints and credentials, signing in when credentials were given
async fn open_session(
    toml_config: &TomlConfig,
    endpoint_args: EndpointArgs,
    username: Option<String>,
    password: Option<String>,
) -> Result<Session> {
    let endpoints = Endpoints::resolve(&endpoint_args.into(), toml_config);
    info!(
        local = %endpoints.local_vision_url,
        cloud = %endpoints.cloud_vision_url,
        scoring = %endpoints.scoring_url,
        chat = %endpoints.chat_url,
        "Endpoints resolved"
    );

    let url_policy = endpoints.url_policy;
    let dispatcher = Arc::new(Dispatcher::new(endpoints)?);
    let verifier = credential_verifier(toml_config)?;
    let mut session = Session::new(dispatcher, verifier, url_policy);

    match (username, password) {
        (Some(user), Some(pass)) => session.login(&user, &pass).await?,
        (Some(_), None) | (None, Some(_)) => {
            bail!("Both --username and --password are needed to sign in")
        }
        (None, None) => {}
    }
    Ok(session)
}

fn credential_verifier(toml_config: &TomlConfig) -> Result<Arc<dyn CredentialVerifier>> {
    let auth = &toml_config.auth;
    match (&auth.username, &auth.password_sha256) {
        (Some(user), Some(digest)) => Ok(Arc::new(StaticCredentialVerifier::new(
            user.as_str(),
            digest.as_str(),
        )?)),
        (None, None) => {
            warn!("No [auth] section configured, using the default admin account");
            Ok(Arc::new(StaticCredentialVerifier::default()))
        }
        _ => bail!("[auth] needs both username and password_sha256"),
    }
}

/// Submit, optionally fetch advice, then print the outcome
async fn finish(session: &mut Session, advice: bool, json: bool) -> Result<()> {
    if let Phase::Errored(message) = session.submit().await {
        bail!("{}", message);
    }

    if advice {
        session.request_advice().await;
    }

    let state = session.state();
    if json {
        println!("{}", serde_json::to_string_pretty(&json_report(state)?)?);
    } else {
        print!("{}", render::render_state(state));
    }
    Ok(())
}

/// `{"prediction", "advice", "advice_error"}`; absent parts are null
fn json_report(state: &UiState) -> Result<serde_json::Value> {
    let prediction = match state.phase() {
        Phase::Done(outcome) => serde_json::to_value(outcome)?,
        _ => serde_json::Value::Null,
    };
    let (advice, advice_error) = match state.advice() {
        AdvicePhase::Ready(t) => (serde_json::to_value(t)?, serde_json::Value::Null),
        AdvicePhase::Errored(message) => (serde_json::Value::Null, message.clone().into()),
        _ => (serde_json::Value::Null, serde_json::Value::Null),
    };
    Ok(serde_json::json!({
        "prediction": prediction,
        "advice": advice,
        "advice_error": advice_error,
    }))
}

fn init_config(explicit: Option<&Path>, force: bool) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config::default_config_path().context("Could not determine config directory")?,
    };
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    config::write_toml_config(&TomlConfig::default(), &path)?;
    println!("{}", path.display());
    Ok(())
}
