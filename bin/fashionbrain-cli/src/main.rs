use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use fashionbrain_client::{ApiClient, ClientOptions, UploadTarget};
use fashionbrain_config::{load_default, load_from_path, FashionBrainConfig};
use fashionbrain_core::{
    ActionRequest, ActionType, FashionBrainError, LoginRequest, OnboardingRequest,
    RecommendRequest, SignupOutcome, SignupRequest,
};
use fashionbrain_endpoints::{EndpointResolver, EnvironmentSnapshot, NoticeSink, PageLocation};
use serde_json::{json, Value};

/// fashionbrain - command-line client for the FashionBrain backend
///
/// Configuration discovery rules:
/// 1. If `--config PATH` (or `-c PATH`) is provided, that path is used and
///    must exist.
/// 2. Otherwise `fashionbrain_config::load_default()` probes
///    `/etc/fashionbrain/fashionbrain.toml` then `./fashionbrain.toml`;
///    when neither exists the built-in defaults apply.
#[derive(Debug, Parser)]
#[command(
    name = "fashionbrain",
    version,
    about = "FashionBrain API client",
    disable_help_subcommand = true
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long = "config", short = 'c', value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides `[telemetry].log_level` and RUST_LOG).
    ///
    /// Accepts standard tracing levels or a full filter expression
    /// (e.g. "info,fashionbrain_client=debug").
    #[arg(long = "log-level", short = 'L', value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Backend base URL; takes precedence over every other source.
    #[arg(long = "api-base", value_name = "URL", global = true)]
    api_base: Option<String>,

    /// Page the client pretends to be served from, used to derive the
    /// backend URL when nothing is configured.
    #[arg(long = "page-url", value_name = "URL", global = true)]
    page_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the backend base URL and the rule that produced it.
    Resolve,

    /// Create an account.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },

    /// Sign in and print the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Show the user a token belongs to.
    Me {
        #[arg(long)]
        token: String,
    },

    /// Fetch personalised outfits.
    Feed {
        #[arg(long)]
        token: String,
        #[arg(long = "num-outfits", short = 'n', default_value_t = 10)]
        num_outfits: u32,
    },

    /// Record a save / skip / shop action.
    Action {
        #[arg(long)]
        token: String,
        /// One of: save, skip, shop.
        #[arg(long = "type", value_name = "ACTION")]
        action_type: ActionType,
        /// Product ids, comma-separated or repeated.
        #[arg(long = "product", value_delimiter = ',', required = true)]
        products: Vec<String>,
    },

    /// Submit onboarding answers.
    Onboard {
        #[arg(long)]
        token: String,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long = "style", value_delimiter = ',')]
        styles: Vec<String>,
        #[arg(long)]
        budget: Option<String>,
        /// Leave the account flagged as not onboarded.
        #[arg(long = "incomplete", action = ArgAction::SetTrue)]
        incomplete: bool,
    },

    /// Ask for recommendations from a text query or an image URL.
    Recommend {
        #[arg(long)]
        token: String,
        #[arg(long)]
        query: Option<String>,
        #[arg(long = "image-url")]
        image_url: Option<String>,
        #[arg(long = "top-k")]
        top_k: Option<u32>,
    },

    /// Upload an image file.
    Upload {
        #[arg(long)]
        token: String,
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
        /// Store as an onboarding inspiration image instead of a search image.
        #[arg(long, action = ArgAction::SetTrue)]
        inspiration: bool,
    },
}

/// Prints the unconfigured-hostname warning straight to the terminal.
struct TerminalNotice;

impl NoticeSink for TerminalNotice {
    fn warn(&self, message: &str) {
        eprintln!("fashionbrain: warning: {}", message);
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("fashionbrain: {}", err);
            process::exit(1);
        }
    };

    // CLI flag, then config file, then RUST_LOG.
    let level = cli.log_level.clone().or_else(|| {
        config
            .telemetry
            .as_ref()
            .and_then(|t| t.log_level.clone())
    });
    if let Err(err) = fashionbrain_telemetry::init(level.as_deref()) {
        eprintln!("fashionbrain: failed to initialise telemetry: {}", err);
        process::exit(1);
    }

    if let Err(err) = config.validate() {
        tracing::error!("configuration validation failed: {}", err);
        process::exit(1);
    }

    let resolver = match build_resolver(&cli, &config) {
        Ok(resolver) => resolver,
        Err(err) => {
            tracing::error!("{:#}", err);
            process::exit(1);
        }
    };

    match render(run_blocking(cli.command, &resolver, &config)) {
        Ok(text) => println!("{}", text),
        Err(message) => {
            tracing::error!("{}", message);
            process::exit(1);
        }
    }
}

/// Pretty JSON for a successful command, or the one-line failure report.
fn render(result: anyhow::Result<Value>) -> Result<String, String> {
    let output = result.map_err(|err| format!("{:#}", err))?;
    serde_json::to_string_pretty(&output).map_err(|err| format!("failed to render output: {}", err))
}

/// Load the explicit config file, or the default locations falling back to
/// built-in defaults when no file exists.
fn load_config(path: Option<&PathBuf>) -> Result<FashionBrainConfig, FashionBrainError> {
    match path {
        Some(path) => load_from_path(path),
        None => match load_default() {
            Ok(cfg) => Ok(cfg),
            Err(FashionBrainError::ConfigNotFound(_)) => Ok(FashionBrainConfig::default()),
            Err(err) => Err(err),
        },
    }
}

fn build_resolver(cli: &Cli, config: &FashionBrainConfig) -> anyhow::Result<EndpointResolver> {
    let location = cli
        .page_url
        .as_deref()
        .map(PageLocation::parse)
        .transpose()
        .context("invalid --page-url")?;

    let override_url = cli.api_base.clone().or_else(|| config.api.base_url.clone());
    let snapshot = EnvironmentSnapshot::capture(override_url, location);

    Ok(
        EndpointResolver::new(snapshot, config.api.hostname_mappings.clone())
            .with_notice(Arc::new(TerminalNotice)),
    )
}

fn run_blocking(
    command: Command,
    resolver: &EndpointResolver,
    config: &FashionBrainConfig,
) -> anyhow::Result<Value> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(run(command, resolver, config))
}

async fn run(
    command: Command,
    resolver: &EndpointResolver,
    config: &FashionBrainConfig,
) -> anyhow::Result<Value> {
    let client = ApiClient::from_resolver(resolver, ClientOptions::from_config(&config.api))?;
    tracing::info!("using backend {}", client.base_url());

    let output = match command {
        Command::Resolve => {
            let endpoint = resolver.endpoint();
            json!({
                "base_url": endpoint.base_url,
                "source": endpoint.source.to_string(),
                "configured": endpoint.source.is_configured(),
            })
        }
        Command::Signup {
            email,
            password,
            name,
        } => {
            let mut request = SignupRequest::new(email, password);
            if let Some(name) = name {
                request = request.with_name(name);
            }
            signup_json(client.signup(&request).await?)
        }
        Command::Login { email, password } => {
            serde_json::to_value(client.login(&LoginRequest::new(email, password)).await?)?
        }
        Command::Me { token } => serde_json::to_value(client.me(&token).await?)?,
        Command::Feed { token, num_outfits } => {
            serde_json::to_value(client.feed(&token, num_outfits).await?)?
        }
        Command::Action {
            token,
            action_type,
            products,
        } => {
            let request = ActionRequest::new(products, action_type);
            serde_json::to_value(client.record_action(&token, &request).await?)?
        }
        Command::Onboard {
            token,
            gender,
            styles,
            budget,
            incomplete,
        } => {
            let request = OnboardingRequest {
                gender,
                preferred_styles: (!styles.is_empty()).then_some(styles),
                budget_range: budget,
                onboarding_completed: !incomplete,
            };
            serde_json::to_value(client.complete_onboarding(&token, &request).await?)?
        }
        Command::Recommend {
            token,
            query,
            image_url,
            top_k,
        } => {
            let request = RecommendRequest {
                query,
                image_url,
                top_k,
            };
            serde_json::to_value(client.recommend(&token, &request).await?)?
        }
        Command::Upload {
            token,
            file,
            inspiration,
        } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let target = if inspiration {
                UploadTarget::Inspiration
            } else {
                UploadTarget::Search
            };
            client.upload_image(&token, target, &file_name, bytes).await?
        }
    };

    Ok(output)
}

fn signup_json(outcome: SignupOutcome) -> Value {
    match outcome {
        SignupOutcome::Session(session) => json!({
            "success": true,
            "requires_confirmation": false,
            "access_token": session.access_token,
            "refresh_token": session.refresh_token,
            "user": session.user,
        }),
        SignupOutcome::ConfirmationRequired { message, user } => json!({
            "success": true,
            "requires_confirmation": true,
            "message": message,
            "user": user,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fashionbrain_core::User;
    use fashionbrain_endpoints::EndpointSource;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fashionbrain").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["resolve", "--api-base", "https://api.example.com", "-L", "debug"]);
        assert_eq!(cli.api_base.as_deref(), Some("https://api.example.com"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Resolve));
    }

    #[test]
    fn action_parses_type_and_product_list() {
        let cli = parse(&["action", "--token", "t", "--type", "SAVE", "--product", "a,b", "--product", "c"]);
        match cli.command {
            Command::Action {
                action_type,
                products,
                ..
            } => {
                assert_eq!(action_type, ActionType::Save);
                assert_eq!(products, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn unknown_action_type_is_rejected() {
        let result = Cli::try_parse_from(["fashionbrain", "action", "--token", "t", "--type", "love", "--product", "a"]);
        assert!(result.is_err());
    }

    #[test]
    fn feed_defaults_to_ten_outfits() {
        match parse(&["feed", "--token", "t"]).command {
            Command::Feed { num_outfits, .. } => assert_eq!(num_outfits, 10),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn api_base_flag_beats_config() {
        let cli = parse(&["--api-base", "https://flag.example.com/", "resolve"]);
        let mut config = FashionBrainConfig::default();
        config.api.base_url = Some("https://file.example.com".to_string());

        let resolver = build_resolver(&cli, &config).unwrap();
        assert_eq!(resolver.base_url(), "https://flag.example.com");
        assert_eq!(resolver.endpoint().source, EndpointSource::Override);
    }

    #[test]
    fn page_url_drives_resolution() {
        let cli = parse(&["--page-url", "https://shop.example.app/feed", "resolve"]);
        let mut config = FashionBrainConfig::default();
        config.api.hostname_mappings.insert(
            "shop.example.app".to_string(),
            "https://backend.example.com".to_string(),
        );

        let resolver = build_resolver(&cli, &config).unwrap();
        assert_eq!(resolver.base_url(), "https://backend.example.com");
    }

    #[test]
    fn bad_page_url_is_an_error() {
        let cli = parse(&["--page-url", "not a url", "resolve"]);
        assert!(build_resolver(&cli, &FashionBrainConfig::default()).is_err());
    }

    #[test]
    fn render_pretty_prints_success() {
        let text = render(Ok(json!({"base_url": "http://localhost:8000"}))).unwrap();
        assert!(text.contains("\n"));
        assert!(text.contains("\"base_url\": \"http://localhost:8000\""));
    }

    #[test]
    fn render_reports_failure_once_with_context() {
        let err = anyhow::Error::new(FashionBrainError::server(401, "Not authenticated"))
            .context("me failed");
        let message = render(Err(err)).unwrap_err();
        assert_eq!(message, "me failed: Not authenticated");
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let path = PathBuf::from("/nonexistent/fashionbrain.toml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn confirmation_signup_renders_flag() {
        let user: User = serde_json::from_value(json!({"id": "pending", "email": "a@b.com"})).unwrap();
        let value = signup_json(SignupOutcome::ConfirmationRequired {
            message: "check your email".to_string(),
            user,
        });
        assert_eq!(value["requires_confirmation"], true);
        assert_eq!(value["user"]["id"], "pending");
    }
}
