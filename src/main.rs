use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use voxa::api::{self, conversations::ConversationQuery, ApiClient};
use voxa::auth::{
    AccessGuard, FileSessionStore, JwtSessionCheck, SessionCheck, StoredTokenCheck, TokenVerifier,
};
use voxa::cli::{
    init::{self, InitConfig, InitResult},
    output::Output,
    Cli, Commands, TerminalNavigator,
};
use voxa::metrics::{CompanyId, MetricsAggregator, SseFeedConnector};
use voxa::utils::{logging::init_logging, toml_config::ConfigManager, toml_config::VoxaConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Commands::Init {
        path,
        force,
        base_url,
    } = &cli.command
    {
        let config = InitConfig {
            path: path.clone(),
            force: *force,
            base_url: base_url.clone(),
        };
        return match init::run(config, &output) {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(e) => Err(anyhow::anyhow!(e)),
        };
    }

    let manager = ConfigManager::new(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let config = manager.config();
    init_logging(&config.logging, cli.verbose);
    debug!("Using configuration from {:?}", manager.path());

    let store = Arc::new(FileSessionStore::with_key(
        config.session.resolved_path(),
        config.session.key.clone(),
    ));
    let client = ApiClient::new(&config.api.base_url, store.clone(), config.api.timeout())?;
    let navigator = Arc::new(TerminalNavigator::new(!cli.no_color));

    match cli.command {
        Commands::Init { .. } => {}

        Commands::Login { email, password } => {
            api::auth::login(&client, &*store, &email, &password).await?;
            output.success(&format!("Signed in as {}", email));
        }

        Commands::Logout => {
            api::auth::logout(&*store)?;
            output.success("Signed out");
        }

        Commands::Whoami => {
            require_session(&config, &store, navigator).await?;
            let user = api::auth::current_user(&client).await?;
            output.kv("id", &user.id);
            output.kv("email", &user.email);
            output.kv("company", &user.company_id);
            if let Some(name) = &user.name {
                output.kv("name", name);
            }
        }

        Commands::Watch { company } => {
            require_session(&config, &store, navigator).await?;
            let company = CompanyId::new(company).context("Company id must not be empty")?;
            watch_dashboard(&config, store, company, &output).await?;
        }

        Commands::Agents => {
            require_session(&config, &store, navigator).await?;
            let agents = api::agents::list_agents(&client).await?;
            output.table_header(&["ID", "Name", "Voice", "Number"]);
            for agent in &agents {
                output.table_row(&[
                    &agent.id,
                    &agent.name,
                    agent.voice.as_deref().unwrap_or("-"),
                    agent.phone_number.as_deref().unwrap_or("-"),
                ]);
            }
        }

        Commands::Numbers => {
            require_session(&config, &store, navigator).await?;
            let numbers = api::phone_numbers::list_phone_numbers(&client).await?;
            output.table_header(&["ID", "Number", "Country", "Agent"]);
            for number in &numbers {
                output.table_row(&[
                    &number.id,
                    &number.number,
                    number.country.as_deref().unwrap_or("-"),
                    number.agent_id.as_deref().unwrap_or("unassigned"),
                ]);
            }
        }

        Commands::Conversations { agent, limit } => {
            require_session(&config, &store, navigator).await?;
            let query = ConversationQuery {
                agent_id: agent,
                cursor: None,
                limit,
            };
            let page = api::conversations::list_conversations(&client, &query).await?;
            output.table_header(&["ID", "Started", "Caller", "Duration", "Sentiment"]);
            for conv in &page.items {
                let started = conv.started_at.format("%Y-%m-%d %H:%M").to_string();
                let duration = conv
                    .duration_secs
                    .map(|s| format!("{}s", s))
                    .unwrap_or_else(|| "-".to_string());
                output.table_row(&[
                    &conv.id,
                    &started,
                    conv.caller.as_deref().unwrap_or("-"),
                    &duration,
                    conv.sentiment.as_deref().unwrap_or("-"),
                ]);
            }
            if let Some(cursor) = &page.next_cursor {
                output.hint(&format!("More results available (cursor {})", cursor));
            }
        }

        Commands::Campaigns => {
            require_session(&config, &store, navigator).await?;
            let campaigns = api::campaigns::list_campaigns(&client).await?;
            output.table_header(&["ID", "Name", "State", "Progress"]);
            for campaign in &campaigns {
                let state = format!("{:?}", campaign.state).to_lowercase();
                let progress = format!("{}/{}", campaign.completed_calls, campaign.contacts);
                output.table_row(&[&campaign.id, &campaign.name, &state, &progress]);
            }
        }

        Commands::Activities { limit } => {
            require_session(&config, &store, navigator).await?;
            let activities = api::activities::recent_activities(&client, limit).await?;
            for activity in &activities {
                output.list_item(&format!(
                    "{} [{}] {}",
                    activity.created_at.format("%Y-%m-%d %H:%M"),
                    activity.kind,
                    activity.description
                ));
            }
        }

        Commands::Config { validate } => {
            if validate {
                VoxaConfig::load(&cli.config)?;
                output.success(&format!("{} is valid", cli.config.display()));
            } else {
                output.header("Configuration");
                output.kv("file", &manager.path().display().to_string());
                output.kv(
                    "session",
                    &config.session.resolved_path().display().to_string(),
                );
                output.newline();
                println!("{}", toml::to_string_pretty(&*config)?);
            }
        }
    }

    Ok(())
}

/// Runs the access guard for a protected command. Fails when access is
/// denied, after the navigator has printed the sign-in hint.
async fn require_session(
    config: &VoxaConfig,
    store: &Arc<FileSessionStore>,
    navigator: Arc<TerminalNavigator>,
) -> Result<()> {
    let check: Arc<dyn SessionCheck> = match config.jwt_secret()? {
        Some(secret) => Arc::new(JwtSessionCheck::new(
            store.clone(),
            TokenVerifier::new(secret),
        )),
        None => Arc::new(StoredTokenCheck::new(store.clone())),
    };

    let mut guard = AccessGuard::new(check, navigator).redirect_to(config.auth.login_path.clone());
    if !guard.guard(|| (), None).await.is_protected() {
        anyhow::bail!("Not signed in");
    }
    Ok(())
}

async fn watch_dashboard(
    config: &VoxaConfig,
    store: Arc<FileSessionStore>,
    company: CompanyId,
    output: &Output,
) -> Result<()> {
    // Streams stay open indefinitely, so only the connect phase is bounded.
    let http = reqwest::Client::builder()
        .connect_timeout(config.api.timeout())
        .build()
        .context("Failed to build HTTP client")?;
    let connector = Arc::new(SseFeedConnector::new(http, &config.api.base_url, store));

    info!("Watching company {}", company);
    let (_company_tx, company_rx) = watch::channel(Some(company));
    let aggregator =
        MetricsAggregator::spawn(connector, company_rx, config.metrics.aggregator_config());

    let mut views = aggregator.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    output.dashboard(&views.borrow_and_update().clone());
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                output.dashboard(&view);
            }
        }
    }

    aggregator.shutdown().await;
    output.success("Disconnected");
    Ok(())
}
