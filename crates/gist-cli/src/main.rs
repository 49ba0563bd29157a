//! Gist queue listener.
//!
//! Connects to the realtime gateway as one user and logs every message the
//! store would show, embed or dismiss. Useful for checking a workspace's
//! campaigns without a host app.
//!
//! # Usage
//!
//! ```bash
//! gist-listen --site-id abc123 --user-id user@example.com
//!
//! # Development backend, EU data center, on a specific route
//! gist-listen --site-id abc123 --user-id u1 --environment dev --data-center eu --route home
//! ```

use std::sync::Arc;

use clap::Parser;
use gist_client::{
    ConnectionManager, GatewayConfig, SystemEnv,
    http::{HttpPollingApi, SseHttpTransport},
};
use gist_proto::{Message, MessagePosition};
use gist_store::{
    Action, Collaborators, GistEnvironment, InAppEventListener, InAppPipeline, MessageRenderer, MetricsError,
    MetricsLogger, Store,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Gist in-app message listener
#[derive(Parser, Debug)]
#[command(name = "gist-listen")]
#[command(about = "Listen to a user's Gist in-app message queue")]
#[command(version)]
struct Args {
    /// Workspace site id
    #[arg(short, long)]
    site_id: String,

    /// User to identify as
    #[arg(short, long)]
    user_id: String,

    /// Data center (us, eu)
    #[arg(long, default_value = "us")]
    data_center: String,

    /// Backend environment (prod, dev, local)
    #[arg(short, long, default_value = "prod")]
    environment: GistEnvironment,

    /// Page route to report
    #[arg(short, long)]
    route: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Logs what a host app would be asked to do.
struct LogHost;

impl InAppEventListener for LogHost {
    fn message_shown(&self, message: &Message) {
        info!(message_id = message.id(), queue_id = message.queue_id(), "message shown");
    }

    fn message_dismissed(&self, message: &Message) {
        info!(message_id = message.id(), "message dismissed");
    }

    fn embed_message(&self, message: &Message, element_id: &str) {
        info!(message_id = message.id(), element_id, "embed message");
    }

    fn message_error(&self, message: &Message) {
        info!(message_id = message.id(), "message error");
    }

    fn message_action(&self, message: &Message, route: &str, action: &str, name: &str) {
        info!(message_id = message.id(), route, action, action_name = name, "message action");
    }
}

impl MessageRenderer for LogHost {
    fn show_modal(&self, message: &Message, position: MessagePosition) {
        info!(message_id = message.id(), ?position, "render modal");
    }
}

impl MetricsLogger for LogHost {
    fn log_view(&self, message: &Message, user_token: &str) -> Result<(), MetricsError> {
        info!(message_id = message.id(), user = user_token, "view");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = GatewayConfig::for_environment(args.environment);
    config.validate()?;
    info!(environment = %args.environment, sse = %config.sse_base_url, "gist listener starting");

    let host = Arc::new(LogHost);
    let collaborators = Collaborators { listener: host.clone(), metrics: host.clone(), renderer: host };
    let store = Arc::new(Store::new(InAppPipeline::standard(collaborators)));

    store
        .dispatch(Action::Initialize {
            site_id: args.site_id,
            data_center: args.data_center,
            environment: args.environment,
        })
        .await?;
    store.dispatch(Action::SetUserIdentifier(args.user_id)).await?;
    if let Some(route) = args.route {
        store.dispatch(Action::SetPageRoute(route)).await?;
    }

    let manager = ConnectionManager::spawn(
        SystemEnv::new(),
        config,
        Arc::clone(&store),
        Arc::new(SseHttpTransport::default()),
        Arc::new(HttpPollingApi::default()),
    );
    manager.start_connection().await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    manager.shutdown().await?;

    Ok(())
}
