use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use switchboard::config::Config;
use switchboard::domain::dispatcher::{CallDispatcher, DispatcherConfig};
use switchboard::infrastructure::notify::SlackNotifier;
use switchboard::infrastructure::telephony::TwilioClient;
use switchboard::interface::api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "switchboard=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    info!(
        port = config.port,
        public_host = %config.public_host,
        "starting switchboard"
    );
    if config.alert_sms_to.is_none() {
        info!("ALERT_SMS_TO not set, SMS alerts disabled");
    }

    let telephony = Arc::new(TwilioClient::new(&config.twilio));
    let notifier = Arc::new(SlackNotifier::new(&config.slack));
    let dispatcher = CallDispatcher::new(DispatcherConfig::from(&config), telephony, notifier);

    let port = config.port;
    let state = AppState {
        dispatcher,
        config: Arc::new(config),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding port {port}"))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
