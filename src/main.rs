use anyhow::{Context, Result};
use chat_translate_bot::{
    cache::TranslationCache,
    config::Config,
    db::Database,
    detect::LanguageDetector,
    pipeline::Dispatcher,
    provider::{GoogleTranslator, TranslationProvider},
    rate_limit::RateLimiter,
    scheduler,
    server::{self, AppState},
    telegram::TelegramClient,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_translate_bot=info".parse()?),
        )
        .init();

    info!("Starting translation bot");

    let config = Config::from_env()?;

    let db = Database::connect(&config.database_url).await?;
    info!("✓ Settings database ready");

    let provider: Arc<dyn TranslationProvider> = Arc::new(
        GoogleTranslator::build(&config.translate_api_url, config.provider_timeout).await?,
    );
    let limiter = Arc::new(RateLimiter::new(config.rate_limit_window));
    let cache = Arc::new(TranslationCache::new(
        Arc::clone(&provider),
        config.cache_capacity,
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        db,
        Arc::clone(&limiter),
        LanguageDetector::new(provider),
        cache,
    ));

    let mut bot = TelegramClient::new(&config.telegram_api_url, &config.telegram_bot_token);
    let me = bot.get_me().await.context("Failed to fetch bot identity")?;
    if let Some(username) = me.username {
        info!("✓ Running as @{}", username);
        bot = bot.with_username(username);
    }
    if let Some(url) = &config.webhook_url {
        bot.set_webhook(url, &config.telegram_webhook_secret).await?;
    }

    // Kept alive for the lifetime of the server
    let _sweeper = match &config.rate_limit_sweep_cron {
        Some(cron) => Some(scheduler::start_sweeper(cron, Arc::clone(&limiter)).await?),
        None => None,
    };

    let state = Arc::new(AppState {
        bot,
        dispatcher,
        webhook_secret: config.telegram_webhook_secret.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, server::router(state))
        .await
        .context("Server error")?;

    Ok(())
}
