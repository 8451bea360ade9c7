use std::sync::Arc;

use pinfeed_core::{ConsumerId, Notice};
use pinfeed_engine::{
    present_outcome, Delivery, Fetcher, HtmlSearchFetcher, QueueManager, ResourceApiFetcher,
};
use pinfeed_logging::{feed_debug, feed_info, feed_warn};
use teloxide::prelude::*;

use super::config::{bot_token, AppConfig, Strategy};
use super::delivery::{TelegramDelivery, MORE_CALLBACK};
use super::logging;

/// Shared by every handler invocation.
struct BotState {
    manager: QueueManager,
    delivery: TelegramDelivery,
}

pub async fn run_app() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    logging::initialize(config.log);
    match &config.source {
        Some(path) => feed_info!("Loaded config from {:?}", path),
        None => feed_info!("No config file found, using defaults"),
    }

    let token = bot_token()?;
    let fetcher = build_fetcher(&config)?;
    let manager = QueueManager::new(fetcher, config.engine_config());

    let bot = Bot::new(token);
    let state = Arc::new(BotState {
        manager,
        delivery: TelegramDelivery::new(bot.clone()),
    });

    feed_info!(
        "Bot starting strategy={:?} block_size={} low_watermark={} max_fetch_attempts={}",
        config.strategy,
        config.block_size,
        config.low_watermark,
        config.max_fetch_attempts
    );

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    feed_info!("Bot stopped");
    Ok(())
}

fn build_fetcher(config: &AppConfig) -> anyhow::Result<Arc<dyn Fetcher>> {
    let base_url = config.base_url()?;
    let settings = config.http_settings();
    let fetcher: Arc<dyn Fetcher> = match config.strategy {
        Strategy::Html => Arc::new(
            HtmlSearchFetcher::new(base_url, &settings)
                .map_err(|err| anyhow::anyhow!("html fetcher: {err}"))?,
        ),
        Strategy::ResourceApi => Arc::new(
            ResourceApiFetcher::new(base_url, &settings)
                .map_err(|err| anyhow::anyhow!("resource fetcher: {err}"))?,
        ),
    };
    Ok(fetcher)
}

async fn on_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text().map(str::trim) else {
        feed_debug!("Ignoring non-text message in chat={}", msg.chat.id);
        return Ok(());
    };
    if text.is_empty() {
        return Ok(());
    }
    let consumer: ConsumerId = msg.chat.id.0;

    if let Some(command) = command_name(text) {
        if command == "start" {
            notify(&state, consumer, Notice::Greeting).await;
        } else {
            feed_debug!("Ignoring command /{} in chat={}", command, consumer);
        }
        return Ok(());
    }

    notify(&state, consumer, Notice::Searching).await;
    let outcome = state.manager.handle_query(consumer, text).await;
    present_outcome(&state.delivery, consumer, &outcome).await;
    Ok(())
}

async fn on_callback(bot: Bot, query: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    if let Err(err) = bot.answer_callback_query(query.id.clone()).await {
        feed_warn!("Failed to answer callback query: {}", err);
    }
    if query.data.as_deref() != Some(MORE_CALLBACK) {
        return Ok(());
    }
    let Some(message) = &query.message else {
        feed_debug!("Callback without message from user={}", query.from.id);
        return Ok(());
    };
    let consumer: ConsumerId = message.chat().id.0;

    if let Some(outcome) = state.manager.handle_continue(consumer).await {
        present_outcome(&state.delivery, consumer, &outcome).await;
    }
    Ok(())
}

async fn notify(state: &BotState, consumer: ConsumerId, notice: Notice) {
    if let Err(err) = state.delivery.send_notice(consumer, notice).await {
        feed_warn!("Failed to send notice to consumer={}: {}", consumer, err);
    }
}

/// Name of a leading bot command, without the slash or an `@botname` suffix.
fn command_name(text: &str) -> Option<&str> {
    let word = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = word.split_once('@').map_or(word, |(name, _)| name);
    (!name.is_empty()).then_some(name)
}
