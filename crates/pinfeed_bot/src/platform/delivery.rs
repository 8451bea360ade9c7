use pinfeed_core::{ConsumerId, Item, Notice};
use pinfeed_engine::{Delivery, DeliveryError};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use url::Url;

/// Callback data carried by the "More" button.
pub const MORE_CALLBACK: &str = "more";
const MORE_LABEL: &str = "More 5";

/// Sends blocks to a Telegram chat: images as photos, notices as text.
#[derive(Clone)]
pub struct TelegramDelivery {
    bot: Bot,
}

impl TelegramDelivery {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn transport(err: teloxide::RequestError) -> DeliveryError {
    DeliveryError::Transport(err.to_string())
}

#[async_trait::async_trait]
impl Delivery for TelegramDelivery {
    async fn send_item(&self, consumer: ConsumerId, item: &Item) -> Result<(), DeliveryError> {
        let url = Url::parse(&item.url).map_err(|err| DeliveryError::InvalidItem(err.to_string()))?;
        self.bot
            .send_photo(ChatId(consumer), InputFile::url(url))
            .await
            .map_err(transport)?;
        Ok(())
    }

    async fn send_notice(
        &self,
        consumer: ConsumerId,
        notice: Notice,
    ) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(consumer), notice.text())
            .await
            .map_err(transport)?;
        Ok(())
    }

    async fn offer_continue(
        &self,
        consumer: ConsumerId,
        enabled: bool,
    ) -> Result<(), DeliveryError> {
        if !enabled {
            return self.send_notice(consumer, Notice::AllShown).await;
        }

        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            MORE_LABEL,
            MORE_CALLBACK,
        )]]);
        self.bot
            .send_message(ChatId(consumer), Notice::MorePrompt.text())
            .reply_markup(keyboard)
            .await
            .map_err(transport)?;
        Ok(())
    }
}
