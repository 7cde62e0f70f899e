use teloxide::prelude::*;
use tracing::info;

use super::edit_html;
use crate::api::Pair;
use crate::services::price_service::fetch_all_quotes;
use crate::state::AppState;
use crate::utils::format::format_price_message;
use crate::utils::BotError;

pub async fn execute(bot: &Bot, msg: &Message, state: &AppState) -> Result<(), BotError> {
    info!("💹 Price command called in chat {}", msg.chat.id);
    let loading = bot
        .send_message(msg.chat.id, "Bitcoin fiyatları alınıyor, lütfen bekleyin...")
        .await?;

    let (btc_try, btc_usd) = tokio::join!(
        fetch_all_quotes(&state.exchanges, Pair::BtcTry),
        fetch_all_quotes(&state.exchanges, Pair::BtcUsd)
    );

    edit_html(bot, &loading, format_price_message(&btc_try, &btc_usd)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Endpoints};
    use crate::services::quote_service::QuoteBook;
    use crate::utils::format::NO_PRICE_DATA;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:abc";

    fn telegram_message(text: &str) -> Value {
        json!({
            "message_id": 7,
            "date": 1_700_000_000,
            "chat": { "id": 42, "type": "private", "first_name": "Ada" },
            "from": { "id": 42, "is_bot": false, "first_name": "Ada", "username": "ada" },
            "text": text
        })
    }

    #[tokio::test]
    async fn test_price_replaces_loading_message() {
        let server = MockServer::start().await;
        let reply = json!({ "ok": true, "result": telegram_message("Bitcoin fiyatları alınıyor, lütfen bekleyin...") });
        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot123:abc/sendmessage$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply.clone()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot123:abc/editmessagetext$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = Config::from_lookup(|key| (key == "TELEGRAM_BOT_TOKEN").then(|| TOKEN.to_string())).unwrap();
        config.endpoints = Endpoints::with_base(&server.uri());
        let state = AppState::new(config, QuoteBook::default());
        let bot = Bot::new(TOKEN).set_api_url(server.uri().parse().unwrap());
        let msg: Message = serde_json::from_value(telegram_message("/price")).unwrap();

        execute(&bot, &msg, &state).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let edit = requests
            .iter()
            .find(|r| r.url.path().to_lowercase().ends_with("editmessagetext"))
            .expect("loading message edited");
        let body: Value = serde_json::from_slice(&edit.body).unwrap();
        assert_eq!(body["text"], NO_PRICE_DATA);
        assert_eq!(body["message_id"], 7);
    }
}
