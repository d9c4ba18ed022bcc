use {
    async_trait::async_trait,
    serde::Deserialize,
    tracing::{debug, info, warn},
};

use {
    reshare_channels::{
        Error, PublisherPlugin, Result,
        format::{check_rendered, render_event_message},
    },
    reshare_common::{Channel, Event},
};

use crate::{ZULIP_MAX_MESSAGE_LEN, config::ZulipConfig};

const CHANNEL: &str = "zulip";

/// Common envelope of every Zulip API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    result: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    id: Option<u64>,
}

/// Publishes events to a Zulip stream.
pub struct ZulipPublisher {
    config: ZulipConfig,
    http: reqwest::Client,
}

impl ZulipPublisher {
    pub fn new(config: ZulipConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Build from the `[channels.zulip]` options table.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: ZulipConfig = serde_json::from_value(value)?;
        if !config.instance.starts_with("http://") && !config.instance.starts_with("https://") {
            return Err(Error::config(format!(
                "zulip instance must be an http(s) URL, got \"{}\"",
                config.instance
            )));
        }
        Ok(Self::new(config))
    }

    /// Send a request and unwrap Zulip's `{result, msg}` envelope.
    ///
    /// Transport and body-read failures are `Error::External`; a response
    /// Zulip rejected is built with `rejected`.
    async fn call(
        &self,
        request: reqwest::RequestBuilder,
        rejected: fn(&'static str, String) -> Error,
    ) -> Result<ApiResponse> {
        let resp = request
            .basic_auth(&self.config.bot_email, Some(self.config.bot_token()))
            .send()
            .await
            .map_err(|e| Error::external("zulip request", e))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::external("read zulip response", e))?;

        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(parsed) if status.is_success() && parsed.result == "success" => Ok(parsed),
            Ok(parsed) if !parsed.msg.is_empty() => Err(rejected(CHANNEL, parsed.msg)),
            _ => Err(rejected(CHANNEL, format!("zulip returned {status}: {body}"))),
        }
    }
}

#[async_trait]
impl PublisherPlugin for ZulipPublisher {
    fn id(&self) -> &str {
        CHANNEL
    }

    async fn validate_credentials(&self, channel: &Channel) -> Result<()> {
        let request = self.http.get(self.config.api_url("users/me"));
        match self.call(request, Error::invalid_credentials).await {
            Ok(_) => {
                debug!(channel = %channel.name, bot = %self.config.bot_email, "zulip credentials ok");
                Ok(())
            },
            Err(e) => {
                warn!(channel = %channel.name, error = %e, "zulip credential check failed");
                Err(e)
            },
        }
    }

    async fn validate_content(&self, event: &Event) -> Result<()> {
        check_rendered(
            CHANNEL,
            event,
            &render_event_message(event),
            ZULIP_MAX_MESSAGE_LEN,
        )
    }

    async fn deliver(&self, event: &Event, channel: &Channel) -> Result<()> {
        let content = render_event_message(event);
        let form = [
            ("type", "stream"),
            ("to", self.config.chat_id.as_str()),
            ("topic", self.config.subject.as_str()),
            ("content", content.as_str()),
        ];
        let request = self.http.post(self.config.api_url("messages")).form(&form);
        let response = self.call(request, Error::delivery).await?;
        info!(
            channel = %channel.name,
            event_id = %event.external_id,
            message_id = response.id,
            "zulip message sent"
        );
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        chrono::{Duration, Utc},
        mockito::Matcher,
        reshare_common::EventPublicationStatus,
        uuid::Uuid,
    };

    fn publisher(instance: &str) -> ZulipPublisher {
        ZulipPublisher::from_value(serde_json::json!({
            "instance": instance,
            "chat_id": "events",
            "subject": "upcoming",
            "bot_email": "bot@zulip.example",
            "bot_token": "secret",
        }))
        .unwrap()
    }

    fn event() -> Event {
        let begin = Utc::now() + Duration::days(1);
        Event {
            external_id: Uuid::new_v4(),
            name: "Repair café".into(),
            description: None,
            link: "https://mobilizon.example/events/2".into(),
            thumbnail_link: None,
            location: Some("Library".into()),
            begin_datetime: begin,
            end_datetime: begin + Duration::hours(3),
            status: EventPublicationStatus::Waiting,
        }
    }

    #[tokio::test]
    async fn credentials_accepted_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/users/me")
            .match_header("authorization", Matcher::Regex("^Basic ".into()))
            .with_status(200)
            .with_body(r#"{"result":"success","msg":"","user_id":7}"#)
            .create_async()
            .await;

        publisher(&server.url())
            .validate_credentials(&Channel::new("zulip"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn credentials_rejected_with_zulip_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/users/me")
            .with_status(401)
            .with_body(r#"{"result":"error","msg":"Invalid API key","code":"INVALID_API_KEY"}"#)
            .create_async()
            .await;

        let err = publisher(&server.url())
            .validate_credentials(&Channel::new("zulip"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials { .. }));
        assert_eq!(err.reason(), "Invalid API key");
    }

    #[tokio::test]
    async fn deliver_posts_stream_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/messages")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "stream".into()),
                Matcher::UrlEncoded("to".into(), "events".into()),
                Matcher::UrlEncoded("topic".into(), "upcoming".into()),
                Matcher::Regex("Repair".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"result":"success","msg":"","id":42}"#)
            .create_async()
            .await;

        publisher(&server.url())
            .deliver(&event(), &Channel::new("zulip"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_result_with_ok_status_is_a_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/messages")
            .with_status(200)
            .with_body(r#"{"result":"error","msg":"Stream 'events' does not exist"}"#)
            .create_async()
            .await;

        let err = publisher(&server.url())
            .deliver(&event(), &Channel::new("zulip"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Delivery { .. }));
        assert_eq!(err.reason(), "Stream 'events' does not exist");
    }

    #[tokio::test]
    async fn non_json_error_reports_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/messages")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = publisher(&server.url())
            .deliver(&event(), &Channel::new("zulip"))
            .await
            .unwrap_err();
        assert!(err.reason().contains("502"));
    }

    #[tokio::test]
    async fn unreachable_instance_is_an_external_error() {
        // Bind then release a port so nothing listens on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = publisher(&url)
            .deliver(&event(), &Channel::new("zulip"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::External { .. }));
        assert!(err.reason().starts_with("channel operation failed: zulip request"));
    }

    #[test]
    fn instance_must_be_a_url() {
        let result = ZulipPublisher::from_value(serde_json::json!({
            "instance": "zulip.example",
            "chat_id": "events",
            "subject": "upcoming",
            "bot_email": "bot@zulip.example",
            "bot_token": "secret",
        }));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn content_check_uses_zulip_limit() {
        let p = publisher("https://zulip.example");
        let mut ev = event();
        ev.description = Some("y".repeat(ZULIP_MAX_MESSAGE_LEN));
        assert!(p.validate_content(&ev).await.is_err());
        assert!(p.validate_content(&event()).await.is_ok());
    }
}
