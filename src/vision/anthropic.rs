use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{FoodScan, VisionClient};
use crate::config::VisionConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 60;

const PROMPT: &str = r#"Analyze this image and if it contains food, provide nutritional estimates in the following JSON format:
{
  "foodItems": [{
    "name": string,
    "calories": number,
    "carbs": number,
    "fat": number,
    "protein": number
  }]
}

If the image doesn't contain food, return { "foodItems": null }.
Only return the JSON, no additional text."#;

/// Split a `data:image/...;base64,` URL into (media type, payload).
/// Only the formats the model accepts pass.
pub(crate) fn split_data_url(data_url: &str) -> anyhow::Result<(&str, &str)> {
    lazy_static! {
        static ref DATA_URL_RE: Regex =
            Regex::new(r"^data:(image/(?:jpeg|png|gif|webp));base64,").unwrap();
    }
    let captures = DATA_URL_RE
        .captures(data_url)
        .context("invalid image format; must be JPEG, PNG, GIF, or WebP")?;
    let prefix_len = captures.get(0).map_or(0, |m| m.len());
    let media_type = captures.get(1).map_or("", |m| m.as_str());
    Ok((media_type, &data_url[prefix_len..]))
}

/// Parse the model's reply. Anything that is not the agreed JSON shape is
/// treated as "no food detected" rather than an error.
fn parse_scan(text: &str) -> FoodScan {
    match serde_json::from_str::<FoodScan>(text) {
        Ok(scan) => scan,
        Err(e) => {
            warn!(error = %e, "vision reply was not the expected shape; treating as no food");
            FoodScan::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

pub struct AnthropicVision {
    client: Client,
    config: VisionConfig,
}

impl AnthropicVision {
    pub fn new(config: VisionConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("build vision http client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl VisionClient for AnthropicVision {
    async fn analyze_image(&self, data_url: &str) -> anyhow::Result<FoodScan> {
        let (media_type, payload) = split_data_url(data_url)?;

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: 1024,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type,
                            data: payload,
                        },
                    },
                    ContentBlock::Text { text: PROMPT },
                ],
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("vision request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("vision service returned {status}: {body}");
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("vision response was not json")?;
        let text = parsed
            .content
            .iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .unwrap_or("");

        debug!(reply_len = text.len(), "vision reply received");
        Ok(parse_scan(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_data_url_accepts_supported_formats() {
        let (media_type, payload) = split_data_url("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(media_type, "image/jpeg");
        assert_eq!(payload, "AAAA");

        for fmt in ["png", "gif", "webp"] {
            let url = format!("data:image/{fmt};base64,Zm9v");
            assert!(split_data_url(&url).is_ok(), "{fmt} should be accepted");
        }
    }

    #[test]
    fn split_data_url_rejects_everything_else() {
        assert!(split_data_url("data:image/tiff;base64,AAAA").is_err());
        assert!(split_data_url("data:text/plain;base64,AAAA").is_err());
        assert!(split_data_url("not a data url").is_err());
        assert!(split_data_url("").is_err());
    }

    #[test]
    fn parse_scan_reads_items_and_defaults_missing_macros() {
        let scan = parse_scan(
            r#"{"foodItems":[{"name":"Chicken Salad","calories":320,"carbs":10},{"name":"Water"}]}"#,
        );
        let items = scan.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Chicken Salad");
        assert_eq!(items[0].calories, 320.0);
        assert_eq!(items[0].fat, 0.0);
        assert_eq!(items[1].calories, 0.0);
    }

    #[test]
    fn parse_scan_handles_explicit_no_food() {
        let scan = parse_scan(r#"{"foodItems":null}"#);
        assert!(scan.food_items.is_none());
        assert!(scan.items().is_empty());
    }

    #[test]
    fn parse_scan_treats_garbage_as_no_food() {
        assert!(parse_scan("I could not analyze this image.").food_items.is_none());
        assert!(parse_scan("").food_items.is_none());
        assert!(parse_scan(r#"{"unexpected": true}"#).food_items.is_none());
    }
}
