use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use uuid::Uuid;

use crate::food::dto::{DataEnvelope, FoodHistory, TargetsRequest, UpdateMacrosRequest};
use crate::history::MacroValues;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Hands out the identity provider's bearer token, or `None` when the user
/// is signed out.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Option<String>;
}

/// The backend surface the session uses, one method per endpoint the mobile
/// client called.
#[async_trait]
pub trait HistoryApi: Send + Sync {
    async fn fetch_history(&self, token: &str) -> anyhow::Result<FoodHistory>;
    async fn update_targets(&self, token: &str, targets: &TargetsRequest) -> anyhow::Result<()>;
    async fn update_macros(&self, token: &str, id: Uuid, macros: MacroValues)
        -> anyhow::Result<()>;
}

/// `HistoryApi` over HTTP against the real backend.
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("build api http client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl HistoryApi for HttpApi {
    async fn fetch_history(&self, token: &str) -> anyhow::Result<FoodHistory> {
        let response = self
            .client
            .get(format!("{}/user-food-history", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .context("fetch food history")?
            .error_for_status()
            .context("food history request rejected")?;

        let envelope: DataEnvelope<FoodHistory> = response
            .json()
            .await
            .context("decode food history response")?;
        Ok(envelope.data)
    }

    async fn update_targets(&self, token: &str, targets: &TargetsRequest) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/update-targets", self.base_url))
            .bearer_auth(token)
            .json(targets)
            .send()
            .await
            .context("save targets")?
            .error_for_status()
            .context("targets update rejected")?;
        Ok(())
    }

    async fn update_macros(
        &self,
        token: &str,
        id: Uuid,
        macros: MacroValues,
    ) -> anyhow::Result<()> {
        let body = UpdateMacrosRequest {
            id,
            calories: macros.calories,
            carbs: macros.carbs,
            fat: macros.fat,
            protein: macros.protein,
        };
        self.client
            .post(format!("{}/update-macros", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("save macro correction")?
            .error_for_status()
            .context("macro correction rejected")?;
        Ok(())
    }
}
