//! Client for the advice/narrative service: hands the ranked result to an
//! OpenAI-compatible chat-completions endpoint and returns its structured
//! commentary. The engine has no dependency on this output.

use std::time::Duration;

use picks_core::{EngineError, HoldingSummary, RankedResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// User-supplied constraints woven into the prompt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TradeConstraints {
    /// Maximum allocation per position, in account currency.
    pub capital: f64,
    /// Desired take-profit, percent above entry.
    pub target_pct: f64,
    /// Stop-loss, percent below entry.
    pub stop_pct: f64,
}

impl Default for TradeConstraints {
    fn default() -> Self {
        Self {
            capital: 1000.0,
            target_pct: 8.0,
            stop_pct: 5.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdviceConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl AdviceConfig {
    /// `None` when no API key is configured; the server then runs without
    /// the advice surface.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        Some(Self {
            api_key,
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            timeout: Duration::from_secs(30),
        })
    }
}

#[derive(Clone)]
pub struct AdviceClient {
    client: Client,
    config: AdviceConfig,
}

impl AdviceClient {
    pub fn new(config: AdviceConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    /// Structured commentary for a ranked result. Asks for a JSON object
    /// response first; some deployments reject `response_format`, so a
    /// failed first attempt is retried without it. Content that still is
    /// not valid JSON comes back wrapped as `{"raw": ...}`.
    pub async fn advise(
        &self,
        ranked: &RankedResult,
        constraints: &TradeConstraints,
    ) -> Result<Value, EngineError> {
        let system = format!(
            "You are an ASX swing-trading assistant. Max A${:.0} allocation per position. \
             Prefer +{:.0}% targets and -{:.0}% stops. Return JSON only.",
            constraints.capital, constraints.target_pct, constraints.stop_pct
        );
        let ranked_json =
            serde_json::to_string(ranked).map_err(|e| EngineError::Advice(e.to_string()))?;
        let user = format!(
            "Ranked candidates:\n{}\nReturn JSON: {{\"symbol\": \"...\", \"entry\": number, \
             \"target\": number, \"stop\": number, \"qty\": number, \"timelineDays\": number, \
             \"rationale\": \"...\"}}",
            ranked_json
        );

        let content = match self.complete(&system, &user, true).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(error = %e, "structured response rejected, retrying plain");
                self.complete(&system, &user, false).await?
            }
        };

        Ok(serde_json::from_str(&content).unwrap_or_else(|_| json!({ "raw": content })))
    }

    /// HOLD/SELL/TAKE PROFIT commentary for an open holding, judged against
    /// the highest close since purchase. Same retry and parse behavior as
    /// [`advise`](Self::advise).
    pub async fn advise_holding(
        &self,
        symbol: &str,
        entry: f64,
        purchased_at: Option<&str>,
        summary: &HoldingSummary,
        constraints: &TradeConstraints,
    ) -> Result<Value, EngineError> {
        let system = format!(
            "You advise HOLD/SELL/TAKE PROFIT on ASX holdings. Use a +{:.0}% target or trail \
             1.5% under the highest close since buy. Assume ~A$10 round-trip fees for a \
             A${:.0} allocation. Return JSON only.",
            constraints.target_pct, constraints.capital
        );
        let holding = json!({ "symbol": symbol, "entry": entry, "purchasedAt": purchased_at });
        let since =
            serde_json::to_string(summary).map_err(|e| EngineError::Advice(e.to_string()))?;
        let user = format!(
            "Holding: {}\nSince: {}\nReturn JSON: {{\"decision\": \"HOLD|SELL|TAKE PROFIT\", \
             \"exitPrice\": number, \"timelineDays\": number, \"rationale\": \"...\", \
             \"estNetPL\": number}}",
            holding, since
        );

        let content = match self.complete(&system, &user, true).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(error = %e, "structured response rejected, retrying plain");
                self.complete(&system, &user, false).await?
            }
        };

        Ok(serde_json::from_str(&content).unwrap_or_else(|_| json!({ "raw": content })))
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
    ) -> Result<String, EngineError> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        if json_mode {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EngineError::Advice(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Advice(format!("HTTP {}: {}", status, body)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Advice(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EngineError::Advice("empty completion".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}
