//! Text generation providers for grounded snippet synthesis.
//!
//! | Config value | Backend            | Endpoint                          |
//! |--------------|--------------------|-----------------------------------|
//! | `"disabled"` | none               | —                                 |
//! | `"openai"`   | chat completions   | `POST /v1/chat/completions`       |
//! | `"gemini"`   | generateContent    | `POST models/{model}:generateContent` |
//!
//! Generation is strictly optional: when disabled, unconfigured, or
//! failing, snippet synthesis falls back to heuristic and fixed snippets
//! instead. This module only moves prompts and raw text; prompt
//! construction and response parsing live with the answer synthesizer.

use std::time::Duration;

use anyhow::{bail, Result};

use crate::config::Config;

enum Backend {
    OpenAi,
    Gemini,
}

/// A configured generative text provider.
pub struct Generator {
    backend: Backend,
    model: String,
    api_key: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl Generator {
    /// Build from configuration.
    ///
    /// Returns `None` when generation is disabled or the provider's API key
    /// is missing; callers treat `None` as "use non-generative synthesis".
    pub fn from_config(config: &Config) -> Option<Generator> {
        let gen = &config.generation;
        let backend = match gen.provider.as_str() {
            "openai" => Backend::OpenAi,
            "gemini" => Backend::Gemini,
            _ => return None,
        };

        let env_name = match backend {
            Backend::OpenAi => "OPENAI_API_KEY",
            Backend::Gemini => "GEMINI_API_KEY",
        };
        let api_key = std::env::var(env_name).unwrap_or_default();
        if api_key.is_empty() {
            eprintln!("Warning: {} is not set; snippet generation disabled", env_name);
            return None;
        }

        let model = gen.model.clone().unwrap_or_else(|| {
            match backend {
                Backend::OpenAi => "gpt-4o-mini",
                Backend::Gemini => "gemini-1.5-flash",
            }
            .to_string()
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(gen.timeout_secs))
            .build()
            .ok()?;

        Some(Generator {
            backend,
            model,
            api_key,
            max_tokens: gen.max_tokens,
            client,
        })
    }

    /// Run one generation call and return the raw response text.
    pub async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        match self.backend {
            Backend::OpenAi => self.generate_openai(system, prompt).await,
            Backend::Gemini => self.generate_gemini(system, prompt).await,
        }
    }

    async fn generate_openai(&self, system: &str, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": self.max_tokens,
            "temperature": 0.2,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Empty completion response"))
    }

    async fn generate_gemini(&self, system: &str, prompt: &str) -> Result<String> {
        let url = gemini_url(&self.model, &self.api_key);

        let mut parts = Vec::new();
        if !system.is_empty() {
            parts.push(serde_json::json!({ "text": system }));
        }
        parts.push(serde_json::json!({ "text": prompt }));
        let body = serde_json::json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "maxOutputTokens": self.max_tokens, "temperature": 0.2 },
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Empty generation response"))
    }
}

fn gemini_url(model: &str, api_key: &str) -> String {
    format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
        model, api_key
    )
}
