//! Client for the generative-AI roadmap endpoint.
//!
//! The model is asked for a strict JSON document, but its output is
//! treated as hostile: parse strictly, fall back to extracting the
//! largest balanced brace-delimited substring, then validate required
//! fields before anything is persisted.

use serde_json::{Value, json};
use std::time::Duration;
use tracing::{instrument, warn};

use crate::error::AppError;
use crate::models::RoadmapContent;

const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Transport errors and non-success statuses are retried this many times
/// in total; generative endpoints are expected to be intermittently slow
/// or malformed.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct RoadmapGenerator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl RoadmapGenerator {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AppError::Internal("GEMINI_API_KEY not set".to_string()))?;
        let api_url =
            std::env::var("GEMINI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Ok(Self::new(api_url, api_key))
    }

    /// Generates a roadmap for a free-text goal. Returns the validated
    /// content together with the raw response, which is kept for audit.
    #[instrument(skip_all)]
    pub async fn generate(&self, prompt: &str) -> Result<(RoadmapContent, Value), AppError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": enhanced_prompt(prompt) }] }],
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": 4096,
                "responseMimeType": "application/json",
            },
        });

        let raw = self.request_with_retry(&body).await?;

        let text = candidate_text(&raw).ok_or_else(|| {
            AppError::Upstream("No response text from roadmap generator".to_string())
        })?;

        let content = parse_roadmap(text)?;
        Ok((content, raw))
    }

    async fn request_with_retry(&self, body: &Value) -> Result<Value, AppError> {
        let url = format!("{}?key={}", self.api_url, self.api_key);
        let mut attempt = 1;

        loop {
            let result = self.client.post(&url).json(body).send().await;

            let failure = match result {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json::<Value>().await?);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let detail = response.text().await.unwrap_or_default();
                    format!("Generator returned status {}: {}", status, detail)
                }
                Err(err) => format!("Generator request failed: {}", err),
            };

            if attempt >= MAX_ATTEMPTS {
                return Err(AppError::Upstream(failure));
            }

            warn!(attempt, failure = %failure, "Roadmap generation attempt failed, retrying");
            tokio::time::sleep(RETRY_DELAY * attempt).await;
            attempt += 1;
        }
    }
}

/// Wraps the user's goal with the structure instructions the model must
/// follow. The field names here are the wire contract `RoadmapContent`
/// deserializes.
fn enhanced_prompt(prompt: &str) -> String {
    format!(
        r#"{prompt}

Please return your response as valid JSON with this exact structure:
{{
  "roadmap_title": "string",
  "goal": "string",
  "phases": [
    {{
      "phase_name": "string",
      "description": "string",
      "skills_to_acquire": ["string"],
      "references": [
        {{
          "title": "string",
          "type": "string",
          "link": "string"
        }}
      ],
      "video_links": [
        {{
          "title": "string",
          "platform": "string",
          "link": "string"
        }}
      ],
      "practice_questions": ["string"]
    }}
  ],
  "general_tips": ["string"]
}}

Return ONLY the JSON, no additional text or explanation."#
    )
}

/// Pulls the first candidate's text out of the generator's response
/// envelope.
pub fn candidate_text(response: &Value) -> Option<&str> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}

/// Tolerant parse of the model's text: strict first, then the largest
/// balanced `{...}` substring, then required-field validation. Anything
/// less than a titled roadmap with phases is rejected outright.
pub fn parse_roadmap(text: &str) -> Result<RoadmapContent, AppError> {
    let content: RoadmapContent = serde_json::from_str(text)
        .or_else(|strict_err| {
            largest_balanced_json(text)
                .ok_or_else(|| {
                    AppError::Upstream(format!(
                        "Failed to parse generator response as JSON: {}",
                        strict_err
                    ))
                })
                .and_then(|candidate| {
                    serde_json::from_str(candidate).map_err(|err| {
                        AppError::Upstream(format!(
                            "Failed to parse generator response as JSON: {}",
                            err
                        ))
                    })
                })
        })?;

    if content.title.is_empty() || content.phases.is_empty() {
        return Err(AppError::Upstream(
            "Invalid roadmap structure from generator".to_string(),
        ));
    }

    Ok(content)
}

/// Finds the longest balanced brace-delimited substring, respecting JSON
/// string literals and escapes.
fn largest_balanced_json(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut best: Option<(usize, usize)> = None;

    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let s = start.take()?;
                    let len = i + 1 - s;
                    if best.is_none_or(|(bs, be)| len > be - bs) {
                        best = Some((s, i + 1));
                    }
                }
            }
            _ => {}
        }
    }

    best.map(|(s, e)| &text[s..e])
}
