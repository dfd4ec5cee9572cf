//! Gemini / Imagen REST client - builds prompts, executes requests and parses responses

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::models::{Storyboard, StoryboardRequest, SuggestionKind};
use crate::network::backend::{
    require_credential, GenerationBackend, GenerationError, GenerationResult,
};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<ContentBody>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct ContentBody {
    role: &'static str,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: &'static str,
    output_options: OutputOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions {
    mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ============================================================================
// Prompts
// ============================================================================

pub fn build_idea_prompt(base_idea: &str, kind: SuggestionKind) -> String {
    format!(
        "You are a creative assistant for a comic book writer.\n\
         Based on this central idea: \"{}\"\n\n\
         Suggest a compelling {} for the story. Be creative and concise, providing one single suggestion.",
        base_idea,
        kind.noun()
    )
}

pub fn build_storyboard_prompt(request: &StoryboardRequest) -> String {
    let mut prompt = format!(
        "You are a master comic book writer. Your task is to create a full storyboard for a 6-panel comic strip based on the user's story.\n\
         You must also generate a title, a prompt for the front cover art, and a prompt for the back cover art.\n\n\
         - The **Title** should be catchy and relevant.\n\
         - The **Front Cover** prompt should be an epic scene introducing the main character(s) and theme.\n\
         - For each of the 6 **Panels**, you must provide:\n    \
           - A **visual prompt** that describes the action for the artist.\n    \
           - A **description** containing the narration or dialogue text that will appear on the panel. This can be an empty string if there is no text.\n\
         - The **Back Cover** prompt should be a fun, cool, or intriguing closing image.\n\
         - For all visual prompts (covers and panels), ensure they describe a scene in a \"{}\".\n",
        request.art_style
    );

    let characters = request.character_descriptions.trim();
    if !characters.is_empty() {
        prompt.push_str(&format!(
            "- Keep every character consistent with these descriptions in all visual prompts:\n\"{}\"\n",
            characters
        ));
    }

    prompt.push_str(&format!("\nThe user's story is:\n\"{}\"", request.story_idea));
    prompt
}

/// Response schema pinning the storyboard shape
pub fn storyboard_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING", "description": "The catchy title of the comic book." },
            "frontCoverPrompt": { "type": "STRING", "description": "A detailed visual prompt for the front cover art, in the requested art style." },
            "panels": {
                "type": "ARRAY",
                "description": "An array of exactly 6 panel objects, each containing a visual prompt and a description (narration/dialogue).",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "prompt": { "type": "STRING", "description": "A detailed visual prompt for the panel artwork." },
                        "description": { "type": "STRING", "description": "The narration or dialogue text for the panel. Can be empty." }
                    },
                    "required": ["prompt", "description"]
                }
            },
            "backCoverPrompt": { "type": "STRING", "description": "A detailed visual prompt for the back cover art, in the requested art style." }
        },
        "required": ["title", "frontCoverPrompt", "panels", "backCoverPrompt"]
    })
}

// ============================================================================
// Response parsing
// ============================================================================

/// Concatenated text of the first candidate
pub(crate) fn extract_text(response: GenerateContentResponse) -> GenerationResult<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/// Parse the structured storyboard text and normalize it to six panels
pub fn parse_storyboard(text: &str) -> GenerationResult<Storyboard> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let mut storyboard: Storyboard = serde_json::from_str(body)?;
    let found = storyboard.panels.len();
    if storyboard.normalize() {
        tracing::warn!(found, "Model did not return exactly 6 panels, adjusted");
    }
    Ok(storyboard)
}

/// Base64 bytes of the first prediction
pub(crate) fn extract_image(response: PredictResponse) -> GenerationResult<String> {
    response
        .predictions
        .into_iter()
        .find_map(|p| p.bytes_base64_encoded.filter(|b| !b.is_empty()))
        .ok_or(GenerationError::EmptyResponse)
}

/// Turn a non-success HTTP response into an error carrying the API message
async fn api_error(resp: reqwest::Response) -> GenerationError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    GenerationError::Api { status, message }
}

// ============================================================================
// Client
// ============================================================================

/// Create an HTTP client with the configured timeout
pub fn create_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, timeout_secs, "Could not build HTTP client with timeout; using defaults");
            reqwest::Client::new()
        })
}

/// REST client for the Gemini text models and the Imagen image model
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_base: String,
    text_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        GeminiClient {
            client: create_client(config.request_timeout_secs),
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.api_base, model, method)
    }

    async fn generate_content(
        &self,
        credential: &str,
        prompt: String,
        generation_config: GenerationConfig,
    ) -> GenerationResult<String> {
        let key = require_credential(credential)?;
        let body = GenerateContentRequest {
            contents: vec![ContentBody {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config,
        };

        let start = Instant::now();
        let resp = self
            .client
            .post(self.model_url(&self.text_model, "generateContent"))
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;
        tracing::debug!(status = resp.status().as_u16(), elapsed_ms = start.elapsed().as_millis() as u64, "generateContent returned");

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        let parsed: GenerateContentResponse = resp.json().await?;
        extract_text(parsed)
    }
}

#[async_trait::async_trait]
impl GenerationBackend for GeminiClient {
    async fn suggest_idea(
        &self,
        credential: &str,
        current_idea: &str,
        kind: SuggestionKind,
    ) -> GenerationResult<String> {
        let config = GenerationConfig {
            temperature: Some(0.9),
            top_p: Some(1.0),
            max_output_tokens: Some(150),
            ..Default::default()
        };
        let text = self
            .generate_content(credential, build_idea_prompt(current_idea, kind), config)
            .await?;
        Ok(text.trim().to_string())
    }

    async fn generate_storyboard(
        &self,
        credential: &str,
        request: &StoryboardRequest,
    ) -> GenerationResult<Storyboard> {
        let config = GenerationConfig {
            response_mime_type: Some("application/json"),
            response_schema: Some(storyboard_schema()),
            ..Default::default()
        };
        let text = self
            .generate_content(credential, build_storyboard_prompt(request), config)
            .await?;
        parse_storyboard(&text)
    }

    async fn generate_image(&self, credential: &str, prompt: &str) -> GenerationResult<String> {
        let key = require_credential(credential)?;
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "1:1",
                output_options: OutputOptions {
                    mime_type: "image/jpeg",
                },
            },
        };

        let start = Instant::now();
        let resp = self
            .client
            .post(self.model_url(&self.image_model, "predict"))
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;
        tracing::debug!(status = resp.status().as_u16(), elapsed_ms = start.elapsed().as_millis() as u64, "predict returned");

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        let parsed: PredictResponse = resp.json().await?;
        extract_image(parsed)
    }
}
