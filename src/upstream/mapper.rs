// Gemini generateContent request/response mapping
use base64::Engine;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{ContentPart, GeneratedImage};

/// Build a single-turn text-to-image request body
pub fn build_request(prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": prompt}]
        }],
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"]
        }
    })
}

/// Flatten the first candidate's parts. Parts that are neither text nor
/// inline data (thoughts, function calls) are skipped.
pub fn parse_parts(response: &Value) -> AppResult<Vec<ContentPart>> {
    // Some gateways wrap the body in a `response` field
    let raw = response.get("response").unwrap_or(response);

    if let Some(reason) = raw
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Err(AppError::ExternalCall(format!(
            "Prompt blocked by provider: {}",
            reason
        )));
    }

    let mut out = Vec::new();
    let Some(parts) = raw
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|cand| cand.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|p| p.as_array())
    else {
        return Ok(out);
    };

    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            out.push(ContentPart::Text(text.to_string()));
            continue;
        }

        // REST uses camelCase, some SDK dumps use snake_case
        let Some(img) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
            continue;
        };
        let mime_type = img
            .get("mimeType")
            .or_else(|| img.get("mime_type"))
            .and_then(|v| v.as_str())
            .unwrap_or("image/png");
        let data = img.get("data").and_then(|v| v.as_str()).unwrap_or("");
        if data.is_empty() {
            continue;
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| AppError::ExternalCall(format!("Invalid inline image data: {}", e)))?;
        out.push(ContentPart::InlineData {
            mime_type: mime_type.to_string(),
            data: bytes,
        });
    }

    Ok(out)
}

/// First part carrying inline data wins. Text-only responses are a failure.
pub fn extract_image(parts: Vec<ContentPart>) -> AppResult<GeneratedImage> {
    parts
        .into_iter()
        .find_map(|part| match part {
            ContentPart::InlineData { mime_type, data } => Some(GeneratedImage { mime_type, data }),
            ContentPart::Text(_) => None,
        })
        .ok_or(AppError::NoImageProduced)
}
