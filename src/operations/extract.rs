//! Model-backed extraction from text and images

use crate::command::validator::ValidatedCall;
use crate::core::error::Result;
use crate::llm::ANSWER_ONLY_PROMPT;
use crate::operations::{read_bytes, read_text, saved_to, write_output, OperationContext};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::Path;

const EMAIL_PROMPT: &str = "Extract the sender's email address from this email.";
const CARD_PROMPT: &str =
    "Extract the long card number (often spaced as XXXX XXXX XXXX XXXX) from this image. Reply with the digits only.";

pub async fn extract_email(ctx: OperationContext<'_>, call: &ValidatedCall) -> Result<String> {
    let input = call.path("input")?;
    let output = call.path("output")?;

    let message = read_text(input).await?;
    let reply = ctx
        .model
        .complete(ANSWER_ONLY_PROMPT, &format!("{} {}", EMAIL_PROMPT, message))
        .await?;

    write_output(output, reply.trim()).await?;
    Ok(saved_to(output))
}

pub async fn extract_credit_card(ctx: OperationContext<'_>, call: &ValidatedCall) -> Result<String> {
    let input = call.path("input")?;
    let output = call.path("output")?;

    let image = read_bytes(input).await?;
    let reply = ctx
        .model
        .complete_with_image(CARD_PROMPT, &data_url(input, &image))
        .await?;

    write_output(output, reply.trim()).await?;
    Ok(saved_to(output))
}

/// Inline `data:` URL for an image, mime type taken from the extension
pub fn data_url(path: &Path, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", image_mime(path), STANDARD.encode(bytes))
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/png",
    }
}
