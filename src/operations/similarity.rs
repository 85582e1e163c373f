//! Most similar pair of comments by embedding cosine similarity

use crate::command::validator::ValidatedCall;
use crate::core::error::{DispatchError, Result};
use crate::operations::{read_text, saved_to, write_output, OperationContext};
use rayon::prelude::*;
use tracing::debug;

pub async fn embedding_comments(ctx: OperationContext<'_>, call: &ValidatedCall) -> Result<String> {
    let input = call.path("input")?;
    let output = call.path("output")?;

    let text = read_text(input).await?;
    let comments: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if comments.len() < 2 {
        return Err(DispatchError::invalid("input", "need at least two comments to compare"));
    }

    let embeddings = ctx.model.embed(&comments).await?;
    if embeddings.len() != comments.len() {
        return Err(DispatchError::UpstreamProvider(format!(
            "expected {} embeddings, got {}",
            comments.len(),
            embeddings.len()
        )));
    }

    let (i, j, score) = most_similar_pair(&embeddings)
        .ok_or_else(|| DispatchError::invalid("input", "need at least two comments to compare"))?;
    debug!(i, j, score, "most similar comments");

    write_output(output, format!("{}\n{}\n", comments[i], comments[j])).await?;
    Ok(saved_to(output))
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Indices `(i, j)` with `i < j` of the highest-similarity pair.
///
/// Rows are scored in parallel; ties keep the earliest pair.
pub fn most_similar_pair(embeddings: &[Vec<f32>]) -> Option<(usize, usize, f32)> {
    let n = embeddings.len();
    (0..n)
        .into_par_iter()
        .filter_map(|i| {
            ((i + 1)..n)
                .map(|j| (i, j, cosine_similarity(&embeddings[i], &embeddings[j])))
                .fold(None, |best: Option<(usize, usize, f32)>, cand| match best {
                    Some(b) if b.2 >= cand.2 => Some(b),
                    _ => Some(cand),
                })
        })
        .reduce_with(|a, b| {
            if b.2 > a.2 || (b.2 == a.2 && (b.0, b.1) < (a.0, a.1)) {
                b
            } else {
                a
            }
        })
}
