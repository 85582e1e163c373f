//! Synthesis prompt and deterministic parsing of the model's script

use regex::Regex;
use std::path::Path;

pub const SYNTHESIS_SYSTEM_PROMPT: &str = "You write small, self-contained Python 3 scripts. \
Reply with exactly one fenced code block and nothing else.";

const RULES: &str = "Rules for the script:
- The first line must be a comment with the script filename, e.g. # count_words.py
- The second line must be a comment listing third-party packages separated by spaces, e.g. # requests pandas, or # none
- Read the input path and write the output path from command-line arguments using argparse with --input and --output; never hard-code them
- Create any missing parent directory of the output before writing
- Do not prompt for user input";

/// Build the user prompt for a synthesis request
pub fn build_prompt(task: &str, input: Option<&Path>, output: Option<&Path>) -> String {
    let mut prompt = format!("Write a Python script that performs this task:\n{}\n\n{}", task.trim(), RULES);
    match (input, output) {
        (None, None) => {}
        (input, output) => {
            prompt.push_str("\n\nThe script will be called with:");
            if let Some(input) = input {
                prompt.push_str(&format!("\n--input {}", input.display()));
            }
            if let Some(output) = output {
                prompt.push_str(&format!("\n--output {}", output.display()));
            }
        }
    }
    prompt
}

/// A script as declared by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub filename: String,
    /// Package specs in declaration order, version specifiers kept
    pub dependencies: Vec<String>,
    pub body: String,
}

impl GeneratedScript {
    /// Parse a model reply.
    ///
    /// Only the first fenced block is used when one exists. The first two
    /// lines are headers only when they are comments; a missing or unusable
    /// filename falls back to `default_filename`.
    pub fn parse(reply: &str, default_filename: &str) -> Self {
        let code = fenced_block(reply);
        let mut lines: Vec<&str> = code.lines().collect();
        while lines.first().is_some_and(|l| l.trim().is_empty()) {
            lines.remove(0);
        }

        let mut rest = lines.as_slice();
        let filename = match rest.first().and_then(|l| comment_text(l)) {
            Some(text) => {
                rest = &rest[1..];
                sanitize_filename(strip_label(text, &["filename", "file"]), default_filename)
            }
            None => default_filename.to_string(),
        };

        let dependencies = match rest.first().and_then(|l| comment_text(l)) {
            Some(text) => {
                rest = &rest[1..];
                parse_dependencies(strip_label(text, &["dependencies", "requirements", "packages"]))
            }
            None => Vec::new(),
        };

        let mut body = rest.join("\n");
        body.push('\n');

        Self {
            filename,
            dependencies,
            body,
        }
    }

    /// Whether the script reads `flag` itself, e.g. `--input`
    pub fn references_flag(&self, flag: &str) -> bool {
        Regex::new(&format!(r"(?:^|[^\w-]){}\b", regex::escape(flag)))
            .map(|re| re.is_match(&self.body))
            .unwrap_or(false)
    }
}

/// Contents of the first ``` block, or the whole reply without fence lines
fn fenced_block(reply: &str) -> String {
    let mut inside = false;
    let mut found = false;
    let mut block = Vec::new();
    for line in reply.lines() {
        if line.trim_start().starts_with("```") {
            if inside {
                break;
            }
            inside = true;
            found = true;
            continue;
        }
        if inside {
            block.push(line);
        }
    }
    if found {
        return block.join("\n");
    }
    reply
        .lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn comment_text(line: &str) -> Option<&str> {
    line.trim().strip_prefix('#').map(|t| t.trim_start_matches('#').trim())
}

fn strip_label<'a>(text: &'a str, labels: &[&str]) -> &'a str {
    for label in labels {
        let Some(head) = text.get(..label.len()) else {
            continue;
        };
        if head.eq_ignore_ascii_case(label) {
            if let Some(rest) = text[label.len()..].trim_start().strip_prefix(':') {
                return rest.trim();
            }
        }
    }
    text
}

fn parse_dependencies(text: &str) -> Vec<String> {
    if text.eq_ignore_ascii_case("none") || text.is_empty() {
        return Vec::new();
    }
    text.split(|c: char| c.is_whitespace() || c == ',')
        .map(str::trim)
        .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("none"))
        .map(str::to_string)
        .collect()
}

/// Keep only the final path component; unusable names fall back
pub fn sanitize_filename(declared: &str, default_filename: &str) -> String {
    let name = declared
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    if name.is_empty() || name == "." || name == ".." || !name.chars().any(char::is_alphanumeric) {
        return default_filename.to_string();
    }
    name.to_string()
}
