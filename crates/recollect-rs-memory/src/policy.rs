//! Capture policy applied to content before it is stored.

use crate::error::MemoryError;
use regex::Regex;

/// Policy for sanitizing content before it enters memory.
#[derive(Debug, Clone)]
pub struct CapturePolicy {
    /// Patterns to redact from captured content.
    pub redact_patterns: Vec<String>,
    /// Detect secrets using entropy heuristics.
    pub detect_secrets: bool,
    /// Entropy threshold for secret detection.
    pub secret_entropy_threshold: f32,
    /// Optional maximum content length in characters.
    pub max_content_chars: Option<usize>,
    /// Replacement string for redactions.
    pub redaction_replacement: String,
}

impl Default for CapturePolicy {
    /// Default capture policy settings.
    fn default() -> Self {
        Self {
            redact_patterns: Vec::new(),
            detect_secrets: true,
            secret_entropy_threshold: 3.7,
            max_content_chars: None,
            redaction_replacement: "[REDACTED]".to_string(),
        }
    }
}

impl CapturePolicy {
    /// Policy that stores content verbatim.
    pub fn passthrough() -> Self {
        Self {
            detect_secrets: false,
            ..Self::default()
        }
    }
}

/// Capture policy with its patterns compiled once.
#[derive(Debug)]
pub(crate) struct CompiledCapturePolicy {
    redactions: Vec<Regex>,
    secret_token: Option<Regex>,
    threshold: f32,
    max_content_chars: Option<usize>,
    replacement: String,
}

impl CompiledCapturePolicy {
    /// Compile the policy, rejecting invalid patterns.
    pub(crate) fn compile(policy: &CapturePolicy) -> Result<Self, MemoryError> {
        let mut redactions = Vec::with_capacity(policy.redact_patterns.len());
        for pattern in &policy.redact_patterns {
            let regex = Regex::new(pattern).map_err(|err| {
                MemoryError::InvalidArgument(format!("redact pattern `{pattern}`: {err}"))
            })?;
            redactions.push(regex);
        }
        let secret_token = if policy.detect_secrets {
            Some(
                Regex::new(r"[A-Za-z0-9+/=]{20,}")
                    .map_err(|err| MemoryError::InvalidArgument(err.to_string()))?,
            )
        } else {
            None
        };
        Ok(Self {
            redactions,
            secret_token,
            threshold: policy.secret_entropy_threshold,
            max_content_chars: policy.max_content_chars,
            replacement: policy.redaction_replacement.clone(),
        })
    }

    /// Apply redaction and truncation to content.
    pub(crate) fn apply(&self, content: &str) -> String {
        let mut content = content.to_string();
        for regex in &self.redactions {
            content = regex
                .replace_all(&content, self.replacement.as_str())
                .to_string();
        }
        if let Some(regex) = &self.secret_token {
            content = redact_high_entropy(regex, &content, self.threshold, &self.replacement);
        }
        if let Some(max_chars) = self.max_content_chars {
            content = truncate_chars(&content, max_chars);
        }
        content
    }
}

/// Truncate a string to a maximum character count.
fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect()
}

/// Redact high-entropy tokens that resemble secrets.
fn redact_high_entropy(regex: &Regex, content: &str, threshold: f32, replacement: &str) -> String {
    regex
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let token = caps.get(0).map_or("", |m| m.as_str());
            if shannon_entropy(token) >= threshold {
                replacement.to_string()
            } else {
                token.to_string()
            }
        })
        .to_string()
}

/// Calculate Shannon entropy for a token string.
fn shannon_entropy(token: &str) -> f32 {
    let mut counts = [0usize; 256];
    let bytes = token.as_bytes();
    if bytes.is_empty() {
        return 0.0;
    }
    for byte in bytes {
        counts[*byte as usize] += 1;
    }
    let len = bytes.len() as f32;
    let mut entropy = 0.0;
    for count in counts.iter().copied().filter(|count| *count > 0) {
        let p = count as f32 / len;
        entropy -= p * p.log2();
    }
    entropy
}

#[cfg(test)]
mod tests {
    use super::{CapturePolicy, CompiledCapturePolicy, shannon_entropy, truncate_chars};
    use crate::MemoryError;
    use pretty_assertions::assert_eq;

    #[test]
    fn redacts_and_truncates() {
        let policy = CapturePolicy {
            redact_patterns: vec!["token".to_string()],
            redaction_replacement: "REDACTED".to_string(),
            max_content_chars: Some(5),
            detect_secrets: false,
            ..CapturePolicy::default()
        };
        let compiled = CompiledCapturePolicy::compile(&policy).expect("compile");
        assert_eq!(compiled.apply("token-1234"), "REDAC");
    }

    #[test]
    fn detects_secrets_with_low_threshold() {
        let policy = CapturePolicy {
            secret_entropy_threshold: 0.1,
            redaction_replacement: "[X]".to_string(),
            ..CapturePolicy::default()
        };
        let compiled = CompiledCapturePolicy::compile(&policy).expect("compile");
        assert_eq!(
            compiled.apply("key ABCDEFGHIJKLMNOPQRSTUVWX"),
            "key [X]".to_string()
        );
    }

    #[test]
    fn default_policy_keeps_plain_prose() {
        let compiled = CompiledCapturePolicy::compile(&CapturePolicy::default()).expect("compile");
        assert_eq!(
            compiled.apply("my name is Ada and I like tea"),
            "my name is Ada and I like tea"
        );
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let policy = CapturePolicy {
            redact_patterns: vec!["(".to_string()],
            ..CapturePolicy::default()
        };
        let err = CompiledCapturePolicy::compile(&policy).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[test]
    fn truncate_chars_handles_limits() {
        assert_eq!(truncate_chars("hello", 0), "");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hello", 10), "hello");
    }

    #[test]
    fn entropy_of_repeated_byte_is_zero() {
        assert_eq!(shannon_entropy("aaaa"), 0.0);
        assert_eq!(shannon_entropy(""), 0.0);
    }
}
