//! Drop-in replacements for the `axum` extractors with JSON error bodies.

pub mod enhanced_json;
pub mod enhanced_path;
pub mod validated_json;

pub use self::enhanced_json::Json;
pub use self::enhanced_path::Path;
pub use self::validated_json::ValidateJson;

/// Keeps the first lines of a rejection message and caps its length.
pub(crate) fn sanitize_error_message(message: &str, max_lines: usize, max_chars: usize) -> String {
    let lines = message.lines().take(max_lines).collect::<Vec<_>>();
    lines.join(" ").chars().take(max_chars).collect()
}
