//! Small utility helpers used across modules.

/// Split a free-text word list (comma, semicolon, pipe or newline separated)
/// into trimmed, non-empty words. Duplicates are dropped case-insensitively,
/// keeping the first spelling seen.
pub fn split_word_list(raw: &str) -> Vec<String> {
  let mut seen = std::collections::HashSet::new();
  raw
    .split(|c| matches!(c, ',' | ';' | '|' | '\n' | '\r'))
    .map(str::trim)
    .filter(|w| !w.is_empty())
    .filter(|w| seen.insert(w.to_lowercase()))
    .map(str::to_string)
    .collect()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
