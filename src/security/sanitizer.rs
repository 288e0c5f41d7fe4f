//! SQL sanitizer: normalizes a validated statement before execution.

/// Trim surrounding whitespace and drop exactly one trailing `;`.
///
/// Must only run on SQL that already passed [`super::is_query_safe`], which
/// inspects the original text including its terminator.
pub fn sanitize(sql: &str) -> String {
    let trimmed = sql.trim();
    let without_terminator = trimmed.strip_suffix(';').unwrap_or(trimmed);
    without_terminator.trim_end().to_string()
}
