use serde::Serialize;

/// Upper bound for upstream bodies quoted in log lines.
pub(crate) const BODY_PREVIEW_CHARS: usize = 512;

/// Logs `value` as pretty JSON, serializing only when DEBUG is enabled.
pub(crate) fn with_pretty_json_debug<T, F>(value: &T, log_action: F)
where
    T: Serialize,
    F: FnOnce(&str),
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let pretty_json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    log_action(pretty_json.as_str());
}

pub(crate) fn body_preview(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);
    format!("{:.len$}", raw, len = BODY_PREVIEW_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(BODY_PREVIEW_CHARS + 10);
        let preview = body_preview(long.as_bytes());
        assert_eq!(preview.chars().count(), BODY_PREVIEW_CHARS);
    }
}
