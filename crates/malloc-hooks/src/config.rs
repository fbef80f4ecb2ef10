use std::str::FromStr;

use crate::error::HookError;

pub(crate) const FORMAT_ENV: &str = "MALLOC_HOOKS_FORMAT";
pub(crate) const DISABLED_ENV: &str = "MALLOC_HOOKS_DISABLED";

/// Output format for the report printed when a [`HooksGuard`](crate::HooksGuard) is dropped.
///
/// * `Table` - Human-readable table format (default)
/// * `Json` - Compact JSON format (single line)
/// * `JsonPretty` - Pretty-printed JSON format with indentation
///
/// Can be overridden at run time with `MALLOC_HOOKS_FORMAT=table|json|json-pretty`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Table,
    Json,
    JsonPretty,
}

impl FromStr for Format {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Format::Table),
            "json" => Ok(Format::Json),
            "json-pretty" => Ok(Format::JsonPretty),
            _ => Err(HookError::UnknownFormat(s.to_string())),
        }
    }
}

/// Format requested through the environment, if any. Unknown values are
/// logged and ignored.
pub(crate) fn format_override() -> Option<Format> {
    let value = std::env::var(FORMAT_ENV).ok()?;
    match value.parse() {
        Ok(format) => Some(format),
        Err(err) => {
            tracing::warn!(env = FORMAT_ENV, "{err}");
            None
        }
    }
}

#[inline]
pub(crate) fn is_disabled() -> bool {
    std::env::var(DISABLED_ENV)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("table".parse::<Format>(), Ok(Format::Table));
        assert_eq!("JSON".parse::<Format>(), Ok(Format::Json));
        assert_eq!(" json-pretty ".parse::<Format>(), Ok(Format::JsonPretty));
        assert_eq!(
            "yaml".parse::<Format>(),
            Err(HookError::UnknownFormat("yaml".to_string()))
        );
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("yes"));
    }
}
