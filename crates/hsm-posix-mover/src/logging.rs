//! Subscriber setup for processes embedding the mover, and scrubbing of
//! operator-supplied strings before they reach a log line.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LOG_LEVEL: &str = "info";

const MAX_FIELD_CHARS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.into(),
            format: LogFormat::Plain,
        }
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn try_init(cfg: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);
    match cfg.format {
        LogFormat::Plain => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
}

/// Like `try_init`, but a second call is a no-op.
pub fn init(cfg: &LogConfig) {
    let _ = try_init(cfg);
}

enum EscapeMode {
    Esc,
    Csi,
    Osc,
    OscEsc,
    StTerminated,
    StEsc,
}

/// Drops escape sequences and control characters and caps the length.
pub fn sanitize_field(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_FIELD_CHARS));
    let mut esc_mode: Option<EscapeMode> = None;
    let mut truncated = false;
    let mut count = 0usize;

    for c in input.chars() {
        if let Some(mode) = esc_mode.as_ref() {
            esc_mode = match (mode, c) {
                (EscapeMode::Esc, '[') => Some(EscapeMode::Csi),
                (EscapeMode::Esc, ']') => Some(EscapeMode::Osc),
                (EscapeMode::Esc, 'P' | 'X' | '^' | '_') => Some(EscapeMode::StTerminated),
                (EscapeMode::Esc, _) => None,
                (EscapeMode::Csi, '@'..='~') => None,
                (EscapeMode::Csi, _) => Some(EscapeMode::Csi),
                (EscapeMode::Osc | EscapeMode::OscEsc, '\x07') => None,
                (EscapeMode::Osc | EscapeMode::OscEsc, '\x1b') => Some(EscapeMode::OscEsc),
                (EscapeMode::OscEsc, '\\') => None,
                (EscapeMode::Osc | EscapeMode::OscEsc, _) => Some(EscapeMode::Osc),
                (EscapeMode::StTerminated | EscapeMode::StEsc, '\x1b') => {
                    Some(EscapeMode::StEsc)
                }
                (EscapeMode::StEsc, '\\') => None,
                (EscapeMode::StTerminated | EscapeMode::StEsc, _) => {
                    Some(EscapeMode::StTerminated)
                }
            };
            continue;
        }

        if c == '\x1b' {
            esc_mode = Some(EscapeMode::Esc);
            continue;
        }
        let visible = match c {
            '\t' => ' ',
            c if c.is_control() || is_format_control(c) => continue,
            c => c,
        };
        if count == MAX_FIELD_CHARS {
            truncated = true;
            break;
        }
        out.push(visible);
        count += 1;
    }

    if truncated {
        out.push_str("...");
    }
    out
}

fn is_format_control(c: char) -> bool {
    c == '\u{061C}'
        || c == '\u{200E}'
        || c == '\u{200F}'
        || ('\u{202A}'..='\u{202E}').contains(&c)
        || ('\u{2066}'..='\u{2069}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_codes_and_newlines() {
        let got = sanitize_field("arch\u{1b}[31mive\u{1b}[0m\n1");
        assert_eq!(got, "archive1");
    }

    #[test]
    fn strips_bidi_overrides_and_expands_tabs() {
        assert_eq!(sanitize_field("a\tb\u{202e}c"), "a bc");
    }

    #[test]
    fn strips_csi_and_osc_sequences() {
        let got = sanitize_field("ok \u{1b}[31mred\u{1b}[0m \u{1b}]0;title\u{7} done");
        assert_eq!(got, "ok red  done");
        assert_eq!(sanitize_field("a\u{1b}]2;t\u{1b}\\b"), "ab");
    }

    #[test]
    fn strips_st_terminated_sequences() {
        assert_eq!(sanitize_field("a\u{1b}Ppayload\u{1b}\\b"), "ab");
        assert_eq!(sanitize_field("a\u{1b}_apc\u{1b}\\b"), "ab");
    }

    #[test]
    fn value_at_limit_is_not_marked_truncated() {
        let exact = "x".repeat(MAX_FIELD_CHARS);
        assert_eq!(sanitize_field(&exact), exact);
    }

    #[test]
    fn truncates_long_values() {
        let long = "x".repeat(MAX_FIELD_CHARS * 2);
        let got = sanitize_field(&long);
        assert_eq!(got.len(), MAX_FIELD_CHARS + 3);
        assert!(got.ends_with("..."));
    }

    #[test]
    fn second_init_is_rejected_by_try_init() {
        init(&LogConfig::default());
        assert!(
            try_init(&LogConfig {
                level: "debug".into(),
                format: LogFormat::Json,
            })
            .is_err()
        );
    }
}
