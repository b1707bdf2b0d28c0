//! Styled terminal lines, written to stderr so stdout stays pipeable.

use console::{StyledObject, style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Ok,
    Failed,
    Caution,
    Note,
}

impl Tone {
    fn marker(self) -> StyledObject<&'static str> {
        match self {
            Self::Ok => style("✓").green().bold(),
            Self::Failed => style("✗").red().bold(),
            Self::Caution => style("!").yellow().bold(),
            Self::Note => style("-").cyan(),
        }
    }
}

fn line(tone: Tone, msg: &str) -> String {
    format!("{} {msg}", tone.marker())
}

fn field(key: &str, value: &str) -> String {
    let label = format!("{key}:");
    format!("  {} {value}", style(format!("{label:<14}")).bold())
}

/// Report a completed action.
pub fn success(msg: &str) {
    eprintln!("{}", line(Tone::Ok, msg));
}

/// Report a failed action.
pub fn error(msg: &str) {
    eprintln!("{}", line(Tone::Failed, msg));
}

/// Report something the operator should look at.
pub fn warning(msg: &str) {
    eprintln!("{}", line(Tone::Caution, msg));
}

/// Print a hint.
pub fn info(msg: &str) {
    eprintln!("{}", line(Tone::Note, msg));
}

/// Print a section title.
pub fn header(msg: &str) {
    eprintln!("\n{}", style(msg).bold().underlined());
}

/// Print an aligned `key: value` pair.
pub fn kv(key: &str, value: &str) {
    eprintln!("{}", field(key, value));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_keeps_message() {
        console::set_colors_enabled(false);
        assert_eq!(line(Tone::Ok, "Logged in as admin1"), "✓ Logged in as admin1");
        assert_eq!(line(Tone::Failed, "nope"), "✗ nope");
    }

    #[test]
    fn test_field_alignment() {
        console::set_colors_enabled(false);
        let rendered = field("Port", "5000");
        assert!(rendered.starts_with("  Port: "));
        assert!(rendered.ends_with(" 5000"));
        assert_eq!(rendered.len(), 2 + 14 + 1 + 4);
    }
}
