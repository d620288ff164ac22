//! Turning outcomes into single-line, length-bounded replies.

use crate::sandbox::outcome::SandboxOutcome;

/// Bold `go:` tag that starts every reply.
pub const REPLY_PREFIX: &str = "\x02go:\x02";
/// Marker appended to truncated replies.
pub const ELLIPSIS: &str = "...";
/// Byte the delivery protocol reserves for its own framing.
const RESERVED_CONTROL: char = '\u{1}';
/// Separator used when joining multi-line diagnostics.
const LINE_JOIN: &str = "; ";

/// Text shown when the deadline fired.
pub const TIMEOUT_NOTICE: &str = "Program took too long, terminated.";

/// Strip the reserved control byte, fold line breaks and bound the length.
///
/// Each `\r\n`, `\n` or `\r` becomes one space. Replies longer than
/// `max_len` bytes are cut at a character boundary no later than
/// `max_len - 3` and end in [`ELLIPSIS`].
pub fn sanitize(text: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            RESERVED_CONTROL => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' => out.push(' '),
            c => out.push(c),
        }
    }
    truncate(out, max_len)
}

fn truncate(mut text: String, max_len: usize) -> String {
    if text.len() <= max_len {
        return text;
    }
    if max_len < ELLIPSIS.len() {
        return ELLIPSIS[..max_len].to_string();
    }
    let mut cut = max_len - ELLIPSIS.len();
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str(ELLIPSIS);
    text
}

fn trim_line_breaks(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

/// Join the lines of a diagnostic with `"; "`.
pub fn join_lines(text: &str) -> String {
    trim_line_breaks(text)
        .lines()
        .collect::<Vec<_>>()
        .join(LINE_JOIN)
}

/// Render the reply for `outcome`, bounded to `max_len` bytes.
pub fn render(outcome: &SandboxOutcome, max_len: usize) -> String {
    let text = match outcome {
        SandboxOutcome::Success { stdout } => {
            format!("{REPLY_PREFIX} {}", trim_line_breaks(stdout))
        }
        SandboxOutcome::StageFailed {
            stage,
            stderr,
            cause,
        } => format!(
            "{REPLY_PREFIX} {}: {}{LINE_JOIN}{}",
            stage.label(),
            join_lines(cause),
            join_lines(stderr)
        ),
        SandboxOutcome::TimedOut => format!("{REPLY_PREFIX} {TIMEOUT_NOTICE}"),
    };
    sanitize(&text, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::limits::max_reply_length;
    use crate::sandbox::outcome::Stage;

    #[test]
    fn test_removes_reserved_control_byte() {
        assert_eq!(sanitize("\u{1}ACTION waves\u{1}", 100), "ACTION waves");
    }

    #[test]
    fn test_line_breaks_become_single_spaces() {
        assert_eq!(sanitize("a\nb\r\nc\rd", 100), "a b c d");
        assert_eq!(sanitize("a\n\nb", 100), "a  b");
    }

    #[test]
    fn test_truncation_is_exact() {
        let max = max_reply_length(10);
        assert_eq!(max, 852);
        let long = "x".repeat(900);
        let out = sanitize(&long, max);
        assert_eq!(out.len(), 852);
        assert!(out.ends_with(ELLIPSIS));
        assert_eq!(out.trim_end_matches('.').len(), 849);
    }

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(sanitize("hello", 5), "hello");
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let out = sanitize(&"é".repeat(10), 8);
        assert!(out.len() <= 8);
        assert!(out.ends_with(ELLIPSIS));
        assert_eq!(out, "éé...");
    }

    #[test]
    fn test_tiny_limit() {
        assert_eq!(sanitize("abcdef", 2), "..");
        assert_eq!(sanitize("abcdef", 0), "");
    }

    #[test]
    fn test_render_success() {
        let outcome = SandboxOutcome::Success {
            stdout: "hi\n".to_string(),
        };
        assert_eq!(render(&outcome, max_reply_length(5)), "\x02go:\x02 hi");
    }

    #[test]
    fn test_render_multiline_success() {
        let outcome = SandboxOutcome::Success {
            stdout: "1\n2\n3\n".to_string(),
        };
        assert_eq!(render(&outcome, 100), "\x02go:\x02 1 2 3");
    }

    #[test]
    fn test_render_stage_failure() {
        let outcome = SandboxOutcome::StageFailed {
            stage: Stage::Compile,
            stderr: "# command-line-arguments\n./1.go:4:4: syntax error: unexpected newline\n"
                .to_string(),
            cause: "exit status: 1".to_string(),
        };
        assert_eq!(
            render(&outcome, 500),
            "\x02go:\x02 Failed to compile: exit status: 1; # command-line-arguments; \
             ./1.go:4:4: syntax error: unexpected newline"
        );
    }

    #[test]
    fn test_render_timeout() {
        assert_eq!(
            render(&SandboxOutcome::TimedOut, 500),
            "\x02go:\x02 Program took too long, terminated."
        );
    }

    #[test]
    fn test_render_bounds_failure_text() {
        let outcome = SandboxOutcome::StageFailed {
            stage: Stage::Run,
            stderr: "panic: boom\n".repeat(200),
            cause: "exit status: 2".to_string(),
        };
        let out = render(&outcome, 100);
        assert_eq!(out.len(), 100);
        assert!(out.starts_with("\x02go:\x02 Failed to run: exit status: 2; panic: boom"));
        assert!(out.ends_with(ELLIPSIS));
    }
}
