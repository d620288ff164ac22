//! Program skeletons that turn a snippet into a complete Go program.

use std::fmt;

/// Which skeleton wraps the submitted snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// The snippet is the body of `main`.
    Bare,
    /// The snippet is the sole argument of `fmt.Println` inside `main`.
    PrintWrapped,
}

const BARE_HEAD: &str = "package main\n\nfunc main() {\n";
const BARE_TAIL: &str = "\n}";
const PRINT_HEAD: &str = "package main\n\nfunc main() {\nfmt.Println(";
const PRINT_TAIL: &str = ")\n}";

impl Template {
    /// Substitute `code` into the skeleton. No validation is done here.
    pub fn render(self, code: &str) -> String {
        let (head, tail) = match self {
            Template::Bare => (BARE_HEAD, BARE_TAIL),
            Template::PrintWrapped => (PRINT_HEAD, PRINT_TAIL),
        };
        let mut program = String::with_capacity(head.len() + code.len() + tail.len());
        program.push_str(head);
        program.push_str(code);
        program.push_str(tail);
        program
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Template::Bare => f.write_str("bare"),
            Template::PrintWrapped => f.write_str("print-wrapped"),
        }
    }
}
