//! Shell-safe argument tokens.
//!
//! The rules mirror how git splits its own command line: a token is wrapped
//! in double quotes only when it contains whitespace, a quote or a
//! backslash, and inside quotes `\` and `"` are backslash-escaped.

use std::borrow::Cow;
use std::path::Path;

/// Characters that force a token to be quoted.
const NEEDS_QUOTES: [char; 6] = ['"', ' ', '\\', '\n', '\r', '\t'];

/// Convert `value` into a single command-line token.
///
/// `None` and the empty string both become `""` so the argument is not
/// dropped by the splitter.
pub fn quote_argument(value: Option<&str>) -> Cow<'_, str> {
    let value = match value {
        Some(value) if !value.is_empty() => value,
        _ => return Cow::Borrowed("\"\""),
    };

    if !value.contains(&NEEDS_QUOTES[..]) {
        return Cow::Borrowed(value);
    }

    // Backslashes first, otherwise the ones inserted for quotes get doubled.
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    Cow::Owned(format!("\"{escaped}\""))
}

/// Render a full invocation as one line, quoting each token.
pub fn render_command_line(program: &Path, args: &[String]) -> String {
    let program = program.display().to_string();
    std::iter::once(quote_argument(Some(&program)))
        .chain(args.iter().map(|arg| quote_argument(Some(arg))))
        .collect::<Vec<_>>()
        .join(" ")
}
