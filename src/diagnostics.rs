use crate::error::SyntaxError;

/// Renders syntax errors compiler style:
///
/// ```text
/// error[E0102]: expected `end` (if_end) before end of input
///   --> war3map.j:1:11
///    |
///  1 | if a then if b then end
///    |           ^^
/// ```
pub struct DiagnosticPrinter<'a> {
    file_name: &'a str,
    source: &'a str,
}

impl<'a> DiagnosticPrinter<'a> {
    pub fn new(file_name: &'a str, source: &'a str) -> Self {
        Self { file_name, source }
    }

    pub fn render(&self, error: &SyntaxError) -> String {
        let span = error.span();
        let line = span.start.line;
        let column = span.start.column;
        let src_line = self.source.lines().nth(line).unwrap_or("");

        // Underline the span where it lies on the first line; zero-width and
        // multi-line spans still get one caret.
        let width = if span.end.line == line {
            span.end.column.saturating_sub(column).max(1)
        } else {
            src_line.chars().count().saturating_sub(column).max(1)
        };

        let gutter = (line + 1).to_string().len().max(2);
        let pad = " ".repeat(gutter);

        let mut out = format!(
            "error[{}]: {}\n{pad}--> {}:{}:{}\n{pad} |\n{:>gutter$} | {}\n{pad} | {}{}\n",
            error.code(),
            error,
            self.file_name,
            line + 1,
            column + 1,
            line + 1,
            src_line,
            " ".repeat(column),
            "^".repeat(width),
        );

        if let SyntaxError::Parse(parse_error) = error {
            if parse_error.expected.len() > 1 {
                let expected: Vec<String> = parse_error
                    .expected
                    .iter()
                    .map(|kind| kind.to_string())
                    .collect();
                out.push_str(&format!("{pad} = expected one of: {}\n", expected.join(", ")));
            }
        }

        out
    }

    pub fn print(&self, error: &SyntaxError) {
        eprint!("{}", self.render(error));
    }
}
