//! HTML error page.

use std::fmt::Write;

use crate::failure::frames::FailureContext;

/// Render the error page. Only verbose mode reveals the message and frames.
pub fn render(context: &FailureContext, verbose: bool) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>Internal Server Error</title>\n</head>\n<body>\n\
         <h1>Internal Server Error</h1>\n",
    );

    if verbose {
        let _ = writeln!(
            html,
            "<p class=\"message\"><strong>{}</strong>: {}</p>",
            escape_html(context.kind),
            escape_html(&context.message)
        );
        html.push_str("<ol class=\"frames\">\n");
        for frame in &context.frames {
            let _ = writeln!(
                html,
                "<li><code>{}</code> line {}</li>",
                escape_html(&frame.file),
                frame.line
            );
        }
        html.push_str("</ol>\n");
    } else {
        html.push_str("<p>Something went wrong while handling your request.</p>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
