//! HTML to plain text for Zendesk titles, post details and comment bodies.

use scraper::{ElementRef, Html};

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
    "pre", "hr", "table",
];

/// Strips tags and decodes entities. Block elements become line breaks,
/// whitespace runs inside a line collapse to one space, empty lines are dropped.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut raw = String::with_capacity(html.len());
    collect_text(fragment.root_element(), &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            match child.value().name() {
                "script" | "style" => {}
                name if BLOCK_ELEMENTS.contains(&name) => {
                    out.push('\n');
                    collect_text(child, out);
                    out.push('\n');
                }
                _ => collect_text(child, out),
            }
        }
    }
}
