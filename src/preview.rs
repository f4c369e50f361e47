//! Text previews of SVG icons for the terminal.

use std::sync::LazyLock;
use colored::Colorize;
use regex::Regex;

static SVG_OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<svg\b[^>]*>").expect("valid svg tag regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute regex")
});

/// Returns the `<svg …>` opening tag, if any.
pub fn svg_open_tag(content: &str) -> Option<&str> {
    SVG_OPEN_TAG.find(content).map(|m| m.as_str())
}

/// Attributes of the opening `<svg>` tag, in document order.
pub fn svg_attributes(content: &str) -> Vec<(String, String)> {
    let Some(tag) = svg_open_tag(content) else {
        return Vec::new();
    };
    ATTRIBUTE
        .captures_iter(tag)
        .map(|caps| {
            let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            (caps[1].to_string(), value.to_string())
        })
        .collect()
}

/// Renders a human-readable preview: header, opening tag, body and size.
pub fn render_preview(name: &str, content: &str, color: bool) -> String {
    let paint = |text: &str, style: fn(&str) -> colored::ColoredString| {
        if color { style(text).to_string() } else { text.to_string() }
    };

    let mut out = Vec::new();
    out.push(paint(&format!("Previewing: {name}.svg"), |s| s.bold().blue()));
    out.push(paint(&"=".repeat(50), |s| s.blue()));

    if let Some(tag) = svg_open_tag(content) {
        let attributes = svg_attributes(content);
        out.push(paint("SVG Tag:", |s| s.bold()));
        for (key, value) in &attributes {
            out.push(format!("  {key} = {value}"));
        }
        if attributes.is_empty() {
            out.push(paint(tag, |s| s.dimmed()));
        }
        out.push(String::new());
    }

    out.push(paint("Content:", |s| s.bold()));
    for line in content.lines() {
        if line.trim_start().starts_with('<') {
            out.push(paint(line, |s| s.cyan()));
        } else {
            out.push(line.to_string());
        }
    }
    out.push(String::new());
    out.push(paint(&format!("Size: {} bytes", content.len()), |s| s.dimmed()));
    out.join("\n")
}
