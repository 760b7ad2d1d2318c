//! Quadrant positioning of districts and its map/scatter renderings

pub mod map;
pub mod quadrant;
pub mod scatter;

pub use map::{MapRenderer, MapReport};
pub use quadrant::{compute_quadrant_index, Quadrant, QuadrantPoint};
pub use scatter::render_scatter_svg;

/// Minimal HTML/XML text escaping for names and labels
pub(crate) fn escape_html(text: &str) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
        assert_eq!(escape_html("성수동"), "성수동");
    }
}
