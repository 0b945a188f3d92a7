//! Flat-style SVG badge rendering
//!
//! Pure string building, no templating. Widths are estimated from glyph
//! count, which is good enough for digits and the short fixed labels used
//! here.

use crate::store::VisitStats;

const LABEL_COLOR: &str = "#555";
const VISIT_COLOR: &str = "#007ec6";
const LIKE_COLOR: &str = "#e05d44";

/// Visitor badge: `visitors | N`
pub fn visitor_badge(stats: &VisitStats) -> String {
    two_cell("visitors", &format_count(stats.count), VISIT_COLOR)
}

/// Like badge: `likes | N`
pub fn like_badge(count: u64) -> String {
    two_cell("likes", &format_count(count), LIKE_COLOR)
}

/// Combined badge: `visits N | likes M`
pub fn combined_badge(visits: u64, likes: u64) -> String {
    let visits = format_count(visits);
    let likes = format_count(likes);
    render_cells(&[
        ("visits", LABEL_COLOR),
        (visits.as_str(), VISIT_COLOR),
        ("likes", LABEL_COLOR),
        (likes.as_str(), LIKE_COLOR),
    ])
}

/// Clickable like button: a pill with a heart and the current count
pub fn like_button(count: u64) -> String {
    let text = format!("\u{2764} Like {}", format_count(count));
    let width = text_width(&text) + 8;
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="28">"#,
            r##"<rect rx="14" width="{w}" height="28" fill="#fff" stroke="{c}" stroke-width="1.5"/>"##,
            r#"<text x="{tx}" y="18" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" font-size="12" fill="{c}">{t}</text>"#,
            r#"</svg>"#
        ),
        w = width,
        c = LIKE_COLOR,
        tx = width / 2,
        t = xml_escape(&text),
    )
}

/// Self-promotion button shown by GET /v1/promo
pub fn promo_button() -> String {
    let text = "\u{2605} Get your own badge";
    let width = text_width(text) + 8;
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="28">"#,
            r##"<rect rx="14" width="{w}" height="28" fill="#fff" stroke="{c}" stroke-width="1.5"/>"##,
            r#"<text x="{tx}" y="18" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" font-size="12" fill="{c}">{t}</text>"#,
            r#"</svg>"#
        ),
        w = width,
        c = VISIT_COLOR,
        tx = width / 2,
        t = xml_escape(text),
    )
}

fn two_cell(label: &str, value: &str, value_color: &str) -> String {
    render_cells(&[(label, LABEL_COLOR), (value, value_color)])
}

fn render_cells(cells: &[(&str, &str)]) -> String {
    let widths: Vec<u32> = cells.iter().map(|(text, _)| text_width(text)).collect();
    let total: u32 = widths.iter().sum();

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="20">"#,
        total
    );

    let mut x = 0;
    for ((text, color), width) in cells.iter().zip(&widths) {
        svg.push_str(&format!(
            r#"<rect x="{}" width="{}" height="20" fill="{}"/>"#,
            x, width, color
        ));
        svg.push_str(&format!(
            r##"<text x="{}" y="14" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" font-size="11" fill="#fff">{}</text>"##,
            x + width / 2,
            xml_escape(text)
        ));
        x += width;
    }

    svg.push_str("</svg>");
    svg
}

/// Approximate rendered width of an 11px Verdana string plus padding
fn text_width(text: &str) -> u32 {
    text.chars().count() as u32 * 7 + 12
}

/// Group digits with thousands separators: 1234567 -> "1,234,567"
fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count_grouping() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_visitor_badge_contains_count() {
        let stats = VisitStats {
            count: 1234,
            recent_visits: vec![],
        };
        let svg = visitor_badge(&stats);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(">visitors<"));
        assert!(svg.contains(">1,234<"));
    }

    #[test]
    fn test_combined_badge_has_both_counts() {
        let svg = combined_badge(10, 3);
        assert!(svg.contains(">visits<"));
        assert!(svg.contains(">10<"));
        assert!(svg.contains(">likes<"));
        assert!(svg.contains(">3<"));
    }

    #[test]
    fn test_like_button_is_valid_pill() {
        let svg = like_button(7);
        assert!(svg.contains("rx=\"14\""));
        assert!(svg.contains("Like 7"));
    }

    #[test]
    fn test_promo_button_renders() {
        let svg = promo_button();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Get your own badge"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a<b>&c"), "a&lt;b&gt;&amp;c");
    }
}
