use std::fmt::Write;

use super::escape_html;
use super::quadrant::QuadrantPoint;

const SIZE: f64 = 640.0;
const MARGIN: f64 = 60.0;
const PLOT: f64 = SIZE - 2.0 * MARGIN;

fn to_px(x: f64, y: f64) -> (f64, f64) {
    (MARGIN + x.clamp(0.0, 1.0) * PLOT, MARGIN + (1.0 - y.clamp(0.0, 1.0)) * PLOT)
}

/// Standalone SVG scatter of the quadrant plane with cross-hairs at 0.5
pub fn render_scatter_svg(points: &[QuadrantPoint], emphasized: &[String]) -> String {
    let mut svg = String::new();
    // write! into a String cannot fail
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{0}" height="{0}" viewBox="0 0 {0} {0}" font-family="sans-serif">"#,
        SIZE
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r##"<rect x="{m}" y="{m}" width="{p}" height="{p}" fill="none" stroke="#333"/>"##,
        m = MARGIN,
        p = PLOT
    );

    let (mid_x, mid_y) = to_px(0.5, 0.5);
    let _ = writeln!(
        svg,
        r##"<line x1="{mid_x}" y1="{top}" x2="{mid_x}" y2="{bottom}" stroke="#888" stroke-dasharray="6 4"/>"##,
        top = MARGIN,
        bottom = MARGIN + PLOT
    );
    let _ = writeln!(
        svg,
        r##"<line x1="{left}" y1="{mid_y}" x2="{right}" y2="{mid_y}" stroke="#888" stroke-dasharray="6 4"/>"##,
        left = MARGIN,
        right = MARGIN + PLOT
    );

    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="14">X index</text>"#,
        MARGIN + PLOT / 2.0,
        SIZE - 20.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="20" y="{0}" text-anchor="middle" font-size="14" transform="rotate(-90 20 {0})">Y index</text>"#,
        MARGIN + PLOT / 2.0
    );

    for point in points {
        let (cx, cy) = to_px(point.x, point.y);
        let radius = if emphasized.contains(&point.name) { 9.0 } else { 6.0 };
        let _ = writeln!(
            svg,
            r##"<circle cx="{:.1}" cy="{:.1}" r="{}" fill="{}" fill-opacity="0.8" stroke="#333"/>"##,
            cx,
            cy,
            radius,
            point.quadrant.color()
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11">{}</text>"#,
            cx + radius + 2.0,
            cy + 4.0,
            escape_html(&point.name)
        );
    }

    svg.push_str("</svg>\n");
    svg
}
