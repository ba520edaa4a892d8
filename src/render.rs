//! HTML output: the static heatmap pages and the dashboard shell

pub mod dashboard_page;
pub mod heatmap_page;

pub use dashboard_page::render_dashboard_shell;
pub use heatmap_page::{
    render_district_heatmap, render_postcode_heatmap, DistrictHeatmap, PostcodeHeatmap,
};

use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::utils::write_atomically;

pub const LEAFLET_CSS: &str = "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css";
pub const LEAFLET_JS: &str = "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js";
pub const LEAFLET_HEAT_JS: &str = "https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js";
pub const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Client-side counterpart of [`escape_html`], for names inserted into markup
/// by page scripts.
pub(crate) const ESC_JS: &str = r#"function esc(value) {
      return String(value).replace(/[&<>"']/g, (c) => ({
        '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;'
      })[c]);
    }"#;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No data to render")]
    NoData,

    #[error("Failed to serialize page data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Escape text for use in HTML element content and quoted attributes.
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

/// Whole pounds with thousands separators (`£12,345`).
pub fn format_gbp(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-£{grouped}")
    } else {
        format!("£{grouped}")
    }
}

/// Serialize `value` for embedding inside a `<script>` element.
pub fn embed_json<T: Serialize>(value: &T) -> Result<String, RenderError> {
    let json = serde_json::to_string(value)?;
    // Keep "</script>" and HTML comments inside strings from closing the element
    Ok(json
        .replace("</", "<\\/")
        .replace("<!--", "\\u003c!--")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}

/// Fill `{{name}}` placeholders in a page template.
pub(crate) fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |page, (name, value)| {
        page.replace(&format!("{{{{{name}}}}}"), value)
    })
}

/// Write a rendered page atomically.
pub fn write_page(path: &Path, html: &str) -> Result<(), RenderError> {
    write_atomically(path, html.as_bytes())?;
    info!("Wrote {} ({} bytes)", path.display(), html.len());
    Ok(())
}
