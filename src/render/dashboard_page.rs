use super::{embed_json, escape_html, fill_template, RenderError, ESC_JS, PLOTLY_JS};
use crate::services::dashboard_service::{DashboardOptions, ALL_AREAS};

pub const DASHBOARD_TITLE: &str = "London House Price Dashboard";

/// The dashboard page. Controls are populated from `options`; the map, charts
/// and summary are fetched from `/api/v1/dashboard` whenever a control changes.
pub fn render_dashboard_shell(options: &DashboardOptions) -> Result<String, RenderError> {
    let mut area_options = format!(r#"<option value="{ALL_AREAS}">All areas</option>"#);
    for area in &options.areas {
        let area = escape_html(area);
        area_options.push_str(&format!(r#"<option value="{area}">{area}</option>"#));
    }

    let marks: String = options
        .marks
        .iter()
        .map(|mark| format!(r#"<option value="{}"></option>"#, mark.value))
        .collect();

    Ok(fill_template(
        DASHBOARD_TEMPLATE,
        &[
            ("title", &escape_html(DASHBOARD_TITLE)),
            ("plotly_js", PLOTLY_JS),
            ("esc_js", ESC_JS),
            ("area_options", &area_options),
            ("marks", &marks),
            ("options", &embed_json(options)?),
        ],
    ))
}

const DASHBOARD_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{title}}</title>
  <script src="{{plotly_js}}"></script>
  <style>
    body { font-family: Arial, sans-serif; margin: 0; background: #fff; }
    .container { max-width: 1400px; margin: 0 auto; padding: 20px; }
    h1 { text-align: center; color: #2c3e50; margin-bottom: 30px; }
    .controls { display: flex; gap: 4%; margin-bottom: 20px; }
    .control { width: 48%; }
    .control label { font-weight: bold; display: block; margin-bottom: 5px; }
    .control input[type=range] { width: 100%; }
    .panels { display: flex; }
    #price-map { width: 65%; height: 600px; margin-right: 2%; }
    .charts { width: 35%; }
    #price-distribution, #area-comparison { height: 280px; margin-bottom: 20px; }
    #summary-stats {
      margin-top: 30px; padding: 20px; background: #f8f9fa;
      border-radius: 8px; text-align: center;
    }
    .stats { display: flex; }
    .stat { flex: 1; }
    .stat h4 { margin: 0; font-size: 1.4em; }
    .stat p { margin: 5px 0; }
  </style>
</head>
<body>
  <div class="container">
    <h1>{{title}}</h1>
    <div class="controls">
      <div class="control">
        <label>Price Range (£ per sqm): <span id="range-label"></span></label>
        <input id="min-price" type="range" list="price-marks" />
        <input id="max-price" type="range" list="price-marks" />
        <datalist id="price-marks">{{marks}}</datalist>
      </div>
      <div class="control">
        <label for="area-dropdown">Area Filter:</label>
        <select id="area-dropdown">{{area_options}}</select>
      </div>
    </div>
    <div class="panels">
      <div id="price-map"></div>
      <div class="charts">
        <div id="price-distribution"></div>
        <div id="area-comparison"></div>
      </div>
    </div>
    <div id="summary-stats"></div>
  </div>
  <script>
    const options = {{options}};
    const minInput = document.getElementById('min-price');
    const maxInput = document.getElementById('max-price');
    const areaInput = document.getElementById('area-dropdown');
    const gbp = (v) => '£' + Math.round(v).toLocaleString('en-GB');
    {{esc_js}}

    [minInput, maxInput].forEach((input) => {
      input.min = options.price_min;
      input.max = options.price_max;
      input.step = options.step;
    });
    minInput.value = options.default_range[0];
    maxInput.value = options.default_range[1];

    function emptyFigure(id, message) {
      Plotly.react(id, [], {
        annotations: [{ text: message, showarrow: false, x: 0.5, y: 0.5, xref: 'paper', yref: 'paper' }],
        xaxis: { visible: false },
        yaxis: { visible: false },
      });
    }

    function drawMap(view) {
      const d = view.districts;
      Plotly.react('price-map', [{
        type: 'scattermapbox',
        mode: 'markers',
        lat: d.map((x) => x.latitude),
        lon: d.map((x) => x.longitude),
        text: d.map((x) => `District: ${esc(x.district)}<br>Avg Price: ${gbp(x.average_price_per_sqm)}/sqm` +
          `<br>Properties: ${x.sale_count}<br>Area: ${esc(x.area)}`),
        hovertemplate: '%{text}<extra></extra>',
        marker: {
          size: d.map((x) => x.marker_size),
          color: d.map((x) => x.average_price_per_sqm),
          colorscale: 'RdBu',
          reversescale: true,
          showscale: true,
          colorbar: { title: 'Avg Price/sqm (£)' },
          opacity: 0.7,
        },
      }], {
        mapbox: { style: 'open-street-map', center: { lat: view.center.latitude, lon: view.center.longitude }, zoom: 10 },
        margin: { r: 0, t: 30, l: 0, b: 0 },
        title: 'House Price Heat Map (By Postcode District)',
        uirevision: 'constant',
        dragmode: 'pan',
      });
    }

    function drawCharts(view) {
      Plotly.react('price-distribution', [{
        type: 'bar',
        x: view.histogram.map((b) => (b.lower + b.upper) / 2),
        y: view.histogram.map((b) => b.count),
        width: view.histogram.map((b) => b.upper - b.lower),
      }], {
        title: 'Price Distribution',
        xaxis: { title: 'Price per sqm (£)' },
        yaxis: { title: 'Number of Properties' },
        margin: { r: 0, t: 30, l: 20, b: 20 },
      });

      Plotly.react('area-comparison', [{
        type: 'bar',
        orientation: 'h',
        x: view.area_comparison.map((a) => a.average_price_per_sqm),
        y: view.area_comparison.map((a) => esc(a.area)),
      }], {
        title: 'Average Price by Area (Top 10)',
        xaxis: { title: 'Average Price/sqm (£)' },
        margin: { r: 0, t: 30, l: 100, b: 20 },
      });
    }

    function drawSummary(view) {
      const el = document.getElementById('summary-stats');
      el.replaceChildren();
      if (!view.summary) {
        el.textContent = 'No data available';
        return;
      }
      const s = view.summary;
      const stats = [
        [gbp(s.average_price_per_sqm), 'Average Price/sqm', '#e74c3c'],
        [gbp(s.median_price_per_sqm), 'Median Price/sqm', '#3498db'],
        [s.total_sales.toLocaleString('en-GB'), 'Total Properties', '#27ae60'],
        [String(s.districts_shown), 'Districts Shown', '#f39c12'],
      ];
      const heading = document.createElement('h3');
      heading.textContent = 'Summary Statistics';
      const row = document.createElement('div');
      row.className = 'stats';
      stats.forEach(([value, label, color]) => {
        const stat = document.createElement('div');
        stat.className = 'stat';
        const h = document.createElement('h4');
        h.style.color = color;
        h.textContent = value;
        const p = document.createElement('p');
        p.textContent = label;
        stat.append(h, p);
        row.append(stat);
      });
      el.append(heading, row);
    }

    async function refresh() {
      let lo = Number(minInput.value);
      let hi = Number(maxInput.value);
      if (lo > hi) { [lo, hi] = [hi, lo]; }
      document.getElementById('range-label').textContent = `${gbp(lo)} - ${gbp(hi)}`;

      const params = new URLSearchParams({ min_price: lo, max_price: hi, area: areaInput.value });
      const response = await fetch(`/api/v1/dashboard?${params}`);
      if (!response.ok) {
        ['price-map', 'price-distribution', 'area-comparison'].forEach((id) => emptyFigure(id, `Request failed (${response.status})`));
        return;
      }
      const view = await response.json();
      if (view.message) {
        ['price-map', 'price-distribution', 'area-comparison'].forEach((id) => emptyFigure(id, view.message));
      } else {
        drawMap(view);
        drawCharts(view);
      }
      drawSummary(view);
    }

    [minInput, maxInput, areaInput].forEach((input) => input.addEventListener('change', refresh));
    refresh();
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dashboard_service::PriceMark;

    fn options(areas: &[&str]) -> DashboardOptions {
        DashboardOptions {
            price_min: 500.0,
            price_max: 20000.0,
            default_range: [2000.0, 8000.0],
            step: 100.0,
            marks: vec![PriceMark {
                value: 2000.0,
                label: "£2,000".to_string(),
            }],
            areas: areas.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_shell_lists_areas_escaped() {
        let html = render_dashboard_shell(&options(&["Camden", "Tom & Jerry"])).unwrap();

        assert!(html.contains(r#"<option value="all">All areas</option>"#));
        assert!(html.contains(r#"<option value="Camden">Camden</option>"#));
        assert!(html.contains("Tom &amp; Jerry"));
        assert!(html.contains("/api/v1/dashboard"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_shell_escapes_names_in_hover_text() {
        let html = render_dashboard_shell(&options(&["Camden"])).unwrap();

        assert!(html.contains("function esc(value)"));
        assert!(html.contains("${esc(x.district)}"));
        assert!(html.contains("${esc(x.area)}"));
        assert!(!html.contains("${x.area}"));
    }
}
