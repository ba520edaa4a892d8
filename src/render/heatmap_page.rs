use chrono::Utc;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{
    embed_json, escape_html, fill_template, format_gbp, RenderError, ESC_JS, LEAFLET_CSS,
    LEAFLET_HEAT_JS, LEAFLET_JS,
};
use crate::analysis::{self, PriceBands};
use crate::models::{DatasetStatistics, DistrictSummary, GeocodedSale, PostcodePoint};

pub const DISTRICT_MARKER_MIN_RADIUS: f64 = 5.0;
pub const DISTRICT_MARKER_MAX_RADIUS: f64 = 15.0;
const INITIAL_ZOOM: u8 = 10;

/// Heat gradient shared by both page variants, low to high.
pub const HEAT_GRADIENT: [(f64, &str); 6] = [
    (0.0, "blue"),
    (0.2, "cyan"),
    (0.4, "lime"),
    (0.6, "yellow"),
    (0.8, "orange"),
    (1.0, "red"),
];

/// Per-district heatmap input
#[derive(Debug, Clone)]
pub struct DistrictHeatmap {
    pub title: String,
    pub districts: Vec<DistrictSummary>,
    pub total_sales: usize,
}

impl DistrictHeatmap {
    pub fn from_sales(title: impl Into<String>, sales: &[GeocodedSale], min_sales: usize) -> Self {
        Self {
            title: title.into(),
            districts: analysis::aggregate_districts(sales, min_sales),
            total_sales: sales.len(),
        }
    }
}

/// Per-postcode heatmap input
#[derive(Debug, Clone)]
pub struct PostcodeHeatmap {
    pub title: String,
    pub points: Vec<PostcodePoint>,
    pub statistics: DatasetStatistics,
}

impl PostcodeHeatmap {
    pub fn from_sales(title: impl Into<String>, sales: &[GeocodedSale]) -> Self {
        Self {
            title: title.into(),
            points: analysis::postcode_points(sales),
            statistics: analysis::dataset_statistics(sales),
        }
    }
}

#[derive(Debug, Serialize)]
struct LegendStep {
    color: &'static str,
    label: String,
}

#[derive(Debug, Serialize)]
struct DistrictMarker<'a> {
    district: &'a str,
    area: &'a str,
    price: String,
    sale_count: usize,
    latitude: f64,
    longitude: f64,
    color: &'static str,
    radius: f64,
}

#[derive(Debug, Serialize)]
struct StatLine {
    label: &'static str,
    value: String,
}

#[derive(Debug, Serialize)]
struct PostcodeMarker<'a> {
    postcode: &'a str,
    area: &'a str,
    price: String,
    year: Option<i32>,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
struct PagePayload<M: Serialize> {
    center: [f64; 2],
    zoom: u8,
    gradient: Vec<(String, &'static str)>,
    heat: Vec<[f64; 3]>,
    markers: Vec<M>,
    legend: Vec<LegendStep>,
    stats: Vec<StatLine>,
}

fn gradient() -> Vec<(String, &'static str)> {
    HEAT_GRADIENT
        .iter()
        .map(|(stop, color)| (stop.to_string(), *color))
        .collect()
}

/// Six evenly spaced legend steps from `min` to `max`, coloured like the heat layer.
fn gradient_legend(min: f64, max: f64) -> Vec<LegendStep> {
    let steps = HEAT_GRADIENT.len();
    HEAT_GRADIENT
        .iter()
        .enumerate()
        .map(|(i, (_, color))| LegendStep {
            color: *color,
            label: format_gbp(min + (max - min) * i as f64 / (steps - 1) as f64),
        })
        .rev()
        .collect()
}

/// Static heatmap with one marker per postcode district.
#[instrument(skip_all, fields(districts = view.districts.len()))]
pub fn render_district_heatmap(view: &DistrictHeatmap) -> Result<String, RenderError> {
    let bands = PriceBands::from_districts(&view.districts).ok_or(RenderError::NoData)?;
    let prices: Vec<f64> = view
        .districts
        .iter()
        .map(|d| d.average_price_per_sqm)
        .collect();
    let summary = analysis::price_summary(&prices).ok_or(RenderError::NoData)?;
    let center = analysis::map_center(&view.districts);

    let heat = analysis::heat_points(&view.districts)
        .into_iter()
        .map(|p| [p.latitude, p.longitude, p.intensity])
        .collect();

    let markers = view
        .districts
        .iter()
        .map(|d| DistrictMarker {
            district: &d.district,
            area: &d.area,
            price: format_gbp(d.average_price_per_sqm),
            sale_count: d.sale_count,
            latitude: d.latitude,
            longitude: d.longitude,
            color: bands.classify(d.average_price_per_sqm).color(),
            radius: analysis::marker_radius(
                d.sale_count,
                DISTRICT_MARKER_MIN_RADIUS,
                DISTRICT_MARKER_MAX_RADIUS,
            ),
        })
        .collect();

    let shown_sales: usize = view.districts.iter().map(|d| d.sale_count).sum();
    let stats = vec![
        StatLine {
            label: "Districts",
            value: view.districts.len().to_string(),
        },
        StatLine {
            label: "Sales shown",
            value: format!("{shown_sales} of {}", view.total_sales),
        },
        StatLine {
            label: "Average £/sqm",
            value: format_gbp(summary.mean),
        },
        StatLine {
            label: "Median £/sqm",
            value: format_gbp(summary.median),
        },
        StatLine {
            label: "Range",
            value: format!("{} - {}", format_gbp(summary.min), format_gbp(summary.max)),
        },
    ];

    let payload = PagePayload {
        center: [center.latitude, center.longitude],
        zoom: INITIAL_ZOOM,
        gradient: gradient(),
        heat,
        markers,
        legend: gradient_legend(summary.min, summary.max),
        stats,
    };

    debug!("Rendering district heatmap centred on {:?}", center);
    render_page(
        &view.title,
        "Average price per square metre by postcode district",
        &payload,
        DISTRICT_MARKER_SCRIPT,
    )
}

/// Static heatmap with one point per postcode.
#[instrument(skip_all, fields(postcodes = view.points.len()))]
pub fn render_postcode_heatmap(view: &PostcodeHeatmap) -> Result<String, RenderError> {
    if view.points.is_empty() {
        return Err(RenderError::NoData);
    }

    let mut prices: Vec<f64> = view
        .points
        .iter()
        .map(|p| p.average_price_per_sqm)
        .collect();
    prices.sort_by(f64::total_cmp);
    let quantile = |p: f64| analysis::percentile_sorted(&prices, p).ok_or(RenderError::NoData);
    let (p20, p50, p80, p90, p95) = (
        quantile(20.0)?,
        quantile(50.0)?,
        quantile(80.0)?,
        quantile(90.0)?,
        quantile(95.0)?,
    );
    let (min, max) = (prices[0], prices[prices.len() - 1]);

    let latitudes: Vec<f64> = view.points.iter().map(|p| p.latitude).collect();
    let longitudes: Vec<f64> = view.points.iter().map(|p| p.longitude).collect();
    let center = [
        analysis::percentile(&latitudes, 50.0).ok_or(RenderError::NoData)?,
        analysis::percentile(&longitudes, 50.0).ok_or(RenderError::NoData)?,
    ];

    let heat = view
        .points
        .iter()
        .map(|p| {
            [
                p.latitude,
                p.longitude,
                analysis::normalized_intensity(p.average_price_per_sqm, min, max),
            ]
        })
        .collect();

    // Expensive postcodes plus a thinned sample of the rest
    let markers = view
        .points
        .iter()
        .enumerate()
        .filter(|(i, p)| p.average_price_per_sqm >= p90 || i % 10 == 0)
        .map(|(_, p)| PostcodeMarker {
            postcode: &p.postcode,
            area: &p.area,
            price: format_gbp(p.average_price_per_sqm),
            year: p.latest_year,
            latitude: p.latitude,
            longitude: p.longitude,
        })
        .collect();

    let legend = vec![
        LegendStep {
            color: "red",
            label: format!("Top 5%: {}+", format_gbp(p95)),
        },
        LegendStep {
            color: "orange",
            label: format!("High: {} - {}", format_gbp(p80), format_gbp(p95)),
        },
        LegendStep {
            color: "yellow",
            label: format!("Medium: {} - {}", format_gbp(p50), format_gbp(p80)),
        },
        LegendStep {
            color: "lime",
            label: format!("Low: {} - {}", format_gbp(p20), format_gbp(p50)),
        },
        LegendStep {
            color: "blue",
            label: format!("Lowest: under {}", format_gbp(p20)),
        },
    ];

    let statistics = &view.statistics;
    let mut stats = vec![
        StatLine {
            label: "Sales",
            value: statistics.total_records.to_string(),
        },
        StatLine {
            label: "Postcodes",
            value: statistics.unique_postcodes.to_string(),
        },
        StatLine {
            label: "Areas",
            value: statistics.area_count.to_string(),
        },
    ];
    if let Some(price) = statistics.price {
        stats.push(StatLine {
            label: "Median £/sqm",
            value: format_gbp(price.median),
        });
        stats.push(StatLine {
            label: "Average £/sqm",
            value: format_gbp(price.mean),
        });
    }

    let payload = PagePayload {
        center,
        zoom: INITIAL_ZOOM,
        gradient: gradient(),
        heat,
        markers,
        legend,
        stats,
    };

    render_page(
        &view.title,
        "Average price per square metre by postcode",
        &payload,
        POSTCODE_MARKER_SCRIPT,
    )
}

fn render_page<M: Serialize>(
    title: &str,
    subtitle: &str,
    payload: &PagePayload<M>,
    marker_script: &str,
) -> Result<String, RenderError> {
    let generated = format!("Generated {}", Utc::now().format("%Y-%m-%d %H:%M UTC"));
    let data = embed_json(payload)?;

    Ok(fill_template(
        PAGE_TEMPLATE,
        &[
            ("title", &escape_html(title)),
            ("subtitle", &escape_html(subtitle)),
            ("generated", &escape_html(&generated)),
            ("leaflet_css", LEAFLET_CSS),
            ("leaflet_js", LEAFLET_JS),
            ("leaflet_heat_js", LEAFLET_HEAT_JS),
            ("esc_js", ESC_JS),
            ("marker_script", marker_script),
            ("data", &data),
        ],
    ))
}

const DISTRICT_MARKER_SCRIPT: &str = r#"
      data.markers.forEach((m) => {
        L.circleMarker([m.latitude, m.longitude], {
          radius: m.radius,
          color: m.color,
          fillColor: m.color,
          fillOpacity: 0.7,
          weight: 2,
        })
          .bindPopup(
            `<b>${esc(m.district)}</b><br>Avg price: ${esc(m.price)}/sqm` +
            `<br>Sales: ${m.sale_count}<br>Area: ${esc(m.area)}`
          )
          .bindTooltip(`${esc(m.district)}: ${esc(m.price)}/sqm`)
          .addTo(map);
      });
"#;

const POSTCODE_MARKER_SCRIPT: &str = r#"
      data.markers.forEach((m) => {
        L.circleMarker([m.latitude, m.longitude], {
          radius: 3,
          color: 'black',
          fillColor: 'white',
          fillOpacity: 0.8,
          weight: 1,
        })
          .bindPopup(
            `<b>${esc(m.postcode)}</b><br>Price: ${esc(m.price)}/sqm` +
            `<br>Area: ${esc(m.area)}` + (m.year ? `<br>Year: ${m.year}` : '')
          )
          .addTo(map);
      });
"#;

const PAGE_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{title}}</title>
  <link rel="stylesheet" href="{{leaflet_css}}" crossorigin="anonymous" />
  <script src="{{leaflet_js}}" crossorigin="anonymous"></script>
  <script src="{{leaflet_heat_js}}"></script>
  <style>
    html, body { height: 100%; margin: 0; font-family: Arial, sans-serif; }
    #map { position: absolute; inset: 0; }
    .panel {
      position: fixed; z-index: 9999; background: white; padding: 10px;
      border: 2px solid grey; border-radius: 5px; font-size: 14px;
    }
    #banner { top: 10px; left: 50%; transform: translateX(-50%); text-align: center; }
    #banner h3 { margin: 0 0 4px 0; }
    #banner small { color: #555; }
    #legend { bottom: 50px; left: 50px; }
    #legend i { display: inline-block; width: 12px; height: 12px; margin-right: 6px; }
    #stats { top: 90px; right: 10px; }
  </style>
</head>
<body>
  <div id="map"></div>
  <div id="banner" class="panel">
    <h3>{{title}}</h3>
    <div>{{subtitle}}</div>
    <small>{{generated}}</small>
  </div>
  <div id="legend" class="panel"><b>Price per sqm</b><br /></div>
  <div id="stats" class="panel"><b>Summary</b><br /></div>
  <script>
    const data = {{data}};

    {{esc_js}}

    const map = L.map('map').setView(data.center, data.zoom);
    L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
      attribution: '&copy; OpenStreetMap contributors',
      maxZoom: 18,
    }).addTo(map);

    const gradient = {};
    data.gradient.forEach(([stop, color]) => { gradient[stop] = color; });
    L.heatLayer(data.heat, {
      minOpacity: 0.2,
      maxZoom: 18,
      radius: 25,
      blur: 15,
      gradient: gradient,
    }).addTo(map);

    if (data.markers.length) {
{{marker_script}}
    }

    const legend = document.getElementById('legend');
    data.legend.forEach((step) => {
      legend.insertAdjacentHTML('beforeend',
        `<i style="background:${esc(step.color)}"></i>${esc(step.label)}<br />`);
    });

    const stats = document.getElementById('stats');
    data.stats.forEach((line) => {
      stats.insertAdjacentHTML('beforeend', `${esc(line.label)}: ${esc(line.value)}<br />`);
    });
  </script>
</body>
</html>
"#;
