// Static heatmap rendering tests, written through to disk

mod common;

use house_price_heatmap::render::{
    render_district_heatmap, render_postcode_heatmap, write_page, DistrictHeatmap,
    PostcodeHeatmap, RenderError,
};

fn sample_sales() -> Vec<house_price_heatmap::models::GeocodedSale> {
    vec![
        common::geocoded_sale("N2 9QL", 5000.0, "Barnet"),
        common::geocoded_sale("N2 9QL", 7000.0, "Barnet"),
        common::geocoded_sale("N2 8AB", 6000.0, "Barnet"),
        common::geocoded_sale("SW3 1AA", 12000.0, "Kensington & Chelsea"),
        common::geocoded_sale("SW3 2BB", 14000.0, "Kensington & Chelsea"),
        common::geocoded_sale("SW3 3CC", 13000.0, "Kensington & Chelsea"),
        common::geocoded_sale("E1 6AN", 8000.0, "Tower Hamlets"),
    ]
}

#[test]
fn test_district_heatmap_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out/heatmap.html");

    let view = DistrictHeatmap::from_sales("London prices", &sample_sales(), 3);
    // E1 has a single sale and is hidden
    assert_eq!(view.districts.len(), 2);
    assert_eq!(view.total_sales, 7);

    let html = render_district_heatmap(&view).unwrap();
    write_page(&output, &html).unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("<!doctype html>"));
    assert!(written.contains("<title>London prices</title>"));
    assert!(written.contains("leaflet"));
    assert!(written.contains("\"district\":\"N2\""));
    assert!(written.contains("\"district\":\"SW3\""));
    assert!(!written.contains("\"district\":\"E1\""));
    assert!(written.contains("£13,000"));
    assert!(written.contains("6 of 7"));
}

#[test]
fn test_postcode_heatmap_lists_every_postcode() {
    let view = PostcodeHeatmap::from_sales("Postcodes", &sample_sales());
    assert_eq!(view.points.len(), 6);

    let n2 = view.points.iter().find(|p| p.postcode == "N2 9QL").unwrap();
    assert_eq!(n2.average_price_per_sqm, 6000.0);

    let html = render_postcode_heatmap(&view).unwrap();
    assert!(html.contains("Top 5%"));
    assert!(html.contains("\"postcode\":\"E1 6AN\""));
    assert!(!html.contains("{{"));
}

#[test]
fn test_render_with_no_sales_is_an_error() {
    let district = DistrictHeatmap::from_sales("Empty", &[], 3);
    assert!(matches!(
        render_district_heatmap(&district),
        Err(RenderError::NoData)
    ));

    let postcode = PostcodeHeatmap::from_sales("Empty", &[]);
    assert!(matches!(
        render_postcode_heatmap(&postcode),
        Err(RenderError::NoData)
    ));
}

#[cfg(unix)]
#[test]
fn test_written_heatmap_is_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("uk_house_price_heatmap.html");
    let view = DistrictHeatmap::from_sales("London prices", &sample_sales(), 3);

    write_page(&output, &render_district_heatmap(&view).unwrap()).unwrap();

    let mode = std::fs::metadata(&output).unwrap().permissions().mode();
    assert_eq!(mode & 0o044, 0o044);
}
