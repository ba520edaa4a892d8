// Geocoder tests combining the offline dataset, postcodes.io and the coordinate cache

use indicatif::ProgressBar;
use mockito::Server;
use serde_json::json;
use std::time::Duration;

use house_price_heatmap::geocoding::{
    CoordinateCache, Geocoder, PostcodeDataset, PostcodesIoClient, PrefixEstimator,
};
use house_price_heatmap::models::{CoordinateSource, Coordinates, HouseSale};

fn sale(postcode: &str) -> HouseSale {
    HouseSale {
        price_per_sqm: 6000.0,
        postcode: postcode.to_string(),
        year: Some(2024),
        date_of_transfer: None,
        property_type: None,
        duration: None,
        price: None,
        area: "Barnet".to_string(),
    }
}

#[tokio::test]
async fn test_prefetch_fills_cache_for_unknown_postcodes() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/postcodes/N29QL")
        .with_status(200)
        .with_body(
            json!({ "status": 200, "result": { "latitude": 51.5889, "longitude": -0.1651 } })
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("coords_cache.json");
    let dataset = PostcodeDataset::from_entries([("SW1A 1AA", Coordinates::new(51.501, -0.1416))]);
    let client = PostcodesIoClient::new(server.url()).with_batch_pause(Duration::ZERO);

    let mut geocoder = Geocoder::new(CoordinateCache::new(&cache_path), PrefixEstimator::new())
        .with_dataset(dataset)
        .with_api(client);

    let postcodes = vec!["SW1A 1AA".to_string(), "n2 9ql".to_string()];
    assert_eq!(geocoder.prefetch(&postcodes).await, 1);
    mock.assert_async().await;

    let (sales, report) =
        geocoder.geocode_sales(vec![sale("SW1A 1AA"), sale("N2 9QL")], &ProgressBar::hidden());
    assert_eq!(report.dataset, 1);
    assert_eq!(report.api, 1);
    assert_eq!(sales[1].source, CoordinateSource::Api);
    assert_eq!(sales[1].coordinates, Coordinates::new(51.5889, -0.1651));

    assert!(geocoder.save_cache().unwrap());

    // a later run answers from the cache without the API
    let mut offline = Geocoder::new(CoordinateCache::load(&cache_path), PrefixEstimator::new());
    let resolution = offline.resolve("N2 9QL").unwrap();
    assert_eq!(resolution.source, CoordinateSource::Cache);
    assert_eq!(resolution.coordinates, Coordinates::new(51.5889, -0.1651));
}

#[tokio::test]
async fn test_prefetch_failure_falls_back_to_estimates() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/postcodes")
        .with_status(500)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = PostcodesIoClient::new(server.url())
        .with_batch_pause(Duration::ZERO)
        .with_retry_delay(Duration::from_millis(1));
    let mut geocoder = Geocoder::new(
        CoordinateCache::new(dir.path().join("coords_cache.json")),
        PrefixEstimator::new(),
    )
    .with_api(client);

    let postcodes = vec!["N2 9QL".to_string(), "N2 8AB".to_string()];
    assert_eq!(geocoder.prefetch(&postcodes).await, 0);

    let (sales, report) = geocoder.geocode_sales(
        postcodes.iter().map(|pc| sale(pc)).collect(),
        &ProgressBar::hidden(),
    );
    assert_eq!(report.estimated, 2);
    assert_eq!(sales.len(), 2);
    assert_ne!(sales[0].coordinates, sales[1].coordinates);
}
