// postcodes.io client tests against a mockito server

use house_price_heatmap::geocoding::{PostcodesIoClient, PostcodesIoError};
use house_price_heatmap::models::Coordinates;
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

fn client(server: &Server) -> PostcodesIoClient {
    PostcodesIoClient::new(server.url())
        .with_batch_pause(Duration::ZERO)
        .with_retry_delay(Duration::from_millis(1))
}

#[tokio::test]
async fn test_lookup_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/postcodes/SW1A1AA")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "status": 200,
                "result": { "postcode": "SW1A 1AA", "latitude": 51.501009, "longitude": -0.141588 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let result = client(&server).lookup("sw1a 1aa").await.unwrap();

    assert_eq!(result, Some(Coordinates::new(51.501009, -0.141588)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_lookup_unknown_postcode() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/postcodes/ZZ11ZZ")
        .with_status(404)
        .with_body(r#"{"status":404,"error":"Postcode not found"}"#)
        .create_async()
        .await;

    let result = client(&server).lookup("ZZ1 1ZZ").await.unwrap();

    assert_eq!(result, None);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_lookup_null_coordinates() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/postcodes/JE24WD")
        .with_status(200)
        .with_body(r#"{"status":200,"result":{"latitude":null,"longitude":null}}"#)
        .create_async()
        .await;

    assert_eq!(client(&server).lookup("JE2 4WD").await.unwrap(), None);
}

#[tokio::test]
async fn test_lookup_retries_server_errors() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/postcodes/N29QL")
        .with_status(503)
        .expect(4)
        .create_async()
        .await;

    let result = client(&server).lookup("N2 9QL").await;

    assert!(matches!(result, Err(PostcodesIoError::Status(503))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_lookup_does_not_retry_client_errors() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/postcodes/N29QL")
        .with_status(400)
        .expect(1)
        .create_async()
        .await;

    let result = client(&server).lookup("N2 9QL").await;

    assert!(matches!(result, Err(PostcodesIoError::Status(400))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_lookup_batch_keys_by_original_postcode() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/postcodes")
        .match_body(Matcher::Json(json!({ "postcodes": ["E16AN", "NW32AB"] })))
        .with_status(200)
        .with_body(
            json!({
                "status": 200,
                "result": [
                    { "query": "E16AN", "result": { "latitude": 51.52, "longitude": -0.07 } },
                    { "query": "NW32AB", "result": null }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let postcodes = vec![
        "E1 6AN".to_string(),
        "e16an".to_string(),
        "NW3 2AB".to_string(),
    ];
    let results = client(&server).lookup_batch(&postcodes).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results["E1 6AN"], Coordinates::new(51.52, -0.07));
    assert_eq!(results["e16an"], Coordinates::new(51.52, -0.07));
    assert!(!results.contains_key("NW3 2AB"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_lookup_batch_splits_into_chunks_of_100() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/postcodes")
        .with_status(200)
        .with_body(r#"{"status":200,"result":[]}"#)
        .expect(3)
        .create_async()
        .await;

    let postcodes: Vec<String> = (0..250).map(|i| format!("E{} {}AA", i / 10 + 1, i % 10)).collect();
    let results = client(&server).lookup_batch(&postcodes).await;

    assert!(results.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_lookup_batch_skips_failed_chunk() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/postcodes")
        .with_status(400)
        .create_async()
        .await;

    let results = client(&server)
        .lookup_batch(&["E1 6AN".to_string()])
        .await;

    assert!(results.is_empty());
}
