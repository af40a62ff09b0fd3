//! Integration tests for the route guide client/server pair

use route_guide::client::{ClientConfig, RouteGuideClient};
use route_guide::pb::{Feature, Point, Rectangle, RouteNote};
use route_guide::server::{RouteGuideService, ServerConfig};
use std::time::Duration;

/// Find an available port for testing
fn find_available_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn feature(name: &str, latitude: i32, longitude: i32) -> Feature {
    Feature {
        name: name.to_string(),
        location: Some(Point {
            latitude,
            longitude,
        }),
    }
}

fn point(latitude: i32, longitude: i32) -> Point {
    Point {
        latitude,
        longitude,
    }
}

fn test_features() -> Vec<Feature> {
    vec![
        feature("BerkshireValleyManagementAreaTrail", 409146138, -746188906),
        feature("101NewJersey10", 408122808, -743999179),
        feature("", 413628156, -749015468),
        feature("FarAway", 500000000, -500000000),
    ]
}

/// Start a server with the given features on an ephemeral port and
/// return a connected client.
async fn start_server(features: Vec<Feature>) -> RouteGuideClient {
    let port = find_available_port();
    let listen_addr = format!("[::1]:{}", port);

    let config = ServerConfig {
        listen_addr: listen_addr.clone(),
        ..Default::default()
    };
    let service = RouteGuideService::with_features(config, features).into_service();

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(service)
            .serve(listen_addr.parse().unwrap())
            .await
            .unwrap();
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = RouteGuideClient::new(ClientConfig {
        server_addr: format!("http://[::1]:{}", port),
    });
    client.connect().await.unwrap();
    client
}

#[tokio::test]
async fn get_feature_hit_and_miss() {
    let client = start_server(test_features()).await;

    let hit = client
        .get_feature(point(409146138, -746188906))
        .await
        .unwrap();
    assert_eq!(hit.name, "BerkshireValleyManagementAreaTrail");
    assert_eq!(hit.location, Some(point(409146138, -746188906)));

    let miss = client.get_feature(point(0, 0)).await.unwrap();
    assert!(miss.name.is_empty());
    assert_eq!(miss.location, Some(point(0, 0)));
}

#[tokio::test]
async fn list_features_streams_in_range_matches_in_order() {
    let client = start_server(test_features()).await;

    let rect = Rectangle {
        lo: Some(point(400000000, -750000000)),
        hi: Some(point(420000000, -730000000)),
    };
    let features = client.list_features(rect).await.unwrap();

    // FarAway is outside the rectangle; the rest stream in load order,
    // including the unnamed feature.
    assert_eq!(
        features
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>(),
        vec!["BerkshireValleyManagementAreaTrail", "101NewJersey10", ""]
    );
}

#[tokio::test]
async fn record_route_summarizes_the_trip() {
    let client = start_server(test_features()).await;

    let route = vec![
        point(409146138, -746188906), // named feature
        point(408122808, -743999179), // named feature
        point(413628156, -749015468), // known but unnamed
        point(1, 1),                  // unknown
    ];
    let summary = client.record_route(route, false).await.unwrap();

    assert_eq!(summary.point_count, 4);
    assert_eq!(summary.feature_count, 2);
    assert!(summary.distance > 0);
    assert!(summary.elapsed_time >= 0);
}

#[tokio::test]
async fn route_chat_echoes_notes_at_repeated_locations() {
    let client = start_server(test_features()).await;

    let notes = vec![
        RouteNote {
            location: Some(point(0, 0)),
            message: "First message".to_string(),
        },
        RouteNote {
            location: Some(point(0, 1)),
            message: "Second message".to_string(),
        },
        RouteNote {
            location: Some(point(1, 0)),
            message: "Third message".to_string(),
        },
        RouteNote {
            location: Some(point(0, 0)),
            message: "Fourth message".to_string(),
        },
    ];
    let received = client.route_chat(notes).await.unwrap();

    // Only the fourth note revisits a location, so the only relay is the
    // first message.
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].message, "First message");
    assert_eq!(received[0].location, Some(point(0, 0)));
}

#[tokio::test]
async fn server_loads_db_from_file() {
    let features = test_features();
    let db_path = std::env::temp_dir().join(format!(
        "route_guide_db_test_{}_{}.json",
        std::process::id(),
        find_available_port()
    ));
    std::fs::write(&db_path, route_guide::encode_db(&features)).unwrap();

    let port = find_available_port();
    let listen_addr = format!("[::1]:{}", port);
    let config = ServerConfig {
        listen_addr: listen_addr.clone(),
        db_path: db_path.clone(),
    };
    let service = RouteGuideService::new(config).unwrap().into_service();

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(service)
            .serve(listen_addr.parse().unwrap())
            .await
            .unwrap();
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = RouteGuideClient::new(ClientConfig {
        server_addr: format!("http://[::1]:{}", port),
    });
    client.connect().await.unwrap();

    let hit = client
        .get_feature(point(408122808, -743999179))
        .await
        .unwrap();
    assert_eq!(hit.name, "101NewJersey10");

    std::fs::remove_file(&db_path).ok();
}
