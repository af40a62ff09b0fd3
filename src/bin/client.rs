//! Route Guide client binary
//!
//! Run with: cargo run --bin route-client -- --help

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rand::Rng;
use route_guide::client::{ClientConfig, RouteGuideClient};
use route_guide::db;
use route_guide::pb::{Feature, Point, Rectangle, RouteNote};
use std::path::PathBuf;

/// Fixed-point coordinates become decimal degrees when divided by this.
const COORD_FACTOR: f64 = 10_000_000.0;

#[derive(Parser, Debug)]
#[command(name = "route-client")]
#[command(about = "Route guide gRPC demonstration client")]
struct Args {
    /// Server address (gRPC endpoint)
    #[arg(long, default_value = "http://[::1]:50051")]
    server_addr: String,

    /// Path to the feature database file
    #[arg(long = "db_path", default_value = db::DEFAULT_DB_PATH)]
    db_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Look up the feature at a point (unary call)
    GetFeature {
        /// Latitude in E7 (degrees times 10^7)
        #[arg(allow_negative_numbers = true)]
        latitude: i32,
        /// Longitude in E7 (degrees times 10^7)
        #[arg(allow_negative_numbers = true)]
        longitude: i32,
    },
    /// List the features inside a rectangle (server-streaming call)
    ListFeatures {
        #[arg(allow_negative_numbers = true, default_value = "400000000")]
        lo_latitude: i32,
        #[arg(allow_negative_numbers = true, default_value = "-750000000")]
        lo_longitude: i32,
        #[arg(allow_negative_numbers = true, default_value = "420000000")]
        hi_latitude: i32,
        #[arg(allow_negative_numbers = true, default_value = "-730000000")]
        hi_longitude: i32,
    },
    /// Record a random route over the db (client-streaming call)
    RecordRoute {
        /// Number of points to visit
        #[arg(long, default_value = "10")]
        points: usize,
    },
    /// Exchange route notes (bidirectional streaming call)
    RouteChat,
    /// Run the canonical four-part tour
    Demo,
}

fn point(latitude: i32, longitude: i32) -> Point {
    Point {
        latitude,
        longitude,
    }
}

fn route_note(message: &str, latitude: i32, longitude: i32) -> RouteNote {
    RouteNote {
        location: Some(point(latitude, longitude)),
        message: message.to_string(),
    }
}

async fn cmd_get_feature(client: &RouteGuideClient, p: Point) -> Result<()> {
    let feature = client.get_feature(p).await?;
    let location = feature.location.clone().unwrap_or_default();
    if feature.name.is_empty() {
        println!(
            "Found no feature at {}, {}",
            f64::from(location.latitude) / COORD_FACTOR,
            f64::from(location.longitude) / COORD_FACTOR
        );
    } else {
        println!(
            "Found feature called {} at {}, {}",
            feature.name,
            f64::from(location.latitude) / COORD_FACTOR,
            f64::from(location.longitude) / COORD_FACTOR
        );
    }
    Ok(())
}

async fn cmd_list_features(client: &RouteGuideClient, rect: Rectangle) -> Result<()> {
    let lo = rect.lo.clone().unwrap_or_default();
    let hi = rect.hi.clone().unwrap_or_default();
    println!(
        "Looking for features between {}, {} and {}, {}",
        f64::from(lo.latitude) / COORD_FACTOR,
        f64::from(lo.longitude) / COORD_FACTOR,
        f64::from(hi.latitude) / COORD_FACTOR,
        f64::from(hi.longitude) / COORD_FACTOR
    );
    let features = client.list_features(rect).await?;
    for feature in &features {
        let location = feature.location.clone().unwrap_or_default();
        println!(
            "Found feature called {} at {}, {}",
            feature.name,
            f64::from(location.latitude) / COORD_FACTOR,
            f64::from(location.longitude) / COORD_FACTOR
        );
    }
    println!("ListFeatures rpc succeeded.");
    Ok(())
}

async fn cmd_record_route(
    client: &RouteGuideClient,
    features: &[Feature],
    count: usize,
) -> Result<()> {
    if features.is_empty() {
        return Err(anyhow!("feature db is empty, nothing to visit"));
    }
    let points: Vec<Point> = {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| {
                let feature = &features[rng.gen_range(0..features.len())];
                feature.location.clone().unwrap_or_default()
            })
            .collect()
    };

    let summary = client.record_route(points, true).await?;
    println!("Finished trip with {} points", summary.point_count);
    println!("Passed {} features", summary.feature_count);
    println!("Travelled {} meters", summary.distance);
    println!("It took {} seconds", summary.elapsed_time);
    Ok(())
}

async fn cmd_route_chat(client: &RouteGuideClient) -> Result<()> {
    let notes = vec![
        route_note("First message", 0, 0),
        route_note("Second message", 0, 1),
        route_note("Third message", 1, 0),
        route_note("Fourth message", 0, 0),
    ];
    let received = client.route_chat(notes).await?;
    for note in &received {
        let location = note.location.clone().unwrap_or_default();
        println!(
            "Got message {} at {}, {}",
            note.message, location.latitude, location.longitude
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    // The client keeps its own copy of the feature db for picking route
    // points. An unreadable file is fatal, a malformed one leaves an
    // empty list.
    let features = db::load_features(&args.db_path)?;

    let client = RouteGuideClient::new(ClientConfig {
        server_addr: args.server_addr.clone(),
    });
    client.connect().await?;

    match args.command {
        Commands::GetFeature {
            latitude,
            longitude,
        } => cmd_get_feature(&client, point(latitude, longitude)).await?,
        Commands::ListFeatures {
            lo_latitude,
            lo_longitude,
            hi_latitude,
            hi_longitude,
        } => {
            let rect = Rectangle {
                lo: Some(point(lo_latitude, lo_longitude)),
                hi: Some(point(hi_latitude, hi_longitude)),
            };
            cmd_list_features(&client, rect).await?
        }
        Commands::RecordRoute { points } => {
            cmd_record_route(&client, &features, points).await?
        }
        Commands::RouteChat => cmd_route_chat(&client).await?,
        Commands::Demo => {
            println!("-------------- GetFeature --------------");
            cmd_get_feature(&client, point(409146138, -746188906)).await?;
            cmd_get_feature(&client, point(0, 0)).await?;

            println!("-------------- ListFeatures --------------");
            let rect = Rectangle {
                lo: Some(point(400000000, -750000000)),
                hi: Some(point(420000000, -730000000)),
            };
            cmd_list_features(&client, rect).await?;

            println!("-------------- RecordRoute --------------");
            cmd_record_route(&client, &features, 10).await?;

            println!("-------------- RouteChat --------------");
            cmd_route_chat(&client).await?;
        }
    }

    Ok(())
}
