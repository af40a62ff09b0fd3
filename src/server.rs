//! Route Guide server implementation
//!
//! The server loads the feature database once at startup and serves it
//! over the four gRPC interaction shapes: a unary lookup, a
//! server-streaming rectangle query, a client-streaming route recorder,
//! and a bidirectional chat relay.

use crate::db;
use crate::pb::route_guide_server::{RouteGuide, RouteGuideServer};
use crate::pb::{Feature, Point, Rectangle, RouteNote, RouteSummary};
use anyhow::Result;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

/// Degrees are stored as fixed-point integers scaled by 10^7.
const COORD_FACTOR: f64 = 10_000_000.0;
/// Mean earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// gRPC listen address
    pub listen_addr: String,
    /// Path to the feature database file
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "[::1]:50051".to_string(),
            db_path: PathBuf::from(db::DEFAULT_DB_PATH),
        }
    }
}

/// Route Guide server state
///
/// The feature list is immutable after load and shared with handlers
/// without locking. The chat note log is the only mutable state and is
/// owned here, guarded by a mutex, and created at construction.
pub struct RouteGuideService {
    config: ServerConfig,
    /// Ordered feature records, read-only after load
    features: Arc<Vec<Feature>>,
    /// Append-only log of received chat notes
    notes: Arc<Mutex<Vec<RouteNote>>>,
}

impl RouteGuideService {
    /// Create the service by loading the feature database from disk.
    ///
    /// An unreadable db file is fatal; a malformed one leaves the service
    /// running with an empty feature list.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let features = db::load_features(&config.db_path)?;
        Ok(Self::with_features(config, features))
    }

    /// Create the service from an already-loaded feature list.
    pub fn with_features(config: ServerConfig, features: Vec<Feature>) -> Self {
        Self {
            config,
            features: Arc::new(features),
            notes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the gRPC service for this server
    pub fn into_service(self) -> RouteGuideServer<RouteGuideImpl> {
        RouteGuideServer::new(RouteGuideImpl {
            inner: Arc::new(self),
        })
    }

    /// Get the listen address
    pub fn listen_addr(&self) -> &str {
        &self.config.listen_addr
    }
}

/// Name of the feature at exactly `point`, if any.
fn feature_name_at<'a>(point: &Point, features: &'a [Feature]) -> Option<&'a str> {
    features
        .iter()
        .find(|f| f.location.as_ref() == Some(point))
        .map(|f| f.name.as_str())
}

/// Whether `point` falls inside `rect`, corner order independent and
/// boundary inclusive.
fn in_rectangle(point: &Point, rect: &Rectangle) -> bool {
    let lo = rect.lo.clone().unwrap_or_default();
    let hi = rect.hi.clone().unwrap_or_default();
    let left = lo.longitude.min(hi.longitude);
    let right = lo.longitude.max(hi.longitude);
    let bottom = lo.latitude.min(hi.latitude);
    let top = lo.latitude.max(hi.latitude);

    point.longitude >= left
        && point.longitude <= right
        && point.latitude >= bottom
        && point.latitude <= top
}

/// Great-circle distance between two points in metres.
///
/// The formula is based on <http://mathforum.org/library/drmath/view/51879.html>
fn calc_distance(start: &Point, end: &Point) -> f64 {
    let lat_1 = f64::from(start.latitude) / COORD_FACTOR;
    let lat_2 = f64::from(end.latitude) / COORD_FACTOR;
    let lon_1 = f64::from(start.longitude) / COORD_FACTOR;
    let lon_2 = f64::from(end.longitude) / COORD_FACTOR;

    let lat_rad_1 = lat_1.to_radians();
    let lat_rad_2 = lat_2.to_radians();
    let delta_lat_rad = (lat_2 - lat_1).to_radians();
    let delta_lon_rad = (lon_2 - lon_1).to_radians();

    let a = (delta_lat_rad / 2.0).sin().powi(2)
        + lat_rad_1.cos() * lat_rad_2.cos() * (delta_lon_rad / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// gRPC service implementation wrapper
pub struct RouteGuideImpl {
    inner: Arc<RouteGuideService>,
}

#[tonic::async_trait]
impl RouteGuide for RouteGuideImpl {
    async fn get_feature(&self, request: Request<Point>) -> Result<Response<Feature>, Status> {
        let point = request.into_inner();

        tracing::debug!(
            "GetFeature request: latitude={}, longitude={}",
            point.latitude,
            point.longitude
        );

        let name = feature_name_at(&point, &self.inner.features)
            .unwrap_or_default()
            .to_string();

        Ok(Response::new(Feature {
            name,
            location: Some(point),
        }))
    }

    type ListFeaturesStream = ReceiverStream<Result<Feature, Status>>;

    async fn list_features(
        &self,
        request: Request<Rectangle>,
    ) -> Result<Response<Self::ListFeaturesStream>, Status> {
        let rect = request.into_inner();

        tracing::debug!("ListFeatures request: {:?}", rect);

        let features = self.inner.features.clone();
        let (tx, rx) = mpsc::channel(4);

        tokio::spawn(async move {
            for feature in features.iter() {
                let matches = feature
                    .location
                    .as_ref()
                    .map_or(false, |p| in_rectangle(p, &rect));
                if matches && tx.send(Ok(feature.clone())).await.is_err() {
                    // Receiver went away; stop streaming.
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn record_route(
        &self,
        request: Request<Streaming<Point>>,
    ) -> Result<Response<RouteSummary>, Status> {
        let mut stream = request.into_inner();

        tracing::debug!("RecordRoute stream opened");

        let started = Instant::now();
        let mut point_count = 0;
        let mut feature_count = 0;
        let mut distance = 0.0;
        let mut previous: Option<Point> = None;

        while let Some(point) = stream.message().await? {
            point_count += 1;
            if feature_name_at(&point, &self.inner.features).map_or(false, |name| !name.is_empty())
            {
                feature_count += 1;
            }
            if let Some(previous) = &previous {
                distance += calc_distance(previous, &point);
            }
            previous = Some(point);
        }

        let summary = RouteSummary {
            point_count,
            feature_count,
            distance: distance as i32,
            elapsed_time: started.elapsed().as_secs() as i32,
        };

        tracing::debug!("RecordRoute summary: {:?}", summary);

        Ok(Response::new(summary))
    }

    type RouteChatStream = ReceiverStream<Result<RouteNote, Status>>;

    async fn route_chat(
        &self,
        request: Request<Streaming<RouteNote>>,
    ) -> Result<Response<Self::RouteChatStream>, Status> {
        let mut stream = request.into_inner();

        tracing::debug!("RouteChat stream opened");

        let notes = self.inner.notes.clone();
        let (tx, rx) = mpsc::channel(4);

        tokio::spawn(async move {
            while let Ok(Some(note)) = stream.message().await {
                // Collect the echoes under the lock, send them after
                // releasing it.
                let echoes: Vec<RouteNote> = {
                    let mut log = notes.lock();
                    let echoes = log
                        .iter()
                        .filter(|n| n.location == note.location)
                        .cloned()
                        .collect();
                    log.push(note);
                    echoes
                };
                for echo in echoes {
                    if tx.send(Ok(echo)).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// Run the server
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let addr = config.listen_addr.parse()?;
    let service = RouteGuideService::new(config)?;

    tracing::info!("Starting route guide server on {}", addr);

    tonic::transport::Server::builder()
        .add_service(service.into_service())
        .serve(addr)
        .await?;

    Ok(())
}
