//! Route Guide client implementation
//!
//! A thin wrapper over the generated stub exposing one method per RPC
//! interaction shape. The streaming methods collect their inbound
//! streams into vectors so callers see plain results.

use crate::pb::route_guide_client::RouteGuideClient as RouteGuideStub;
use crate::pb::{Feature, Point, Rectangle, RouteNote, RouteSummary};
use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use rand::Rng;
use std::time::Duration;
use tokio_stream::StreamExt;
use tonic::transport::Channel;

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server address (gRPC endpoint)
    pub server_addr: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "http://[::1]:50051".to_string(),
        }
    }
}

/// Route Guide client
pub struct RouteGuideClient {
    config: ClientConfig,
    /// gRPC stub, present after [`connect`](Self::connect)
    stub: Mutex<Option<RouteGuideStub<Channel>>>,
}

impl RouteGuideClient {
    /// Create a new, unconnected client
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            stub: Mutex::new(None),
        }
    }

    /// Connect to the server
    pub async fn connect(&self) -> Result<()> {
        tracing::info!("Connecting to server at {}", self.config.server_addr);

        let channel = Channel::from_shared(self.config.server_addr.clone())?
            .connect()
            .await?;

        *self.stub.lock() = Some(RouteGuideStub::new(channel));

        Ok(())
    }

    /// Check if connected to server
    pub fn is_connected(&self) -> bool {
        self.stub.lock().is_some()
    }

    fn stub(&self) -> Result<RouteGuideStub<Channel>> {
        self.stub
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("Not connected"))
    }

    /// Unary call: look up the feature at a point.
    ///
    /// The returned feature has an empty name if nothing is known at
    /// that location.
    pub async fn get_feature(&self, point: Point) -> Result<Feature> {
        let mut stub = self.stub()?;
        let feature = stub.get_feature(point).await?.into_inner();
        Ok(feature)
    }

    /// Server-streaming call: collect all features inside `rect`.
    pub async fn list_features(&self, rect: Rectangle) -> Result<Vec<Feature>> {
        let mut stub = self.stub()?;
        let mut stream = stub.list_features(rect).await?.into_inner();

        let mut features = Vec::new();
        while let Some(feature) = stream.message().await? {
            features.push(feature);
        }
        Ok(features)
    }

    /// Client-streaming call: send a route point by point and receive
    /// the traversal summary.
    ///
    /// With `pace` set, each point is preceded by a randomized
    /// 500-1500 ms delay, mimicking a traveller reporting positions.
    pub async fn record_route(&self, points: Vec<Point>, pace: bool) -> Result<RouteSummary> {
        let mut stub = self.stub()?;

        let delays: Vec<Duration> = if pace {
            let mut rng = rand::thread_rng();
            points
                .iter()
                .map(|_| Duration::from_millis(rng.gen_range(500..1500)))
                .collect()
        } else {
            vec![Duration::ZERO; points.len()]
        };

        let outbound =
            tokio_stream::iter(points.into_iter().zip(delays)).then(|(point, delay)| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                tracing::info!(
                    "Visiting point {}, {}",
                    point.latitude as f64 / 1e7,
                    point.longitude as f64 / 1e7
                );
                point
            });

        let summary = stub.record_route(outbound).await?.into_inner();
        Ok(summary)
    }

    /// Bidirectional streaming call: send `notes` while collecting every
    /// note the server relays back.
    pub async fn route_chat(&self, notes: Vec<RouteNote>) -> Result<Vec<RouteNote>> {
        let mut stub = self.stub()?;

        let outbound = tokio_stream::iter(notes.into_iter().inspect(|note| {
            tracing::info!(
                "Sending message {:?} at {}, {}",
                note.message,
                note.location.as_ref().map_or(0, |l| l.latitude),
                note.location.as_ref().map_or(0, |l| l.longitude)
            );
        }));

        let mut inbound = stub.route_chat(outbound).await?.into_inner();

        let mut received = Vec::new();
        while let Some(note) = inbound.message().await? {
            received.push(note);
        }
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_is_not_connected() {
        let client = RouteGuideClient::new(ClientConfig::default());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn calls_before_connect_fail() {
        let client = RouteGuideClient::new(ClientConfig::default());
        let err = client
            .get_feature(Point {
                latitude: 0,
                longitude: 0,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Not connected"));
    }
}
