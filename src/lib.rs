pub mod client;
pub mod db;
pub mod server;

// Re-export generated protobuf types
pub mod pb {
    tonic::include_proto!("routeguide");
}

pub use client::RouteGuideClient;
pub use db::{encode_db, parse_db, DbError};
pub use server::RouteGuideService;
