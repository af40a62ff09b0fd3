//! Route Guide - Main entry point
//!
//! This crate implements the route guide demo: a client/server pair
//! covering the four gRPC interaction shapes over a feature database
//! loaded from a flat file at startup.
//!
//! ## Usage
//!
//! Start the server:
//! ```bash
//! cargo run --bin route-server -- --db_path route_guide_db.json
//! ```
//!
//! Run the client:
//! ```bash
//! cargo run --bin route-client -- demo
//! cargo run --bin route-client -- get-feature 409146138 -746188906
//! ```

fn main() {
    println!("Route Guide");
    println!();
    println!("Use the following binaries:");
    println!("  cargo run --bin route-server -- --help");
    println!("  cargo run --bin route-client -- --help");
}
