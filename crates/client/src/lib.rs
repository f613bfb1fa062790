//! Client-side gateway for the Empresta aê offline cache.
//!
//! This crate provides the fetch pipeline, route classification, the two
//! caching strategies, and the install/activate lifecycle shared by the
//! proxy server and the CLI.

pub mod classify;
pub mod fetch;
pub mod gateway;
pub mod lifecycle;

pub use classify::{RouteClass, RoutingConfig, classify};
pub use fetch::{FetchConfig, FetchRequest, FetchedResponse, Fetcher, HttpFetcher};
pub use gateway::{Gateway, GatewayResponse, ResponseSource};
pub use lifecycle::{Lifecycle, Phase};
