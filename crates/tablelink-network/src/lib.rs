//! Network layer for the tablelink bridge
//!
//! This crate connects the scanner to the outside world in both directions.
//!
//! # Components
//!
//! - **GrpcScanBackend**: one `SubmitScan` call over a lazily connected tonic channel
//! - **DispatchClient**: exponential-backoff retry policy around a [`ScanBackend`]
//! - **IngressGateway**: status reads and simulated scans, gated by hardware availability
//! - **router / serve**: the axum HTTP surface of the gateway
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablelink_core::{BackendSettings, StatusRegister};
//! use tablelink_network::{
//!     DispatchClient, DispatchConfig, GrpcBackendConfig, GrpcScanBackend, IngressGateway,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = BackendSettings::default();
//! let backend = GrpcScanBackend::connect_lazy(&GrpcBackendConfig::from(&settings))?;
//! let dispatcher = Arc::new(DispatchClient::new(backend, DispatchConfig::from(&settings)));
//!
//! let (_writer, reader) = StatusRegister::new();
//! let shutdown = CancellationToken::new();
//! let gateway = Arc::new(IngressGateway::new(reader, dispatcher, true, shutdown.clone()));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! tablelink_network::serve(listener, tablelink_network::router(gateway), shutdown).await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod client;
mod gateway;
mod rpc;
mod server;

pub use backend::{BackendError, GrpcBackendConfig, GrpcScanBackend, ScanBackend};
pub use client::{DispatchClient, DispatchConfig, Sleeper, TokioSleeper, backoff_delay};
pub use gateway::{GatewayError, IngressGateway, SimulateRequest, SimulateResponse, StatusResponse};
pub use rpc::{ScanReply, ScanRequest, ScannerBackendClient};
pub use server::{router, serve};
