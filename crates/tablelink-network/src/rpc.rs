//! Wire types and client stub for `proto/scanner.proto`.
//!
//! Kept in the shape `tonic-build` emits so the crate builds without
//! `protoc`. Regenerate by hand when the proto changes.

use tonic::codegen::http;
use tonic::transport::Channel;

/// Scan submitted to the backend.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScanRequest {
    #[prost(string, tag = "1")]
    pub table_id: String,
    #[prost(string, tag = "2")]
    pub payload: String,
    #[prost(string, tag = "3")]
    pub source: String,
    #[prost(int64, tag = "4")]
    pub captured_at_unix: i64,
}

/// Backend verdict for a scan.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScanReply {
    #[prost(bool, tag = "1")]
    pub accepted: bool,
    #[prost(string, tag = "2")]
    pub message: String,
}

const SERVICE_NAME: &str = "scanner.ScannerBackend";

/// Client for the `scanner.ScannerBackend` service.
#[derive(Debug, Clone)]
pub struct ScannerBackendClient {
    inner: tonic::client::Grpc<Channel>,
}

impl ScannerBackendClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn submit_scan(
        &mut self,
        request: impl tonic::IntoRequest<ScanRequest>,
    ) -> Result<tonic::Response<ScanReply>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(not_ready)?;

        let codec = tonic::codec::ProstCodec::default();
        let path = http::uri::PathAndQuery::from_static("/scanner.ScannerBackend/SubmitScan");
        let mut req = request.into_request();
        req.extensions_mut()
            .insert(tonic::GrpcMethod::new(SERVICE_NAME, "SubmitScan"));

        self.inner.unary(req, path, codec).await
    }
}

/// A channel that cannot become ready has no reachable backend behind it.
fn not_ready(error: impl std::fmt::Display) -> tonic::Status {
    tonic::Status::unavailable(format!("Service was not ready: {error}"))
}
