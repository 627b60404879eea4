use crate::error::{StreamError, StreamResult};
use rivulet_base::Manifest;
use std::time::Duration;

//
// The transport seam. Worker threads and the manifest fetch go through this
// trait so tests can inject fakes; the production implementation wraps a
// blocking reqwest client with a fixed per-request timeout.
//

#[derive(Debug, Clone)]
pub enum FetchError {
    /// Response arrived with a non-200 status
    Status(u16),
    /// Connection failure, timeout, or other transport-level problem
    Transport(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(
        &self,
        fmt: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        match *self {
            FetchError::Status(status) => write!(fmt, "HTTP status {}", status),
            FetchError::Transport(ref e) => e.fmt(fmt),
        }
    }
}

impl From<FetchError> for StreamError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Status(status) => StreamError::HttpStatus(status),
            FetchError::Transport(message) => StreamError::TransportError(message),
        }
    }
}

pub trait StreamingTransport: Send + Sync + 'static {
    fn fetch(
        &self,
        url: &str,
    ) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> StreamResult<HttpTransport> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| StreamError::TransportError(e.to_string()))?;
        Ok(HttpTransport { client })
    }
}

impl StreamingTransport for HttpTransport {
    fn fetch(
        &self,
        url: &str,
    ) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::Status(status));
        }

        let bytes = response
            .bytes()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Fetch and parse the streaming manifest. Failure here is a hard error for
/// streaming mode; the caller is expected to degrade to bundled-only
/// operation.
pub fn fetch_manifest(
    transport: &dyn StreamingTransport,
    manifest_url: &str,
) -> StreamResult<Manifest> {
    log::info!("Fetching streaming manifest from {}", manifest_url);
    let bytes = transport.fetch(manifest_url)?;
    let manifest = Manifest::from_json_bytes(&bytes)?;
    log::info!(
        "Loaded manifest version {} with {} entries",
        manifest.version(),
        manifest.len()
    );
    Ok(manifest)
}

#[cfg(test)]
mod test {
    use super::*;

    struct StaticTransport(Vec<u8>);

    impl StreamingTransport for StaticTransport {
        fn fetch(
            &self,
            _url: &str,
        ) -> Result<Vec<u8>, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct FailingTransport;

    impl StreamingTransport for FailingTransport {
        fn fetch(
            &self,
            _url: &str,
        ) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::Status(404))
        }
    }

    #[test]
    fn fetch_manifest_parses_document() {
        let transport = StaticTransport(
            br#"{"version": "1", "streaming_assets": {"models": [{"path": "models/a.glb"}]}}"#
                .to_vec(),
        );
        let manifest = fetch_manifest(&transport, "http://example/manifest.json").unwrap();
        assert_eq!(manifest.version(), "1");
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn fetch_manifest_propagates_transport_failure() {
        let result = fetch_manifest(&FailingTransport, "http://example/manifest.json");
        assert!(matches!(result, Err(StreamError::HttpStatus(404))));
    }

    #[test]
    fn fetch_manifest_propagates_parse_failure() {
        let transport = StaticTransport(b"not json".to_vec());
        let result = fetch_manifest(&transport, "http://example/manifest.json");
        assert!(matches!(result, Err(StreamError::ManifestError(_))));
    }
}
