//! Per-IP rate limiting for the API routes.

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor,
};

/// Creates a token-bucket rate limiter keyed by the client's peer address.
///
/// `requests` sets the burst capacity; the bucket refills one request every
/// `window_secs / requests` seconds (at least one per second). Requests over
/// the limit receive `429 Too Many Requests`.
pub fn layer(
    requests: u32,
    window_secs: u64,
) -> GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body> {
    let replenish_secs = (window_secs / u64::from(requests.max(1))).max(1);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(replenish_secs)
            .burst_size(requests)
            .finish()
            .unwrap(),
    );

    GovernorLayer::new(governor_conf)
}
