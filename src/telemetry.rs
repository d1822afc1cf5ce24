//! Telemetry metric name constants.
//!
//! Centralised metric names for copysmith operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `copysmith_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `transport`: "direct" or "local_proxy"
//! - `status`: outcome: "ok" or the failure kind (e.g. "api_error")
//! - `reason`: why a retry happened: "user_id_response" or "invalid_response"

/// Total HTTP requests sent upstream (one per attempt).
///
/// Labels: `transport`, `status`.
pub const REQUESTS_TOTAL: &str = "copysmith_requests_total";

/// Upstream request duration in seconds.
///
/// Labels: `transport`.
pub const REQUEST_DURATION_SECONDS: &str = "copysmith_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `reason`.
pub const RETRIES_TOTAL: &str = "copysmith_retries_total";

/// Total responses that carried a leaked upstream identifier.
///
/// Labels: `source` (the response shape it was found in).
pub const LEAKED_IDENTIFIERS_TOTAL: &str = "copysmith_leaked_identifiers_total";

/// Total description fields processed by the batch runner.
///
/// Labels: `field`, `status` ("ok" | failure kind).
pub const BATCH_FIELDS_TOTAL: &str = "copysmith_batch_fields_total";
