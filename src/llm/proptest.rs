//! Property-based tests for classification and chain resolution.
//!
//! - Classification is total and unknown task types map to moderate
//! - Resolved chains are never empty
//! - A registered preferred provider leads the chain exactly once
//! - Backoff delays stay inside the configured bounds
