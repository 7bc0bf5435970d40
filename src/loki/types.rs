use crate::pipeline::fragment::StreamFragment;
use serde::{Deserialize, Serialize};

/// Path of Loki's push endpoint, relative to the server base URL
pub const PUSH_PATH: &str = "/loki/api/v1/push";

/// Path of Loki's readiness endpoint
pub const READY_PATH: &str = "/ready";

/// Body of one push request.
///
/// ```json
/// {"streams": [{"stream": {"tag": "app1"}, "values": [["1700000000000000000", "hello"]]}]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushBatch {
    pub streams: Vec<StreamFragment>,
}

impl PushBatch {
    /// Total number of log lines across all streams
    pub fn entry_count(&self) -> usize {
        self.streams.iter().map(|s| s.entries.len()).sum()
    }

    /// Size of the largest stream
    pub fn max_stream_len(&self) -> usize {
        self.streams.iter().map(|s| s.entries.len()).max().unwrap_or(0)
    }
}
