use crate::loki::types::PushBatch;
use crate::pipeline::fragment::StreamFragment;

/// Default upper bound on fragments fed into one push request
pub const DEFAULT_MAX_STREAMS_PER_BATCH: usize = 4096;

/// Split fragments into push batches of at most `max_per_batch` fragments,
/// merging fragments with equal label sets inside each batch.
///
/// Chunk `i` covers fragments `[i * max, (i + 1) * max)` in their original
/// order. Entries of a merged fragment are appended to the first fragment in
/// the chunk carrying the same labels, so per-stream arrival order holds.
pub fn make_batches(fragments: &[StreamFragment], max_per_batch: usize) -> Vec<PushBatch> {
    fragments
        .chunks(max_per_batch.max(1))
        .map(merge_streams)
        .collect()
}

/// Merge fragments sharing a label set. Linear scan per fragment: the chunk
/// size bounds the number of distinct label sets.
pub fn merge_streams(fragments: &[StreamFragment]) -> PushBatch {
    let mut batch = PushBatch::default();

    for fragment in fragments {
        match batch
            .streams
            .iter_mut()
            .find(|stream| stream.labels == fragment.labels)
        {
            Some(stream) => stream.entries.extend(fragment.entries.iter().cloned()),
            None => batch.streams.push(fragment.clone()),
        }
    }

    batch
}
