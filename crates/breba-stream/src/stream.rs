//! Stream adapter over [`TagAccumulator`]

use crate::accumulator::TagAccumulator;
use futures::future;
use futures::stream::{self, Stream, StreamExt};

/// Turn a stream of raw chunks into a stream of complete tag groups
///
/// Empty emissions are skipped. When the input ends, whatever the
/// accumulator still holds is yielded as a final item if non-empty.
pub fn accumulate<S>(chunks: S, mut accumulator: TagAccumulator) -> impl Stream<Item = String>
where
    S: Stream<Item = String>,
{
    chunks
        .map(Some)
        .chain(stream::once(future::ready(None)))
        .filter_map(move |chunk| {
            let emitted = match chunk {
                Some(chunk) => accumulator.append_and_return_html(&chunk),
                None => accumulator.drain_buffer(),
            };
            future::ready((!emitted.is_empty()).then_some(emitted))
        })
}
