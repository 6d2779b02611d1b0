/*!
 * Token-bounded batching of subtitle segments.
 *
 * Segments are packed greedily, in order, into groups whose token cost stays
 * within a ceiling. A segment that alone exceeds the ceiling gets a group of
 * its own; nothing is dropped or reordered.
 */

use log::{debug, warn};
use std::sync::Arc;

use crate::subtitle_processor::Segment;
use super::tokens::TokenCounter;

/// Contiguous run of segments sent as one request
#[derive(Debug, Clone, PartialEq)]
pub struct Group<'a> {
    /// Position of the first segment in the source sequence
    pub offset: usize,

    /// The segments, never empty
    pub segments: &'a [Segment],

    /// Sum of segment token counts plus one per delimiter
    pub token_cost: usize,
}

impl Group<'_> {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Partitions segments into token-bounded groups
#[derive(Debug, Clone)]
pub struct Batcher {
    /// Counter used for every segment
    counter: Arc<dyn TokenCounter>,

    /// Token ceiling per group
    max_tokens: usize,
}

impl Batcher {
    pub fn new(counter: Arc<dyn TokenCounter>, max_tokens: usize) -> Self {
        Self { counter, max_tokens }
    }

    /// Token cost of one segment as it will be sent
    pub fn segment_cost(&self, segment: &Segment) -> usize {
        self.counter.count(&segment.request_text())
    }

    /// Split the segments into groups
    pub fn group<'a>(&self, segments: &'a [Segment]) -> Vec<Group<'a>> {
        let mut groups = Vec::new();
        let mut start = 0;
        let mut current_cost = 0;

        for (idx, segment) in segments.iter().enumerate() {
            let cost = self.segment_cost(segment);

            if idx == start {
                current_cost = cost;
            } else if current_cost + 1 + cost <= self.max_tokens {
                current_cost += 1 + cost;
            } else {
                groups.push(Group {
                    offset: start,
                    segments: &segments[start..idx],
                    token_cost: current_cost,
                });
                start = idx;
                current_cost = cost;
            }

            if cost > self.max_tokens {
                warn!(
                    "Segment {} costs {} tokens, above the {} token ceiling; sending it alone",
                    segment.id, cost, self.max_tokens
                );
            }
        }

        if start < segments.len() {
            groups.push(Group {
                offset: start,
                segments: &segments[start..],
                token_cost: current_cost,
            });
        }

        debug!("Packed {} segments into {} groups", segments.len(), groups.len());
        groups
    }
}
