/*!
 * Alignment repair between translated texts and their source segments.
 *
 * Every layer that turns service output into per-segment texts goes through
 * `align`, so output position `i` always belongs to source segment `i`.
 */

use log::warn;

use crate::subtitle_processor::Segment;

/// Force `outputs` to exactly one entry per source segment.
///
/// Missing tail positions are filled with the untranslated source text and
/// surplus entries are dropped.
pub fn align(mut outputs: Vec<String>, sources: &[Segment]) -> Vec<String> {
    let expected = sources.len();
    let received = outputs.len();

    if received > expected {
        warn!("Dropping {} surplus translations", received - expected);
        outputs.truncate(expected);
    } else if received < expected {
        warn!(
            "Filling {} missing translations with source text",
            expected - received
        );
        outputs.extend(sources[received..].iter().map(|segment| segment.text.clone()));
    }

    outputs
}

/// Source texts unchanged, the fallback when a group cannot be translated
pub fn source_texts(sources: &[Segment]) -> Vec<String> {
    sources.iter().map(|segment| segment.text.clone()).collect()
}
