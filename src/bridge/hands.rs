//! Flat landmark arrays from JS into hand detections

use crate::landmarks::{HandDetection, Handedness, HAND_VALUES};

/// Parse `num_hands` hands from `[x, y, z] x 21` blocks
///
/// `handedness` is a comma-separated label list in report order
/// (e.g. `"Right,Left"`); `scores` holds one confidence per hand. Blocks that
/// are cut short are skipped.
pub fn parse_hands(
    flat_data: &[f32],
    num_hands: usize,
    handedness: &str,
    scores: &[f32],
) -> Vec<HandDetection> {
    let labels: Vec<Handedness> = handedness
        .split(',')
        .map(|l| Handedness::from_label(l).unwrap_or(Handedness::Right))
        .collect();

    (0..num_hands)
        .filter_map(|h| {
            let block = flat_data.get(h * HAND_VALUES..(h + 1) * HAND_VALUES)?;
            let side = labels.get(h).copied().unwrap_or(Handedness::Right);
            let score = scores.get(h).copied().unwrap_or(1.0);
            HandDetection::from_flat(block, side, score)
        })
        .collect()
}
