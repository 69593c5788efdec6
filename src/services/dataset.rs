use crate::{
    metrics,
    models::{BlockRecord, Sample},
};

/// Derive training samples from adjacent block pairs. A pair contributes a
/// sample only when both sides carry a base fee; pre-London blocks drop
/// out here. Pairing is by sequence index, so a stepped window pairs
/// non-adjacent heights.
///
/// Also reports the most recent observed base fee to the gauge, once per
/// call.
pub fn blocks_to_dataset(blocks: &[BlockRecord]) -> Vec<Sample> {
    let mut samples = Vec::new();

    for pair in blocks.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);

        let (Some(prev_fee_gwei), Some(curr_fee_gwei)) =
            (prev.base_fee_gwei(), curr.base_fee_gwei())
        else {
            continue;
        };

        samples.push(Sample {
            x: vec![prev_fee_gwei, prev.gas_used_ratio()],
            y: curr_fee_gwei,
        });
    }

    if let Some(latest_gwei) = blocks.last().and_then(|b| b.base_fee_gwei()) {
        metrics::LAST_BASE_FEE.set(latest_gwei);
    }

    samples
}
