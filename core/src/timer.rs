use crate::{
    sanitize,
    GaugeRecord,
};

/// Reduce one cycle's samples for a timer to count, sum, sum of squares, min
/// and max in a single pass. A timer without samples yields no record.
pub fn reduce(name: &str, samples: &[f64]) -> Option<GaugeRecord> {
    let (&first, rest) = samples.split_first()?;

    let mut count = 1u64;
    let mut sum = first;
    let mut sum_squares = first * first;
    let mut min = first;
    let mut max = first;

    for &sample in rest {
        count += 1;
        sum += sample;
        sum_squares += sample * sample;
        min = min.min(sample);
        max = max.max(sample);
    }

    Some(GaugeRecord::Summary {
        name: sanitize(name),
        count,
        sum,
        sum_squares,
        min,
        max,
    })
}
