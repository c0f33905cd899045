use crate::util::wrap_unit;

/// Spreads partials around a circle of speakers.
///
/// Partial `i` of `out.len()` lands at position `arc_start + arc_span * i / n` on the
/// unit circle, which selects an entry of `channels`. A negative span sweeps the other
/// way round; a span beyond one turn wraps around again. Writes the physical channel
/// for each partial into `out` without allocating.
pub fn compute_output_map(arc_start: f32, arc_span: f32, channels: &[usize], out: &mut [usize]) {
    if channels.is_empty() {
        out.fill(0);
        return;
    }
    let partials = out.len() as f32;
    let count = channels.len();
    for (i, slot) in out.iter_mut().enumerate() {
        let position = wrap_unit(arc_start + arc_span * i as f32 / partials);
        let index = ((position * count as f32).floor() as usize).min(count - 1);
        *slot = channels[index];
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn map(arc_start: f32, arc_span: f32, channels: &[usize], partials: usize) -> Vec<usize> {
        let mut out = vec![usize::MAX; partials];
        compute_output_map(arc_start, arc_span, channels, &mut out);
        out
    }

    #[test]
    fn test_full_circle_is_monotonic() {
        let channels = [0, 1, 2, 3];
        let out = map(0.0, 1.0, &channels, 8);
        assert_eq!(out, vec![0, 0, 1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_negative_span_sweeps_backwards() {
        let channels = [10, 11, 12, 13];
        let out = map(0.0, -1.0, &channels, 4);
        assert_eq!(out, vec![10, 13, 12, 11]);
    }

    #[test]
    fn test_span_beyond_one_turn_wraps() {
        let channels = [0, 1];
        let out = map(0.0, 2.0, &channels, 4);
        assert_eq!(out, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_arc_start_offsets() {
        let channels = [5, 6, 7, 8];
        let out = map(0.5, 0.0, &channels, 3);
        assert_eq!(out, vec![7, 7, 7]);
    }

    proptest! {
        #[test]
        fn output_map_stays_in_channel_list(
            arc_start in -4.0f32..4.0,
            arc_span in -2.0f32..=2.0,
            count in 1usize..12,
            partials in 1usize..64,
        ) {
            let channels: Vec<usize> = (0..count).map(|c| c * 3 + 1).collect();
            let out = map(arc_start, arc_span, &channels, partials);
            for channel in out {
                prop_assert!(channels.contains(&channel));
            }
        }

        #[test]
        fn unit_span_from_zero_starts_at_first_channel(
            count in 1usize..12,
            partials in 1usize..64,
        ) {
            let channels: Vec<usize> = (0..count).collect();
            let out = map(0.0, 1.0, &channels, partials);
            prop_assert_eq!(out[0], channels[0]);
            for pair in out.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }
}
