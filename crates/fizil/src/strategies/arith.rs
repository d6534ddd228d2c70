use std::{borrow::Cow, sync::Arc};

use super::{Stage, TestCasesPerExample, pruning::could_be_bitflip};

/// Largest delta the arith stages add or subtract.
pub const ARITH_MAX: u32 = 16;

/// Adds and subtracts every δ ∈ [1, ARITH_MAX] at each byte. Results a flip
/// stage already reaches are skipped.
pub fn arith8(example: &Arc<[u8]>) -> Stage {
    let data = Arc::clone(example);
    let test_cases = (0..data.len()).flat_map(move |i| {
        let data = Arc::clone(&data);
        (1..=ARITH_MAX as u8).flat_map(move |delta| {
            let orig = data[i];
            let mut out = Vec::with_capacity(2);
            for new in [orig.wrapping_add(delta), orig.wrapping_sub(delta)] {
                if !could_be_bitflip(u32::from(orig), u32::from(new)) {
                    let mut buf = data.to_vec();
                    buf[i] = new;
                    out.push(buf);
                }
            }
            out
        })
    });
    Stage {
        name: Cow::Borrowed("arith 8/8"),
        test_cases_per_example: TestCasesPerExample::PerByte(2 * ARITH_MAX),
        identity: false,
        test_cases: Box::new(test_cases),
    }
}

/// 16-bit arith at every word-aligned position, in both byte orders.
/// Deltas whose effect stays within one byte are left to [`arith8`], and
/// flip-reachable results are skipped.
pub fn arith16(example: &Arc<[u8]>) -> Stage {
    let data = Arc::clone(example);
    let test_cases = aligned_positions(data.len(), 2).flat_map(move |i| {
        let data = Arc::clone(&data);
        (1..=ARITH_MAX as u16).flat_map(move |delta| {
            let orig = u16::from_le_bytes([data[i], data[i + 1]]);
            let mut out = Vec::with_capacity(4);
            let mut emit = |value: u16| {
                let mut buf = data.to_vec();
                buf[i..i + 2].copy_from_slice(&value.to_le_bytes());
                out.push(buf);
            };
            if (orig & 0xff) + delta > 0xff {
                let new = orig.wrapping_add(delta);
                if !could_be_bitflip(u32::from(orig), u32::from(new)) {
                    emit(new);
                }
            }
            if (orig & 0xff) < delta {
                let new = orig.wrapping_sub(delta);
                if !could_be_bitflip(u32::from(orig), u32::from(new)) {
                    emit(new);
                }
            }
            let swapped = orig.swap_bytes();
            if (orig >> 8) + delta > 0xff {
                let new = swapped.wrapping_add(delta).swap_bytes();
                if !could_be_bitflip(u32::from(orig), u32::from(new)) {
                    emit(new);
                }
            }
            if (orig >> 8) < delta {
                let new = swapped.wrapping_sub(delta).swap_bytes();
                if !could_be_bitflip(u32::from(orig), u32::from(new)) {
                    emit(new);
                }
            }
            out
        })
    });
    Stage {
        name: Cow::Borrowed("arith 16/8"),
        test_cases_per_example: TestCasesPerExample::PerByte(2 * ARITH_MAX),
        identity: false,
        test_cases: Box::new(test_cases),
    }
}

/// 32-bit arith at every dword-aligned position, in both byte orders.
pub fn arith32(example: &Arc<[u8]>) -> Stage {
    let data = Arc::clone(example);
    let test_cases = aligned_positions(data.len(), 4).flat_map(move |i| {
        let data = Arc::clone(&data);
        (1..=ARITH_MAX).flat_map(move |delta| {
            let orig = u32::from_le_bytes(data[i..i + 4].try_into().expect("aligned window"));
            let mut out = Vec::with_capacity(4);
            let mut emit = |value: u32| {
                let mut buf = data.to_vec();
                buf[i..i + 4].copy_from_slice(&value.to_le_bytes());
                out.push(buf);
            };
            if (orig & 0xffff) + delta > 0xffff {
                let new = orig.wrapping_add(delta);
                if !could_be_bitflip(orig, new) {
                    emit(new);
                }
            }
            if (orig & 0xffff) < delta {
                let new = orig.wrapping_sub(delta);
                if !could_be_bitflip(orig, new) {
                    emit(new);
                }
            }
            let swapped = orig.swap_bytes();
            if (orig >> 16) + delta > 0xffff {
                let new = swapped.wrapping_add(delta).swap_bytes();
                if !could_be_bitflip(orig, new) {
                    emit(new);
                }
            }
            if (orig >> 16) < delta {
                let new = swapped.wrapping_sub(delta).swap_bytes();
                if !could_be_bitflip(orig, new) {
                    emit(new);
                }
            }
            out
        })
    });
    Stage {
        name: Cow::Borrowed("arith 32/8"),
        test_cases_per_example: TestCasesPerExample::PerByte(2 * ARITH_MAX),
        identity: false,
        test_cases: Box::new(test_cases),
    }
}

/// Positions that are multiples of `width` with a full window remaining.
pub(super) fn aligned_positions(len: usize, width: usize) -> impl Iterator<Item = usize> {
    (0..(len + 1).saturating_sub(width)).step_by(width)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn byte_values(stage: Stage) -> BTreeSet<u8> {
        stage.test_cases.map(|case| case[0]).collect()
    }

    #[test]
    fn arith8_prunes_everything_a_flip_reaches() {
        let produced = byte_values(arith8(&Arc::from(&[128u8][..])));
        let expected: BTreeSet<u8> = (113..=126)
            .chain([133, 135, 137, 138, 139, 141, 142])
            .collect();
        assert_eq!(produced, expected);
        assert_eq!(produced.len(), 21);
    }

    #[test]
    fn arith16_only_emits_multi_byte_effects() {
        let produced: Vec<[u8; 2]> = arith16(&Arc::from(&[0xFF, 0x00][..]))
            .test_cases
            .map(|case| [case[0], case[1]])
            .collect();
        assert!(!produced.is_empty());
        // a delta confined to the low byte belongs to arith 8/8
        assert!(produced.iter().all(|case| case[1] != 0x00));
    }

    #[test]
    fn short_buffers_produce_no_wide_arith() {
        assert_eq!(arith16(&Arc::from(&[1u8][..])).test_cases.count(), 0);
        assert_eq!(arith32(&Arc::from(&[1u8, 2, 3][..])).test_cases.count(), 0);
    }

    #[test]
    fn aligned_positions_step_by_width() {
        assert_eq!(aligned_positions(8, 2).collect::<Vec<_>>(), [0, 2, 4, 6]);
        assert_eq!(aligned_positions(7, 2).collect::<Vec<_>>(), [0, 2, 4]);
        assert_eq!(aligned_positions(3, 4).count(), 0);
    }
}
