use std::{borrow::Cow, sync::Arc};

use super::{
    Stage, TestCasesPerExample,
    arith::aligned_positions,
    pruning::{could_be_arith, could_be_bitflip, could_be_interest},
};

/// Values with a track record of tripping edge conditions.
pub const INTERESTING_8: [i8; 9] = [-128, -1, 0, 1, 16, 32, 64, 100, 127];

pub const INTERESTING_16: [i16; 19] = [
    -128, -1, 0, 1, 16, 32, 64, 100, 127, // the 8-bit values
    -32768, -129, 128, 255, 256, 512, 1000, 1024, 4096, 32767,
];

pub const INTERESTING_32: [i32; 27] = [
    -128, -1, 0, 1, 16, 32, 64, 100, 127, // the 8-bit values
    -32768, -129, 128, 255, 256, 512, 1000, 1024, 4096, 32767, // the 16-bit values
    -2147483648, -100663046, -32769, 32768, 65535, 65536, 100663045, 2147483647,
];

/// Overwrites every byte with each interesting 8-bit value. Results a flip
/// or arith already reaches are skipped.
pub fn interest8(example: &Arc<[u8]>) -> Stage {
    let data = Arc::clone(example);
    let test_cases = (0..data.len()).flat_map(move |i| {
        let data = Arc::clone(&data);
        INTERESTING_8.into_iter().filter_map(move |value| {
            let orig = data[i];
            let new = value as u8;
            if could_be_bitflip(u32::from(orig), u32::from(new))
                || could_be_arith(u32::from(orig), u32::from(new), 1)
            {
                return None;
            }
            let mut buf = data.to_vec();
            buf[i] = new;
            Some(buf)
        })
    });
    Stage {
        name: Cow::Borrowed("interest 8/8"),
        test_cases_per_example: TestCasesPerExample::PerByte(INTERESTING_8.len() as u32),
        identity: false,
        test_cases: Box::new(test_cases),
    }
}

/// Overwrites every word-aligned position with each interesting 16-bit
/// value, in both byte orders, skipping anything a simpler stage reaches.
pub fn interest16(example: &Arc<[u8]>) -> Stage {
    let data = Arc::clone(example);
    let test_cases = aligned_positions(data.len(), 2).flat_map(move |i| {
        let data = Arc::clone(&data);
        INTERESTING_16.into_iter().flat_map(move |value| {
            let orig = u16::from_le_bytes([data[i], data[i + 1]]);
            let mut out = Vec::with_capacity(2);
            let natural = value as u16;
            if !could_be_bitflip(u32::from(orig), u32::from(natural))
                && !could_be_arith(u32::from(orig), u32::from(natural), 2)
                && !could_be_interest(u32::from(orig), u32::from(natural), 2, false)
            {
                let mut buf = data.to_vec();
                buf[i..i + 2].copy_from_slice(&natural.to_le_bytes());
                out.push(buf);
            }
            let swapped = natural.swap_bytes();
            if swapped != natural
                && !could_be_bitflip(u32::from(orig), u32::from(swapped))
                && !could_be_arith(u32::from(orig), u32::from(swapped), 2)
                && !could_be_interest(u32::from(orig), u32::from(swapped), 2, true)
            {
                let mut buf = data.to_vec();
                buf[i..i + 2].copy_from_slice(&swapped.to_le_bytes());
                out.push(buf);
            }
            out
        })
    });
    Stage {
        name: Cow::Borrowed("interest 16/8"),
        test_cases_per_example: TestCasesPerExample::PerByte(INTERESTING_16.len() as u32),
        identity: false,
        test_cases: Box::new(test_cases),
    }
}

/// Overwrites every dword-aligned position with each interesting 32-bit
/// value, in both byte orders.
pub fn interest32(example: &Arc<[u8]>) -> Stage {
    let data = Arc::clone(example);
    let test_cases = aligned_positions(data.len(), 4).flat_map(move |i| {
        let data = Arc::clone(&data);
        INTERESTING_32.into_iter().flat_map(move |value| {
            let orig = u32::from_le_bytes(data[i..i + 4].try_into().expect("aligned window"));
            let mut out = Vec::with_capacity(2);
            let natural = value as u32;
            if !could_be_bitflip(orig, natural)
                && !could_be_arith(orig, natural, 4)
                && !could_be_interest(orig, natural, 4, false)
            {
                let mut buf = data.to_vec();
                buf[i..i + 4].copy_from_slice(&natural.to_le_bytes());
                out.push(buf);
            }
            let swapped = natural.swap_bytes();
            if swapped != natural
                && !could_be_bitflip(orig, swapped)
                && !could_be_arith(orig, swapped, 4)
                && !could_be_interest(orig, swapped, 4, true)
            {
                let mut buf = data.to_vec();
                buf[i..i + 4].copy_from_slice(&swapped.to_le_bytes());
                out.push(buf);
            }
            out
        })
    });
    Stage {
        name: Cow::Borrowed("interest 32/8"),
        test_cases_per_example: TestCasesPerExample::PerByte(INTERESTING_32.len() as u32),
        identity: false,
        test_cases: Box::new(test_cases),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn interest8_on_zero_keeps_only_flip_unreachable_values() {
        let produced: BTreeSet<u8> = interest8(&Arc::from(&[0u8][..]))
            .test_cases
            .map(|case| case[0])
            .collect();
        // -128, -1, 1, 16, 32 and 64 are single-run flips of zero; 0 is the
        // identity; 100 and 127 survive
        assert_eq!(produced, BTreeSet::from([100, 127]));
    }

    #[test]
    fn interest8_never_replays_the_original_byte() {
        for orig in [0u8, 1, 16, 100, 0xFF] {
            assert!(
                interest8(&Arc::from(&[orig][..]))
                    .test_cases
                    .all(|case| case[0] != orig)
            );
        }
    }

    #[test]
    fn interest16_emits_byte_swapped_forms() {
        let produced: BTreeSet<u16> = interest16(&Arc::from(&[0x77u8, 0x77][..]))
            .test_cases
            .map(|case| u16::from_le_bytes([case[0], case[1]]))
            .collect();
        // 1000 is 0x03E8; the swapped store 0xE803 comes from this stage too
        assert!(produced.contains(&0x03E8));
        assert!(produced.contains(&0xE803));
    }

    #[test]
    fn interest_stages_respect_alignment() {
        let produced: Vec<_> = interest16(&Arc::from(&[0x77u8, 0x77, 0x77][..]))
            .test_cases
            .collect();
        // only position 0 fits; byte 2 is never touched
        assert!(produced.iter().all(|case| case[2] == 0x77));
    }
}
