//! Reachability predicates used to skip mutations an earlier stage already
//! produced. Ties always go to the earlier, simpler stage, so arith skips
//! anything a flip can reach and interest skips anything a flip or arith can
//! reach.

use super::arith::ARITH_MAX;
use super::interest::{INTERESTING_8, INTERESTING_16, INTERESTING_32};

/// Whether `new` is reachable from `old` by one bit-run flip (width 1, 2 or
/// 4 at any bit offset) or one byte-run flip (width 1, 2 or 4 at a byte
/// boundary). The identity is not considered a flip.
pub fn could_be_bitflip(old: u32, new: u32) -> bool {
    let xor = old ^ new;
    if xor == 0 {
        return false;
    }
    let sh = xor.trailing_zeros();
    let run = xor >> sh;
    if run == 1 || run == 3 || run == 15 {
        return true;
    }
    // whole-byte runs only line up with the byte-flip stages on byte
    // boundaries
    if sh % 8 != 0 {
        return false;
    }
    run == 0xff || run == 0xffff || run == 0xffff_ffff
}

/// Whether `new` is reachable from `old` by adding or subtracting some
/// δ ∈ [1, ARITH_MAX] to a byte, word or dword inside a `width`-byte value,
/// in either byte order. Values that do not fit `width` bytes are never
/// arith-reachable.
pub fn could_be_arith(old: u32, new: u32, width: u32) -> bool {
    if old == new {
        return true;
    }
    if width < 4 {
        let limit = 1u64 << (8 * width);
        if u64::from(old) >= limit || u64::from(new) >= limit {
            return false;
        }
    }

    let (mut diffs, mut ov, mut nv) = (0u32, 0u8, 0u8);
    for i in 0..width {
        let a = (old >> (8 * i)) as u8;
        let b = (new >> (8 * i)) as u8;
        if a != b {
            diffs += 1;
            ov = a;
            nv = b;
        }
    }
    if diffs == 1
        && (u32::from(ov.wrapping_sub(nv)) <= ARITH_MAX || u32::from(nv.wrapping_sub(ov)) <= ARITH_MAX)
    {
        return true;
    }
    if width == 1 {
        return false;
    }

    let (mut diffs, mut ov, mut nv) = (0u32, 0u16, 0u16);
    for i in 0..width / 2 {
        let a = (old >> (16 * i)) as u16;
        let b = (new >> (16 * i)) as u16;
        if a != b {
            diffs += 1;
            ov = a;
            nv = b;
        }
    }
    if diffs == 1 {
        if u32::from(ov.wrapping_sub(nv)) <= ARITH_MAX || u32::from(nv.wrapping_sub(ov)) <= ARITH_MAX {
            return true;
        }
        let (ov, nv) = (ov.swap_bytes(), nv.swap_bytes());
        if u32::from(ov.wrapping_sub(nv)) <= ARITH_MAX || u32::from(nv.wrapping_sub(ov)) <= ARITH_MAX {
            return true;
        }
    }

    if width == 4 {
        if old.wrapping_sub(new) <= ARITH_MAX || new.wrapping_sub(old) <= ARITH_MAX {
            return true;
        }
        let (old, new) = (old.swap_bytes(), new.swap_bytes());
        if old.wrapping_sub(new) <= ARITH_MAX || new.wrapping_sub(old) <= ARITH_MAX {
            return true;
        }
    }
    false
}

/// Whether `new` is reachable from `old` by overwriting part of a
/// `width`-byte value with an interesting value of equal or smaller width.
/// `check_le` additionally admits full-width little-endian overwrites; the
/// caller passes false when those are the very candidates being generated.
pub fn could_be_interest(old: u32, new: u32, width: u32, check_le: bool) -> bool {
    if old == new {
        return true;
    }

    for i in 0..width {
        for &v in &INTERESTING_8 {
            let patched = (old & !(0xffu32 << (8 * i))) | (u32::from(v as u8) << (8 * i));
            if new == patched {
                return true;
            }
        }
    }

    if width == 2 && !check_le {
        return false;
    }

    for i in 0..width.saturating_sub(1) {
        for &v in &INTERESTING_16 {
            let patched = (old & !(0xffffu32 << (8 * i))) | (u32::from(v as u16) << (8 * i));
            if new == patched {
                return true;
            }
            if width > 2 {
                let swapped = (old & !(0xffffu32 << (8 * i)))
                    | (u32::from((v as u16).swap_bytes()) << (8 * i));
                if new == swapped {
                    return true;
                }
            }
        }
    }

    if width == 4 && check_le {
        for &v in &INTERESTING_32 {
            if new == v as u32 {
                return true;
            }
        }
    }
    false
}
