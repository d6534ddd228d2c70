use std::{borrow::Cow, sync::Arc};

use super::{Stage, TestCasesPerExample};

/// Inverts the byte run [i, i+width) for every byte offset i.
pub fn byte_flip(width: usize, example: &Arc<[u8]>) -> Stage {
    let data = Arc::clone(example);
    let starts = (data.len() + 1).saturating_sub(width);
    let test_cases = (0..starts).map(move |start| {
        let mut out = data.to_vec();
        for byte in &mut out[start..start + width] {
            *byte = !*byte;
        }
        out
    });
    Stage {
        name: Cow::Owned(format!("bitflip {}/8", width * 8)),
        test_cases_per_example: TestCasesPerExample::PerByte(1),
        identity: false,
        test_cases: Box::new(test_cases),
    }
}
