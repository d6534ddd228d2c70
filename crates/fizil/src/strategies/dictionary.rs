//! Dictionary token stages: overwrite every fitting offset with each token,
//! then insert each token at every offset.

use std::{borrow::Cow, sync::Arc};

use super::{Stage, TestCasesPerExample};
use crate::dictionary::Dictionary;

pub(super) fn owned_tokens(dictionary: &Dictionary) -> Arc<[Vec<u8>]> {
    dictionary
        .tokens()
        .iter()
        .filter(|token| !token.is_empty())
        .cloned()
        .collect()
}

pub fn overwrite(tokens: Arc<[Vec<u8>]>, example: &Arc<[u8]>) -> Stage {
    let data = Arc::clone(example);
    let token_count = tokens.len() as u32;
    let test_cases = (0..tokens.len()).flat_map(move |t| {
        let data = Arc::clone(&data);
        let tokens = Arc::clone(&tokens);
        let token_len = tokens[t].len();
        (0..(data.len() + 1).saturating_sub(token_len)).filter_map(move |i| {
            let token = &tokens[t];
            // overwriting with what is already there is a no-op
            if data[i..i + token_len] == token[..] {
                return None;
            }
            let mut buf = data.to_vec();
            buf[i..i + token_len].copy_from_slice(token);
            Some(buf)
        })
    });
    Stage {
        name: Cow::Borrowed("user extras (over)"),
        test_cases_per_example: TestCasesPerExample::PerByte(token_count),
        identity: false,
        test_cases: Box::new(test_cases),
    }
}

pub fn insert(tokens: Arc<[Vec<u8>]>, example: &Arc<[u8]>) -> Stage {
    let data = Arc::clone(example);
    let token_count = tokens.len() as u32;
    let test_cases = (0..tokens.len()).flat_map(move |t| {
        let data = Arc::clone(&data);
        let tokens = Arc::clone(&tokens);
        (0..=data.len()).map(move |i| {
            let token = &tokens[t];
            let mut buf = Vec::with_capacity(data.len() + token.len());
            buf.extend_from_slice(&data[..i]);
            buf.extend_from_slice(token);
            buf.extend_from_slice(&data[i..]);
            buf
        })
    });
    Stage {
        name: Cow::Borrowed("user extras (insert)"),
        test_cases_per_example: TestCasesPerExample::PerByte(token_count),
        identity: false,
        test_cases: Box::new(test_cases),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&[u8]]) -> Arc<[Vec<u8>]> {
        raw.iter().map(|t| t.to_vec()).collect()
    }

    #[test]
    fn overwrite_walks_every_fitting_offset() {
        let produced: Vec<_> = overwrite(tokens(&[&b"XY"[..]]), &Arc::from(&b"abcd"[..]))
            .test_cases
            .collect();
        assert_eq!(
            produced,
            vec![b"XYcd".to_vec(), b"aXYd".to_vec(), b"abXY".to_vec()]
        );
    }

    #[test]
    fn overwrite_skips_an_existing_match() {
        let produced: Vec<_> = overwrite(tokens(&[&b"XY"[..]]), &Arc::from(&b"XYcd"[..]))
            .test_cases
            .collect();
        assert_eq!(produced, vec![b"XXYd".to_vec(), b"XYXY".to_vec()]);
    }

    #[test]
    fn insert_includes_both_ends() {
        let produced: Vec<_> = insert(tokens(&[&b"T"[..]]), &Arc::from(&b"ab"[..]))
            .test_cases
            .collect();
        assert_eq!(
            produced,
            vec![b"Tab".to_vec(), b"aTb".to_vec(), b"abT".to_vec()]
        );
    }

    #[test]
    fn oversized_tokens_never_overwrite_but_still_insert() {
        let long = tokens(&[&b"LONGTOKEN"[..]]);
        assert_eq!(overwrite(Arc::clone(&long), &Arc::from(&b"ab"[..])).test_cases.count(), 0);
        assert_eq!(insert(long, &Arc::from(&b"ab"[..])).test_cases.count(), 3);
    }
}
