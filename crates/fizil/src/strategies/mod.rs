//! Mutation strategies.
//!
//! Each strategy is a pure function from one example buffer to a [`Stage`]: a
//! named, finite, single-pass sequence of mutated buffers. Strategies hold no
//! state; for a given input the produced sequence is identical across runs.

use std::{borrow::Cow, sync::Arc};

use derive_more::Debug;

pub mod arith;
pub mod bit_flip;
pub mod byte_flip;
pub mod dictionary;
pub mod interest;
pub mod pruning;

use crate::dictionary::Dictionary;

/// Rough per-stage output volume, used only to estimate the run's total test
/// count for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCasesPerExample {
    PerByte(u32),
    PerExample(u32),
}

impl TestCasesPerExample {
    pub fn expected(self, example_len: usize) -> u64 {
        match self {
            Self::PerByte(n) => n as u64 * example_len as u64,
            Self::PerExample(n) => n as u64,
        }
    }
}

/// One mutation strategy applied to one example.
#[derive(Debug)]
pub struct Stage {
    pub name: Cow<'static, str>,
    pub test_cases_per_example: TestCasesPerExample,
    /// True only for the stage that replays the example unchanged.
    pub identity: bool,
    /// Lazy and single-pass; pulling a case is the only way to advance.
    #[debug(skip)]
    pub test_cases: Box<dyn Iterator<Item = Vec<u8>> + Send>,
}

/// Replays the example verbatim. One case; establishes baseline coverage.
pub fn use_original(example: &Arc<[u8]>) -> Stage {
    let data = Arc::clone(example);
    Stage {
        name: Cow::Borrowed("use original"),
        test_cases_per_example: TestCasesPerExample::PerExample(1),
        identity: true,
        test_cases: Box::new(std::iter::once_with(move || data.to_vec())),
    }
}

pub(crate) type StrategyFn = Box<dyn Fn(&Arc<[u8]>) -> Stage + Send + Sync>;

/// All strategies in pipeline order.
pub(crate) fn catalog(dictionary: &Dictionary) -> Vec<StrategyFn> {
    let mut strategies: Vec<StrategyFn> = vec![
        Box::new(use_original),
        Box::new(|ex| bit_flip::bit_flip(1, ex)),
        Box::new(|ex| bit_flip::bit_flip(2, ex)),
        Box::new(|ex| bit_flip::bit_flip(4, ex)),
        Box::new(|ex| byte_flip::byte_flip(1, ex)),
        Box::new(|ex| byte_flip::byte_flip(2, ex)),
        Box::new(|ex| byte_flip::byte_flip(4, ex)),
        Box::new(arith::arith8),
        Box::new(arith::arith16),
        Box::new(arith::arith32),
        Box::new(interest::interest8),
        Box::new(interest::interest16),
        Box::new(interest::interest32),
    ];
    if !dictionary.is_empty() {
        let tokens = dictionary::owned_tokens(dictionary);
        let overwrite_tokens = Arc::clone(&tokens);
        strategies.push(Box::new(move |ex| {
            dictionary::overwrite(Arc::clone(&overwrite_tokens), ex)
        }));
        strategies.push(Box::new(move |ex| {
            dictionary::insert(Arc::clone(&tokens), ex)
        }));
    }
    strategies
}
