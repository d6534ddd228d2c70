//! Turns examples plus a dictionary into the run's single test-case stream.
//!
//! Strategies run in a fixed order; each is applied to every example in turn.
//! Nothing is materialized: downstream iteration pulls cases on demand, and
//! the stream is consumed exactly once.

use std::sync::Arc;

use crate::{
    dictionary::Dictionary,
    strategies,
    test_case::{Example, TestCase},
};

/// The global test-case stream: per strategy in fixed order, the stage
/// applied to every example.
pub fn test_cases(
    examples: Vec<Example>,
    dictionary: &Dictionary,
) -> impl Iterator<Item = TestCase> + Send + 'static {
    let catalog = strategies::catalog(dictionary);
    catalog.into_iter().flat_map(move |strategy| {
        let examples = examples.clone();
        examples.into_iter().flat_map(move |example| {
            let stage = strategy(&example.data);
            let stage_name: Arc<str> = Arc::from(stage.name.as_ref());
            let source_file = stage.identity.then(|| example.path.clone());
            let file_extension = example.file_extension;
            stage.test_cases.map(move |data| TestCase {
                data,
                file_extension: file_extension.clone(),
                source_file: source_file.clone(),
                stage: Arc::clone(&stage_name),
            })
        })
    })
}

/// Display estimate for the whole stream; stages report per-byte or
/// per-example volumes rather than exact counts.
pub fn expected_total(examples: &[Example], dictionary: &Dictionary) -> u64 {
    strategies::catalog(dictionary)
        .iter()
        .flat_map(|strategy| {
            examples.iter().map(move |example| {
                strategy(&example.data)
                    .test_cases_per_example
                    .expected(example.data.len())
            })
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn example(name: &str, data: &[u8]) -> Example {
        Example {
            path: PathBuf::from(name),
            data: Arc::from(data),
            file_extension: ".bin".into(),
        }
    }

    #[test]
    fn stream_opens_with_the_unmutated_examples() {
        let examples = vec![example("a.bin", b"aa"), example("b.bin", b"bb")];
        let stream: Vec<_> = test_cases(examples, &Dictionary::empty()).collect();

        assert_eq!(&stream[0].data, b"aa");
        assert_eq!(stream[0].source_file, Some(PathBuf::from("a.bin")));
        assert_eq!(&stream[1].data, b"bb");
        assert_eq!(stream[1].source_file, Some(PathBuf::from("b.bin")));
        // everything after the verbatim replays is a mutation
        assert!(stream[2..].iter().all(|case| case.source_file.is_none()));
    }

    #[test]
    fn strategy_major_ordering_across_examples() {
        let examples = vec![example("a.bin", b"a"), example("b.bin", b"b")];
        let stages: Vec<_> = test_cases(examples, &Dictionary::empty())
            .map(|case| case.stage)
            .collect();
        // each strategy finishes both examples before the next one starts,
        // so every stage name forms one contiguous block
        let mut finished: Vec<Arc<str>> = Vec::new();
        let mut current = stages[0].clone();
        for stage in &stages[1..] {
            if *stage != current {
                assert!(!finished.contains(stage), "stage {stage} came back after ending");
                finished.push(current);
                current = stage.clone();
            }
        }
    }

    #[test]
    fn every_case_names_its_stage_and_extension() {
        let examples = vec![example("seed.txt", b"xy")];
        for case in test_cases(examples, &Dictionary::new(vec![b"Z".to_vec()])) {
            assert!(!case.stage.is_empty());
            assert_eq!(case.file_extension, ".bin");
        }
    }

    #[test]
    fn expected_total_covers_every_stage() {
        let examples = vec![example("a.bin", b"abcd")];
        let total = expected_total(&examples, &Dictionary::empty());
        // at minimum: 1 verbatim case plus 8 per byte for bitflip 1/1
        assert!(total > 1 + 8 * 4);
    }
}
