//! Property-based checks for cache keys, request validation and backoff

mod common;

use common::strategies::{analysis_text_strategy, options_strategy};
use proptest::prelude::*;
use std::time::Duration;

use analysis_orchestrator::queue::BackoffPolicy;
use analysis_orchestrator::validation::DEFAULT_MAX_TEXT_LENGTH;
use analysis_orchestrator::{validate_request, AnalysisCache, AnalysisRequest, CacheKey};

proptest! {
    #[test]
    fn cache_key_is_stable_and_well_formed(text in analysis_text_strategy()) {
        let first = CacheKey::for_text(&text);
        let second = AnalysisCache::compute_key(&text);
        prop_assert_eq!(&first, &second);

        let digest = first.as_str().strip_prefix("analysis:").unwrap();
        prop_assert_eq!(digest.len(), 64);
        prop_assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn cache_key_ignores_options(
        text in analysis_text_strategy(),
        left in options_strategy(),
        right in options_strategy(),
    ) {
        let a = AnalysisRequest::new(text.clone(), left).unwrap();
        let b = AnalysisRequest::new(text, right).unwrap();
        prop_assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn distinct_texts_get_distinct_keys(
        a in analysis_text_strategy(),
        b in analysis_text_strategy(),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(CacheKey::for_text(&a), CacheKey::for_text(&b));
    }

    #[test]
    fn validation_respects_effective_limit(
        text in analysis_text_strategy(),
        options in options_strategy(),
    ) {
        let request = AnalysisRequest::new(text.clone(), options.clone()).unwrap();
        let limit = request.max_length().unwrap_or(DEFAULT_MAX_TEXT_LENGTH);
        let accepted = validate_request(&text, options, DEFAULT_MAX_TEXT_LENGTH).is_ok();
        prop_assert_eq!(accepted, request.char_len() <= limit);
    }

    #[test]
    fn backoff_delay_never_decreases(base_ms in 1u64..10_000, attempt in 1u32..40) {
        let policy = BackoffPolicy::exponential(Duration::from_millis(base_ms));
        prop_assert!(policy.delay_for_attempt(attempt) <= policy.delay_for_attempt(attempt + 1));
    }
}

#[test]
fn first_retry_waits_the_base_delay() {
    let policy = BackoffPolicy::exponential(Duration::from_millis(2000));
    assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
    assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
    assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
}
