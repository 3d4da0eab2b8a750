//! Property tests for the shared precision-pairing and ceiling-arithmetic
//! helpers every synthesiser builds on.

use kernelforge_core::{ceil_div, ceil_to_multiple, Precision};
use proptest::prelude::*;

fn precision_strategy() -> impl Strategy<Value = Precision> {
    prop_oneof![
        Just(Precision::FP32),
        Just(Precision::FP16),
        Just(Precision::BF16),
    ]
}

proptest! {
    #[test]
    fn legal_pair_matches_definition(memory in precision_strategy(), register in precision_strategy()) {
        let expected = register == memory || register == Precision::FP32;
        prop_assert_eq!(Precision::legal_pair(memory, register), expected);
    }

    #[test]
    fn ceil_div_never_undercounts(dividend in 1u32..10_000, divisor in 1u32..1_000) {
        let q = ceil_div(dividend, divisor);
        prop_assert!(q * divisor >= dividend);
        prop_assert!((q - 1) * divisor < dividend);
    }

    #[test]
    fn ceil_to_multiple_is_ceil_div_times_multiple(value in 0u32..10_000, multiple in 1u32..1_000) {
        prop_assert_eq!(ceil_to_multiple(value, multiple), ceil_div(value, multiple) * multiple);
    }
}
