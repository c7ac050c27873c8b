//! # Revocation Quota Arithmetic
//!
//! The revocation cap of a plan is a percentage of its license count,
//! rounded up. Computed in integer arithmetic so that the result is exact
//! for every license count the model admits.

/// Number of revocations a plan with `num_licenses` licenses may perform.
///
/// `ceil(num_licenses * percentage / 100)`. Percentages above 100 are
/// clamped to 100.
pub fn revocations_allowed(num_licenses: u64, percentage: u8) -> u64 {
    let pct = u64::from(percentage.min(100));
    (num_licenses * pct).div_ceil(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rounds_up() {
        assert_eq!(revocations_allowed(10, 5), 1);
        assert_eq!(revocations_allowed(20, 5), 1);
        assert_eq!(revocations_allowed(21, 5), 2);
        assert_eq!(revocations_allowed(100, 5), 5);
    }

    #[test]
    fn zero_cases() {
        assert_eq!(revocations_allowed(0, 5), 0);
        assert_eq!(revocations_allowed(100, 0), 0);
    }

    #[test]
    fn full_percentage_allows_every_license() {
        assert_eq!(revocations_allowed(37, 100), 37);
        assert_eq!(revocations_allowed(37, 250), 37);
    }

    proptest! {
        #[test]
        fn never_exceeds_license_count(n in 0u64..=5000, p in 0u8..=100) {
            prop_assert!(revocations_allowed(n, p) <= n);
        }

        #[test]
        fn is_smallest_integer_covering_share(n in 0u64..=5000, p in 0u8..=100) {
            let allowed = revocations_allowed(n, p);
            prop_assert!(allowed * 100 >= n * u64::from(p));
            if allowed > 0 {
                prop_assert!((allowed - 1) * 100 < n * u64::from(p));
            }
        }

        #[test]
        fn monotone_in_license_count(n in 0u64..5000, p in 0u8..=100) {
            prop_assert!(revocations_allowed(n, p) <= revocations_allowed(n + 1, p));
        }
    }
}
