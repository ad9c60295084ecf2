use arbitrary::Arbitrary;

/// One step of a fuzzed map workload, shared by every tree target.
#[derive(Arbitrary, Debug)]
pub enum MapAction {
    Insert { key: u64, value: u64 },
    Remove { key: u64 },
    Replace { key: u64, value: u64 },
    Get { key: u64 },
    Iterate,
}

/// Asserts that the in-order key walk is strictly increasing.
pub fn assert_sorted(keys: &[u64]) {
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
}
