// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Formal Verification Module (Kani Proofs)
//!
//! Proofs cover the integer packing behind unique ids. They stay
//! CBMC-tractable: no maps, strings or loops, only `kani::any()` integers.

#[allow(unused_variables)]
#[cfg(kani)]
mod verification {
    use crate::codec::sequence::{compose, mask};
    use crate::engine_core::constants::sequence::{
        DEFAULT_NODE_BITS, DEFAULT_STEP_BITS, DEFAULT_TIME_BITS,
    };

    // =========================================================================
    // PROOF 1: IDS ARE NON-NEGATIVE
    // =========================================================================
    #[kani::proof]
    fn prove_ids_non_negative() {
        let elapsed: i64 = kani::any();
        let node: u64 = kani::any();
        let step: u64 = kani::any();
        let id = compose(elapsed, node, step, DEFAULT_TIME_BITS, DEFAULT_NODE_BITS, DEFAULT_STEP_BITS);
        kani::assert(id >= 0, "CRITICAL: packed id must fit a positive i64");
    }

    // =========================================================================
    // PROOF 2: FIELDS DO NOT BLEED INTO EACH OTHER
    // =========================================================================
    #[kani::proof]
    fn prove_fields_round_trip() {
        let elapsed: i64 = kani::any();
        let node: u64 = kani::any();
        let step: u64 = kani::any();
        kani::assume(elapsed >= 0 && (elapsed as u64) <= mask(DEFAULT_TIME_BITS));
        kani::assume(node <= mask(DEFAULT_NODE_BITS));
        kani::assume(step <= mask(DEFAULT_STEP_BITS));

        let raw = compose(elapsed, node, step, DEFAULT_TIME_BITS, DEFAULT_NODE_BITS, DEFAULT_STEP_BITS) as u64;
        kani::assert(raw & mask(DEFAULT_STEP_BITS) == step, "step must survive packing");
        kani::assert(
            (raw >> DEFAULT_STEP_BITS) & mask(DEFAULT_NODE_BITS) == node,
            "node must survive packing",
        );
        kani::assert(
            (raw >> (DEFAULT_STEP_BITS + DEFAULT_NODE_BITS)) as i64 == elapsed,
            "elapsed time must survive packing",
        );
    }

    // =========================================================================
    // PROOF 3: LATER TIME, LARGER ID
    // =========================================================================
    #[kani::proof]
    fn prove_time_dominates_ordering() {
        let a: i64 = kani::any();
        let b: i64 = kani::any();
        let node: u64 = kani::any();
        let step_a: u64 = kani::any();
        let step_b: u64 = kani::any();
        kani::assume(a >= 0 && b > a && (b as u64) <= mask(DEFAULT_TIME_BITS));

        let id_a = compose(a, node, step_a, DEFAULT_TIME_BITS, DEFAULT_NODE_BITS, DEFAULT_STEP_BITS);
        let id_b = compose(b, node, step_b, DEFAULT_TIME_BITS, DEFAULT_NODE_BITS, DEFAULT_STEP_BITS);
        kani::assert(id_b > id_a, "CRITICAL: a later tick must always sort after");
    }

    // =========================================================================
    // PROOF 4: NEGATIVE ELAPSED TIME CLAMPS TO ZERO
    // =========================================================================
    #[kani::proof]
    fn prove_clock_regression_clamps() {
        let elapsed: i64 = kani::any();
        kani::assume(elapsed < 0);
        let id = compose(elapsed, 0, 0, DEFAULT_TIME_BITS, DEFAULT_NODE_BITS, DEFAULT_STEP_BITS);
        kani::assert(id == 0, "Pre-epoch clock reads must not wrap around");
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::sequence::{compose, mask};

    #[test]
    fn test_compose_masks_oversized_parts() {
        let id = compose(1, u64::MAX, u64::MAX, 42, 7, 14);
        assert_eq!(id as u64 >> 21, 1);
        assert_eq!((id as u64 >> 14) & mask(7), mask(7));
        assert_eq!(id as u64 & mask(14), mask(14));
    }

    #[test]
    fn test_compose_clamps_negative_time() {
        assert_eq!(compose(-5, 0, 0, 42, 7, 14), 0);
    }

    #[test]
    fn test_time_dominates_ordering() {
        let earlier = compose(10, 127, mask(14), 42, 7, 14);
        let later = compose(11, 0, 0, 42, 7, 14);
        assert!(later > earlier);
    }
}
