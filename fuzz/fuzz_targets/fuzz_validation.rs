//! Fuzz testing for validation functions.
//!
//! Feeds arbitrary bytes to the request validators and checks that they
//! never panic, whatever the input.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the validation fuzz target
//! cargo +nightly fuzz run fuzz_validation
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `validate_product`: Create/update payloads parsed from the input as JSON
//! - `parse_pagination`: `page` and `limit` query strings
//! - `validate_search_term`: The `name` search parameter

#![no_main]

use libfuzzer_sys::fuzz_target;
use product_catalog::validation::{parse_pagination, validate_product, validate_search_term};

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = serde_json::from_slice::<serde_json::Value>(data) {
        if let Ok(input) = validate_product(&payload) {
            assert!(!input.name.trim().is_empty());
            assert!(!input.price.is_sign_negative() || input.price.is_zero());
        }
    }

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = validate_search_term(Some(s));

        // Split on the first '&' to get two independent query values
        let (page, limit) = s.split_once('&').unwrap_or((s, ""));
        if let Ok(pagination) = parse_pagination(Some(page), Some(limit), 2, 100) {
            assert!(pagination.page >= 1);
            assert!((1..=100).contains(&pagination.limit));
            let _ = pagination.offset();
        }
    }
});
