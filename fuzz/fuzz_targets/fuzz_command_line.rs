//! Fuzz target: console command parser
//!
//! Feeds arbitrary text to `commands::parse` and checks that it never
//! panics and that every accepted `set` carries finite, non-negative
//! values within the token budget.
//!
//! cargo fuzz run fuzz_command_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use reflow::app::commands::{self, Command, MAX_TOKENS};

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    match commands::parse(line) {
        Ok(Command::Set(updates)) => {
            assert!(!updates.is_empty());
            assert!(updates.len() * 2 < MAX_TOKENS);
            for (_, value) in &updates {
                assert!(value.is_finite() && *value >= 0.0);
            }
        }
        Ok(_) | Err(_) => {}
    }
});
