//! Fuzz target: MAX31855K frame decoding
//!
//! Any 32-bit frame either decodes to a fault or to temperatures inside
//! the converter's representable range.
//!
//! cargo fuzz run fuzz_thermocouple_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use reflow::drivers::max31855::Frame;

fuzz_target!(|raw: u32| {
    if let Ok(frame) = Frame::decode(raw) {
        let hj = frame.hot_junction_c();
        let cj = frame.cold_junction_c();
        assert!((-2048.0..2048.0).contains(&hj));
        assert!((-128.0..128.0).contains(&cj));
        assert_eq!(frame.raw(), raw);
    }
});
