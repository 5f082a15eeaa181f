//! Peripheral drivers: thermocouple digitiser, heater PWM and the periodic
//! tick source behind the time-event clocks.

pub mod heater;
pub mod hw_timer;
pub mod max31855;

pub use heater::PwmHeater;
pub use hw_timer::ThreadTicker;
pub use max31855::Max31855;
