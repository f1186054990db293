pub mod constants;
pub mod palette;
pub mod units;
