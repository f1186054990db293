pub mod deposition;
pub mod scan;
pub mod serialization;
pub mod spectrum;
