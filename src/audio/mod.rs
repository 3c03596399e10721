pub mod decode;
pub mod mel;
pub mod resample;
pub mod spectrum;
