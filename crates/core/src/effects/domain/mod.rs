pub mod label;
pub mod region_effect;
