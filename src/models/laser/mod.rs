pub mod params;
pub mod sweep;
