pub mod laser;
