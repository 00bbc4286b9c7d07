pub mod hardening;
pub mod summary;
