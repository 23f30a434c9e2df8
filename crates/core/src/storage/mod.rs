pub mod encryption;
pub mod vault;
