pub mod encoding;
pub mod validation;
