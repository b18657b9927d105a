// Module exports for models

pub mod policy;
pub mod settings;
