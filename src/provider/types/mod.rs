//! Provider module types

pub mod generate;
pub mod models;

pub use generate::GenerateConfig;
pub use models::ModelDescriptor;
