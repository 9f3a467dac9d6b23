//! Configuración del núcleo

pub mod settings;

pub use settings::Settings;
