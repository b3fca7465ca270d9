pub mod drag;
pub mod keys;
pub mod logging;
pub mod settings;
