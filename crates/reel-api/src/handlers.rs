//! Request handlers.

pub mod events;
pub mod health;
pub mod runs;
pub mod settings;

pub use events::*;
pub use health::*;
pub use runs::*;
pub use settings::*;
