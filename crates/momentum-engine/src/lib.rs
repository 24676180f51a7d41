pub mod enrich;
pub mod fallback;
pub mod features;
pub mod rank;
pub mod scorer;
pub mod universe;

pub use fallback::PickEngine;
