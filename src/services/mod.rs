pub mod algorithms;
pub mod engine;
pub mod notifier;
pub mod publishers;

pub use engine::{EngineSettings, RecommendationEngine};
pub use notifier::{EventNotifier, NotifierHandle};
