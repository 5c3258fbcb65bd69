pub mod associate;
pub mod boxes;
pub mod events;

pub use associate::{Associator, FrameAggregate, FrameOutcome, MatchedPerson};
pub use boxes::{BoundingBox, ClassedBox, FallClass, PersonBox};
pub use events::{fall_warning, EventDetector, FallEvent};
