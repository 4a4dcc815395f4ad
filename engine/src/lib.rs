//! Frame-shaped input and the cooperative loop that consumes it.
//!
//! The landmark contract lives in [`landmark`], the detector capability in
//! [`source`], and the render/timer loop in [`scheduler`].

pub mod landmark;
pub mod profiling;
pub mod scheduler;
pub mod source;

pub use landmark::{Delivery, Landmark, LandmarkFrame, Point2};
pub use profiling::{Profiler, TaskTimings};
pub use scheduler::{Fired, Scheduler, TaskControl, TaskId};
pub use source::{FrameHandler, FrameSlot, LandmarkSource, ScriptedDelivery, ScriptedSource, SourceError};
