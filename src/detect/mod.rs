mod backend;
mod backends;
mod registry;
mod result;

pub use backend::Detector;
pub use backends::{MotionDetector, StubDetector};
pub use registry::{BackendFactory, BackendRegistry};
pub use result::Detection;
