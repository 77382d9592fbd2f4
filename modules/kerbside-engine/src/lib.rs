pub mod error;
pub mod extract;
pub mod poller;
pub mod resolve;
pub mod traits;
pub mod workflow;

pub use error::{Result, WorkflowError};
pub use extract::{ExtractError, ExtractedFrame, FfmpegExtractor};
pub use poller::PollPolicy;
pub use traits::{FrameSource, VideoUnderstanding};
pub use workflow::{SearchWorkflow, VehicleQuery, WorkflowOutput};
