mod batch;
mod completion_stream;
mod job;

pub use batch::{Batch, Example};
pub use completion_stream::CompletionStream;
pub use job::{Completion, Job};
