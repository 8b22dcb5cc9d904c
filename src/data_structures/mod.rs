pub mod bucket_queue;

pub use bucket_queue::{BucketQueue, QueueLinks};
