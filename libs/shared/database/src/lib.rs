pub mod batch;
pub mod http;
pub mod memory;
pub mod store;

pub use batch::in_batches;
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use store::{Condition, Query, RecordStore, StoreError};
