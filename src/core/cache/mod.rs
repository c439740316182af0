mod store;

pub use store::{base_name, ChecksumCache};
