pub mod feed;
pub mod record;

pub use feed::RawFeedResponse;
pub use record::{IdentityKey, Record, KEY_SEPARATOR};
