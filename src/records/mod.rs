pub mod store;
pub mod types;

pub use store::{append_record, load_records, save_records, RecordSource};
pub use types::{InputValue, Record};
