mod models;

pub use models::{ImageData, Record, RecordImage};
