pub mod fields;
pub mod logbook;

pub use fields::{FormFields, field_key};
pub use logbook::Logbook;
