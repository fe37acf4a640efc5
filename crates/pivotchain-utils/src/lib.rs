//! Small helpers that sit beside the pivotchain core: calendar arithmetic,
//! directory listing and an embedded relational store. None touches a Dataset.

pub mod calendar;
pub mod listing;
pub mod store;

pub use calendar::week_of_month;
pub use listing::{list_files, print_files};
pub use store::{Store, StoreError, StoredRow};
