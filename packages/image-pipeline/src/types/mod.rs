//! Domain types shared by every pipeline stage.

pub mod batch;
pub mod image;

pub use batch::{BatchStatus, BatchUrlState};
pub use image::{ImageRecord, UNKNOWN};
