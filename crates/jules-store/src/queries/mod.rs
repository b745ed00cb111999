pub mod entries;
pub mod records;
pub mod sessions;
