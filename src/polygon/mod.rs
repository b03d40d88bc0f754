pub mod polygon;
pub mod sector;
