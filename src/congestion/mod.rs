pub mod aggregate;
pub mod traffic;
