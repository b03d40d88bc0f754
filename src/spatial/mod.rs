pub mod kd_tree;
pub mod proximity;
