pub mod diagnostics;
pub mod status_bar;
pub mod tree;
