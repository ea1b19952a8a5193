pub mod binding;
pub mod dispatcher;
pub mod object;
pub mod resources;
pub mod roots;
pub mod trace;
