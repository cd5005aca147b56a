pub mod control;
pub mod core;
pub mod io;
pub mod prelude;
pub mod runtime;
pub mod timeline;
