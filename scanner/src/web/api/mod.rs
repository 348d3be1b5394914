pub mod detect;
pub mod log;
