pub mod catalog;
pub mod detection;
pub mod detector;
pub mod resources;
pub mod scanner;
pub mod yolo;
