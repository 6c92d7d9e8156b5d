pub mod atomic_file;
pub mod file_parsing;
pub mod math;
pub mod text;
