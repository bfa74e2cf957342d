pub mod ocr;
pub mod parser;
pub mod render;
pub mod runtime;
pub mod words;
