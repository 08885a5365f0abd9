pub mod csv;
pub mod generic;
pub mod json;
pub mod md;
pub mod pdf;
pub mod txt;

pub use csv::CsvFile;
pub use generic::GenericFile;
pub use json::JsonFile;
pub use md::MdFile;
pub use pdf::PdfFile;
pub use txt::TxtFile;
