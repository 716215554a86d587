mod bridge;
mod pdfium_document;
mod pdfium_library;

pub use pdfium_document::{PdfiumDocument, PdfiumForm, PdfiumPage};
pub use pdfium_library::{BindError, PdfiumAvailability, PdfiumLibrary};
