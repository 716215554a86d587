use log::{debug, warn};
use pdfium_render::prelude::*;
use thiserror::Error;

use pdftest::clock::Clock;
use pdftest::library::{
    DataAvailability, DataStatus, DownloadHints, FileAccess, FormStatus, Library, Linearization,
    LoadError, UnsupportedHandler,
};

use crate::bridge::{self, FileAvail, FileReader, HintsBridge};
use crate::pdfium_document::PdfiumDocument;

#[derive(Debug, Error)]
#[error("Failed to load pdfium: {0}")]
pub struct BindError(#[from] PdfiumError);

pub struct PdfiumLibrary {
    pdfium: Pdfium,
}

impl PdfiumLibrary {
    /// Binds pdfium from the working directory, falling back to the system
    /// library.
    #[cfg(not(feature = "static"))]
    pub fn bind() -> Result<Self, BindError> {
        let bindings =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())?;
        Ok(Self::with_pdfium(Pdfium::new(bindings)))
    }

    #[cfg(feature = "static")]
    pub fn bind() -> Result<Self, BindError> {
        let bindings = Pdfium::bind_to_statically_linked_library()?;
        Ok(Self::with_pdfium(Pdfium::new(bindings)))
    }

    pub fn with_pdfium(pdfium: Pdfium) -> Self {
        PdfiumLibrary { pdfium }
    }

    fn bindings(&self) -> &dyn PdfiumLibraryBindings {
        self.pdfium.bindings()
    }

    fn opened<'a>(
        &'a self,
        handle: FPDF_DOCUMENT,
        reader: Option<Box<FileReader<'a>>>,
    ) -> Result<PdfiumDocument<'a>, LoadError> {
        let bindings = self.bindings();
        if handle.is_null() {
            let code = bindings.FPDF_GetLastError() as u64;
            debug!("pdfium load failed with code {}", code);
            return Err(LoadError::from_code(code).unwrap_or(LoadError::Unknown));
        }
        let document = PdfiumDocument::new(bindings, handle, reader);
        debug!("opened document with {} pages", bindings.FPDF_GetPageCount(handle));
        Ok(document)
    }
}

impl Library for PdfiumLibrary {
    type Document<'a> = PdfiumDocument<'a>;
    type Availability<'a> = PdfiumAvailability<'a>;

    #[cfg(feature = "static")]
    const CAPABILITIES: &'static [&'static str] = &["STATIC"];
    #[cfg(not(feature = "static"))]
    const CAPABILITIES: &'static [&'static str] = &["DYNAMIC"];

    fn set_clock(&self, clock: Clock) {
        // pdfium-render does not bind FSDK_SetTimeFunction
        if clock.is_fixed() {
            warn!("pdfium keeps the system clock, ignoring {:?}", clock);
        }
    }

    fn set_unsupported_handler(&self, _handler: UnsupportedHandler) {
        // pdfium-render does not bind FSDK_SetUnSpObjProcessHandler
        debug!("unsupported feature notifications are not available");
    }

    fn load_mem_document<'a>(
        &'a self,
        data: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<PdfiumDocument<'a>, LoadError> {
        let handle = self.bindings().FPDF_LoadMemDocument(data, password);
        self.opened(handle, None)
    }

    fn load_custom_document<'a>(
        &'a self,
        access: FileAccess<'a>,
        password: Option<&'a str>,
    ) -> Result<PdfiumDocument<'a>, LoadError> {
        let mut reader = FileReader::new(access);
        let handle = self.bindings().FPDF_LoadCustomDocument(reader.raw(), password);
        self.opened(handle, Some(reader))
    }

    fn create_availability<'a>(&'a self, access: FileAccess<'a>) -> PdfiumAvailability<'a> {
        let bindings = self.bindings();
        let mut file = FileAvail::new(access.clone());
        let mut reader = FileReader::new(access);
        let handle = bindings.FPDFAvail_Create(file.raw(), reader.raw());
        if handle.is_null() {
            warn!("FPDFAvail_Create failed");
        }
        PdfiumAvailability {
            bindings,
            handle,
            _file: file,
            _reader: reader,
        }
    }

    fn availability_document<'a>(
        &'a self,
        avail: &mut PdfiumAvailability<'a>,
        password: Option<&'a str>,
    ) -> Result<PdfiumDocument<'a>, LoadError> {
        if avail.handle.is_null() {
            return Err(LoadError::Unknown);
        }
        let handle = self.bindings().FPDFAvail_GetDocument(avail.handle, password);
        // the document keeps reading through the availability's file access
        self.opened(handle, None)
    }
}

/// Availability of a file fed to pdfium through [`FileAccess`].
///
/// Documents opened from it keep reading through its file access, so it has
/// to outlive them.
pub struct PdfiumAvailability<'a> {
    bindings: &'a dyn PdfiumLibraryBindings,
    handle: FPDF_AVAIL,
    _file: Box<FileAvail<'a>>,
    _reader: Box<FileReader<'a>>,
}

impl PdfiumAvailability<'_> {
    fn check(
        &mut self,
        hints: &mut dyn DownloadHints,
        ask: impl FnOnce(&dyn PdfiumLibraryBindings, FPDF_AVAIL, *mut FX_DOWNLOADHINTS) -> i32,
    ) -> Option<i32> {
        if self.handle.is_null() {
            return None;
        }
        let mut bridge = HintsBridge::new(hints);
        Some(ask(self.bindings, self.handle, bridge.raw()))
    }
}

impl DataAvailability for PdfiumAvailability<'_> {
    fn is_linearized(&mut self) -> Linearization {
        if self.handle.is_null() {
            return Linearization::Unknown;
        }
        bridge::linearization(self.bindings.FPDFAvail_IsLinearized(self.handle))
    }

    fn is_doc_avail(&mut self, hints: &mut dyn DownloadHints) -> DataStatus {
        self.check(hints, |bindings, avail, hints| {
            bindings.FPDFAvail_IsDocAvail(avail, hints)
        })
        .map_or(DataStatus::Error, bridge::data_status)
    }

    fn is_form_avail(&mut self, hints: &mut dyn DownloadHints) -> FormStatus {
        self.check(hints, |bindings, avail, hints| {
            bindings.FPDFAvail_IsFormAvail(avail, hints)
        })
        .map_or(FormStatus::Error, bridge::form_status)
    }

    fn is_page_avail(&mut self, index: usize, hints: &mut dyn DownloadHints) -> DataStatus {
        let Ok(page_index) = i32::try_from(index) else {
            return DataStatus::Error;
        };
        self.check(hints, |bindings, avail, hints| {
            bindings.FPDFAvail_IsPageAvail(avail, page_index, hints)
        })
        .map_or(DataStatus::Error, bridge::data_status)
    }
}

impl Drop for PdfiumAvailability<'_> {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            self.bindings.FPDFAvail_Destroy(self.handle);
        }
    }
}
