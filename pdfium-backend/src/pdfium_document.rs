use std::cell::Cell;
use std::os::raw::c_int;

use log::{debug, warn};
use pdfium_render::prelude::*;

use pdftest::bitmap::Bitmap;
use pdftest::library::{
    ColorScheme, Document, DocumentAction, FormFill, Page, PageAction, PageResolver, PauseControl,
    RenderArea, RenderStatus,
};
use pdftest::RenderFlags;

use crate::bridge::{self, FileReader, PauseBridge};

const FPDF_PAGEOBJ_IMAGE: c_int = 3;

const FPDF_FORMFIELD_UNKNOWN: c_int = 0;

const FPDFDOC_AACTION_WC: c_int = 0x10;
const FPDFPAGE_AACTION_OPEN: c_int = 0;
const FPDFPAGE_AACTION_CLOSE: c_int = 1;

pub struct PdfiumDocument<'a> {
    bindings: &'a dyn PdfiumLibraryBindings,
    handle: FPDF_DOCUMENT,
    // custom documents read through this until closed
    _reader: Option<Box<FileReader<'a>>>,
}

impl<'a> PdfiumDocument<'a> {
    pub(crate) fn new(
        bindings: &'a dyn PdfiumLibraryBindings,
        handle: FPDF_DOCUMENT,
        reader: Option<Box<FileReader<'a>>>,
    ) -> Self {
        PdfiumDocument {
            bindings,
            handle,
            _reader: reader,
        }
    }
}

impl<'a> Document for PdfiumDocument<'a> {
    type Page = PdfiumPage<'a>;
    type Form = PdfiumForm<'a>;

    fn page_count(&self) -> usize {
        usize::try_from(self.bindings.FPDF_GetPageCount(self.handle)).unwrap_or(0)
    }

    fn load_page(&self, index: usize) -> Option<PdfiumPage<'a>> {
        let page_index = c_int::try_from(index).ok()?;
        let handle = self.bindings.FPDF_LoadPage(self.handle, page_index);
        if handle.is_null() {
            debug!("page {} failed to load", index);
            return None;
        }
        Some(PdfiumPage {
            bindings: self.bindings,
            handle,
            index,
            progress: Cell::new(None),
        })
    }

    fn has_valid_cross_reference_table(&self) -> bool {
        self.bindings
            .is_true(self.bindings.FPDF_DocumentHasValidCrossReferenceTable(self.handle))
    }

    fn init_form_fill(&self) -> PdfiumForm<'a> {
        // SAFETY: every field is an integer, a nullable pointer or an optional
        // callback, so all zeroes is a valid value.
        let mut info: Box<FPDF_FORMFILLINFO> = Box::new(unsafe { std::mem::zeroed() });
        info.version = 1;
        let handle = self
            .bindings
            .FPDFDOC_InitFormFillEnvironment(self.handle, &mut *info);
        if handle.is_null() {
            debug!("document has no form environment");
        }
        PdfiumForm {
            bindings: self.bindings,
            handle,
            _info: info,
        }
    }

    fn rendered_image_bitmap(&self, page: &PdfiumPage<'a>, object_index: usize) -> Option<Bitmap> {
        let object = page.object(object_index)?;
        let bitmap = self
            .bindings
            .FPDFImageObj_GetRenderedBitmap(self.handle, page.handle, object);
        if bitmap.is_null() {
            debug!("object {} on page {} has no rendered bitmap", object_index, page.index);
        }
        bridge::take_bitmap(self.bindings, bitmap)
    }
}

impl Drop for PdfiumDocument<'_> {
    fn drop(&mut self) {
        self.bindings.FPDF_CloseDocument(self.handle);
    }
}

/// The pdfium bitmap of a progressive render and the pixels it writes to.
#[derive(Clone, Copy)]
struct Progress {
    bitmap: FPDF_BITMAP,
    pixels: *const u8,
}

pub struct PdfiumPage<'a> {
    bindings: &'a dyn PdfiumLibraryBindings,
    handle: FPDF_PAGE,
    index: usize,
    progress: Cell<Option<Progress>>,
}

impl PdfiumPage<'_> {
    fn object(&self, index: usize) -> Option<FPDF_PAGEOBJECT> {
        let index = c_int::try_from(index).ok()?;
        let object = self.bindings.FPDFPage_GetObject(self.handle, index);
        (!object.is_null()).then_some(object)
    }

    fn release_progress(&self) {
        if let Some(progress) = self.progress.take() {
            self.bindings.FPDFBitmap_Destroy(progress.bitmap);
        }
    }
}

impl Page for PdfiumPage<'_> {
    fn width(&self) -> f32 {
        self.bindings.FPDF_GetPageWidthF(self.handle)
    }

    fn height(&self) -> f32 {
        self.bindings.FPDF_GetPageHeightF(self.handle)
    }

    fn has_transparency(&self) -> bool {
        self.bindings
            .is_true(self.bindings.FPDFPage_HasTransparency(self.handle))
    }

    fn render(&self, bitmap: &mut Bitmap, area: RenderArea, flags: RenderFlags) {
        let Some(device) = bridge::wrap_bitmap(self.bindings, bitmap) else {
            warn!("page {}: pdfium refused the bitmap", self.index);
            return;
        };
        self.bindings.FPDF_RenderPageBitmap(
            device,
            self.handle,
            0,
            0,
            area.width,
            area.height,
            0,
            flags.bits() as c_int,
        );
        self.bindings.FPDFBitmap_Destroy(device);
    }

    fn render_start(
        &self,
        bitmap: &mut Bitmap,
        area: RenderArea,
        flags: RenderFlags,
        colors: Option<&ColorScheme>,
        pause: &mut dyn PauseControl,
    ) -> RenderStatus {
        self.release_progress();
        let Some(device) = bridge::wrap_bitmap(self.bindings, bitmap) else {
            warn!("page {}: pdfium refused the bitmap", self.index);
            return RenderStatus::Failed;
        };
        self.progress.set(Some(Progress {
            bitmap: device,
            pixels: bitmap.buffer().as_ptr(),
        }));

        let scheme = colors.map(|colors| FPDF_COLORSCHEME {
            path_fill_color: FPDF_DWORD::from(colors.path_fill_color),
            path_stroke_color: FPDF_DWORD::from(colors.path_stroke_color),
            text_fill_color: FPDF_DWORD::from(colors.text_fill_color),
            text_stroke_color: FPDF_DWORD::from(colors.text_stroke_color),
        });
        let scheme_ptr = scheme
            .as_ref()
            .map_or(std::ptr::null(), |scheme| scheme as *const FPDF_COLORSCHEME);
        let mut pause = PauseBridge::new(pause);
        let status = self.bindings.FPDF_RenderPageBitmapWithColorScheme_Start(
            device,
            self.handle,
            0,
            0,
            area.width,
            area.height,
            0,
            flags.bits() as c_int,
            scheme_ptr,
            pause.raw(),
        );
        bridge::render_status(status)
    }

    fn render_continue(&self, bitmap: &mut Bitmap, pause: &mut dyn PauseControl) -> RenderStatus {
        match self.progress.get() {
            Some(progress) if progress.pixels == bitmap.buffer().as_ptr() => {}
            _ => {
                warn!("page {}: continue without a matching start", self.index);
                return RenderStatus::Failed;
            }
        }
        let mut pause = PauseBridge::new(pause);
        bridge::render_status(self.bindings.FPDF_RenderPage_Continue(self.handle, pause.raw()))
    }

    fn render_close(&self) {
        self.bindings.FPDF_RenderPage_Close(self.handle);
        self.release_progress();
    }

    fn object_count(&self) -> usize {
        usize::try_from(self.bindings.FPDFPage_CountObjects(self.handle)).unwrap_or(0)
    }

    fn is_image_object(&self, index: usize) -> bool {
        self.object(index)
            .is_some_and(|object| self.bindings.FPDFPageObj_GetType(object) == FPDF_PAGEOBJ_IMAGE)
    }

    fn image_bitmap(&self, index: usize) -> Option<Bitmap> {
        let object = self.object(index)?;
        bridge::take_bitmap(self.bindings, self.bindings.FPDFImageObj_GetBitmap(object))
    }

    fn thumbnail_bitmap(&self) -> Option<Bitmap> {
        bridge::take_bitmap(
            self.bindings,
            self.bindings.FPDFPage_GetThumbnailAsBitmap(self.handle),
        )
    }

    fn decoded_thumbnail_data(&self) -> Vec<u8> {
        bridge::read_blob(|buf, len| {
            self.bindings
                .FPDFPage_GetDecodedThumbnailData(self.handle, buf, len)
        })
    }

    fn raw_thumbnail_data(&self) -> Vec<u8> {
        bridge::read_blob(|buf, len| {
            self.bindings
                .FPDFPage_GetRawThumbnailData(self.handle, buf, len)
        })
    }
}

impl Drop for PdfiumPage<'_> {
    fn drop(&mut self) {
        self.release_progress();
        self.bindings.FPDF_ClosePage(self.handle);
    }
}

/// The form-fill environment of a document. When pdfium refuses to create
/// one the handle is null, which every form call accepts as a no-op.
pub struct PdfiumForm<'a> {
    bindings: &'a dyn PdfiumLibraryBindings,
    handle: FPDF_FORMHANDLE,
    // pdfium keeps a pointer to this until the environment exits
    _info: Box<FPDF_FORMFILLINFO>,
}

impl<'a> FormFill<PdfiumPage<'a>> for PdfiumForm<'a> {
    fn set_field_highlight(&self, color: u32, alpha: u8) {
        self.bindings.FPDF_SetFormFieldHighlightColor(
            self.handle,
            FPDF_FORMFIELD_UNKNOWN,
            FPDF_DWORD::from(color),
        );
        self.bindings
            .FPDF_SetFormFieldHighlightAlpha(self.handle, alpha);
    }

    fn do_document_js_action(&self, _pages: &dyn PageResolver<PdfiumPage<'a>>) {
        self.bindings.FORM_DoDocumentJSAction(self.handle);
    }

    fn do_document_open_action(&self, _pages: &dyn PageResolver<PdfiumPage<'a>>) {
        self.bindings.FORM_DoDocumentOpenAction(self.handle);
    }

    fn do_document_action(
        &self,
        action: DocumentAction,
        _pages: &dyn PageResolver<PdfiumPage<'a>>,
    ) {
        let code = match action {
            DocumentAction::WillClose => FPDFDOC_AACTION_WC,
        };
        self.bindings.FORM_DoDocumentAAction(self.handle, code);
    }

    fn on_after_load_page(&self, page: &PdfiumPage<'a>, _pages: &dyn PageResolver<PdfiumPage<'a>>) {
        self.bindings.FORM_OnAfterLoadPage(page.handle, self.handle);
    }

    fn do_page_action(
        &self,
        page: &PdfiumPage<'a>,
        action: PageAction,
        _pages: &dyn PageResolver<PdfiumPage<'a>>,
    ) {
        let code = match action {
            PageAction::Open => FPDFPAGE_AACTION_OPEN,
            PageAction::Close => FPDFPAGE_AACTION_CLOSE,
        };
        self.bindings.FORM_DoPageAAction(page.handle, self.handle, code);
    }

    fn on_before_close_page(&self, page: &PdfiumPage<'a>) {
        self.bindings.FORM_OnBeforeClosePage(page.handle, self.handle);
    }

    fn draw(
        &self,
        page: &PdfiumPage<'a>,
        bitmap: &mut Bitmap,
        area: RenderArea,
        flags: RenderFlags,
    ) {
        let Some(device) = bridge::wrap_bitmap(self.bindings, bitmap) else {
            warn!("page {}: pdfium refused the bitmap for form data", page.index);
            return;
        };
        self.bindings.FPDF_FFLDraw(
            self.handle,
            device,
            page.handle,
            0,
            0,
            area.width,
            area.height,
            0,
            flags.bits() as c_int,
        );
        self.bindings.FPDFBitmap_Destroy(device);
    }
}

impl Drop for PdfiumForm<'_> {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            self.bindings.FPDFDOC_ExitFormFillEnvironment(self.handle);
        }
    }
}
