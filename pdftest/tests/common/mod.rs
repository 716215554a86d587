#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use pdftest::bitmap::Bitmap;
use pdftest::clock::Clock;
use pdftest::library::{
    ColorScheme, DataAvailability, DataStatus, Document, DocumentAction, DownloadHints,
    FileAccess, FormFill, FormStatus, Library, Linearization, LoadError, Page, PageAction,
    PageResolver, PauseControl, RenderArea, RenderStatus, UnsupportedHandler,
};
use pdftest::RenderFlags;

pub const PAGE_INK: u32 = 0xFF102030;

pub type Events = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Clone)]
pub enum FakeObject {
    Text,
    /// An image object; `None` has no decodable bitmap.
    Image(Option<(u32, u32)>),
}

#[derive(Debug, Clone)]
pub struct PageSpec {
    pub width: f32,
    pub height: f32,
    pub transparent: bool,
    pub objects: Vec<FakeObject>,
    pub thumbnail: Option<(u32, u32)>,
    pub raw_thumbnail: Vec<u8>,
    pub decoded_thumbnail: Vec<u8>,
}

impl PageSpec {
    pub fn new(width: f32, height: f32) -> Self {
        PageSpec {
            width,
            height,
            transparent: false,
            objects: Vec::new(),
            thumbnail: None,
            raw_thumbnail: Vec::new(),
            decoded_thumbnail: Vec::new(),
        }
    }
}

/// In-memory stand-in for the rendering library. Every call it receives is
/// appended to `events`.
pub struct FakeLibrary {
    pub pages: Vec<PageSpec>,
    pub password: Option<String>,
    pub linearized: bool,
    pub valid_xref: bool,
    pub doc_avail: RefCell<VecDeque<DataStatus>>,
    pub page_avail: RefCell<VecDeque<DataStatus>>,
    pub form_avail: FormStatus,
    /// Continue steps a progressive render takes before it is done.
    pub progressive_steps: usize,
    /// Page the form asks for while another page is being opened.
    pub reenter_page: Option<usize>,
    pub events: Events,
    pub clock: Cell<Option<Clock>>,
    pub unsupported: RefCell<Option<UnsupportedHandler>>,
}

impl FakeLibrary {
    pub fn new(pages: Vec<PageSpec>) -> Self {
        FakeLibrary {
            pages,
            password: None,
            linearized: false,
            valid_xref: true,
            doc_avail: RefCell::new(VecDeque::new()),
            page_avail: RefCell::new(VecDeque::new()),
            form_avail: FormStatus::Available,
            progressive_steps: 0,
            reenter_page: None,
            events: Rc::new(RefCell::new(Vec::new())),
            clock: Cell::new(None),
            unsupported: RefCell::new(None),
        }
    }

    pub fn letter(count: usize) -> Self {
        FakeLibrary::new(vec![PageSpec::new(612.0, 792.0); count])
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.borrow().iter().filter(|e| *e == event).count()
    }

    fn log(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    fn open(&self, data: &[u8], password: Option<&str>) -> Result<FakeDocument<'_>, LoadError> {
        if !data.starts_with(b"%PDF") {
            return Err(LoadError::Format);
        }
        if self.password.is_some() && self.password.as_deref() != password {
            return Err(LoadError::Password);
        }
        if let Some(handler) = self.unsupported.borrow().as_ref() {
            if data.windows(4).any(|w| w == b"/XFA") {
                handler(pdftest::library::UnsupportedFeature::Xfa);
            }
        }
        Ok(FakeDocument { library: self })
    }
}

impl Library for FakeLibrary {
    type Document<'a> = FakeDocument<'a>;
    type Availability<'a> = FakeAvailability<'a>;

    const CAPABILITIES: &'static [&'static str] = &["FAKE"];

    fn set_clock(&self, clock: Clock) {
        self.clock.set(Some(clock));
    }

    fn set_unsupported_handler(&self, handler: UnsupportedHandler) {
        *self.unsupported.borrow_mut() = Some(handler);
    }

    fn load_mem_document<'a>(
        &'a self,
        data: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<FakeDocument<'a>, LoadError> {
        self.log("load mem");
        self.open(data, password)
    }

    fn load_custom_document<'a>(
        &'a self,
        access: FileAccess<'a>,
        password: Option<&'a str>,
    ) -> Result<FakeDocument<'a>, LoadError> {
        self.log("load custom");
        let mut header = [0u8; 4];
        if !access.get_block(0, &mut header) {
            return Err(LoadError::File);
        }
        self.open(access.data(), password)
    }

    fn create_availability<'a>(&'a self, access: FileAccess<'a>) -> FakeAvailability<'a> {
        FakeAvailability {
            library: self,
            access,
        }
    }

    fn availability_document<'a>(
        &'a self,
        avail: &mut FakeAvailability<'a>,
        password: Option<&'a str>,
    ) -> Result<FakeDocument<'a>, LoadError> {
        self.log("load avail");
        self.open(avail.access.data(), password)
    }
}

pub struct FakeAvailability<'a> {
    library: &'a FakeLibrary,
    access: FileAccess<'a>,
}

impl Drop for FakeAvailability<'_> {
    fn drop(&mut self) {
        self.library.log("drop avail");
    }
}

impl DataAvailability for FakeAvailability<'_> {
    fn is_linearized(&mut self) -> Linearization {
        if self.library.linearized {
            Linearization::Linearized
        } else {
            Linearization::NotLinearized
        }
    }

    fn is_doc_avail(&mut self, hints: &mut dyn DownloadHints) -> DataStatus {
        self.library.log("doc avail");
        let status = self.library.doc_avail.borrow_mut().pop_front();
        let status = status.unwrap_or(DataStatus::Available);
        if status == DataStatus::NotAvailable {
            hints.add_segment(0, self.access.len());
        }
        status
    }

    fn is_form_avail(&mut self, _hints: &mut dyn DownloadHints) -> FormStatus {
        self.library.form_avail
    }

    fn is_page_avail(&mut self, index: usize, _hints: &mut dyn DownloadHints) -> DataStatus {
        self.library.log(format!("page avail {index}"));
        let status = self.library.page_avail.borrow_mut().pop_front();
        status.unwrap_or(DataStatus::Available)
    }
}

pub struct FakeDocument<'a> {
    library: &'a FakeLibrary,
}

impl Drop for FakeDocument<'_> {
    fn drop(&mut self) {
        self.library.log("drop document");
    }
}

impl<'a> Document for FakeDocument<'a> {
    type Page = FakePage<'a>;
    type Form = FakeForm<'a>;

    fn page_count(&self) -> usize {
        self.library.pages.len()
    }

    fn load_page(&self, index: usize) -> Option<FakePage<'a>> {
        self.library.log(format!("load page {index}"));
        let spec = self.library.pages.get(index)?.clone();
        Some(FakePage {
            library: self.library,
            index,
            spec,
            remaining_steps: Cell::new(0),
        })
    }

    fn has_valid_cross_reference_table(&self) -> bool {
        self.library.valid_xref
    }

    fn init_form_fill(&self) -> FakeForm<'a> {
        FakeForm {
            library: self.library,
        }
    }

    fn rendered_image_bitmap(&self, page: &FakePage<'a>, object_index: usize) -> Option<Bitmap> {
        // rendered images come out twice as large as their source
        let (w, h) = page.image_size(object_index)?;
        Bitmap::new(w as i32 * 2, h as i32 * 2, true)
    }
}

pub struct FakePage<'a> {
    library: &'a FakeLibrary,
    index: usize,
    spec: PageSpec,
    remaining_steps: Cell<usize>,
}

impl FakePage<'_> {
    fn image_size(&self, object_index: usize) -> Option<(u32, u32)> {
        match self.spec.objects.get(object_index)? {
            FakeObject::Image(size) => *size,
            FakeObject::Text => None,
        }
    }
}

impl Drop for FakePage<'_> {
    fn drop(&mut self) {
        self.library.log(format!("drop page {}", self.index));
    }
}

impl Page for FakePage<'_> {
    fn width(&self) -> f32 {
        self.spec.width
    }

    fn height(&self) -> f32 {
        self.spec.height
    }

    fn has_transparency(&self) -> bool {
        self.spec.transparent
    }

    fn render(&self, bitmap: &mut Bitmap, area: RenderArea, flags: RenderFlags) {
        self.library
            .log(format!("render {} {}x{} {:#x}", self.index, area.width, area.height, flags.bits()));
        bitmap.fill_rect(0, 0, area.width, area.height, PAGE_INK);
    }

    fn render_start(
        &self,
        bitmap: &mut Bitmap,
        area: RenderArea,
        _flags: RenderFlags,
        colors: Option<&ColorScheme>,
        pause: &mut dyn PauseControl,
    ) -> RenderStatus {
        self.library.log(format!(
            "render start {} {}x{} forced:{}",
            self.index,
            area.width,
            area.height,
            colors.is_some()
        ));
        bitmap.fill_rect(0, 0, area.width, area.height, PAGE_INK);
        self.remaining_steps.set(self.library.progressive_steps);
        if self.remaining_steps.get() > 0 && pause.need_to_pause_now() {
            RenderStatus::ToBeContinued
        } else {
            RenderStatus::Done
        }
    }

    fn render_continue(&self, _bitmap: &mut Bitmap, pause: &mut dyn PauseControl) -> RenderStatus {
        self.library.log(format!("render continue {}", self.index));
        let left = self.remaining_steps.get().saturating_sub(1);
        self.remaining_steps.set(left);
        if left > 0 && pause.need_to_pause_now() {
            RenderStatus::ToBeContinued
        } else {
            RenderStatus::Done
        }
    }

    fn render_close(&self) {
        self.library.log(format!("render close {}", self.index));
    }

    fn object_count(&self) -> usize {
        self.spec.objects.len()
    }

    fn is_image_object(&self, index: usize) -> bool {
        matches!(self.spec.objects.get(index), Some(FakeObject::Image(_)))
    }

    fn image_bitmap(&self, index: usize) -> Option<Bitmap> {
        let (w, h) = self.image_size(index)?;
        Bitmap::new(w as i32, h as i32, true)
    }

    fn thumbnail_bitmap(&self) -> Option<Bitmap> {
        let (w, h) = self.spec.thumbnail?;
        Bitmap::new(w as i32, h as i32, false)
    }

    fn decoded_thumbnail_data(&self) -> Vec<u8> {
        self.spec.decoded_thumbnail.clone()
    }

    fn raw_thumbnail_data(&self) -> Vec<u8> {
        self.spec.raw_thumbnail.clone()
    }
}

pub struct FakeForm<'a> {
    library: &'a FakeLibrary,
}

impl Drop for FakeForm<'_> {
    fn drop(&mut self) {
        self.library.log("drop form");
    }
}

impl<'a> FormFill<FakePage<'a>> for FakeForm<'a> {
    fn set_field_highlight(&self, color: u32, alpha: u8) {
        self.library.log(format!("highlight {color:#08x} {alpha}"));
    }

    fn do_document_js_action(&self, _pages: &dyn PageResolver<FakePage<'a>>) {
        self.library.log("document js");
    }

    fn do_document_open_action(&self, _pages: &dyn PageResolver<FakePage<'a>>) {
        self.library.log("document open");
    }

    fn do_document_action(&self, action: DocumentAction, _pages: &dyn PageResolver<FakePage<'a>>) {
        self.library.log(format!("document action {action:?}"));
    }

    fn on_after_load_page(&self, page: &FakePage<'a>, pages: &dyn PageResolver<FakePage<'a>>) {
        self.library.log(format!("after load {}", page.index));
        if let Some(other) = self.library.reenter_page {
            let found = pages.page_for_index(other).map(|p| p.index);
            self.library.log(format!("form asked for {other}: {found:?}"));
        }
    }

    fn do_page_action(
        &self,
        page: &FakePage<'a>,
        action: PageAction,
        _pages: &dyn PageResolver<FakePage<'a>>,
    ) {
        self.library.log(format!("page action {:?} {}", action, page.index));
    }

    fn on_before_close_page(&self, page: &FakePage<'a>) {
        self.library.log(format!("before close {}", page.index));
    }

    fn draw(&self, page: &FakePage<'a>, _bitmap: &mut Bitmap, area: RenderArea, _flags: RenderFlags) {
        self.library
            .log(format!("draw {} {}x{}", page.index, area.width, area.height));
    }
}

/// A minimal file the fake library accepts.
pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.7\n1 0 obj <<>> endobj\ntrailer <<>>\n%%EOF\n".to_vec()
}

pub fn diag_lines(diag: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(diag)
        .lines()
        .map(str::to_string)
        .collect()
}
