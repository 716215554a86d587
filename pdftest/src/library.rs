//! The rendering library as seen by the driver.
//!
//! Everything the driver needs from the PDF library goes through these traits,
//! so the driver can run against pdfium or against an in-memory fake.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::bitmap::Bitmap;
use crate::clock::Clock;
use crate::options::RenderFlags;

/// Why a document could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Unknown error")]
    Unknown,
    #[error("File not found or could not be opened")]
    File,
    #[error("File not in PDF format or corrupted")]
    Format,
    #[error("Password required or incorrect password")]
    Password,
    #[error("Unsupported security scheme")]
    Security,
    #[error("Page not found or content error")]
    Page,
    #[error("Unknown error {0}")]
    Other(u64),
}

impl LoadError {
    /// Maps a pdfium `FPDF_ERR_*` code. Zero is success and has no error.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => None,
            1 => Some(LoadError::Unknown),
            2 => Some(LoadError::File),
            3 => Some(LoadError::Format),
            4 => Some(LoadError::Password),
            5 => Some(LoadError::Security),
            6 => Some(LoadError::Page),
            other => Some(LoadError::Other(other)),
        }
    }
}

/// Document features the library can render only partially, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedFeature {
    Xfa,
    PortfoliosPackages,
    Attachment,
    RightsManagement,
    SharedReview,
    SharedForm,
    ThreeD,
    Movie,
    Sound,
    Screen,
    DigitalSignature,
    Unknown,
}

impl UnsupportedFeature {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => UnsupportedFeature::Xfa,
            2 => UnsupportedFeature::PortfoliosPackages,
            3 | 16 => UnsupportedFeature::Attachment,
            4 => UnsupportedFeature::RightsManagement,
            5 => UnsupportedFeature::SharedReview,
            6..=8 => UnsupportedFeature::SharedForm,
            11 => UnsupportedFeature::ThreeD,
            12 => UnsupportedFeature::Movie,
            13 => UnsupportedFeature::Sound,
            14 | 15 => UnsupportedFeature::Screen,
            17 => UnsupportedFeature::DigitalSignature,
            _ => UnsupportedFeature::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UnsupportedFeature::Xfa => "XFA",
            UnsupportedFeature::PortfoliosPackages => "Portfolios_Packages",
            UnsupportedFeature::Attachment => "Attachment",
            UnsupportedFeature::RightsManagement => "Rights_Management",
            UnsupportedFeature::SharedReview => "Shared_Review",
            UnsupportedFeature::SharedForm => "Shared_Form",
            UnsupportedFeature::ThreeD => "3D",
            UnsupportedFeature::Movie => "Movie",
            UnsupportedFeature::Sound => "Sound",
            UnsupportedFeature::Screen => "Screen",
            UnsupportedFeature::DigitalSignature => "Digital_Signature",
            UnsupportedFeature::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for UnsupportedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type UnsupportedHandler = Box<dyn Fn(UnsupportedFeature)>;

/// Prints the notice the command line tool shows for unsupported features.
pub fn print_unsupported_feature(feature: UnsupportedFeature) {
    println!("Unsupported feature: {feature}.");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linearization {
    Unknown,
    NotLinearized,
    Linearized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStatus {
    Error,
    NotAvailable,
    Available,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Error,
    NotAvailable,
    Available,
    NotExist,
}

impl FormStatus {
    pub fn code(&self) -> i32 {
        match self {
            FormStatus::Error => -1,
            FormStatus::NotAvailable => 0,
            FormStatus::Available => 1,
            FormStatus::NotExist => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    ToBeContinued,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentAction {
    WillClose,
}

/// Destination box in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderArea {
    pub width: i32,
    pub height: i32,
}

impl RenderArea {
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Forced colors for progressive rendering, all ARGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub path_fill_color: u32,
    pub path_stroke_color: u32,
    pub text_fill_color: u32,
    pub text_stroke_color: u32,
}

impl ColorScheme {
    /// Red paths, green strokes, blue text and cyan text outlines.
    pub fn sample() -> Self {
        ColorScheme {
            path_fill_color: 0xFFFF0000,
            path_stroke_color: 0xFF00FF00,
            text_fill_color: 0xFF0000FF,
            text_stroke_color: 0xFF00FFFF,
        }
    }
}

/// Asked between progressive render steps whether to yield.
pub trait PauseControl {
    fn need_to_pause_now(&mut self) -> bool;
}

/// Yields after every step so the continue path always gets exercised.
#[derive(Debug, Default)]
pub struct AlwaysPause;

impl PauseControl for AlwaysPause {
    fn need_to_pause_now(&mut self) -> bool {
        true
    }
}

/// Receives the byte ranges the library wants before it can make progress.
pub trait DownloadHints {
    fn add_segment(&mut self, offset: u64, size: u64);
}

/// Hints sink for fully buffered input: segments are only logged.
#[derive(Debug, Default)]
pub struct SegmentHints {
    requested: usize,
}

impl SegmentHints {
    pub fn requested(&self) -> usize {
        self.requested
    }
}

impl DownloadHints for SegmentHints {
    fn add_segment(&mut self, offset: u64, size: u64) {
        self.requested += 1;
        debug!("download hint offset:{} size:{}", offset, size);
    }
}

/// Block reader over the bytes of an input file.
#[derive(Debug, Clone)]
pub struct FileAccess<'a> {
    data: &'a [u8],
    position: u64,
}

impl<'a> FileAccess<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        FileAccess { data, position: 0 }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Copies `buf.len()` bytes starting at `position`. Fails without
    /// touching `buf` when the range is not entirely inside the file.
    pub fn get_block(&self, position: u64, buf: &mut [u8]) -> bool {
        let Some(end) = position.checked_add(buf.len() as u64) else {
            return false;
        };
        if end > self.len() {
            return false;
        }
        let start = position as usize;
        buf.copy_from_slice(&self.data[start..end as usize]);
        true
    }

    /// The whole file is in memory, so every range is available.
    pub fn is_data_avail(&self, _offset: u64, _size: u64) -> bool {
        true
    }
}

impl Read for FileAccess<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len().saturating_sub(self.position);
        let count = (buf.len() as u64).min(remaining) as usize;
        if count == 0 {
            return Ok(0);
        }
        if !self.get_block(self.position, &mut buf[..count]) {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "block out of range"));
        }
        self.position += count as u64;
        Ok(count)
    }
}

impl Seek for FileAccess<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of file",
            )),
        }
    }
}

/// Loads pages on behalf of form callbacks that ask for a page by index.
pub trait PageResolver<P> {
    fn page_for_index(&self, index: usize) -> Option<Rc<P>>;
}

/// The form-fill environment of one document.
///
/// Hooks receive a resolver because form scripts may touch other pages
/// while a page is being opened.
pub trait FormFill<P> {
    fn set_field_highlight(&self, color: u32, alpha: u8);
    fn do_document_js_action(&self, pages: &dyn PageResolver<P>);
    fn do_document_open_action(&self, pages: &dyn PageResolver<P>);
    fn do_document_action(&self, action: DocumentAction, pages: &dyn PageResolver<P>);
    fn on_after_load_page(&self, page: &P, pages: &dyn PageResolver<P>);
    fn do_page_action(&self, page: &P, action: PageAction, pages: &dyn PageResolver<P>);
    fn on_before_close_page(&self, page: &P);
    fn draw(&self, page: &P, bitmap: &mut Bitmap, area: RenderArea, flags: RenderFlags);
}

pub trait Page {
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    fn has_transparency(&self) -> bool;

    fn render(&self, bitmap: &mut Bitmap, area: RenderArea, flags: RenderFlags);

    fn render_start(
        &self,
        bitmap: &mut Bitmap,
        area: RenderArea,
        flags: RenderFlags,
        colors: Option<&ColorScheme>,
        pause: &mut dyn PauseControl,
    ) -> RenderStatus;
    fn render_continue(&self, bitmap: &mut Bitmap, pause: &mut dyn PauseControl) -> RenderStatus;
    fn render_close(&self);

    fn object_count(&self) -> usize;
    fn is_image_object(&self, index: usize) -> bool;
    /// The image's own pixels, without page transforms applied.
    fn image_bitmap(&self, index: usize) -> Option<Bitmap>;

    fn thumbnail_bitmap(&self) -> Option<Bitmap>;
    fn decoded_thumbnail_data(&self) -> Vec<u8>;
    fn raw_thumbnail_data(&self) -> Vec<u8>;
}

pub trait Document {
    type Page: Page;
    type Form: FormFill<Self::Page>;

    fn page_count(&self) -> usize;
    fn load_page(&self, index: usize) -> Option<Self::Page>;
    fn has_valid_cross_reference_table(&self) -> bool;
    fn init_form_fill(&self) -> Self::Form;
    /// An image object as it appears on the rendered page, masks and
    /// transforms applied.
    fn rendered_image_bitmap(&self, page: &Self::Page, object_index: usize) -> Option<Bitmap>;
}

/// Availability checks for progressively downloaded files.
pub trait DataAvailability {
    fn is_linearized(&mut self) -> Linearization;
    fn is_doc_avail(&mut self, hints: &mut dyn DownloadHints) -> DataStatus;
    fn is_form_avail(&mut self, hints: &mut dyn DownloadHints) -> FormStatus;
    fn is_page_avail(&mut self, index: usize, hints: &mut dyn DownloadHints) -> DataStatus;
}

pub trait Library {
    type Document<'a>: Document
    where
        Self: 'a;
    type Availability<'a>: DataAvailability
    where
        Self: 'a;

    /// Build capabilities reported by `--show-config`.
    const CAPABILITIES: &'static [&'static str];

    fn set_clock(&self, clock: Clock);
    fn set_unsupported_handler(&self, handler: UnsupportedHandler);

    fn load_mem_document<'a>(
        &'a self,
        data: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<Self::Document<'a>, LoadError>;

    fn load_custom_document<'a>(
        &'a self,
        access: FileAccess<'a>,
        password: Option<&'a str>,
    ) -> Result<Self::Document<'a>, LoadError>;

    fn create_availability<'a>(&'a self, access: FileAccess<'a>) -> Self::Availability<'a>;

    fn availability_document<'a>(
        &'a self,
        avail: &mut Self::Availability<'a>,
        password: Option<&'a str>,
    ) -> Result<Self::Document<'a>, LoadError>;
}
