//! Callback structs handed to pdfium and the mapping of its status codes.

use std::ffi::c_void;
use std::os::raw::{c_int, c_uchar, c_ulong};
use std::ptr;
use std::slice;

use log::debug;
use pdfium_render::prelude::*;

use pdftest::bitmap::{Bitmap, BitmapFormat};
use pdftest::library::{
    DataStatus, DownloadHints, FileAccess, FormStatus, Linearization, PauseControl, RenderStatus,
};

const FPDFBITMAP_GRAY: c_int = 1;
const FPDFBITMAP_BGR: c_int = 2;
const FPDFBITMAP_BGRX: c_int = 3;
const FPDFBITMAP_BGRA: c_int = 4;

const PDF_LINEARIZED: c_int = 1;
const PDF_NOT_LINEARIZED: c_int = 0;

const PDF_DATA_NOTAVAIL: c_int = 0;
const PDF_DATA_AVAIL: c_int = 1;

const PDF_FORM_ERROR: c_int = -1;
const PDF_FORM_NOTAVAIL: c_int = 0;
const PDF_FORM_AVAIL: c_int = 1;
const PDF_FORM_NOTEXIST: c_int = 2;

const FPDF_RENDER_TOBECONTINUED: c_int = 1;
const FPDF_RENDER_DONE: c_int = 2;

/// `FPDF_FILEACCESS` reading from a [`FileAccess`]. Boxed so the pointer
/// pdfium keeps stays put.
pub(crate) struct FileReader<'a> {
    raw: FPDF_FILEACCESS,
    access: FileAccess<'a>,
}

impl<'a> FileReader<'a> {
    pub(crate) fn new(access: FileAccess<'a>) -> Box<Self> {
        let mut reader = Box::new(FileReader {
            raw: FPDF_FILEACCESS {
                m_FileLen: access.len() as c_ulong,
                m_GetBlock: Some(get_block),
                m_Param: ptr::null_mut(),
            },
            access,
        });
        reader.raw.m_Param = &mut reader.access as *mut FileAccess<'a> as *mut c_void;
        reader
    }

    pub(crate) fn raw(&mut self) -> *mut FPDF_FILEACCESS {
        &mut self.raw
    }
}

unsafe extern "C" fn get_block(
    param: *mut c_void,
    position: c_ulong,
    buf: *mut c_uchar,
    size: c_ulong,
) -> c_int {
    if param.is_null() || buf.is_null() {
        return 0;
    }
    // SAFETY: m_Param points at the access owned by the boxed reader, and
    // pdfium passes a writable buffer of `size` bytes.
    let (access, buf) = unsafe {
        (
            &*(param as *const FileAccess<'_>),
            slice::from_raw_parts_mut(buf, size as usize),
        )
    };
    c_int::from(access.get_block(position as u64, buf))
}

/// `FX_FILEAVAIL` answering from a [`FileAccess`]. pdfium hands back the
/// pointer to `raw`, which is why it comes first.
#[repr(C)]
pub(crate) struct FileAvail<'a> {
    raw: FX_FILEAVAIL,
    access: FileAccess<'a>,
}

impl<'a> FileAvail<'a> {
    pub(crate) fn new(access: FileAccess<'a>) -> Box<Self> {
        Box::new(FileAvail {
            raw: FX_FILEAVAIL {
                version: 1,
                IsDataAvail: Some(is_data_avail),
            },
            access,
        })
    }

    pub(crate) fn raw(&mut self) -> *mut FX_FILEAVAIL {
        &mut self.raw
    }
}

unsafe extern "C" fn is_data_avail(
    this: *mut FX_FILEAVAIL,
    offset: usize,
    size: usize,
) -> FPDF_BOOL {
    if this.is_null() {
        return 0;
    }
    // SAFETY: `this` is the first field of a live FileAvail.
    let avail = unsafe { &*(this as *const FileAvail<'_>) };
    FPDF_BOOL::from(avail.access.is_data_avail(offset as u64, size as u64))
}

/// `FX_DOWNLOADHINTS` forwarding segments to a [`DownloadHints`] sink for
/// the duration of one availability call.
#[repr(C)]
pub(crate) struct HintsBridge<'h> {
    raw: FX_DOWNLOADHINTS,
    sink: &'h mut dyn DownloadHints,
}

impl<'h> HintsBridge<'h> {
    pub(crate) fn new(sink: &'h mut dyn DownloadHints) -> Self {
        HintsBridge {
            raw: FX_DOWNLOADHINTS {
                version: 1,
                AddSegment: Some(add_segment),
            },
            sink,
        }
    }

    pub(crate) fn raw(&mut self) -> *mut FX_DOWNLOADHINTS {
        &mut self.raw
    }
}

unsafe extern "C" fn add_segment(this: *mut FX_DOWNLOADHINTS, offset: usize, size: usize) {
    if this.is_null() {
        return;
    }
    // SAFETY: `this` is the first field of a HintsBridge that outlives the
    // availability call.
    let bridge = unsafe { &mut *(this as *mut HintsBridge<'_>) };
    bridge.sink.add_segment(offset as u64, size as u64);
}

/// `IFSDK_PAUSE` asking a [`PauseControl`] whether to yield.
#[repr(C)]
pub(crate) struct PauseBridge<'p> {
    raw: IFSDK_PAUSE,
    control: &'p mut dyn PauseControl,
}

impl<'p> PauseBridge<'p> {
    pub(crate) fn new(control: &'p mut dyn PauseControl) -> Self {
        PauseBridge {
            raw: IFSDK_PAUSE {
                version: 1,
                NeedToPauseNow: Some(need_to_pause_now),
                user: ptr::null_mut(),
            },
            control,
        }
    }

    pub(crate) fn raw(&mut self) -> *mut IFSDK_PAUSE {
        &mut self.raw
    }
}

unsafe extern "C" fn need_to_pause_now(this: *mut IFSDK_PAUSE) -> FPDF_BOOL {
    if this.is_null() {
        return 0;
    }
    // SAFETY: `this` is the first field of a PauseBridge borrowed for the
    // render call.
    let bridge = unsafe { &mut *(this as *mut PauseBridge<'_>) };
    FPDF_BOOL::from(bridge.control.need_to_pause_now())
}

pub(crate) fn linearization(code: c_int) -> Linearization {
    match code {
        PDF_LINEARIZED => Linearization::Linearized,
        PDF_NOT_LINEARIZED => Linearization::NotLinearized,
        _ => Linearization::Unknown,
    }
}

pub(crate) fn data_status(code: c_int) -> DataStatus {
    match code {
        PDF_DATA_AVAIL => DataStatus::Available,
        PDF_DATA_NOTAVAIL => DataStatus::NotAvailable,
        _ => DataStatus::Error,
    }
}

pub(crate) fn form_status(code: c_int) -> FormStatus {
    match code {
        PDF_FORM_NOTAVAIL => FormStatus::NotAvailable,
        PDF_FORM_AVAIL => FormStatus::Available,
        PDF_FORM_NOTEXIST => FormStatus::NotExist,
        PDF_FORM_ERROR => FormStatus::Error,
        other => {
            debug!("form availability {}", other);
            FormStatus::Error
        }
    }
}

/// `FPDF_RENDER_READY` only comes before a start and counts as a failure.
pub(crate) fn render_status(code: c_int) -> RenderStatus {
    match code {
        FPDF_RENDER_TOBECONTINUED => RenderStatus::ToBeContinued,
        FPDF_RENDER_DONE => RenderStatus::Done,
        _ => RenderStatus::Failed,
    }
}

pub(crate) fn bitmap_format(code: c_int) -> BitmapFormat {
    match code {
        FPDFBITMAP_GRAY => BitmapFormat::Gray,
        FPDFBITMAP_BGR => BitmapFormat::Bgr,
        FPDFBITMAP_BGRX => BitmapFormat::Bgrx,
        FPDFBITMAP_BGRA => BitmapFormat::Bgra,
        _ => BitmapFormat::Unknown,
    }
}

fn format_code(format: BitmapFormat) -> c_int {
    match format {
        BitmapFormat::Unknown => 0,
        BitmapFormat::Gray => FPDFBITMAP_GRAY,
        BitmapFormat::Bgr => FPDFBITMAP_BGR,
        BitmapFormat::Bgrx => FPDFBITMAP_BGRX,
        BitmapFormat::Bgra => FPDFBITMAP_BGRA,
    }
}

/// Wraps the pixels of `bitmap` in a pdfium bitmap without copying. The
/// handle must be destroyed before the buffer moves or is dropped.
pub(crate) fn wrap_bitmap(
    bindings: &dyn PdfiumLibraryBindings,
    bitmap: &mut Bitmap,
) -> Option<FPDF_BITMAP> {
    let (width, height, stride) = (bitmap.width(), bitmap.height(), bitmap.stride());
    let format = format_code(bitmap.format());
    let pixels = bitmap.buffer_mut().as_mut_ptr() as *mut c_void;
    let handle = bindings.FPDFBitmap_CreateEx(width, height, format, pixels, stride);
    (!handle.is_null()).then_some(handle)
}

/// Copies a bitmap pdfium allocated and destroys it.
pub(crate) fn take_bitmap(
    bindings: &dyn PdfiumLibraryBindings,
    handle: FPDF_BITMAP,
) -> Option<Bitmap> {
    if handle.is_null() {
        return None;
    }
    let width = bindings.FPDFBitmap_GetWidth(handle);
    let height = bindings.FPDFBitmap_GetHeight(handle);
    let stride = bindings.FPDFBitmap_GetStride(handle);
    let format = bitmap_format(bindings.FPDFBitmap_GetFormat(handle));
    let buffer = bindings.FPDFBitmap_GetBuffer_as_vec(handle);
    bindings.FPDFBitmap_Destroy(handle);
    Some(Bitmap::from_raw(width, height, stride, format, buffer))
}

/// Reads a length-prefixed blob: the first call asks for the size, the
/// second fills the buffer.
pub(crate) fn read_blob(read: impl Fn(*mut c_void, c_ulong) -> c_ulong) -> Vec<u8> {
    let len = read(ptr::null_mut(), 0);
    if len == 0 {
        return Vec::new();
    }
    let mut data = vec![0u8; len as usize];
    let written = read(data.as_mut_ptr() as *mut c_void, len);
    data.truncate((written as usize).min(len as usize));
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdftest::library::{AlwaysPause, SegmentHints};

    #[test]
    fn test_get_block_reads_from_access() {
        let data = b"%PDF-1.7\n%%EOF";
        let mut reader = FileReader::new(FileAccess::new(data));
        let raw = unsafe { &*reader.raw() };
        assert_eq!(raw.m_FileLen, data.len() as c_ulong);

        let read = raw.m_GetBlock.unwrap();
        let mut buf = [0u8; 3];
        let ok = unsafe { read(raw.m_Param, 5, buf.as_mut_ptr(), 3) };
        assert_eq!(ok, 1);
        assert_eq!(&buf, b"1.7");
        let past_end = unsafe { read(raw.m_Param, 13, buf.as_mut_ptr(), 3) };
        assert_eq!(past_end, 0);
    }

    #[test]
    fn test_buffered_data_is_available() {
        let mut avail = FileAvail::new(FileAccess::new(b"%PDF"));
        let raw = avail.raw();
        let check = unsafe { (*raw).IsDataAvail.unwrap() };
        assert_eq!(unsafe { check(raw, 0, 4) }, 1);
        assert_eq!(unsafe { check(raw, 1 << 20, 16) }, 1);
    }

    #[test]
    fn test_segments_reach_hints() {
        let mut hints = SegmentHints::default();
        {
            let mut bridge = HintsBridge::new(&mut hints);
            let raw = bridge.raw();
            let add = unsafe { (*raw).AddSegment.unwrap() };
            unsafe {
                add(raw, 0, 1024);
                add(raw, 4096, 512);
            }
        }
        assert_eq!(hints.requested(), 2);
    }

    struct Countdown(u32);

    impl PauseControl for Countdown {
        fn need_to_pause_now(&mut self) -> bool {
            self.0 = self.0.saturating_sub(1);
            self.0 == 0
        }
    }

    #[test]
    fn test_pause_asks_control() {
        let mut always = AlwaysPause;
        let mut bridge = PauseBridge::new(&mut always);
        let raw = bridge.raw();
        let ask = unsafe { (*raw).NeedToPauseNow.unwrap() };
        assert_eq!(unsafe { ask(raw) }, 1);

        let mut countdown = Countdown(2);
        let mut bridge = PauseBridge::new(&mut countdown);
        let raw = bridge.raw();
        assert_eq!(unsafe { ask(raw) }, 0);
        assert_eq!(unsafe { ask(raw) }, 1);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(linearization(1), Linearization::Linearized);
        assert_eq!(linearization(0), Linearization::NotLinearized);
        assert_eq!(linearization(-1), Linearization::Unknown);

        assert_eq!(data_status(1), DataStatus::Available);
        assert_eq!(data_status(0), DataStatus::NotAvailable);
        assert_eq!(data_status(-1), DataStatus::Error);

        assert_eq!(form_status(2), FormStatus::NotExist);
        assert_eq!(form_status(-1), FormStatus::Error);
        assert_eq!(form_status(7), FormStatus::Error);

        assert_eq!(render_status(0), RenderStatus::Failed);
        assert_eq!(render_status(1), RenderStatus::ToBeContinued);
        assert_eq!(render_status(2), RenderStatus::Done);
        assert_eq!(render_status(3), RenderStatus::Failed);
    }

    #[test]
    fn test_bitmap_formats() {
        for format in [
            BitmapFormat::Gray,
            BitmapFormat::Bgr,
            BitmapFormat::Bgrx,
            BitmapFormat::Bgra,
        ] {
            assert_eq!(bitmap_format(format_code(format)), format);
        }
        assert_eq!(bitmap_format(9), BitmapFormat::Unknown);
    }

    #[test]
    fn test_read_blob_sizes_then_fills() {
        let source = b"thumbnail";
        let blob = read_blob(|buf, len| {
            if !buf.is_null() {
                let out = unsafe { slice::from_raw_parts_mut(buf as *mut u8, len as usize) };
                out.copy_from_slice(source);
            }
            source.len() as c_ulong
        });
        assert_eq!(blob, source);
        assert!(read_blob(|_, _| 0).is_empty());
    }
}
