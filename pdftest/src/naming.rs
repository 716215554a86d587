//! Output file names for every artifact the driver writes.

/// Longest file name, in bytes, the driver will create.
pub const MAX_FILENAME_LEN: usize = 255;

fn checked(name: String) -> Option<String> {
    if name.len() > MAX_FILENAME_LEN {
        None
    } else {
        Some(name)
    }
}

/// `<out>.png` for a single page, `<out>.<page>.png` otherwise. Anything from
/// the first `.png` in `out_name` on is dropped first.
pub fn page_png_name(out_name: &str, page_index: usize, single_page: bool) -> String {
    let base = match out_name.find(".png") {
        Some(pos) => &out_name[..pos],
        None => out_name,
    };
    if single_page {
        format!("{base}.png")
    } else {
        format!("{base}.{page_index}.png")
    }
}

pub fn image_name(pdf_name: &str, page_index: usize, object_index: usize) -> Option<String> {
    checked(format!("{pdf_name}.{page_index}.{object_index}.png"))
}

pub fn thumbnail_name(pdf_name: &str, page_index: usize) -> Option<String> {
    checked(format!("{pdf_name}.thumbnail.{page_index}.png"))
}

pub fn raw_thumbnail_name(pdf_name: &str, page_index: usize) -> Option<String> {
    checked(format!("{pdf_name}.thumbnail.raw.{page_index}.bin"))
}

pub fn decoded_thumbnail_name(pdf_name: &str, page_index: usize) -> Option<String> {
    checked(format!("{pdf_name}.thumbnail.decoded.{page_index}.bin"))
}
