//! Writers for page images, embedded images and thumbnails.
//!
//! Failures here never abort a page: they are reported on the diagnostics
//! stream and the artifact is skipped.

use std::fmt;
use std::fs::File;
use std::io::Write;

use log::debug;

use crate::bitmap::{Bitmap, BitmapFormat};
use crate::encode::{encode_bitmap, encode_png};
use crate::library::{Document, Page};
use crate::naming::{self, MAX_FILENAME_LEN};

/// Writes one diagnostic line. A broken diagnostics stream is not worth
/// failing a render over.
pub fn report(diag: &mut dyn Write, args: fmt::Arguments<'_>) {
    if let Err(err) = diag.write_fmt(args).and_then(|_| diag.write_all(b"\n")) {
        debug!("dropped diagnostic: {}", err);
    }
}

pub fn write_buffer_to_file(diag: &mut dyn Write, buffer: &[u8], filename: &str, filetype: &str) {
    let mut file = match File::create(filename) {
        Ok(file) => file,
        Err(err) => {
            debug!("create {} failed: {}", filename, err);
            report(
                diag,
                format_args!("Failed to open {filename} for saving {filetype}."),
            );
            return;
        }
    };
    match file.write_all(buffer) {
        Ok(()) => report(diag, format_args!("Successfully wrote {filetype} {filename}.")),
        Err(err) => {
            debug!("write {} failed: {}", filename, err);
            report(diag, format_args!("Failed to write to {filename}."));
        }
    }
}

/// Encodes a rendered page and writes it next to `out_name`. Returns the
/// written file name.
pub fn write_page_png(
    diag: &mut dyn Write,
    bitmap: &Bitmap,
    out_name: &str,
    page_index: usize,
    single_page: bool,
) -> Option<String> {
    // The page buffer is written as BGRA even when its fourth byte is padding.
    let png = match encode_png(
        bitmap.buffer(),
        bitmap.width(),
        bitmap.height(),
        bitmap.stride(),
        BitmapFormat::Bgra,
    ) {
        Ok(png) => png,
        Err(err) => {
            debug!("page {} encode: {}", page_index, err);
            report(diag, format_args!("Failed to convert bitmap to PNG"));
            return None;
        }
    };

    let filename = naming::page_png_name(out_name, page_index, single_page);
    if filename.len() > MAX_FILENAME_LEN {
        report(diag, format_args!("Filename {filename} is too long"));
        return None;
    }

    let mut file = match File::create(&filename) {
        Ok(file) => file,
        Err(_) => {
            report(diag, format_args!("Failed to open {filename} for output"));
            return None;
        }
    };
    if file.write_all(&png).is_err() {
        report(diag, format_args!("Failed to write to {filename}"));
    }
    Some(filename)
}

fn write_image_objects<P: Page>(
    diag: &mut dyn Write,
    page: &P,
    pdf_name: &str,
    page_index: usize,
    mut bitmap_for: impl FnMut(usize) -> Option<Bitmap>,
) {
    for i in 0..page.object_count() {
        if !page.is_image_object(i) {
            continue;
        }
        let Some(bitmap) = bitmap_for(i) else {
            report(
                diag,
                format_args!(
                    "Image object #{} on page #{} has an empty bitmap.",
                    i + 1,
                    page_index + 1
                ),
            );
            continue;
        };
        let Some(filename) = naming::image_name(pdf_name, page_index, i) else {
            report(
                diag,
                format_args!(
                    "Filename {pdf_name}.{page_index}.{i}.png for saving image is too long."
                ),
            );
            continue;
        };
        match encode_bitmap(&bitmap) {
            Ok(png) => write_buffer_to_file(diag, &png, &filename, "image"),
            Err(err) => {
                debug!("image {} encode: {}", i, err);
                report(
                    diag,
                    format_args!(
                        "Failed to convert image object #{}, on page #{} to png.",
                        i + 1,
                        page_index + 1
                    ),
                );
            }
        }
    }
}

/// Saves each image object's own pixels as `<pdf>.<page>.<object>.png`.
pub fn write_images<P: Page>(diag: &mut dyn Write, page: &P, pdf_name: &str, page_index: usize) {
    write_image_objects(diag, page, pdf_name, page_index, |i| page.image_bitmap(i));
}

/// Saves each image object as drawn on the page, under the same names as
/// [`write_images`].
pub fn write_rendered_images<D: Document>(
    diag: &mut dyn Write,
    document: &D,
    page: &D::Page,
    pdf_name: &str,
    page_index: usize,
) {
    write_image_objects(diag, page, pdf_name, page_index, |i| {
        document.rendered_image_bitmap(page, i)
    });
}

pub fn write_thumbnail<P: Page>(diag: &mut dyn Write, page: &P, pdf_name: &str, page_index: usize) {
    let Some(filename) = naming::thumbnail_name(pdf_name, page_index) else {
        report(
            diag,
            format_args!("Filename {pdf_name}.thumbnail.{page_index}.png for saving is too long."),
        );
        return;
    };
    let Some(bitmap) = page.thumbnail_bitmap() else {
        report(
            diag,
            format_args!("Thumbnail of page #{} has an empty bitmap.", page_index + 1),
        );
        return;
    };
    match encode_bitmap(&bitmap) {
        Ok(png) => write_buffer_to_file(diag, &png, &filename, "thumbnail"),
        Err(err) => {
            debug!("thumbnail encode: {}", err);
            report(
                diag,
                format_args!(
                    "Failed to convert thumbnail of page #{} to png.",
                    page_index + 1
                ),
            );
        }
    }
}

pub fn write_decoded_thumbnail<P: Page>(
    diag: &mut dyn Write,
    page: &P,
    pdf_name: &str,
    page_index: usize,
) {
    let Some(filename) = naming::decoded_thumbnail_name(pdf_name, page_index) else {
        report(
            diag,
            format_args!(
                "Filename {pdf_name}.thumbnail.decoded.{page_index}.bin for saving is too long."
            ),
        );
        return;
    };
    let data = page.decoded_thumbnail_data();
    if data.is_empty() {
        report(
            diag,
            format_args!(
                "Failed to get decoded thumbnail for page #{}.",
                page_index + 1
            ),
        );
        return;
    }
    write_buffer_to_file(diag, &data, &filename, "decoded thumbnail");
}

pub fn write_raw_thumbnail<P: Page>(
    diag: &mut dyn Write,
    page: &P,
    pdf_name: &str,
    page_index: usize,
) {
    let Some(filename) = naming::raw_thumbnail_name(pdf_name, page_index) else {
        report(
            diag,
            format_args!(
                "Filename {pdf_name}.thumbnail.raw.{page_index}.bin for saving is too long."
            ),
        );
        return;
    };
    let data = page.raw_thumbnail_data();
    if data.is_empty() {
        report(
            diag,
            format_args!(
                "Failed to get raw thumbnail data for page #{}.",
                page_index + 1
            ),
        );
        return;
    }
    write_buffer_to_file(diag, &data, &filename, "raw thumbnail");
}
