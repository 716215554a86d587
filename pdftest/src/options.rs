use std::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

use crate::error::{Error, Result};

bitflags! {
    /// Page rendering flags understood by the rendering library.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u32 {
        const ANNOT = 0x01;
        const LCD_TEXT = 0x02;
        const NO_NATIVETEXT = 0x04;
        const GRAYSCALE = 0x08;
        const REVERSE_BYTE_ORDER = 0x10;
        const CONVERT_FILL_TO_STROKE = 0x20;
        const LIMITED_IMAGE_CACHE = 0x200;
        const FORCE_HALFTONE = 0x400;
        const PRINTING = 0x800;
        const NO_SMOOTHTEXT = 0x1000;
        const NO_SMOOTHIMAGE = 0x2000;
        const NO_SMOOTHPATH = 0x4000;
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Png,
}

/// Inclusive, zero-based page range as given by `--pages=N` or `--pages=N-M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: usize,
    pub last: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid page number '{0}'")]
pub struct PageRangeError(String);

impl FromStr for PageRange {
    type Err = PageRangeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let number = |part: &str| {
            part.parse::<usize>()
                .map_err(|_| PageRangeError(part.to_string()))
        };
        match s.split_once('-') {
            Some((first, last)) => Ok(PageRange {
                first: number(first)?,
                last: number(last)?,
            }),
            None => {
                let page = number(s)?;
                Ok(PageRange {
                    first: page,
                    last: page,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub show_config: bool,
    pub use_load_mem_document: bool,
    pub render_oneshot: bool,
    pub lcd_text: bool,
    pub no_nativetext: bool,
    pub grayscale: bool,
    pub forced_color: bool,
    pub fill_to_stroke: bool,
    pub limit_cache: bool,
    pub force_halftone: bool,
    pub printing: bool,
    pub no_smoothtext: bool,
    pub no_smoothimage: bool,
    pub no_smoothpath: bool,
    pub reverse_byte_order: bool,
    pub save_images: bool,
    pub save_rendered_images: bool,
    pub save_thumbnails: bool,
    pub save_thumbnails_decoded: bool,
    pub save_thumbnails_raw: bool,
    pub output_format: OutputFormat,
    pub password: Option<String>,
    pub scale_factor: Option<String>,
    pub pages: Option<PageRange>,
    /// Seconds since the epoch the library clock is pinned to.
    pub time: Option<i64>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub maintain_aspect_ratio: bool,
    pub allow_enlargement: bool,
    /// Upper bound on availability checks per poll; `None` polls forever.
    pub avail_poll_limit: Option<u64>,
}

impl Options {
    pub fn page_render_flags(&self) -> RenderFlags {
        let mut flags = RenderFlags::ANNOT;
        let toggles = [
            (self.lcd_text, RenderFlags::LCD_TEXT),
            (self.no_nativetext, RenderFlags::NO_NATIVETEXT),
            (self.grayscale, RenderFlags::GRAYSCALE),
            (self.fill_to_stroke, RenderFlags::CONVERT_FILL_TO_STROKE),
            (self.limit_cache, RenderFlags::LIMITED_IMAGE_CACHE),
            (self.force_halftone, RenderFlags::FORCE_HALFTONE),
            (self.printing, RenderFlags::PRINTING),
            (self.no_smoothtext, RenderFlags::NO_SMOOTHTEXT),
            (self.no_smoothimage, RenderFlags::NO_SMOOTHIMAGE),
            (self.no_smoothpath, RenderFlags::NO_SMOOTHPATH),
            (self.reverse_byte_order, RenderFlags::REVERSE_BYTE_ORDER),
        ];
        for (enabled, flag) in toggles {
            flags.set(flag, enabled);
        }
        flags
    }

    pub fn scale(&self) -> Result<f64> {
        match self.scale_factor.as_deref() {
            Some(value) => parse_number("scale", value),
            None => Ok(1.0),
        }
    }

    pub fn width_override(&self) -> Result<Option<i32>> {
        self.width
            .as_deref()
            .map(|value| parse_number("width", value))
            .transpose()
    }

    pub fn height_override(&self) -> Result<Option<i32>> {
        self.height
            .as_deref()
            .map(|value| parse_number("height", value))
            .transpose()
    }
}

fn parse_number<T: FromStr>(flag: &'static str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::InvalidNumber {
        flag,
        value: value.to_string(),
    })
}
