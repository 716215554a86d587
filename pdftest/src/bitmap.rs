/// Pixel layouts the library renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapFormat {
    Unknown,
    /// 8-bit gray.
    Gray,
    /// 24-bit BGR.
    Bgr,
    /// 32-bit BGR with an unused fourth byte.
    Bgrx,
    /// 32-bit BGRA.
    Bgra,
}

impl BitmapFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            BitmapFormat::Unknown => 0,
            BitmapFormat::Gray => 1,
            BitmapFormat::Bgr => 3,
            BitmapFormat::Bgrx | BitmapFormat::Bgra => 4,
        }
    }
}

/// A device bitmap shared between the driver and the rendering library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: i32,
    height: i32,
    stride: i32,
    format: BitmapFormat,
    buffer: Vec<u8>,
}

impl Bitmap {
    /// Allocates a 32-bit bitmap, BGRA when `alpha` is set and BGRx otherwise.
    ///
    /// Returns `None` for empty or oversized dimensions, or when the buffer
    /// cannot be allocated.
    pub fn new(width: i32, height: i32, alpha: bool) -> Option<Self> {
        let format = if alpha {
            BitmapFormat::Bgra
        } else {
            BitmapFormat::Bgrx
        };
        Self::with_format(width, height, format)
    }

    pub fn with_format(width: i32, height: i32, format: BitmapFormat) -> Option<Self> {
        if width <= 0 || height <= 0 || format == BitmapFormat::Unknown {
            return None;
        }
        let row = (width as usize).checked_mul(format.bytes_per_pixel())?;
        // rows are padded to 4 bytes
        let stride = row.checked_add(3)? / 4 * 4;
        let size = stride.checked_mul(height as usize)?;
        if size > i32::MAX as usize {
            return None;
        }
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size).ok()?;
        buffer.resize(size, 0);
        Some(Bitmap {
            width,
            height,
            stride: stride as i32,
            format,
            buffer,
        })
    }

    /// Wraps an existing pixel buffer without validating it.
    pub fn from_raw(
        width: i32,
        height: i32,
        stride: i32,
        format: BitmapFormat,
        buffer: Vec<u8>,
    ) -> Self {
        Bitmap {
            width,
            height,
            stride,
            format,
            buffer,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn stride(&self) -> i32 {
        self.stride
    }

    pub fn format(&self) -> BitmapFormat {
        self.format
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Fills a rectangle with an ARGB color, clipped to the bitmap.
    pub fn fill_rect(&mut self, left: i32, top: i32, width: i32, height: i32, color: u32) {
        let [a, r, g, b] = color.to_be_bytes();
        let pixel = match self.format {
            BitmapFormat::Unknown => return,
            BitmapFormat::Gray => [gray(r, g, b), 0, 0, 0],
            BitmapFormat::Bgr => [b, g, r, 0],
            BitmapFormat::Bgrx | BitmapFormat::Bgra => [b, g, r, a],
        };
        let bpp = self.format.bytes_per_pixel();
        let pixel = &pixel[..bpp];
        let x0 = left.clamp(0, self.width) as usize;
        let x1 = left.saturating_add(width).clamp(0, self.width) as usize;
        let y0 = top.clamp(0, self.height) as usize;
        let y1 = top.saturating_add(height).clamp(0, self.height) as usize;
        if x1 <= x0 {
            return;
        }
        for y in y0..y1 {
            let start = y * self.stride as usize;
            let Some(row) = self.buffer.get_mut(start + x0 * bpp..start + x1 * bpp) else {
                return;
            };
            for chunk in row.chunks_exact_mut(bpp) {
                chunk.copy_from_slice(pixel);
            }
        }
    }
}

fn gray(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000) as u8
}
