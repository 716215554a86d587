/// Output geometry for one page.
///
/// `render_*` is the box handed to the library, `image_*` the bitmap it is
/// drawn into. They only differ when the aspect ratio is kept without
/// enlargement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSize {
    pub render_width: i32,
    pub render_height: i32,
    pub image_width: i32,
    pub image_height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeRequest {
    pub scale: f64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub maintain_aspect_ratio: bool,
    pub allow_enlargement: bool,
}

impl Default for SizeRequest {
    fn default() -> Self {
        SizeRequest {
            scale: 1.0,
            width: None,
            height: None,
            maintain_aspect_ratio: false,
            allow_enlargement: false,
        }
    }
}

impl RenderSize {
    pub fn compute(page_width: f32, page_height: f32, request: &SizeRequest) -> Self {
        let render_width = (f64::from(page_width) * request.scale) as i32;
        let render_height = (f64::from(page_height) * request.scale) as i32;
        let natural = RenderSize {
            render_width,
            render_height,
            image_width: render_width,
            image_height: render_height,
        };

        // An unset override behaves as -1 in the aspect arithmetic below.
        let mut width = request.width.unwrap_or(-1);
        let mut height = request.height.unwrap_or(-1);
        if width <= 0 && height <= 0 {
            return natural;
        }

        let calc_aspect_height = scale_axis(render_height, width, render_width);
        let calc_aspect_width = scale_axis(render_width, height, render_height);
        if height < 0 {
            height = calc_aspect_height;
        } else if width < 0 {
            width = calc_aspect_width;
        }

        match (request.maintain_aspect_ratio, request.allow_enlargement) {
            (true, true) => {
                let render_width = width.max(calc_aspect_width);
                let render_height = height.max(calc_aspect_height);
                RenderSize {
                    render_width,
                    render_height,
                    image_width: render_width,
                    image_height: render_height,
                }
            }
            (true, false) => RenderSize {
                render_width: width.min(calc_aspect_width),
                render_height: height.min(calc_aspect_height),
                image_width: width,
                image_height: height,
            },
            (false, _) => RenderSize {
                render_width: width,
                render_height: height,
                image_width: width,
                image_height: height,
            },
        }
    }
}

/// `value * numerator / denominator` in integer arithmetic, truncating toward
/// zero. A zero denominator yields zero.
fn scale_axis(value: i32, numerator: i32, denominator: i32) -> i32 {
    if denominator == 0 {
        return 0;
    }
    let scaled = i64::from(value) * i64::from(numerator) / i64::from(denominator);
    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
