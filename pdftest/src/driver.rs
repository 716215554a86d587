use std::io::Write;

use log::{debug, info};

use crate::bitmap::Bitmap;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::library::{
    AlwaysPause, ColorScheme, DataAvailability, DataStatus, Document, DocumentAction, FileAccess,
    FormFill, FormStatus, Library, Linearization, Page, PageAction, PageResolver, RenderArea,
    RenderStatus, SegmentHints,
};
use crate::options::{Options, OutputFormat};
use crate::output::{self, report};
use crate::pages::FormSession;
use crate::sizing::{RenderSize, SizeRequest};

/// Highlight applied to every form field, RGB.
const FIELD_HIGHLIGHT_COLOR: u32 = 0xFFE4DD;
const FIELD_HIGHLIGHT_ALPHA: u8 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed_pages: usize,
    pub bad_pages: usize,
}

/// Renders documents through a [`Library`] according to [`Options`].
///
/// Progress and per-artifact messages go to `diag`; the idle callback runs
/// after every step that may have queued library work.
pub struct Driver<'l, L: Library, W: Write> {
    library: &'l L,
    options: &'l Options,
    idler: Box<dyn FnMut() + 'l>,
    diag: W,
}

impl<'l, L: Library, W: Write> Driver<'l, L, W> {
    pub fn new(library: &'l L, options: &'l Options, diag: W) -> Self {
        library.set_clock(Clock::from_option(options.time));
        Driver {
            library,
            options,
            idler: Box::new(|| {}),
            diag,
        }
    }

    pub fn with_idler(mut self, idler: impl FnMut() + 'l) -> Self {
        self.idler = Box::new(idler);
        self
    }

    pub fn into_diagnostics(self) -> W {
        self.diag
    }

    pub fn idle(&mut self) {
        (self.idler)();
    }

    /// Renders the requested pages of one file. Document level failures are
    /// reported on the diagnostics stream and returned; page level failures
    /// only count as bad pages.
    pub fn process_pdf(&mut self, name: &str, out_name: &str, data: &[u8]) -> Result<RunSummary> {
        let result = self.run_document(name, out_name, data);
        if let Err(err) = &result {
            report(&mut self.diag, format_args!("{err}"));
        }
        result
    }

    fn size_request(&self) -> Result<SizeRequest> {
        Ok(SizeRequest {
            scale: self.options.scale()?,
            width: self.options.width_override()?,
            height: self.options.height_override()?,
            maintain_aspect_ratio: self.options.maintain_aspect_ratio,
            allow_enlargement: self.options.allow_enlargement,
        })
    }

    fn run_document(&mut self, name: &str, out_name: &str, data: &[u8]) -> Result<RunSummary> {
        let options = self.options;
        let library = self.library;
        let request = self.size_request()?;
        let password = options.password.as_deref();
        let limit = options.avail_poll_limit;

        let mut avail = library.create_availability(FileAccess::new(data));
        let mut hints = SegmentHints::default();
        let (document, linearized) = if options.use_load_mem_document {
            debug!("loading {} from memory", name);
            (library.load_mem_document(data, password)?, false)
        } else if avail.is_linearized() == Linearization::Linearized {
            debug!("loading linearized {}", name);
            let document = library.availability_document(&mut avail, password)?;
            let status = poll(limit, "document", DataStatus::NotAvailable, || {
                avail.is_doc_avail(&mut hints)
            })?;
            if status == DataStatus::Error {
                return Err(Error::DocumentUnavailable);
            }
            let form_status = avail.is_form_avail(&mut hints);
            if matches!(form_status, FormStatus::Error | FormStatus::NotAvailable) {
                return Err(Error::FormUnavailable(form_status));
            }
            (document, true)
        } else {
            debug!("loading {} through the block reader", name);
            (
                library.load_custom_document(FileAccess::new(data), password)?,
                false,
            )
        };

        if !document.has_valid_cross_reference_table() {
            report(
                &mut self.diag,
                format_args!("Document has invalid cross reference table"),
            );
        }

        let session = FormSession::new(&document);
        let form = session.form();
        form.set_field_highlight(FIELD_HIGHLIGHT_COLOR, FIELD_HIGHLIGHT_ALPHA);
        form.do_document_js_action(&session);
        form.do_document_open_action(&session);

        let page_count = document.page_count();
        let (first, last) = match options.pages {
            Some(range) => (range.first, range.last.saturating_add(1)),
            None => (0, page_count),
        };
        let single_page = first.checked_add(1) == Some(last);
        // requested pages past the end count as bad without being loaded
        let end = last.min(page_count);
        info!(
            "{}: {} pages, rendering {} to {}",
            name, page_count, first, last
        );

        let mut summary = RunSummary {
            processed_pages: 0,
            bad_pages: last.saturating_sub(first.max(end)),
        };
        for index in first..end {
            if linearized {
                let status = poll(limit, "page", DataStatus::NotAvailable, || {
                    avail.is_page_avail(index, &mut hints)
                })?;
                if status == DataStatus::Error {
                    return Err(Error::PageUnavailable(index));
                }
            }
            if self.process_page(&session, name, out_name, index, single_page, &request) {
                summary.processed_pages += 1;
            } else {
                summary.bad_pages += 1;
            }
            self.idle();
        }
        debug!("{} download hints requested", hints.requested());

        form.do_document_action(DocumentAction::WillClose, &session);
        self.idle();

        report(
            &mut self.diag,
            format_args!("Processed {} pages.", summary.processed_pages),
        );
        if summary.bad_pages > 0 {
            report(
                &mut self.diag,
                format_args!("Skipped {} bad pages.", summary.bad_pages),
            );
        }
        Ok(summary)
    }

    fn write_artifacts<D: Document>(&mut self, document: &D, page: &D::Page, name: &str, index: usize) {
        let options = self.options;
        let diag: &mut dyn Write = &mut self.diag;
        if options.save_images {
            output::write_images(diag, page, name, index);
        }
        if options.save_rendered_images {
            output::write_rendered_images(diag, document, page, name, index);
        }
        if options.save_thumbnails {
            output::write_thumbnail(diag, page, name, index);
        }
        if options.save_thumbnails_decoded {
            output::write_decoded_thumbnail(diag, page, name, index);
        }
        if options.save_thumbnails_raw {
            output::write_raw_thumbnail(diag, page, name, index);
        }
    }

    /// Returns whether the page was rendered.
    fn process_page<D: Document>(
        &mut self,
        session: &FormSession<'_, D>,
        name: &str,
        out_name: &str,
        index: usize,
        single_page: bool,
        request: &SizeRequest,
    ) -> bool {
        let Some(page) = session.page_for_index(index) else {
            debug!("page {} could not be loaded", index);
            return false;
        };
        let page: &D::Page = &page;
        let form = session.form();
        let options = self.options;

        self.write_artifacts(session.document(), page, name, index);

        let size = RenderSize::compute(page.width(), page.height(), request);
        let area = RenderArea {
            width: size.render_width,
            height: size.render_height,
        };
        let alpha = page.has_transparency();
        let flags = options.page_render_flags();

        let rendered = match Bitmap::new(size.image_width, size.image_height, alpha) {
            Some(mut bitmap) => {
                let fill = if alpha { 0x00000000 } else { 0xFFFFFFFF };
                bitmap.fill_rect(0, 0, size.image_width, size.image_height, fill);

                if options.render_oneshot {
                    page.render(&mut bitmap, area, flags);
                } else {
                    let colors = ColorScheme::sample();
                    let mut pause = AlwaysPause;
                    let mut status = page.render_start(
                        &mut bitmap,
                        area,
                        flags,
                        options.forced_color.then_some(&colors),
                        &mut pause,
                    );
                    while status == RenderStatus::ToBeContinued {
                        self.idle();
                        status = page.render_continue(&mut bitmap, &mut pause);
                    }
                    debug!("page {} progressive render ended {:?}", index, status);
                }

                form.draw(page, &mut bitmap, area, flags);
                self.idle();

                if !options.render_oneshot {
                    page.render_close();
                    self.idle();
                }

                match options.output_format {
                    OutputFormat::Png => {
                        if let Some(filename) =
                            output::write_page_png(&mut self.diag, &bitmap, out_name, index, single_page)
                        {
                            info!("page {} written to {}", index, filename);
                        }
                    }
                }
                true
            }
            None => {
                report(&mut self.diag, format_args!("Page was too large to be rendered."));
                false
            }
        };

        form.do_page_action(page, PageAction::Close, session);
        self.idle();
        form.on_before_close_page(page);
        self.idle();
        rendered
    }
}

/// Reads a whole input file.
pub fn read_file(path: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::Read {
        path: path.to_string(),
        source,
    })
}

/// Calls `check` until it returns something other than `pending`, giving up
/// after `limit` calls when a limit is set.
fn poll<S: Copy + PartialEq>(
    limit: Option<u64>,
    what: &str,
    pending: S,
    mut check: impl FnMut() -> S,
) -> Result<S> {
    let mut attempts = 0u64;
    loop {
        let status = check();
        attempts += 1;
        if status != pending {
            return Ok(status);
        }
        if limit.is_some_and(|limit| attempts >= limit) {
            return Err(Error::PollLimit {
                what: what.to_string(),
                attempts,
            });
        }
    }
}
