use std::ffi::OsString;

use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use pdftest::{Options, OutputFormat, PageRange};

/// Renders PDF pages to PNG through pdfium.
#[derive(Parser, Debug)]
#[command(
    name = "pdfium_test",
    author,
    version,
    about,
    long_about = None,
    override_usage = "pdfium_test [OPTION] [INPUT FILE] [OUTPUT FILE]"
)]
pub struct Cli {
    /// Print build options and exit
    #[arg(long)]
    pub show_config: bool,

    /// Load the document from memory instead of through a block reader
    #[arg(long)]
    pub mem_document: bool,

    /// Render in one pass instead of progressively
    #[arg(long)]
    pub render_oneshot: bool,

    /// Render text optimized for LCD displays
    #[arg(long)]
    pub lcd_text: bool,

    /// Render without the native text output
    #[arg(long)]
    pub no_nativetext: bool,

    /// Render grayscale output
    #[arg(long)]
    pub grayscale: bool,

    /// Render in forced color mode
    #[arg(long)]
    pub forced_color: bool,

    /// Render fill as stroke in forced color mode
    #[arg(long)]
    pub fill_to_stroke: bool,

    /// Render limiting the image cache size
    #[arg(long)]
    pub limit_cache: bool,

    /// Render forcing halftone
    #[arg(long)]
    pub force_halftone: bool,

    /// Render as if for printing
    #[arg(long)]
    pub printing: bool,

    /// Render without text anti-aliasing
    #[arg(long)]
    pub no_smoothtext: bool,

    /// Render without image anti-aliasing
    #[arg(long)]
    pub no_smoothimage: bool,

    /// Render without path anti-aliasing
    #[arg(long)]
    pub no_smoothpath: bool,

    /// Render to RGBA instead of BGRA
    #[arg(long)]
    pub reverse_byte_order: bool,

    /// Write raw embedded images <pdf-name>.<page-number>.<object-number>.png
    #[arg(long, conflicts_with = "save_rendered_images")]
    pub save_images: bool,

    /// Write embedded images as rendered on the page <pdf-name>.<page-number>.<object-number>.png
    #[arg(long)]
    pub save_rendered_images: bool,

    /// Write page thumbnails <pdf-name>.thumbnail.<page-number>.png
    #[arg(long = "save-thumbs")]
    pub save_thumbs: bool,

    /// Write the decoded thumbnail stream <pdf-name>.thumbnail.decoded.<page-number>.bin
    #[arg(long = "save-thumbs-dec")]
    pub save_thumbs_dec: bool,

    /// Write the raw thumbnail stream <pdf-name>.thumbnail.raw.<page-number>.bin
    #[arg(long = "save-thumbs-raw")]
    pub save_thumbs_raw: bool,

    /// Write page images <out-name>.<page-number>.png
    #[arg(long)]
    pub png: bool,

    /// Password to decrypt the PDF with
    #[arg(long, require_equals = true, value_name = "SECRET", value_parser = NonEmptyStringValueParser::new())]
    pub password: Option<String>,

    /// Scale output size by a number (e.g. 0.5)
    #[arg(long, require_equals = true, value_name = "NUMBER", value_parser = NonEmptyStringValueParser::new())]
    pub scale: Option<String>,

    /// Only render the given 0-based page(s)
    #[arg(long, alias = "page", require_equals = true, value_name = "N[-M]")]
    pub pages: Option<PageRange>,

    /// Seconds since the epoch to pin the library clock to
    #[arg(long, require_equals = true, value_name = "SECONDS", value_parser = parse_time)]
    pub time: Option<i64>,

    /// Override page width in pixels
    #[arg(long, require_equals = true, value_name = "WIDTH", value_parser = NonEmptyStringValueParser::new())]
    pub width: Option<String>,

    /// Override page height in pixels
    #[arg(long, require_equals = true, value_name = "HEIGHT", value_parser = NonEmptyStringValueParser::new())]
    pub height: Option<String>,

    /// Maintain the aspect ratio when resizing the page
    #[arg(long)]
    pub maintain_aspect_ratio: bool,

    /// When maintaining the aspect ratio, allow one side to exceed the given width/height
    #[arg(long)]
    pub allow_enlargement: bool,

    /// Give up on linearized data after this many availability checks
    #[arg(long, require_equals = true, value_name = "N")]
    pub avail_poll_limit: Option<u64>,

    /// Input PDF followed by the output name
    #[arg(value_name = "FILE")]
    pub files: Vec<String>,
}

fn parse_time(value: &str) -> Result<i64, String> {
    let time: i64 = value
        .parse()
        .map_err(|_| format!("Invalid --time argument {value}"))?;
    if time < 0 {
        return Err("Invalid --time argument, must be non-negative".to_string());
    }
    Ok(time)
}

impl Cli {
    /// Parses a command line whose flags all start with `--`. The first
    /// token that does not ends the flags, so `-in.pdf` names a file.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let split = args
            .iter()
            .skip(1)
            .position(|arg| !arg.to_string_lossy().starts_with("--"))
            .map_or(args.len(), |pos| pos + 1);
        let files = args.split_off(split);
        if args.iter().skip(1).any(|arg| arg == "--") {
            let mut command = Cli::command();
            return Err(command.error(ErrorKind::UnknownArgument, "Unrecognized argument --"));
        }
        args.push(OsString::from("--"));
        args.extend(files);
        Cli::try_parse_from(args)
    }

    pub fn options(&self) -> Options {
        Options {
            show_config: self.show_config,
            use_load_mem_document: self.mem_document,
            render_oneshot: self.render_oneshot,
            lcd_text: self.lcd_text,
            no_nativetext: self.no_nativetext,
            grayscale: self.grayscale,
            forced_color: self.forced_color,
            fill_to_stroke: self.fill_to_stroke,
            limit_cache: self.limit_cache,
            force_halftone: self.force_halftone,
            printing: self.printing,
            no_smoothtext: self.no_smoothtext,
            no_smoothimage: self.no_smoothimage,
            no_smoothpath: self.no_smoothpath,
            reverse_byte_order: self.reverse_byte_order,
            save_images: self.save_images,
            save_rendered_images: self.save_rendered_images,
            save_thumbnails: self.save_thumbs,
            save_thumbnails_decoded: self.save_thumbs_dec,
            save_thumbnails_raw: self.save_thumbs_raw,
            // png is the only output format
            output_format: OutputFormat::Png,
            password: self.password.clone(),
            scale_factor: self.scale.clone(),
            pages: self.pages,
            time: self.time,
            width: self.width.clone(),
            height: self.height.clone(),
            maintain_aspect_ratio: self.maintain_aspect_ratio,
            allow_enlargement: self.allow_enlargement,
            avail_poll_limit: self.avail_poll_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_args(std::iter::once("pdfium_test").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["in.pdf", "out"]).unwrap();
        assert_eq!(cli.files, vec!["in.pdf", "out"]);
        let options = cli.options();
        assert_eq!(options, Options {
            output_format: OutputFormat::Png,
            ..Default::default()
        });
    }

    #[test]
    fn test_flags_and_values() {
        let cli = parse(&[
            "--render-oneshot",
            "--lcd-text",
            "--save-thumbs-raw",
            "--password=secret",
            "--scale=0.5",
            "--pages=1-3",
            "--time=1000",
            "--width=300",
            "--avail-poll-limit=20",
            "in.pdf",
            "out",
        ])
        .unwrap();
        let options = cli.options();
        assert!(options.render_oneshot);
        assert!(options.lcd_text);
        assert!(options.save_thumbnails_raw);
        assert_eq!(options.password.as_deref(), Some("secret"));
        assert_eq!(options.scale_factor.as_deref(), Some("0.5"));
        assert_eq!(options.pages, Some(PageRange { first: 1, last: 3 }));
        assert_eq!(options.time, Some(1000));
        assert_eq!(options.width.as_deref(), Some("300"));
        assert_eq!(options.avail_poll_limit, Some(20));
    }

    #[test]
    fn test_page_alias() {
        let cli = parse(&["--page=4", "in.pdf", "out"]).unwrap();
        assert_eq!(cli.pages, Some(PageRange { first: 4, last: 4 }));
    }

    #[test]
    fn test_save_images_conflict_either_order() {
        let err = parse(&["--save-images", "--save-rendered-images", "a", "b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        let err = parse(&["--save-rendered-images", "--save-images", "a", "b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_duplicate_flags() {
        assert!(parse(&["--png", "--png", "a", "b"]).is_err());
        assert!(parse(&["--scale=1", "--scale=2", "a", "b"]).is_err());
        assert!(parse(&["--pages=1", "--page=2", "a", "b"]).is_err());
    }

    #[test]
    fn test_values_need_equals() {
        assert!(parse(&["--password", "secret", "a", "b"]).is_err());
        assert!(parse(&["--password=", "a", "b"]).is_err());
        assert!(parse(&["--scale=", "a", "b"]).is_err());
    }

    #[test]
    fn test_bad_numbers() {
        assert!(parse(&["--pages=x", "a", "b"]).is_err());
        assert!(parse(&["--pages=1-", "a", "b"]).is_err());
        assert!(parse(&["--time=-1", "a", "b"]).is_err());
        assert!(parse(&["--time=soon", "a", "b"]).is_err());
        assert!(parse(&["--avail-poll-limit=-3", "a", "b"]).is_err());
    }

    #[test]
    fn test_unknown_flag() {
        let err = parse(&["--bogus", "a", "b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_single_dash_names_are_files() {
        let cli = parse(&["--png", "-in.pdf", "out"]).unwrap();
        assert!(cli.png);
        assert_eq!(cli.files, vec!["-in.pdf", "out"]);

        let cli = parse(&["-", "-out"]).unwrap();
        assert_eq!(cli.files, vec!["-", "-out"]);
    }

    #[test]
    fn test_bare_double_dash_is_rejected() {
        let err = parse(&["--", "in.pdf", "out"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(err.to_string().contains("Unrecognized argument --"));

        let err = parse(&["--png", "--", "in.pdf", "out"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_unknown_flag_before_files() {
        let err = parse(&["--png", "--bogus", "-in.pdf", "out"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_help_and_no_files() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        let cli = parse(&["--show-config"]).unwrap();
        assert!(cli.show_config);
        assert!(cli.files.is_empty());
    }

    #[test]
    fn test_first_positional_ends_flags() {
        let cli = parse(&["in.pdf", "--png", "out"]).unwrap();
        assert!(!cli.png);
        assert_eq!(cli.files, vec!["in.pdf", "--png", "out"]);
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("0"), Ok(0));
        assert_eq!(
            parse_time("-5"),
            Err("Invalid --time argument, must be non-negative".to_string())
        );
    }
}
