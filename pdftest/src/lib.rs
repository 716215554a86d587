pub mod bitmap;
pub mod clock;
pub mod driver;
pub mod encode;
pub mod error;
pub mod library;
pub mod naming;
pub mod options;
pub mod output;
pub mod pages;
pub mod sizing;

pub use driver::{read_file, Driver, RunSummary};
pub use error::{Error, Result};
pub use options::{Options, OutputFormat, PageRange, RenderFlags};
