use std::io;
use std::process::ExitCode;

use log::{error, info};

use pdfium_backend::PdfiumLibrary;
use pdftest::library::{print_unsupported_feature, Library};
use pdftest::Driver;

mod cli;

use cli::Cli;

fn main() -> ExitCode {
    env_logger::init();
    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            if let Err(print_err) = err.print() {
                error!("failed to print usage: {}", print_err);
            }
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if cli.show_config {
        println!("{}", PdfiumLibrary::CAPABILITIES.join(","));
        return ExitCode::SUCCESS;
    }

    let [filename, out_filename] = cli.files.as_slice() else {
        eprintln!("Please specify one input file and one output file.");
        return ExitCode::FAILURE;
    };
    let options = cli.options();

    let contents = match pdftest::read_file(filename) {
        Ok(contents) => contents,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    eprintln!("Processing PDF file {filename}.");

    let library = match PdfiumLibrary::bind() {
        Ok(library) => library,
        Err(err) => {
            error!("{:?}", err);
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    library.set_unsupported_handler(Box::new(print_unsupported_feature));

    let mut driver = Driver::new(&library, &options, io::stderr());
    match driver.process_pdf(filename, out_filename, &contents) {
        Ok(summary) => {
            info!(
                "{}: {} pages processed, {} skipped",
                filename, summary.processed_pages, summary.bad_pages
            );
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
