use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docgrab_core::{DownloadConfig, Error, SearchConfig, DEFAULT_CATALOG_URL};
use docgrab_local::{report, run_download, run_search};

#[derive(Parser, Debug)]
#[command(name = "docgrab")]
#[command(about = "Download catalog documents and search/highlight PDF corpora", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape a catalog page and download the documents it lists.
    Download(DownloadCmd),
    /// Search a PDF corpus and write highlighted copies of matching files.
    Search(SearchCmd),
}

#[derive(clap::Args, Debug)]
struct DownloadCmd {
    /// Catalog page URL.
    #[arg(long, default_value = DEFAULT_CATALOG_URL)]
    url: String,
    /// Root directory for downloads; files land in a dated subdirectory.
    #[arg(long, default_value = "downloads")]
    out: PathBuf,
    /// Also download rows whose links do not look like PDFs.
    #[arg(long)]
    all_types: bool,
    /// Skip TLS certificate verification.
    #[arg(long)]
    insecure: bool,
    /// Retry attempts per request on transient failures.
    #[arg(long, default_value_t = 3)]
    retries: u32,
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    /// Text to search for.
    query: String,
    /// Directory holding the PDF corpus.
    #[arg(long, default_value = "downloads")]
    dir: PathBuf,
    /// Root directory for highlighted output copies.
    #[arg(long, default_value = "search_output")]
    out: PathBuf,
    /// Do not open matched files when the search finishes.
    #[arg(long)]
    no_open: bool,
}

fn exit_code(err: &Error) -> i32 {
    match err {
        Error::NoTable | Error::MissingCorpus(_) => 2,
        Error::NoRows | Error::NoPdfs(_) => 3,
        _ => 1,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Download(cmd) => download(cmd),
        Commands::Search(cmd) => search(cmd),
    };
    std::process::exit(code);
}

fn download(cmd: DownloadCmd) -> i32 {
    let cfg = DownloadConfig {
        url: cmd.url,
        out_root: cmd.out,
        only_pdf: !cmd.all_types,
        verify_tls: !cmd.insecure,
        max_retries: cmd.retries,
        ..DownloadConfig::default()
    };
    match run_download(&cfg) {
        Ok(summary) => {
            println!(
                "downloaded {} file(s), {} failed, into {}",
                summary.succeeded,
                summary.failed,
                summary.dir.display()
            );
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            exit_code(&e)
        }
    }
}

fn search(cmd: SearchCmd) -> i32 {
    let cfg = SearchConfig {
        query: cmd.query,
        docs_dir: cmd.dir,
        out_root: cmd.out,
        auto_open: !cmd.no_open,
        ..SearchConfig::default()
    };
    match run_search(&cfg) {
        Ok(result) => {
            print!("{}", report::render(&result));
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            exit_code(&e)
        }
    }
}
