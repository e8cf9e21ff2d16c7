use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tower::Service;
use tracing::error;
use tracing_subscriber::EnvFilter;

use image_scraper::config::{DEFAULT_COUNT, DEFAULT_OUTPUT_DIR, DEFAULT_QUERY};
use image_scraper::{Provider, ScrapeReport, ScrapeRequest, ScraperService};

/// 画像検索ページから画像をダウンロードする
#[derive(Debug, Parser)]
#[command(name = "image-scraper", version)]
struct Cli {
    /// 画像検索サイト
    #[arg(short = 'w', long = "webpage", value_enum, ignore_case = true)]
    webpage: Provider,

    /// ブラウザを表示して実行し、デバッグログを出す
    #[arg(short, long)]
    debug: bool,

    /// 検索語
    #[arg(short, long, default_value = DEFAULT_QUERY)]
    query: String,

    /// 取得枚数
    #[arg(short = 'n', long, default_value_t = DEFAULT_COUNT, value_parser = parse_count)]
    count: usize,

    /// 保存先ディレクトリ
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Chrome / Chromium の実行ファイル
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,

    /// 実行レポートをJSONで標準出力に書く
    #[arg(long)]
    json: bool,
}

fn parse_count(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("1以上を指定してください".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// RUST_LOG（無ければ info）を基本にし、--debug 時はクレートを debug に上げる
fn build_filter(env: Option<&str>, debug: bool) -> EnvFilter {
    let filter = env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    if !debug {
        return filter;
    }
    match "image_scraper=debug".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

fn init_tracing(debug: bool) {
    let env = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(env.as_deref(), debug))
        .init();
}

fn print_report(report: &ScrapeReport, json: bool) {
    println!(
        "{}/{} images downloaded ({} failed)",
        report.downloaded(),
        report.requested,
        report.failed()
    );

    if json {
        match serde_json::to_string_pretty(report) {
            Ok(body) => println!("{}", body),
            Err(e) => error!("Failed to serialize report: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let mut request = ScrapeRequest::new(cli.webpage, cli.query)
        .with_count(cli.count)
        .with_output_dir(cli.output)
        .with_headless(!cli.debug);
    if let Some(path) = cli.chrome {
        request = request.with_chrome_executable(path);
    }

    let mut service = ScraperService::new();
    match service.call(request).await {
        Ok(report) => {
            print_report(&report, cli.json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Scrape failed: {}", e);
            eprintln!("[ ERR ]: {}", e);
            ExitCode::FAILURE
        }
    }
}
