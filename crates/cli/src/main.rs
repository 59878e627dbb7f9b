use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use usertable_api::{ApiError, TableSession};
use usertable_core::{FilterPatch, RecordId, SortField, ITEMS_PER_PAGE};
use usertable_source::{HttpUserSource, SourceConfig};
use usertable_store::RecordStore;

mod browse;
mod render;

use browse::Command;

#[derive(Parser, Debug)]
#[command(name = "usertable", version, about = "Browse, filter, sort and page through the user table")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Users endpoint (bulk read with ?skip=&limit=)
    #[arg(long, global = true, env = "USERTABLE_ENDPOINT")]
    endpoint: Option<String>,

    /// Batch size requested from the endpoint
    #[arg(long, global = true, env = "USERTABLE_FETCH_LIMIT")]
    limit: Option<usize>,

    /// Request timeout in seconds (0 keeps the default)
    #[arg(long = "timeout-secs", global = true, env = "USERTABLE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Rows per page
    #[arg(long = "page-size", global = true, env = "USERTABLE_PAGE_SIZE", default_value_t = ITEMS_PER_PAGE)]
    page_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one page of the table
    List {
        /// Free-text search over name, maiden name, email and phone
        #[arg(long, short = 's')]
        search: Option<String>,
        /// male | female | other
        #[arg(long, short = 'g')]
        gender: Option<String>,
        /// Minimum age (inclusive)
        #[arg(long = "age-min")]
        age_min: Option<String>,
        /// Maximum age (inclusive)
        #[arg(long = "age-max")]
        age_max: Option<String>,
        /// Header click; repeat to cycle asc → desc → unsorted
        #[arg(long = "sort")]
        sort: Vec<String>,
        /// Requested page (out-of-range pages are clamped)
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show the detail view of one user
    Show { id: RecordId },
    /// Interactive session over stdin
    Browse,
}

fn init_tracing() {
    let env = std::env::var("USERTABLE_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("USERTABLE_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid USERTABLE_METRICS_ADDR; expected host:port");
        }
    }
}

fn source_config(cli: &Cli) -> SourceConfig {
    let mut cfg = SourceConfig::from_env();
    if let Some(url) = cli.endpoint.as_deref() { cfg.base_url = url.to_string(); }
    if let Some(limit) = cli.limit { cfg.limit = limit; }
    if let Some(secs) = cli.timeout_secs.filter(|s| *s > 0) { cfg.timeout = Duration::from_secs(secs); }
    cfg
}

fn open_session(cli: &Cli) -> Result<TableSession> {
    let cfg = source_config(cli);
    info!(endpoint = %cfg.base_url, skip = cfg.skip, limit = cfg.limit, "session: opening");
    let source = HttpUserSource::new(&cfg).context("building http client")?;
    let store = RecordStore::with_request(Arc::new(source), cfg.request());
    Ok(TableSession::with_page_size(Arc::new(store), cli.page_size))
}

async fn load(session: &mut TableSession) -> Result<()> {
    if let Err(e) = session.load().await {
        if let ApiError::Load(fe) = &e {
            eprintln!("{}", fe.user_message());
        }
        return Err(e).context("loading users");
    }
    Ok(())
}

fn print_state(session: &mut TableSession, output: Output) -> Result<()> {
    let state = session.state();
    match output {
        Output::Human => {
            print!("{}", render::table(&state));
            if let Some(rec) = state.selected.as_ref() {
                println!("\n{}", render::detail(rec));
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(&state)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let mut session = open_session(&cli)?;

    match &cli.command {
        Commands::List { search, gender, age_min, age_max, sort, page } => {
            load(&mut session).await?;
            let mut patch = FilterPatch::new();
            if let Some(q) = search { patch = patch.search(q.as_str()); }
            if let Some(g) = gender { patch = patch.gender_input(g); }
            if let Some(v) = age_min { patch = patch.age_min_input(v); }
            if let Some(v) = age_max { patch = patch.age_max_input(v); }
            session.set_filter(patch);
            for click in sort {
                let field = SortField::from_str(click)?;
                session.set_sort(field);
            }
            session.set_page(*page);
            print_state(&mut session, cli.output)?;
        }
        Commands::Show { id } => {
            load(&mut session).await?;
            let rec = session.open_detail(*id)?;
            match cli.output {
                Output::Human => println!("{}", render::detail(rec)),
                Output::Json => println!("{}", serde_json::to_string_pretty(rec)?),
            }
        }
        Commands::Browse => browse_loop(&mut session, cli.output).await?,
    }

    Ok(())
}

async fn browse_loop(session: &mut TableSession, output: Output) -> Result<()> {
    eprintln!("Loading…");
    if let Err(e) = load(session).await {
        warn!(error = %e, "initial load failed");
    }
    print_state(session, output)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            next = lines.next_line() => match next? {
                Some(line) => line,
                None => break,
            },
            _ = signal::ctrl_c() => {
                info!("Ctrl-C received; leaving browse loop");
                break;
            }
        };
        let cmd = match browse::parse(&line) {
            Ok(cmd) => cmd,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };
        match cmd {
            Command::Filter(patch) => { session.set_filter(patch); }
            Command::ClearFilters => {
                session.set_filter(FilterPatch::new().clear_search().clear_gender().clear_age_min().clear_age_max());
            }
            Command::Sort(field) => { session.set_sort(field); }
            Command::Page(n) => { session.set_page(n); }
            Command::Next => { session.next_page(); }
            Command::Prev => { session.prev_page(); }
            Command::First => { session.first_page(); }
            Command::Last => { session.last_page(); }
            Command::Show(id) => {
                if let Err(e) = session.open_detail(id) {
                    eprintln!("{e}");
                    continue;
                }
            }
            Command::Close => session.close_detail(),
            Command::Retry => {
                if let Err(e) = session.retry().await {
                    warn!(error = %e, "retry failed");
                }
            }
            Command::Help => {
                println!("{}", browse::HELP);
                continue;
            }
            Command::Quit => break,
        }
        print_state(session, output)?;
    }
    Ok(())
}
