use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use diaka_client::{
    AsyncDiaka, DiakaConfig, DonationKind, DonationStats, EventErrorPolicy, NotificationRecord,
    TestNotification, DEFAULT_STATS_LIMIT, DEFAULT_TEST_AMOUNT, DEFAULT_TEST_MESSAGE,
    DEFAULT_TEST_NAME,
};

#[derive(Debug, Parser)]
#[command(name = "diaka")]
#[command(about = "Listen to diaka.ua donations, send test notifications and query stats")]
struct Cli {
    /// Stream/widget origin. Falls back to DIAKA_STREAM_ORIGIN env.
    #[arg(long, global = true)]
    stream_origin: Option<String>,

    /// REST API base. Falls back to DIAKA_API_ORIGIN env.
    #[arg(long, global = true)]
    api_origin: Option<String>,

    /// SSE endpoint. Falls back to DIAKA_EVENTS_URL env.
    #[arg(long, global = true)]
    events_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print donations as they arrive
    Listen {
        /// Widget URL or bare topic
        url: String,

        /// What to do with an event that cannot be enriched
        #[arg(long)]
        on_error: Option<EventErrorPolicy>,

        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Send a test notification and print the status code
    Test {
        /// Widget URL or bare topic
        url: String,

        /// Notification target (widget or goal identifier)
        #[arg(long)]
        target: String,

        #[arg(long, default_value_t = DEFAULT_TEST_AMOUNT)]
        amount: f64,

        #[arg(long, default_value = DEFAULT_TEST_NAME)]
        name: String,

        #[arg(long, default_value = DEFAULT_TEST_MESSAGE)]
        message: String,

        #[arg(long, default_value = "")]
        source: String,

        /// Send with show=false
        #[arg(long)]
        hide: bool,

        #[arg(long, default_value = "")]
        additional: String,
    },

    /// Most recent donations
    Recent {
        url: String,

        #[arg(long, default_value_t = DEFAULT_STATS_LIMIT)]
        limit: u32,

        #[command(flatten)]
        kind: KindArg,
    },

    /// Largest donations in a time window
    Top {
        url: String,

        /// Window length in seconds (86400 for one day)
        #[arg(long)]
        offset: u64,

        #[arg(long, default_value_t = DEFAULT_STATS_LIMIT)]
        limit: u32,

        #[command(flatten)]
        kind: KindArg,
    },

    /// Sum of donations in a time window
    Sum {
        url: String,

        /// Window length in seconds
        #[arg(long)]
        offset: u64,

        #[command(flatten)]
        kind: KindArg,
    },
}

#[derive(Debug, Args)]
struct KindArg {
    /// Query real donations instead of test ones
    #[arg(long)]
    paid: bool,
}

impl KindArg {
    fn kind(&self) -> DonationKind {
        if self.paid {
            DonationKind::Paid
        } else {
            DonationKind::Test
        }
    }
}

impl Cli {
    fn config(&self) -> Result<DiakaConfig, diaka_client::DiakaError> {
        let mut config = DiakaConfig::from_env()?;
        if let Some(ref origin) = self.stream_origin {
            config = config.with_stream_origin(origin);
        }
        if let Some(ref origin) = self.api_origin {
            config = config.with_api_origin(origin);
        }
        if let Some(ref url) = self.events_url {
            config = config.with_events_url(url);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;

    match cli.command {
        Command::Listen {
            url,
            on_error,
            limit,
            json,
        } => {
            let diaka = AsyncDiaka::with_config(&url, config)?;
            listen(&diaka, on_error, limit, json).await?;
        }
        Command::Test {
            url,
            target,
            amount,
            name,
            message,
            source,
            hide,
            additional,
        } => {
            let diaka = AsyncDiaka::with_config(&url, config)?;
            let notification = TestNotification::new(target)
                .with_amount(amount)
                .with_name(name)
                .with_message(message)
                .with_source(source)
                .with_show(!hide)
                .with_additional(additional);
            let status = diaka.send_test_notification(&notification).await?;
            println!("{}", status);
        }
        Command::Recent { url, limit, kind } => {
            let diaka = AsyncDiaka::with_config(&url, config)?;
            print_stats(&diaka.get_last_donations(limit, kind.kind()).await?)?;
        }
        Command::Top {
            url,
            offset,
            limit,
            kind,
        } => {
            let diaka = AsyncDiaka::with_config(&url, config)?;
            print_stats(&diaka.get_largest_donations(offset, limit, kind.kind()).await?)?;
        }
        Command::Sum { url, offset, kind } => {
            let diaka = AsyncDiaka::with_config(&url, config)?;
            print_stats(&diaka.get_amount_of_donations(offset, kind.kind()).await?)?;
        }
    }

    Ok(())
}

async fn listen(
    diaka: &AsyncDiaka,
    on_error: Option<EventErrorPolicy>,
    limit: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = diaka.session_builder();
    if let Some(policy) = on_error {
        builder = builder.event_errors(policy);
    }
    let mut notifications = builder.open();
    let mut received = 0usize;
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    info!("Listening for donations to {}", diaka.topic());

    loop {
        if limit.is_some_and(|limit| received >= limit) {
            break;
        }

        tokio::select! {
            _ = &mut interrupted => {
                info!("Interrupted, closing session");
                break;
            }
            next = notifications.next() => match next {
                Some(Ok(record)) => {
                    received += 1;
                    print_record(&record, json)?;
                }
                Some(Err(e)) => warn!("{}", e),
                None => break,
            },
        }
    }

    info!(
        "Session for {} ended after {} records ({:?})",
        diaka.topic(),
        received,
        notifications.state()
    );
    Ok(())
}

fn print_record(record: &NotificationRecord, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(record)?);
    } else {
        println!("{}", record.message_header);
        if !record.message_body.is_empty() {
            println!("  {}", record.message_body);
        }
        println!("  start: {}", record.start_music_url);
        println!("  voice: {}", record.voice_music_url);
        println!("  image: {}", record.image_url);
    }
    Ok(())
}

fn print_stats(stats: &DonationStats) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}
