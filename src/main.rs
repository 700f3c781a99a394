use std::path::PathBuf;
use std::process;

use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info, warn, LevelFilter};

use activity_atlas::config::{validate_accounts, MAX_ACCOUNTS};
use activity_atlas::{
    AccountCredentials, Activity, AtlasError, Authenticator, DateRange, NominatimGeocoder,
    ReportConfig, ReportGenerator, Result, StravaClient,
};

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "activity-atlas")]
#[command(about = "Combine Strava activities of several accounts into route, heatmap and location maps")]
struct Args {
    /// Account name, repeated once per account (1 to 5). Order sets legend and colour order.
    #[arg(short, long = "account", value_name = "NAME", required = true)]
    accounts: Vec<String>,

    /// Directory for the generated HTML files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Directory holding strava_token_{account}.json files
    #[arg(long, default_value = ".")]
    token_dir: PathBuf,

    /// Local port for the OAuth redirect (must match the Strava app settings)
    #[arg(long, default_value_t = activity_atlas::auth::DEFAULT_CALLBACK_PORT)]
    callback_port: u16,

    /// Only activities on or after this date (YYYY-MM-DD), overrides FROM_DATE
    #[arg(long)]
    from: Option<String>,

    /// Only activities before this date (YYYY-MM-DD), overrides TO_DATE
    #[arg(long)]
    to: Option<String>,
}

#[tokio::main]
async fn main() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("hyper", LevelFilter::Warn)
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let code = tokio::select! {
        result = run(args) => match result {
            Ok(()) => 0,
            Err(e) => {
                error!("{}", e);
                1
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping without cleanup");
            EXIT_INTERRUPTED
        }
    };

    process::exit(code);
}

async fn run(args: Args) -> Result<()> {
    validate_accounts(&args.accounts)?;

    let credentials = args
        .accounts
        .iter()
        .enumerate()
        .map(|(i, name)| AccountCredentials::from_env(i + 1, name))
        .collect::<Result<Vec<_>>>()?;

    let range = DateRange::from_env().overridden(args.from.as_deref(), args.to.as_deref());
    if !range.is_unbounded() {
        info!("Date filter: from {:?} to {:?}", range.from, range.to);
    }

    info!(
        "Combining {} account(s) (max {})",
        credentials.len(),
        MAX_ACCOUNTS
    );

    let authenticator = Authenticator::new(&args.token_dir, args.callback_port)?;
    let strava = StravaClient::new()?;
    let mut activities: Vec<Activity> = Vec::new();

    for creds in &credentials {
        info!("Processing {}...", creds.name);

        let token = match authenticator.access_token(creds).await {
            Ok(token) => token,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("{}: authentication failed, skipping account: {}", creds.name, e);
                continue;
            }
        };

        let fetched = strava.fetch_activities(&token, &creds.name, &range).await;
        if fetched.is_empty() {
            warn!("{}: no activities found", creds.name);
        } else {
            info!("{}: {} activities", creds.name, fetched.len());
            activities.extend(fetched);
        }
    }

    if activities.is_empty() {
        return Err(AtlasError::NoActivities);
    }
    info!(
        "Total: {} activities from {} accounts",
        activities.len(),
        credentials.len()
    );

    let config = ReportConfig {
        output_dir: args.output_dir,
        ..ReportConfig::default()
    };
    let mut generator = ReportGenerator::new(config, NominatimGeocoder::new()?);
    let outputs = generator.generate(&activities, &args.accounts).await?;

    let show = |p: &Option<PathBuf>| {
        p.as_ref()
            .map_or_else(|| "not created".to_string(), |p| p.display().to_string())
    };
    info!("Outputs:");
    info!("  1. Routes: {}", show(&outputs.routes));
    info!("  2. Heatmap: {}", show(&outputs.heatmap));
    info!(
        "  3. Location maps: {} ({} files)",
        show(&outputs.location_dir),
        outputs.location_maps.len()
    );
    Ok(())
}
