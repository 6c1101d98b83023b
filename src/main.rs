use clap::{Args as ClapArgs, Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use marketing_screenshots::config::{
    Config, DEFAULT_TEST_ATTEMPTS, DEFAULT_TEST_PLAN, ENV_RETRIES, ENV_SCHEME, ENV_TEST_PLAN,
};
use marketing_screenshots::device::DEVICES;
use marketing_screenshots::process::SystemRunner;
use marketing_screenshots::{HarnessConfig, RunReport, resolve_targets, run_extraction, run_harness};

/// Marketing Screenshots - App Store screenshots from Xcode UI tests
#[derive(Parser, Debug)]
#[command(
    name = "marketing-screenshots",
    about = "Run an Xcode UI test plan on simulators and export the screenshots it captures",
    after_help = "ENVIRONMENT VARIABLES:\n\
        MARKETING_SCREENSHOTS_SCHEME              Xcode scheme to test\n\
        MARKETING_SCREENSHOTS_TEST_PLAN           Test plan name (default: Marketing)\n\
        MARKETING_SCREENSHOTS_RETRIES             Attempts per test run (default: 5)\n\
        MARKETING_SCREENSHOTS_EXPORT_DIR          Export folder inside the project\n\
        MARKETING_SCREENSHOTS_DERIVED_DATA_DIR    Derived data folder inside the project\n\
        MARKETING_SCREENSHOTS_XCRUN               xcrun executable\n\
        MARKETING_SCREENSHOTS_XCODEBUILD          xcodebuild executable\n\
        MARKETING_SCREENSHOTS_XCRESULTTOOL_LEGACY Pass --legacy to xcresulttool (default: true)\n\
        RUST_LOG                                  Log filter (default: info)"
)]
struct Args {
    /// Log debug output, including every external command
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Boot simulators, run the test plan and export its screenshots
    Run {
        /// Folder containing the Xcode project
        path: PathBuf,

        /// Xcode scheme to test
        #[arg(long, env = ENV_SCHEME)]
        scheme: String,

        /// Test plan producing the screenshots
        #[arg(long, env = ENV_TEST_PLAN, default_value = DEFAULT_TEST_PLAN)]
        test_plan: String,

        /// Simulator names (see `devices`), comma-separated or repeated
        #[arg(long, short = 'd', value_delimiter = ',')]
        devices: Vec<String>,

        /// Also capture the macOS app
        #[arg(long)]
        mac: bool,

        /// Attempts per `xcodebuild test` run
        #[arg(long, env = ENV_RETRIES, default_value_t = DEFAULT_TEST_ATTEMPTS)]
        retries: u32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Export screenshots from the newest result bundle without running tests
    Extract {
        /// Folder containing the Xcode project
        path: PathBuf,

        /// Simulator the result bundle was produced on
        #[arg(long, short = 'd', conflicts_with = "mac", required_unless_present = "mac")]
        device: Option<String>,

        /// The result bundle comes from the macOS app
        #[arg(long)]
        mac: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List supported simulators
    Devices,
}

#[derive(ClapArgs, Debug)]
struct OutputArgs {
    /// Stop extracting a target at its first failing screenshot
    #[arg(long)]
    fail_fast: bool,

    /// Output the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Run {
            path,
            scheme,
            test_plan,
            devices,
            mac,
            retries,
            output,
        } => {
            let targets = resolve_targets(&devices, mac)?;
            if targets.is_empty() {
                return Err("no target selected; pass --devices and/or --mac".into());
            }
            let config = Config::from_env()
                .scheme(scheme)
                .test_plan(test_plan)
                .test_attempts(retries);
            let harness_config = HarnessConfig::new(path, config)
                .targets(targets)
                .fail_fast(output.fail_fast);

            let report = run_harness(&harness_config, &SystemRunner)?;
            print_report(&report, output.json)?;
            exit_with(&report)
        }

        Commands::Extract { path, device, mac, output } => {
            let targets = resolve_targets(device.iter(), mac)?;
            let harness_config = HarnessConfig::new(path, Config::from_env())
                .targets(targets)
                .fail_fast(output.fail_fast);

            let report = run_extraction(&harness_config, &SystemRunner)?;
            print_report(&report, output.json)?;
            exit_with(&report)
        }

        Commands::Devices => {
            println!("Supported simulators:");
            for device in DEVICES {
                println!(
                    "  {:<40} {:<22} {}",
                    device.simulator_name, device.screen_description, device.key
                );
            }
            println!("  {:<40} {:<22} macOS", "macOS (--mac)", "Mac");
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &RunReport, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report.summary());
    }
    Ok(())
}

/// The printed report already carries any error; only the status is left to set
fn exit_with(report: &RunReport) -> Result<(), Box<dyn Error>> {
    match report.exit_code() {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}
