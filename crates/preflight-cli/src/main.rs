//! Preflight CLI - prepare configuration, components and installer manifests before an upgrade

use clap::{Args, Parser, Subcommand};
use preflight_core::RuntimeValues;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

use error::Result;

#[derive(Parser)]
#[command(name = "preflight")]
#[command(author = "Preflight Contributors")]
#[command(version)]
#[command(about = "Prepare configuration, components and installer manifests before a cluster upgrade", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

/// Values applied last, over anything declared in override files
#[derive(Args, Debug, Clone, Default)]
struct RuntimeArgs {
    /// Cluster domain
    #[arg(long, env = "PREFLIGHT_DOMAIN", default_value = "")]
    domain: String,

    /// TLS certificate
    #[arg(long, env = "PREFLIGHT_TLS_CERT", default_value = "", hide_env_values = true)]
    tls_cert: String,

    /// TLS private key
    #[arg(long, env = "PREFLIGHT_TLS_KEY", default_value = "", hide_env_values = true)]
    tls_key: String,

    /// Admin password (stored base64-encoded)
    #[arg(long, env = "PREFLIGHT_ADMIN_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,
}

impl From<RuntimeArgs> for RuntimeValues {
    fn from(args: RuntimeArgs) -> Self {
        RuntimeValues {
            domain: args.domain,
            tls_cert: args.tls_cert,
            tls_key: args.tls_key,
            password: args.password,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Merge override files and runtime values into the final configuration
    Config {
        /// Override file(s), merged in order
        #[arg(short = 'f', long = "overrides")]
        overrides: Vec<PathBuf>,

        #[command(flatten)]
        runtime: RuntimeArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Print secret values instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },

    /// List the components of a components declaration
    Components {
        /// Components file (flat list or installation resource)
        file: PathBuf,

        /// Namespace shown for components that declare none
        #[arg(long, default_value = "kyma-system")]
        default_namespace: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read or replace the installer image in a manifest file
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },

    /// Check whether an upgrade between two versions is allowed
    CheckUpgrade {
        /// Currently installed version
        installed: String,

        /// Version to upgrade to
        target: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every upgrade preparation step
    Prepare {
        /// Installation status reported by the installer
        #[arg(long, default_value = "Installed")]
        state: String,

        /// Currently installed version
        #[arg(long)]
        installed: String,

        /// Version to upgrade to
        #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
        target: String,

        /// Installer manifest file
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Components file
        #[arg(long)]
        components: Option<PathBuf>,

        /// Override file(s), merged in order
        #[arg(short = 'f', long = "overrides")]
        overrides: Vec<PathBuf>,

        /// Replace the installer image with this reference
        #[arg(long)]
        image: Option<String>,

        /// Write the patched manifest here
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        runtime: RuntimeArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ImageAction {
    /// Print the installer image
    Get {
        /// Manifest file (multi-document YAML)
        manifest: PathBuf,

        /// Installer container name
        #[arg(long, default_value = preflight_core::installer::DEFAULT_INSTALLER_CONTAINER)]
        container: String,
    },

    /// Replace the installer image
    Set {
        /// Manifest file (multi-document YAML)
        manifest: PathBuf,

        /// New image reference
        image: String,

        /// Installer container name
        #[arg(long, default_value = preflight_core::installer::DEFAULT_INSTALLER_CONTAINER)]
        container: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Config {
            overrides,
            runtime,
            json,
            show_secrets,
        } => commands::config::run(&overrides, runtime.into(), json, show_secrets),

        Commands::Components {
            file,
            default_namespace,
            json,
        } => commands::components::run(&file, &default_namespace, json),

        Commands::Image { action } => match action {
            ImageAction::Get {
                manifest,
                container,
            } => commands::image::get(&manifest, &container),
            ImageAction::Set {
                manifest,
                image,
                container,
                output,
            } => commands::image::set(&manifest, &image, &container, output.as_deref()),
        },

        Commands::CheckUpgrade {
            installed,
            target,
            json,
        } => commands::check_upgrade::run(&installed, &target, json),

        Commands::Prepare {
            state,
            installed,
            target,
            manifest,
            components,
            overrides,
            image,
            output,
            runtime,
            json,
        } => commands::prepare::run(commands::prepare::PrepareArgs {
            state,
            installed,
            target,
            manifest,
            components,
            overrides,
            image,
            output,
            runtime: runtime.into(),
            json,
        }),
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are reported as errors by clap but succeed
            let code = if err.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        tracing::debug!(code, "command failed");
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
