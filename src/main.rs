//! pmaker - make packages from files already on this system.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use pmaker::build::Step;
use pmaker::commands::{self, BuildOptions};
use pmaker::config::Config;
use pmaker::logging;
use pmaker::package::{Format, PackageInfo};

#[derive(Parser)]
#[command(name = "pmaker")]
#[command(about = "Build rpm/deb packages from files, directories and symlinks")]
#[command(
    after_help = "QUICK START:\n  pmaker preflight               Check build tools\n  pmaker collect files.list -n foo  Show what would be packaged\n  pmaker build files.list -n foo    Build the package\n  pmaker show status             Show finished steps"
)]
struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Work directory (default: PMAKER_WORKDIR or ./pmaker-workdir)
    #[arg(short, long, global = true)]
    workdir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect the listed paths and build the package
    Build {
        #[command(flatten)]
        package: PackageArgs,

        /// Stop after this step (setup, preconfigure, configure, sbuild, build)
        #[arg(long, default_value = "build")]
        upto: Step,

        /// Redo steps that are already done
        #[arg(long)]
        force: bool,

        /// Build binary rpms in this mock chroot (e.g. fedora-40-x86_64)
        #[arg(long)]
        mock_root: Option<String>,
    },

    /// Collect the listed paths and save the manifest, without building
    Collect {
        #[command(flatten)]
        package: PackageArgs,
    },

    /// Check build tools and the work directory
    Preflight {
        /// Package format (default: PMAKER_FORMAT or rpm)
        #[arg(long)]
        format: Option<Format>,

        /// Build strategy (default: PMAKER_DRIVER or autotools)
        #[arg(long)]
        driver: Option<String>,

        /// Also check for mock
        #[arg(long)]
        mock: bool,

        /// Exit non-zero if any check fails
        #[arg(long)]
        strict: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Reset the work directory (default: step markers only)
    Clean {
        /// Also remove the staged tree, manifest and generated lists
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Effective configuration
    Config,
    /// Finished steps and manifest summary
    Status,
}

#[derive(Args)]
struct PackageArgs {
    /// Listing file (one path per line, or a .json record list; '-' for stdin)
    listing: PathBuf,

    /// Package name
    #[arg(short, long)]
    name: String,

    #[arg(long, default_value = "0.1")]
    pversion: String,

    #[arg(long, default_value = "1")]
    release: String,

    /// Package format (default: PMAKER_FORMAT or rpm)
    #[arg(long)]
    format: Option<Format>,

    /// Build strategy (default: PMAKER_DRIVER or autotools)
    #[arg(long)]
    driver: Option<String>,

    /// Strip this prefix from every install path
    #[arg(long)]
    destdir: Option<String>,

    /// Don't consult the rpm database (no metadata, no conflict detection)
    #[arg(long)]
    no_rpmdb: bool,

    /// Package every object as owned by root
    #[arg(long)]
    ignore_owner: bool,

    #[arg(long)]
    summary: Option<String>,

    #[arg(long)]
    license: Option<String>,

    #[arg(long)]
    url: Option<String>,
}

impl PackageArgs {
    fn into_options(self, workdir: PathBuf, config: &Config) -> BuildOptions {
        let mut package = PackageInfo::new(&self.name, self.format.unwrap_or(config.format));
        package.version = self.pversion;
        package.release = self.release;
        if let Some(summary) = self.summary {
            package.summary = summary;
        }
        if let Some(license) = self.license {
            package.license = license;
        }
        package.url = self.url;
        if let Some(packager) = &config.packager {
            package.packager = packager.clone();
        }
        if let Some(email) = &config.email {
            package.email = email.clone();
        }

        let mut opts = BuildOptions::new(&self.listing, &workdir, package);
        opts.driver = self.driver.unwrap_or_else(|| config.driver.clone());
        opts.destdir = self.destdir;
        opts.no_rpmdb = self.no_rpmdb;
        opts.ignore_owner = self.ignore_owner;
        opts
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let base_dir = std::env::current_dir()?;
    let config = Config::load(&base_dir);
    let workdir = cli.workdir.unwrap_or_else(|| config.workdir.clone());

    match cli.command {
        Commands::Build {
            package,
            upto,
            force,
            mock_root,
        } => {
            let mut opts = package.into_options(workdir, &config);
            opts.upto = upto;
            opts.force = force;
            opts.mock_root = mock_root;
            commands::cmd_build(&opts, &config)?;
        }

        Commands::Collect { package } => {
            let opts = package.into_options(workdir, &config);
            commands::cmd_collect(&opts, &config)?;
        }

        Commands::Preflight {
            format,
            driver,
            mock,
            strict,
        } => {
            commands::cmd_preflight(
                &workdir,
                driver.as_deref().unwrap_or(&config.driver),
                format.unwrap_or(config.format),
                true,
                mock,
                strict,
            )?;
        }

        Commands::Show { what } => {
            let target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Status => commands::show::ShowTarget::Status,
            };
            commands::cmd_show(&workdir, target, &config)?;
        }

        Commands::Clean { all } => {
            let target = if all {
                commands::clean::CleanTarget::All
            } else {
                commands::clean::CleanTarget::Markers
            };
            commands::cmd_clean(&workdir, target)?;
        }
    }

    Ok(())
}
