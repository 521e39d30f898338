//! Build and collect commands.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::build::{BackendRegistry, BuildContext, BuildStateMachine, Step};
use crate::collect::Collector;
use crate::config::Config;
use crate::filter::FilterChain;
use crate::listing;
use crate::manifest::Manifest;
use crate::modifier::{ChainOptions, ModifierChain};
use crate::object::ObjectFactory;
use crate::owner::{OwnerCache, OwnershipIndex, RpmDb, SnapshotIndex};
use crate::package::{Format, PackageInfo};
use crate::timing::Timer;
use crate::users::IdMap;

/// Everything `build` and `collect` take from the command line, merged
/// with the configuration.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub listing: PathBuf,
    pub workdir: PathBuf,
    pub package: PackageInfo,
    pub driver: String,
    pub destdir: Option<String>,
    pub upto: Step,
    pub force: bool,
    /// Don't consult the package database at all.
    pub no_rpmdb: bool,
    /// Package everything as owned by root.
    pub ignore_owner: bool,
    pub mock_root: Option<String>,
}

impl BuildOptions {
    pub fn new(listing: &Path, workdir: &Path, package: PackageInfo) -> Self {
        Self {
            listing: listing.to_path_buf(),
            workdir: workdir.to_path_buf(),
            package,
            driver: crate::config::DEFAULT_DRIVER.to_string(),
            destdir: None,
            upto: Step::Build,
            force: false,
            no_rpmdb: false,
            ignore_owner: false,
            mock_root: None,
        }
    }

    pub fn format(&self) -> Format {
        self.package.format
    }
}

/// Open the package ownership index, or `None` if it is disabled or rpm is
/// not available on this host.
pub fn open_index(opts: &BuildOptions, config: &Config) -> Option<Box<dyn OwnershipIndex>> {
    if opts.no_rpmdb {
        return None;
    }
    if which::which("rpm").is_err() {
        info!("rpm not found, package ownership checks disabled");
        return None;
    }

    let rpmdb = RpmDb::new();
    match SnapshotIndex::load_or_refresh(&config.rpmdb_snapshot(), config.cache_expires, || {
        rpmdb.dump_all()
    }) {
        Ok(snapshot) => Some(Box::new(snapshot)),
        Err(e) => {
            warn!("package index snapshot unavailable, querying rpm per path: {:#}", e);
            Some(Box::new(OwnerCache::new(rpmdb)))
        }
    }
}

/// Read the listing and run one collection.
pub fn collect(opts: &BuildOptions, config: &Config) -> Result<Manifest> {
    let timer = Timer::start("collect");
    let targets = listing::read_listing(&opts.listing)
        .with_context(|| format!("Failed to read listing {}", opts.listing.display()))?;
    info!(targets = targets.len(), "listing parsed");

    let index = open_index(opts, config);
    let index = index.as_deref();
    let ids = IdMap::system();

    let mut factory = ObjectFactory::new(&ids);
    if let Some(index) = index {
        factory = factory.with_index(index);
    }
    let modifiers = ModifierChain::standard(&ChainOptions {
        package: opts.package.name.clone(),
        format: opts.format(),
        destdir: opts.destdir.clone(),
        reset_owner: opts.ignore_owner,
        ids: &ids,
        index,
    });

    let manifest = Collector::new(factory, FilterChain::standard(), modifiers)
        .use_index(index.is_some())
        .run(&targets)?;
    timer.finish();
    Ok(manifest)
}

/// Execute the collect command: collect and persist the manifest only.
pub fn cmd_collect(opts: &BuildOptions, config: &Config) -> Result<()> {
    let manifest = collect(opts, config)?;
    let path = manifest.save(&opts.workdir)?;

    for obj in manifest.iter() {
        let attr = obj.format_attr.as_deref().unwrap_or("");
        match &obj.conflict {
            Some(c) => println!("{} {}  (owned by {}, was {})", attr, obj.install_path, c.owner_name, c.original_path),
            None => println!("{} {}", attr, obj.install_path),
        }
    }
    let (conflicted, _) = manifest.partition();
    println!(
        "\n{} object(s), {} conflict(s), saved to {}",
        manifest.len(),
        conflicted.len(),
        path.display()
    );
    Ok(())
}

/// Execute the build command.
pub fn cmd_build(opts: &BuildOptions, config: &Config) -> Result<()> {
    let registry = BackendRegistry::standard();
    let machine = BuildStateMachine::new(&registry, &opts.driver, opts.format())?
        .force(opts.force)
        .upto(opts.upto);

    let mut ctx = BuildContext::new(&opts.workdir, opts.package.clone())
        .with_mock_root(opts.mock_root.clone());

    // Reuse the persisted manifest once staging is done.
    if opts.force || !Step::Setup.is_done(&opts.workdir) {
        ctx = ctx.with_manifest(collect(opts, config)?);
    }

    let report = machine.run(&mut ctx)?;
    println!(
        "{}: {} step(s) run, {} skipped, stopped after '{}'",
        opts.package.name_version(),
        report.executed.len(),
        report.skipped.len(),
        opts.upto
    );
    Ok(())
}
