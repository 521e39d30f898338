//! Backends: what each build step actually does for one
//! (strategy, format) pair.
//!
//! `setup` and `preconfigure` are the same for every backend and come as
//! provided methods. `configure`, `sbuild` and `build` hand off to external
//! tools through the context's [`Invoker`].

use anyhow::{Context, Result};
use std::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::generate::GenerateInput;
use super::step::Step;
use super::BuildContext;
use crate::error::Error;
use crate::manifest::Manifest;
use crate::package::Format;
use crate::process::Cmd;

/// Runs external tool invocations for the delegated steps.
pub trait Invoker {
    fn invoke(&self, step: Step, cmd: Cmd) -> Result<()>;
}

/// Runs commands for real, with output on the terminal.
#[derive(Debug, Default)]
pub struct SystemInvoker;

impl Invoker for SystemInvoker {
    fn invoke(&self, step: Step, cmd: Cmd) -> Result<()> {
        info!(step = %step, command = %cmd.describe(), "running");
        cmd.run_interactive()?;
        Ok(())
    }
}

pub trait Backend {
    fn strategy(&self) -> &'static str;

    fn format(&self) -> Format;

    /// Host programs the delegated steps need.
    fn required_tools(&self) -> Vec<&'static str>;

    /// Stage every manifest object under `<workdir>/src`, then persist the
    /// manifest.
    fn setup(&self, ctx: &mut BuildContext) -> Result<()> {
        let manifest = ctx
            .manifest
            .as_ref()
            .context("No collected manifest to stage")?;
        let srcdir = ctx.srcdir();
        fs::create_dir_all(&srcdir)
            .with_context(|| format!("Failed to create {}", srcdir.display()))?;

        for obj in manifest.iter() {
            let dest = obj.stage(&srcdir).with_context(|| {
                format!("Failed to stage {} as {}", obj.path(), obj.install_path)
            })?;
            debug!(path = obj.path(), dest = %dest.display(), "staged");
        }

        let staged = WalkDir::new(&srcdir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .count();
        info!(objects = manifest.len(), entries = staged, "src tree ready");

        manifest.save(&ctx.workdir)?;
        Ok(())
    }

    /// Compute the manifest views and hand them to the generator.
    fn preconfigure(&self, ctx: &mut BuildContext) -> Result<()> {
        if ctx.manifest.is_none() {
            ctx.manifest = Some(Manifest::load(&ctx.workdir)?);
        }
        let manifest = ctx
            .manifest
            .as_ref()
            .context("No manifest after reload")?;
        let input = GenerateInput::new(&ctx.workdir, &ctx.package, manifest);
        ctx.generator.generate(&input)
    }

    fn configure(&self, ctx: &BuildContext) -> Result<()>;

    fn sbuild(&self, ctx: &BuildContext) -> Result<()>;

    fn build(&self, ctx: &BuildContext) -> Result<()>;

    fn run_step(&self, step: Step, ctx: &mut BuildContext) -> Result<()> {
        match step {
            Step::Setup => self.setup(ctx),
            Step::Preconfigure => self.preconfigure(ctx),
            Step::Configure => self.configure(ctx),
            Step::Sbuild => self.sbuild(ctx),
            Step::Build => self.build(ctx),
        }
    }
}

/// Every backend known to this build, keyed by (strategy, format).
///
/// Built once at startup and passed to whoever needs it.
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    pub fn standard() -> Self {
        Self::empty()
            .with(super::autotools::Autotools::new(Format::Rpm))
            .with(super::autotools::Autotools::new(Format::Deb))
            .with(super::buildrpm::Buildrpm)
    }

    /// Register `backend`, replacing any backend with the same key.
    pub fn with(mut self, backend: impl Backend + 'static) -> Self {
        self.backends
            .retain(|b| (b.strategy(), b.format()) != (backend.strategy(), backend.format()));
        self.backends.push(Box::new(backend));
        self
    }

    pub fn resolve(&self, strategy: &str, format: Format) -> crate::Result<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.strategy() == strategy && b.format() == format)
            .map(|b| b.as_ref())
            .ok_or_else(|| Error::UnknownBackend {
                strategy: strategy.to_string(),
                format,
            })
    }

    pub fn keys(&self) -> Vec<(&'static str, Format)> {
        self.backends
            .iter()
            .map(|b| (b.strategy(), b.format()))
            .collect()
    }
}
