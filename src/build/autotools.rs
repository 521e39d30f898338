//! autotools strategy: `autoreconf` + `configure`, then make targets.

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::backend::Backend;
use super::step::Step;
use super::BuildContext;
use crate::package::Format;
use crate::process::Cmd;

#[derive(Debug, Clone, Copy)]
pub struct Autotools {
    format: Format,
}

impl Autotools {
    pub fn new(format: Format) -> Self {
        Self { format }
    }

    /// The source rpm left in the work directory by `make srpm`.
    fn find_srpm(ctx: &BuildContext) -> Result<PathBuf> {
        let pattern = ctx
            .workdir
            .join(format!("{}-{}-*.src.rpm", ctx.package.name, ctx.package.version));
        let pattern = pattern.to_string_lossy();
        glob::glob(&pattern)
            .context("Invalid source rpm pattern")?
            .filter_map(|p| p.ok())
            .max()
            .with_context(|| format!("No source rpm matching {}", pattern))
    }
}

impl Backend for Autotools {
    fn strategy(&self) -> &'static str {
        "autotools"
    }

    fn format(&self) -> Format {
        self.format
    }

    fn required_tools(&self) -> Vec<&'static str> {
        let mut tools = vec!["autoreconf", "make"];
        match self.format {
            Format::Rpm => tools.push("rpmbuild"),
            Format::Deb => tools.extend(["dpkg-buildpackage", "fakeroot"]),
        }
        tools
    }

    fn configure(&self, ctx: &BuildContext) -> Result<()> {
        ctx.invoke(Step::Configure, Cmd::new("autoreconf").arg("-vfi"))?;
        ctx.invoke(Step::Configure, Cmd::new("./configure").arg("--quiet"))
    }

    fn sbuild(&self, ctx: &BuildContext) -> Result<()> {
        let target = match self.format {
            Format::Rpm => "srpm",
            Format::Deb => "dist",
        };
        ctx.invoke(Step::Sbuild, Cmd::new("make").arg(target))
    }

    fn build(&self, ctx: &BuildContext) -> Result<()> {
        match (self.format, ctx.mock_root.as_deref()) {
            (Format::Rpm, None) => ctx.invoke(Step::Build, Cmd::new("make").arg("rpm")),
            (Format::Rpm, Some(root)) => {
                let srpm = Self::find_srpm(ctx)?;
                let resultdir = ctx.workdir.join("mock-result");
                ctx.invoke(
                    Step::Build,
                    Cmd::new("mock")
                        .args(["-r", root, "--resultdir"])
                        .arg(resultdir.to_string_lossy())
                        .arg(srpm.to_string_lossy()),
                )
            }
            (Format::Deb, _) => ctx.invoke(
                Step::Build,
                Cmd::new("dpkg-buildpackage").args(["-rfakeroot", "-uc", "-us"]),
            ),
        }
    }
}
