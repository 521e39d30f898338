//! buildrpm strategy: source tarball plus plain `rpmbuild`.

use anyhow::Result;

use super::backend::Backend;
use super::step::Step;
use super::BuildContext;
use crate::package::Format;
use crate::process::Cmd;

#[derive(Debug, Clone, Copy, Default)]
pub struct Buildrpm;

impl Buildrpm {
    fn rpmbuild(ctx: &BuildContext, mode: &str) -> Cmd {
        let workdir = ctx.workdir.to_string_lossy();
        let mut cmd = Cmd::new("rpmbuild");
        for macro_name in ["_topdir", "_sourcedir", "_specdir", "_srcrpmdir", "_rpmdir", "_builddir"] {
            cmd = cmd.arg("--define").arg(format!("{} {}", macro_name, workdir));
        }
        cmd.arg(mode).arg(format!("{}.spec", ctx.package.name))
    }
}

impl Backend for Buildrpm {
    fn strategy(&self) -> &'static str {
        "buildrpm"
    }

    fn format(&self) -> Format {
        Format::Rpm
    }

    fn required_tools(&self) -> Vec<&'static str> {
        vec!["tar", "rpmbuild"]
    }

    /// Pack the staged tree as `<name>-<version>.tar.gz`.
    fn configure(&self, ctx: &BuildContext) -> Result<()> {
        let nv = ctx.package.name_version();
        ctx.invoke(
            Step::Configure,
            Cmd::new("tar")
                .arg("--transform")
                .arg(format!("s,^src,{},", nv))
                .arg("-czf")
                .arg(format!("{}.tar.gz", nv))
                .arg("src"),
        )
    }

    fn sbuild(&self, ctx: &BuildContext) -> Result<()> {
        ctx.invoke(Step::Sbuild, Self::rpmbuild(ctx, "-bs"))
    }

    fn build(&self, ctx: &BuildContext) -> Result<()> {
        ctx.invoke(Step::Build, Self::rpmbuild(ctx, "-bb"))
    }
}
