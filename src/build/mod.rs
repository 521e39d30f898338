//! Resumable build: five markered steps handed to a backend.
//!
//! ```text
//! setup → preconfigure → configure → sbuild → build
//! ```
//!
//! A step whose marker exists is skipped unless forced. A failing step
//! writes no marker, so the next run against the same work directory starts
//! again at that step.

pub mod autotools;
pub mod backend;
pub mod buildrpm;
pub mod context;
pub mod generate;
pub mod step;

pub use backend::{Backend, BackendRegistry, Invoker, SystemInvoker};
pub use context::BuildContext;
pub use generate::{GenerateInput, Generator, ListGenerator};
pub use step::Step;

use std::fs;
use tracing::info;

use crate::error::{Error, Result};
use crate::package::Format;
use crate::timing::Timer;

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub executed: Vec<Step>,
    pub skipped: Vec<Step>,
}

pub struct BuildStateMachine<'a> {
    backend: &'a dyn Backend,
    force: bool,
    upto: Step,
}

impl<'a> BuildStateMachine<'a> {
    /// Resolve the backend for `(strategy, format)`. An unknown pair fails
    /// here, before any step runs.
    pub fn new(registry: &'a BackendRegistry, strategy: &str, format: Format) -> Result<Self> {
        Ok(Self::with_backend(registry.resolve(strategy, format)?))
    }

    pub fn with_backend(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            force: false,
            upto: Step::Build,
        }
    }

    /// Re-run steps even if their marker exists.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Stop after this step.
    pub fn upto(mut self, step: Step) -> Self {
        self.upto = step;
        self
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend
    }

    pub fn run(&self, ctx: &mut BuildContext) -> Result<RunReport> {
        fs::create_dir_all(&ctx.workdir).map_err(|e| Error::io(&ctx.workdir, e))?;
        info!(
            package = %ctx.package.name,
            strategy = self.backend.strategy(),
            format = %self.backend.format(),
            workdir = %ctx.workdir.display(),
            "starting build"
        );

        let mut report = RunReport::default();
        for step in Step::ALL.into_iter().take_while(|s| *s <= self.upto) {
            if !self.force && step.is_done(&ctx.workdir) {
                info!(step = %step, "already done, skipping");
                report.skipped.push(step);
                continue;
            }

            info!(step = %step, "{}", step.progress_message());
            let timer = Timer::start(step.name());
            self.backend
                .run_step(step, ctx)
                .map_err(|e| Error::step(step, e))?;
            step.mark_done(&ctx.workdir)?;
            timer.finish();
            report.executed.push(step);
        }
        Ok(report)
    }
}

/// Markers currently present in `workdir`, in step order.
pub fn completed_steps(workdir: &std::path::Path) -> Vec<Step> {
    Step::ALL
        .into_iter()
        .filter(|s| s.is_done(workdir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::package::PackageInfo;
    use crate::process::Cmd;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Rc<RefCell<Vec<Step>>>,
        fail_at: Option<Step>,
    }

    impl Invoker for Recorder {
        fn invoke(&self, step: Step, _cmd: Cmd) -> anyhow::Result<()> {
            self.calls.borrow_mut().push(step);
            if self.fail_at == Some(step) {
                anyhow::bail!("{} exited with status 2", step);
            }
            Ok(())
        }
    }

    fn context(dir: &TempDir, recorder: &Recorder) -> BuildContext {
        BuildContext::new(dir.path(), PackageInfo::new("foo", Format::Rpm))
            .with_manifest(Manifest::new())
            .with_invoker(recorder.clone())
    }

    #[test]
    fn test_full_run_then_rerun_skips_everything() {
        let dir = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let registry = BackendRegistry::standard();
        let machine = BuildStateMachine::new(&registry, "buildrpm", Format::Rpm).unwrap();

        let report = machine.run(&mut context(&dir, &recorder)).unwrap();
        assert_eq!(report.executed, Step::ALL);
        assert_eq!(completed_steps(dir.path()), Step::ALL);
        assert_eq!(
            *recorder.calls.borrow(),
            [Step::Configure, Step::Sbuild, Step::Build]
        );

        let report = machine.run(&mut context(&dir, &recorder)).unwrap();
        assert!(report.executed.is_empty());
        assert_eq!(report.skipped, Step::ALL);
        assert_eq!(recorder.calls.borrow().len(), 3);
    }

    #[test]
    fn test_upto_stops_after_marker() {
        let dir = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let registry = BackendRegistry::standard();
        let machine = BuildStateMachine::new(&registry, "autotools", Format::Rpm)
            .unwrap()
            .upto(Step::Preconfigure);

        let report = machine.run(&mut context(&dir, &recorder)).unwrap();
        assert_eq!(report.executed, [Step::Setup, Step::Preconfigure]);
        assert!(Step::Preconfigure.is_done(dir.path()));
        assert!(!Step::Configure.is_done(dir.path()));
        assert!(recorder.calls.borrow().is_empty());
    }

    #[test]
    fn test_failure_writes_no_marker_and_resumes() {
        let dir = TempDir::new().unwrap();
        let registry = BackendRegistry::standard();
        let machine = BuildStateMachine::new(&registry, "autotools", Format::Deb).unwrap();

        let failing = Recorder {
            fail_at: Some(Step::Sbuild),
            ..Default::default()
        };
        let err = machine.run(&mut context(&dir, &failing)).unwrap_err();
        assert!(matches!(err, Error::Step { step: Step::Sbuild, .. }));
        assert_eq!(
            completed_steps(dir.path()),
            [Step::Setup, Step::Preconfigure, Step::Configure]
        );

        let working = Recorder::default();
        let report = machine.run(&mut context(&dir, &working)).unwrap();
        assert_eq!(report.executed, [Step::Sbuild, Step::Build]);
        assert_eq!(*working.calls.borrow(), [Step::Sbuild, Step::Build]);
    }

    #[test]
    fn test_force_reruns_done_steps() {
        let dir = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let registry = BackendRegistry::standard();
        let machine = BuildStateMachine::new(&registry, "buildrpm", Format::Rpm).unwrap();
        machine.run(&mut context(&dir, &recorder)).unwrap();

        let report = machine
            .force(true)
            .run(&mut context(&dir, &recorder))
            .unwrap();
        assert_eq!(report.executed, Step::ALL);
        assert_eq!(recorder.calls.borrow().len(), 6);
    }

    #[test]
    fn test_unknown_backend_fails_before_any_step() {
        let dir = TempDir::new().unwrap();
        let registry = BackendRegistry::standard();
        let err = BuildStateMachine::new(&registry, "buildrpm", Format::Deb).err().unwrap();
        assert!(matches!(err, Error::UnknownBackend { .. }));
        assert!(completed_steps(dir.path()).is_empty());
    }
}
