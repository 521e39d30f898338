//! One collection run: targets in, manifest out.

use tracing::info;

use crate::error::Result;
use crate::filter::FilterChain;
use crate::listing::Target;
use crate::manifest::Manifest;
use crate::modifier::ModifierChain;
use crate::object::ObjectFactory;

pub struct Collector<'a> {
    factory: ObjectFactory<'a>,
    filters: FilterChain,
    modifiers: ModifierChain<'a>,
    use_index: bool,
}

impl<'a> Collector<'a> {
    pub fn new(factory: ObjectFactory<'a>, filters: FilterChain, modifiers: ModifierChain<'a>) -> Self {
        Self {
            factory,
            filters,
            modifiers,
            use_index: false,
        }
    }

    /// Let the factory take metadata from the ownership index.
    pub fn use_index(mut self, enabled: bool) -> Self {
        self.use_index = enabled;
        self
    }

    /// Create, filter and modify every target, keeping listing order.
    ///
    /// A modifier error aborts the run; nothing collected so far is kept.
    pub fn run(&mut self, targets: &[Target]) -> Result<Manifest> {
        let mut manifest = Manifest::new();
        let mut excluded = 0;

        for target in targets {
            let obj = self.factory.create(target, self.use_index, &target.attrs);
            if !self.filters.accepts(&obj) {
                excluded += 1;
                continue;
            }
            let obj = self.modifiers.apply(obj, Some(target))?;
            manifest.push(obj);
        }

        let (conflicts, _) = manifest.partition();
        info!(
            objects = manifest.len(),
            excluded,
            conflicts = conflicts.len(),
            "collection finished"
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::listing::{self, AttrValue};
    use crate::modifier::ChainOptions;
    use crate::object::FileKind;
    use crate::package::Format;
    use crate::users::IdMap;
    use std::fs;
    use tempfile::TempDir;

    fn options(ids: &IdMap) -> ChainOptions<'_> {
        ChainOptions {
            package: "foo".into(),
            format: Format::Rpm,
            destdir: None,
            reset_owner: false,
            ids,
            index: None,
        }
    }

    #[test]
    fn test_filtered_objects_never_reach_manifest() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("keep");
        fs::write(&file, "x").unwrap();

        let targets = vec![
            Target::new(file.to_str().unwrap()),
            Target::new("/no/such/file"),
            Target::new("/dev/null"),
        ];
        let ids = IdMap::default();
        let mut collector = Collector::new(
            ObjectFactory::new(&ids),
            FilterChain::standard(),
            ModifierChain::standard(&options(&ids)),
        );
        let manifest = collector.run(&targets).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.objects()[0].path(), file.to_str().unwrap());
        assert!(manifest.objects()[0].format_attr.is_some());
    }

    #[test]
    fn test_destdir_error_aborts_run() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("etc")).unwrap();
        fs::write(root.join("etc/foo"), "x").unwrap();
        fs::write(dir.path().join("outside"), "y").unwrap();

        let lines = [
            root.join("etc/foo").display().to_string(),
            dir.path().join("outside").display().to_string(),
        ];
        let targets = listing::parse_lines(lines).unwrap();

        let ids = IdMap::default();
        let mut opts = options(&ids);
        opts.destdir = Some(root.display().to_string());
        let mut collector = Collector::new(
            ObjectFactory::new(&ids),
            FilterChain::standard(),
            ModifierChain::standard(&opts),
        );
        let err = collector.run(&targets).unwrap_err();
        assert!(matches!(err, Error::Modifier { modifier: "destdir", .. }));
    }

    #[test]
    fn test_overrides_come_from_the_chain() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("resolv.conf");
        fs::write(&file, "x").unwrap();
        let target = Target::new(file.to_str().unwrap())
            .with_attr("install_path", AttrValue::Str("/etc/foo/resolv.conf".into()))
            .with_attr("mode", AttrValue::Int(600));

        let ids = IdMap::default();
        let mut bare = Collector::new(
            ObjectFactory::new(&ids),
            FilterChain::standard(),
            ModifierChain::new(Vec::new()),
        );
        let manifest = bare.run(std::slice::from_ref(&target)).unwrap();
        assert_eq!(manifest.objects()[0].install_path, file.to_str().unwrap());

        let mut collector = Collector::new(
            ObjectFactory::new(&ids),
            FilterChain::standard(),
            ModifierChain::standard(&options(&ids)),
        );
        let manifest = collector.run(&[target]).unwrap();
        let obj = &manifest.objects()[0];
        assert_eq!(obj.install_path, "/etc/foo/resolv.conf");
        assert_eq!(obj.mode, 0o600);
        assert_eq!(obj.path(), file.to_str().unwrap());
    }

    #[test]
    fn test_created_objects_survive_filters() {
        let dir = TempDir::new().unwrap();
        let target = Target::new(dir.path().join("motd").to_str().unwrap())
            .with_attr("content", AttrValue::Str("hi".into()));

        let ids = IdMap::default();
        let mut collector = Collector::new(
            ObjectFactory::new(&ids),
            FilterChain::standard(),
            ModifierChain::standard(&options(&ids)),
        );
        let manifest = collector.run(&[target]).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.objects()[0].kind(), FileKind::File);
        assert!(manifest.objects()[0].is_created());
    }
}
