//! Staging copies, dispatched on [`FileKind`].
//!
//! Existing objects are copied from their source `path`; objects marked for
//! materialization are generated from inline content, a link target, or an
//! alternative source file. Nothing is ever written through a symlink that
//! sits inside the staging root.

use std::fs;
use std::io::{self, ErrorKind};
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use super::{FileKind, FileObject, Materialize};

pub(crate) fn stage_object(obj: &FileObject, root: &Path) -> io::Result<PathBuf> {
    let relative = Path::new(obj.relative_install_path());
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("install path {} leaves the staging root", obj.install_path),
        ));
    }

    let dest = obj.staged_path(root);
    let mut dir = root.to_path_buf();
    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            dir.push(component);
            match fs::symlink_metadata(&dir) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    return Err(io::Error::new(
                        ErrorKind::InvalidInput,
                        format!(
                            "cannot stage {}: {} is a symlink",
                            obj.install_path,
                            dir.display()
                        ),
                    ));
                }
                Ok(_) => {}
                // Nothing below a missing directory can be a symlink yet.
                Err(_) => break,
            }
        }
    }

    copy_object(obj, &dest)?;
    Ok(dest)
}

fn copy_object(obj: &FileObject, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    match &obj.materialize {
        Some(m) => materialize(obj, m, dest),
        None => copy_existing(obj, dest),
    }
}

fn copy_existing(obj: &FileObject, dest: &Path) -> io::Result<()> {
    let src = Path::new(obj.path());
    match obj.kind() {
        FileKind::File => {
            remove_if_symlink(dest)?;
            fs::copy(src, dest)?;
            set_mode(dest, obj.permission())
        }
        FileKind::Dir => make_dir(dest, obj.permission()),
        FileKind::Symlink => {
            let target = fs::read_link(src)?;
            replace_with_symlink(&target, dest)
        }
        FileKind::Other | FileKind::Unknown => Err(io::Error::new(
            ErrorKind::Unsupported,
            format!("{} is a {} object and cannot be copied", obj.path(), obj.kind()),
        )),
    }
}

fn materialize(obj: &FileObject, m: &Materialize, dest: &Path) -> io::Result<()> {
    match obj.kind() {
        FileKind::File => {
            remove_if_symlink(dest)?;
            match (&m.content, &m.source) {
                (Some(content), _) => fs::write(dest, content)?,
                (None, Some(source)) => {
                    fs::copy(source, dest)?;
                }
                (None, None) => fs::write(dest, "")?,
            }
            set_mode(dest, obj.permission())
        }
        FileKind::Dir => make_dir(dest, obj.permission()),
        FileKind::Symlink => match (&m.link_target, &m.source) {
            (Some(target), _) => replace_with_symlink(Path::new(target), dest),
            (None, Some(source)) => {
                let target = fs::read_link(source)?;
                replace_with_symlink(&target, dest)
            }
            (None, None) => Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("symlink {} has no link target", obj.path()),
            )),
        },
        FileKind::Other | FileKind::Unknown => Err(io::Error::new(
            ErrorKind::Unsupported,
            format!("cannot create {} object {}", obj.kind(), obj.path()),
        )),
    }
}

fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Staged directories stay owner-writable so children can be staged into
/// them; the packaged mode comes from the format attribute.
fn make_dir(path: &Path, mode: u32) -> io::Result<()> {
    remove_if_symlink(path)?;
    fs::create_dir_all(path)?;
    set_mode(path, mode | 0o700)
}

fn remove_if_symlink(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(path),
        _ => Ok(()),
    }
}

fn replace_with_symlink(target: &Path, dest: &Path) -> io::Result<()> {
    match fs::symlink_metadata(dest) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(dest)?,
        Ok(_) => fs::remove_file(dest)?,
        Err(_) => {}
    }
    symlink(target, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_file_sets_mode() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.conf");
        fs::write(&src, "data").unwrap();

        let obj = FileObject::new(src.to_str().unwrap(), FileKind::File, 0o600, 0, 0);
        let dest = dir.path().join("stage/etc/src.conf");
        copy_object(&obj, &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "data");
        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_copy_symlink_preserves_target() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("link");
        symlink("../somewhere", &link).unwrap();

        let obj = FileObject::new(link.to_str().unwrap(), FileKind::Symlink, 0o777, 0, 0);
        let dest = dir.path().join("stage/link");
        copy_object(&obj, &dest).unwrap();
        // Copying twice replaces the link instead of failing.
        copy_object(&obj, &dest).unwrap();

        assert_eq!(fs::read_link(&dest).unwrap(), Path::new("../somewhere"));
    }

    #[test]
    fn test_materialize_content_dir_and_link() {
        let dir = TempDir::new().unwrap();
        let stage = dir.path().join("stage");

        let mut file = FileObject::new("/etc/motd", FileKind::File, 0o644, 0, 0);
        file.materialize = Some(Materialize {
            content: Some("welcome\n".into()),
            ..Default::default()
        });
        file.stage(&stage).unwrap();
        assert_eq!(
            fs::read_to_string(stage.join("etc/motd")).unwrap(),
            "welcome\n"
        );

        let mut d = FileObject::new("/var/lib/foo", FileKind::Dir, 0o750, 0, 0);
        d.materialize = Some(Materialize::default());
        d.stage(&stage).unwrap();
        assert!(stage.join("var/lib/foo").is_dir());

        let mut l = FileObject::new("/usr/bin/foo", FileKind::Symlink, 0o777, 0, 0);
        l.materialize = Some(Materialize {
            link_target: Some("/opt/foo/bin/foo".into()),
            ..Default::default()
        });
        l.stage(&stage).unwrap();
        assert_eq!(
            fs::read_link(stage.join("usr/bin/foo")).unwrap(),
            Path::new("/opt/foo/bin/foo")
        );
    }

    #[test]
    fn test_materialize_from_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("template");
        fs::write(&source, "from source").unwrap();

        let mut obj = FileObject::new("/etc/foo.conf", FileKind::File, 0o644, 0, 0);
        obj.materialize = Some(Materialize {
            source: Some(source.to_str().unwrap().into()),
            ..Default::default()
        });
        let dest = dir.path().join("out");
        copy_object(&obj, &dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "from source");
    }

    #[test]
    fn test_other_kinds_refuse_copy() {
        let dir = TempDir::new().unwrap();
        let obj = FileObject::new("/dev/null", FileKind::Other, 0o666, 0, 0);
        let err = copy_object(&obj, &dir.path().join("null")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let mut link = FileObject::new("/x", FileKind::Symlink, 0o777, 0, 0);
        link.materialize = Some(Materialize::default());
        assert!(copy_object(&link, &dir.path().join("x")).is_err());
    }

    #[test]
    fn test_never_stages_through_a_staged_symlink() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("host/real");
        fs::create_dir_all(&real).unwrap();
        let data = real.join("data.txt");
        fs::write(&data, "important").unwrap();
        let stage = dir.path().join("stage");

        let mut link = FileObject::new("/a/link", FileKind::Symlink, 0o777, 0, 0);
        link.materialize = Some(Materialize {
            link_target: Some(real.display().to_string()),
            ..Default::default()
        });
        link.stage(&stage).unwrap();

        let mut file = FileObject::new(data.to_str().unwrap(), FileKind::File, 0o644, 0, 0);
        file.install_path = "/a/link/data.txt".into();
        let err = file.stage(&stage).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("is a symlink"));
        assert_eq!(fs::read_to_string(&data).unwrap(), "important");
    }

    #[test]
    fn test_install_path_cannot_leave_root() {
        let dir = TempDir::new().unwrap();
        let stage = dir.path().join("stage");
        let mut obj = FileObject::new("/etc/motd", FileKind::File, 0o644, 0, 0);
        obj.materialize = Some(Materialize::default());
        obj.install_path = "/etc/../../escaped".into();

        assert!(obj.stage(&stage).is_err());
        assert!(!dir.path().join("escaped").exists());
    }

    #[test]
    fn test_dir_replaces_staged_symlink() {
        let dir = TempDir::new().unwrap();
        let host = dir.path().join("host");
        fs::create_dir_all(&host).unwrap();
        fs::set_permissions(&host, fs::Permissions::from_mode(0o755)).unwrap();
        let stage = dir.path().join("stage");
        fs::create_dir_all(stage.join("var")).unwrap();
        symlink(&host, stage.join("var/lib")).unwrap();

        let mut d = FileObject::new("/var/lib", FileKind::Dir, 0o750, 0, 0);
        d.materialize = Some(Materialize::default());
        d.stage(&stage).unwrap();

        assert!(!fs::symlink_metadata(stage.join("var/lib")).unwrap().file_type().is_symlink());
        let mode = fs::metadata(&host).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }
}
