//! Live queries against the rpm database.

use anyhow::{Context, Result};
use std::collections::BTreeMap;

use super::{OwnedFile, Owner, OwnershipIndex};
use crate::process::Cmd;

const OWNER_QUERY: &str = "%{NAME}\t%{VERSION}\t%{RELEASE}\t%{ARCH}\t%{EPOCH}\n";
const FILES_QUERY: &str = "[%{FILENAMES}\t%{FILEMODES}\t%{FILEUSERNAME}\t%{FILEGROUPNAME}\n]";
const DUMP_QUERY: &str = "[%{NAME}\t%{VERSION}\t%{RELEASE}\t%{ARCH}\t%{EPOCH}\t%{FILENAMES}\t%{FILEMODES}\t%{FILEUSERNAME}\t%{FILEGROUPNAME}\n]";

/// Index backed by `rpm -qf` for every lookup.
#[derive(Debug, Clone)]
pub struct RpmDb {
    program: String,
}

impl Default for RpmDb {
    fn default() -> Self {
        Self::new()
    }
}

impl RpmDb {
    pub fn new() -> Self {
        Self {
            program: "rpm".to_string(),
        }
    }

    /// An rpm invocation with untranslated output, which the parsers below
    /// and the "not owned" check rely on.
    fn query(&self) -> Cmd {
        Cmd::new(&self.program).env("LC_ALL", "C")
    }

    /// Dump the whole database as `path -> record`.
    ///
    /// When several packages own a path the first one listed wins.
    pub fn dump_all(&self) -> Result<BTreeMap<String, OwnedFile>> {
        let result = self
            .query()
            .args(["-qa", "--qf", DUMP_QUERY])
            .error_msg("Failed to dump the rpm database")
            .run()?;
        Ok(parse_dump(&result.stdout))
    }
}

impl OwnershipIndex for RpmDb {
    fn lookup(&self, path: &str) -> Result<Option<OwnedFile>> {
        let result = self
            .query()
            .args(["-qf", "--qf", OWNER_QUERY, path])
            .allow_fail()
            .run()?;

        if !result.success() {
            // rpm exits 1 both for "not owned" and for missing files.
            let out = format!("{}{}", result.stdout, result.stderr);
            if out.contains("not owned by any package") || out.contains("No such file") {
                return Ok(None);
            }
            anyhow::bail!(
                "rpm -qf {} failed (exit code {}): {}",
                path,
                result.code(),
                result.stderr_trimmed()
            );
        }

        let owner = match result.stdout.lines().find_map(parse_owner_line) {
            Some(owner) => owner,
            None => return Ok(None),
        };

        let files = self
            .query()
            .args(["-q", "--qf", FILES_QUERY, &owner.name])
            .run()
            .with_context(|| format!("Failed to list files of {}", owner.name))?;

        let (mode, user, group) = files
            .stdout
            .lines()
            .find_map(|line| {
                let fields: Vec<&str> = line.split('\t').collect();
                (fields.len() == 4 && fields[0] == path).then(|| {
                    (
                        fields[1].parse::<u32>().ok(),
                        Some(fields[2].to_string()),
                        Some(fields[3].to_string()),
                    )
                })
            })
            .unwrap_or((None, None, None));

        Ok(Some(OwnedFile {
            owner,
            mode,
            user,
            group,
        }))
    }
}

fn parse_epoch(raw: &str) -> Option<String> {
    match raw.trim() {
        "" | "(none)" => None,
        e => Some(e.to_string()),
    }
}

fn parse_owner_line(line: &str) -> Option<Owner> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 5 {
        return None;
    }
    Some(Owner {
        name: fields[0].to_string(),
        version: fields[1].to_string(),
        release: fields[2].to_string(),
        arch: fields[3].to_string(),
        epoch: parse_epoch(fields[4]),
    })
}

/// Parse the output of [`DUMP_QUERY`].
pub(crate) fn parse_dump(text: &str) -> BTreeMap<String, OwnedFile> {
    let mut files = BTreeMap::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 9 || fields[5].is_empty() || fields[5] == "(none)" {
            continue;
        }
        files.entry(fields[5].to_string()).or_insert_with(|| OwnedFile {
            owner: Owner {
                name: fields[0].to_string(),
                version: fields[1].to_string(),
                release: fields[2].to_string(),
                arch: fields[3].to_string(),
                epoch: parse_epoch(fields[4]),
            },
            mode: fields[6].parse().ok(),
            user: Some(fields[7].to_string()),
            group: Some(fields[8].to_string()),
        });
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_line() {
        let owner = parse_owner_line("setup\t2.13.7\t9.el9\tnoarch\t(none)").unwrap();
        assert_eq!(owner.name, "setup");
        assert_eq!(owner.release, "9.el9");
        assert_eq!(owner.epoch, None);

        let owner = parse_owner_line("bash\t5.1.8\t6.el9\tx86_64\t1").unwrap();
        assert_eq!(owner.epoch.as_deref(), Some("1"));

        assert!(parse_owner_line("garbage").is_none());
    }

    #[test]
    fn test_queries_run_untranslated() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("rpm");
        fs::write(
            &script,
            r#"#!/bin/sh
[ "$LC_ALL" = C ] || { echo "Datei gehoert zu keinem Paket" >&2; exit 2; }
case "$1" in
  -qf) printf 'setup\t2.13.7\t9.el9\tnoarch\t(none)\n' ;;
  -q) printf '/etc/hosts\t33188\troot\troot\n' ;;
esac
"#,
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let rpmdb = RpmDb {
            program: script.display().to_string(),
        };
        let record = rpmdb.lookup("/etc/hosts").unwrap().unwrap();
        assert_eq!(record.owner.name, "setup");
        assert_eq!(record.mode, Some(0o100644));
        assert_eq!(record.user.as_deref(), Some("root"));
    }

    #[test]
    fn test_parse_dump_first_owner_wins() {
        let dump = "\
setup\t2.13.7\t9.el9\tnoarch\t(none)\t/etc/hosts\t33188\troot\troot
other\t1\t1\tnoarch\t(none)\t/etc/hosts\t33261\troot\troot
filesystem\t3.16\t2.el9\tx86_64\t(none)\t/etc\t16877\troot\troot
empty\t1\t1\tnoarch\t(none)\t(none)\t\t\t
";
        let files = parse_dump(dump);
        assert_eq!(files.len(), 2);
        let hosts = &files["/etc/hosts"];
        assert_eq!(hosts.owner.name, "setup");
        assert_eq!(hosts.mode, Some(0o100644));
        assert_eq!(files["/etc"].mode, Some(0o040755));
    }
}
