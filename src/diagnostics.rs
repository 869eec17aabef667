use std::path::Path;

use crate::config::Config;

/// Preflight checks, run before the device is touched.
pub fn check(cfg: &Config, repository: &Path) -> anyhow::Result<()> {
    let mut errors: Vec<String> = Vec::new();

    // Check 1: repository root is an existing, writable directory
    match std::fs::metadata(repository) {
        Ok(meta) if !meta.is_dir() => errors.push(format!(
            "repository '{}' is not a directory",
            repository.display()
        )),
        Ok(_) => {
            if let Err(e) = tempfile::tempfile_in(repository) {
                errors.push(format!(
                    "repository '{}' is not writable: {e}",
                    repository.display()
                ));
            }
        }
        Err(e) => errors.push(format!(
            "cannot access repository '{}': {e}\n  \
             → pass the staged repository directory, e.g. --repository ceremony/YYYY-MM-DD",
            repository.display()
        )),
    }

    // Check 2: pinentry binary found, if one was requested
    if let Some(pinentry) = &cfg.pinentry {
        match std::process::Command::new(pinentry).arg("--version").output() {
            Ok(_) => {}
            Err(e) => errors.push(format!(
                "pinentry binary not found: '{pinentry}': {e}\n  \
                 → install pinentry, or omit --pinentry to type the PIN in this terminal"
            )),
        }
    }

    if errors.is_empty() {
        return Ok(());
    }

    for err in &errors {
        eprintln!("ERROR: {err}");
    }
    anyhow::bail!("{} preflight check(s) failed", errors.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config(extra: &[&str]) -> Config {
        let mut args = vec!["pivroot"];
        args.extend_from_slice(extra);
        args.extend_from_slice(&["add-key", "--repository", "unused"]);
        Config::parse_from(args)
    }

    #[test]
    fn test_check_accepts_directory() {
        let dir = tempfile::tempdir().unwrap();
        check(&config(&[]), dir.path()).unwrap();
    }

    #[test]
    fn test_check_leaves_repository_untouched() {
        let dir = tempfile::tempdir().unwrap();
        check(&config(&[]), dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_check_rejects_unwritable_repository() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("ro");
        std::fs::create_dir(&repo).unwrap();
        std::fs::set_permissions(&repo, std::fs::Permissions::from_mode(0o555)).unwrap();
        if tempfile::tempfile_in(&repo).is_ok() {
            println!("SKIP: running with privileges that ignore directory modes");
            return;
        }
        assert!(check(&config(&[]), &repo).is_err());
    }

    #[test]
    fn test_check_rejects_missing_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check(&config(&[]), &dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_check_rejects_file_repository() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("root.json");
        std::fs::write(&file, b"{}").unwrap();
        assert!(check(&config(&[]), &file).is_err());
    }

    #[test]
    fn test_check_rejects_missing_pinentry() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&["--pinentry", "/nonexistent/pinentry-xyz"]);
        assert!(check(&cfg, dir.path()).is_err());
    }
}
