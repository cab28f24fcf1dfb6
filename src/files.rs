use anyhow::{Context, Result, bail};
use std::io::{Read, Write};
use std::path::{Component, Path};

/// Path argument meaning stdin/stdout.
const STDIO: &str = "-";

/// Reject paths that climb out of the working tree.
pub fn check_path(path: &str) -> Result<&Path> {
    let p = Path::new(path);
    if p.components().any(|c| matches!(c, Component::ParentDir)) {
        bail!("Refusing path '{}': '..' components are not allowed", path);
    }
    Ok(p)
}

/// Read a whole file, or stdin when `path` is absent or `-`.
pub fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        None | Some(STDIO) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
        Some(file) => {
            let p = check_path(file)?;
            std::fs::read_to_string(p).with_context(|| format!("Failed to read '{}'", file))
        }
    }
}

/// Write `text` plus a trailing newline to a file, or stdout when `path` is
/// absent or `-`.
pub fn write_output(path: Option<&str>, text: &str) -> Result<()> {
    match path {
        None | Some(STDIO) => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{text}").context("Failed to write stdout")?;
            Ok(())
        }
        Some(file) => {
            let p = check_path(file)?;
            std::fs::write(p, format!("{text}\n"))
                .with_context(|| format!("Failed to write '{}'", file))?;
            log::debug!("wrote {} bytes to {}", text.len() + 1, p.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_dir_rejected() {
        assert!(check_path("../secret.md").is_err());
        assert!(check_path("docs/../../x.md").is_err());
    }

    #[test]
    fn test_plain_paths_allowed() {
        assert!(check_path("docs/page.md").is_ok());
        assert!(check_path("/tmp/page.md").is_ok());
        assert!(check_path("./page..md").is_ok());
    }
}
