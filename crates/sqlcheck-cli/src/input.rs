//! Input collection: positional files or stdin.

use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::PathBuf;

pub struct InputFile {
    pub name: String,
    pub content: String,
    pub from_stdin: bool,
}

/// Reads the given files, or stdin when none are given (or "-" is passed).
pub fn read_input(paths: &[PathBuf]) -> Result<Vec<InputFile>> {
    let wants_stdin =
        paths.is_empty() || (paths.len() == 1 && paths[0].as_os_str() == "-");
    if wants_stdin {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read stdin")?;
        return Ok(vec![InputFile {
            name: "<stdin>".to_string(),
            content,
            from_stdin: true,
        }]);
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        files.push(InputFile {
            name: path.display().to_string(),
            content,
            from_stdin: false,
        });
    }
    Ok(files)
}
