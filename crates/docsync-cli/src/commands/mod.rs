pub mod export;
pub mod replay;
pub mod sync;

use std::path::Path;

use docsync_core::{Command, Denial, Registry};

/// Parse a JSON-lines command file
///
/// Blank lines and lines starting with `#` are skipped. Each command is
/// paired with its 1-based line number.
pub fn read_commands(path: &Path) -> Result<Vec<(usize, Command)>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    let mut commands = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command: Command = serde_json::from_str(line)
            .map_err(|e| format!("Invalid command on line {}: {}", index + 1, e))?;
        commands.push((index + 1, command));
    }
    Ok(commands)
}

/// One-line description of a denial for stderr
pub fn describe_denial(registry: &Registry, denial: &Denial) -> String {
    format!(
        "denied: {} by {} on {}",
        denial.kind(),
        denial.requester(),
        registry.describe(denial.target())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_commands_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# header").unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"event":"delete","id":"p1"}}"#).unwrap();

        let commands = read_commands(file.path()).unwrap();
        assert_eq!(commands, vec![(3, Command::delete("p1"))]);
    }

    #[test]
    fn test_read_commands_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"event":"delete","id":"p1"}}"#).unwrap();
        writeln!(file, r#"{{"event":"explode"}}"#).unwrap();

        let err = read_commands(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
