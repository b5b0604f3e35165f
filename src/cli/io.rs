//! File helpers shared by the protocol commands

use std::fs;
use std::path::Path;

/// Read a set file: one element per line, blank lines skipped
///
/// Duplicates are kept; they match (or not) independently.
pub fn read_elements(path: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read set file '{}': {}", path.display(), e))?;

    Ok(contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Read an encoded protocol message
pub fn read_message(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    Ok(fs::read(path)
        .map_err(|e| format!("Failed to read message '{}': {}", path.display(), e))?)
}

/// Write an encoded protocol message
pub fn write_message(path: &Path, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(path, bytes)
        .map_err(|e| format!("Failed to write message '{}': {}", path.display(), e))?;
    Ok(())
}
