use std::path::Path;

use log::{trace, warn};

use super::Transfer;
use crate::error::{Result, WalletCliError};
use crate::types::Fixed64;

/// Read `address,amount` lines from `path`.
pub fn read_multi_output(path: &Path) -> Result<Vec<Transfer>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| WalletCliError::filesystem(path, e))?;
    parse_multi_output(&content)
}

/// Columns after the second are ignored. A line that is blank, has a single
/// column, or carries a bad amount is reported and skipped; the file fails
/// only when no line yields a transfer.
pub fn parse_multi_output(content: &str) -> Result<Vec<Transfer>> {
    let mut transfers = Vec::new();
    for (number, line) in content.lines().enumerate() {
        match parse_line(line) {
            Ok(transfer) => {
                trace!(
                    "multi output address: {}, amount: {}",
                    transfer.address,
                    transfer.amount
                );
                transfers.push(transfer);
            }
            Err(e) => warn!("skipping multi output line {}: {}", number + 1, e),
        }
    }
    if transfers.is_empty() {
        return Err(WalletCliError::user_input(
            "multi output file contains no valid address,amount line",
        ));
    }
    Ok(transfers)
}

pub fn parse_line(line: &str) -> Result<Transfer> {
    let columns: Vec<&str> = line.split(',').collect();
    if columns.len() < 2 {
        return Err(WalletCliError::user_input(format!(
            "invalid multi output line: {:?}",
            line
        )));
    }
    let address = columns[0].trim();
    if address.is_empty() {
        return Err(WalletCliError::user_input(format!(
            "missing address in line: {:?}",
            line
        )));
    }
    let amount_str = columns[1].trim();
    let amount: Fixed64 = amount_str
        .parse()
        .ok()
        .filter(|amount| *amount > Fixed64::ZERO)
        .ok_or_else(|| {
            WalletCliError::user_input(format!(
                "invalid multi output transaction amount: {}",
                amount_str
            ))
        })?;
    Ok(Transfer {
        address: address.to_string(),
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_trimmed_columns() {
        let t = parse_line("abc, 1.5").unwrap();
        assert_eq!(t.address, "abc");
        assert_eq!(t.amount, Fixed64(150_000_000));
        let extra = parse_line("def,2,memo").unwrap();
        assert_eq!(extra.amount, Fixed64(200_000_000));
    }

    #[test]
    fn bad_lines_are_skipped() {
        let transfers = parse_multi_output("abc, 1.5\nonlyone\n\nxyz,nope\ndef, 2\n").unwrap();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[1].address, "def");
    }

    #[test]
    fn non_positive_amounts_are_skipped() {
        assert!(parse_line("abc,-1").is_err());
        assert!(parse_line("abc,0").is_err());
        let transfers = parse_multi_output("abc,-1
def,0
ghi,0.5
").unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].address, "ghi");
        assert!(parse_multi_output("abc,-1
").is_err());
    }

    #[test]
    fn single_bad_line_fails_file() {
        assert!(matches!(
            parse_multi_output("onlyone"),
            Err(WalletCliError::UserInput(_))
        ));
        assert!(parse_multi_output("").is_err());
    }

    #[test]
    fn missing_file_names_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outputs.csv");
        match read_multi_output(&path) {
            Err(WalletCliError::Filesystem { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected {:?}", other),
        }
        std::fs::write(&path, "abc,1\n").unwrap();
        assert_eq!(read_multi_output(&path).unwrap().len(), 1);
    }
}
