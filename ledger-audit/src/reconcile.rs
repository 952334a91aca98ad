use anyhow::{Context, Result};
use measurs::config::Config;
use measurs::sink::{read_records, FileResource, JsonlCollection, PrimarySink};
use measurs::HistoryRecord;
use std::collections::HashSet;

/// How the two sinks compare, record by record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub in_both: usize,
    pub only_primary: usize,
    pub only_secondary: usize,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.only_primary == 0 && self.only_secondary == 0
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        output.push_str("Ledger Reconciliation\n");
        output.push_str("=====================\n\n");
        output.push_str(&format!("Records in both sinks: {}\n", self.in_both));
        output.push_str(&format!("Only in primary: {}\n", self.only_primary));
        output.push_str(&format!("Only in secondary: {}\n", self.only_secondary));
        output.push_str(&format!(
            "Status: {}\n",
            if self.is_consistent() { "consistent" } else { "diverged" }
        ));
        output
    }
}

/// Compare sinks on ciphertext alone; no key is needed
pub fn reconcile_sinks(config: &Config) -> Result<Reconciliation> {
    let primary = JsonlCollection::new(&config.collection_file).find_all()?;
    let secondary = read_records(&FileResource::new(&config.history_file))
        .with_context(|| format!("reading {}", config.history_file.display()))?;
    Ok(compare(&primary, &secondary))
}

fn compare(primary: &[HistoryRecord], secondary: &[HistoryRecord]) -> Reconciliation {
    let primary_set: HashSet<&HistoryRecord> = primary.iter().collect();
    let secondary_set: HashSet<&HistoryRecord> = secondary.iter().collect();

    Reconciliation {
        in_both: primary_set.intersection(&secondary_set).count(),
        only_primary: primary_set.difference(&secondary_set).count(),
        only_secondary: secondary_set.difference(&primary_set).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measurs::observe::TracingObserver;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(tag: u8) -> HistoryRecord {
        HistoryRecord {
            input: vec![tag; 3],
            output: vec![tag],
        }
    }

    #[test]
    fn test_compare_counts() {
        let result = compare(&[record(1), record(2)], &[record(2), record(3), record(4)]);
        assert_eq!(
            result,
            Reconciliation {
                in_both: 1,
                only_primary: 1,
                only_secondary: 2,
            }
        );
        assert!(!result.is_consistent());
        assert!(result.render().contains("Status: diverged"));
    }

    #[test]
    fn test_fresh_service_is_consistent() {
        let dir = tempdir().unwrap();
        let config = Config::in_dir(dir.path());
        let service = config.open_service(Arc::new(TracingObserver)).unwrap();
        service.convert("abbcc").unwrap();
        service.convert("dz_a_aazzaaa").unwrap();

        let result = reconcile_sinks(&config).unwrap();
        assert_eq!(result.in_both, 2);
        assert!(result.is_consistent());
    }

    #[test]
    fn test_blank_secondary_reads_as_empty() {
        let dir = tempdir().unwrap();
        let config = Config::in_dir(dir.path());
        std::fs::write(&config.history_file, " \n").unwrap();

        let result = reconcile_sinks(&config).unwrap();
        assert_eq!(result.only_secondary, 0);
        assert!(result.is_consistent());

        std::fs::write(&config.history_file, "{ not an array").unwrap();
        assert!(reconcile_sinks(&config).is_err());
    }

    #[test]
    fn test_empty_sinks_are_consistent() {
        let dir = tempdir().unwrap();
        let result = reconcile_sinks(&Config::in_dir(dir.path())).unwrap();
        assert_eq!(result.in_both, 0);
        assert!(result.is_consistent());
    }
}
