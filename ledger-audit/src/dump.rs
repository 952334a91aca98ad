use anyhow::{bail, Context, Result};
use measurs::cipher::Cipher;
use measurs::config::Config;
use measurs::keystore::KeyStore;
use measurs::ledger::Ledger;
use measurs::observe::RecordingObserver;
use measurs::sink::{FileResource, JsonlCollection, PrimarySink};
use measurs::{HistoryEntry, HistoryRecord};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Destination for decrypted entries; must not exist yet
    pub export: Option<PathBuf>,
}

#[derive(Serialize)]
struct Export {
    primary: Vec<HistoryEntry>,
    secondary: Vec<HistoryEntry>,
}

/// Open the ledger with the existing key only; auditing never creates keys
pub fn open_ledger(config: &Config) -> Result<Ledger> {
    config.validate()?;
    if !config.key_file.exists() {
        bail!("no key file at {}", config.key_file.display());
    }
    let key = config.key_store().load_key()?;
    Ok(Ledger::new(
        Cipher::new(&key),
        Arc::new(JsonlCollection::new(&config.collection_file)),
        Arc::new(FileResource::new(&config.history_file)),
        Arc::new(RecordingObserver::new()),
    ))
}

/// Decrypt every record in both sinks and describe the result
pub fn dump_sinks(config: &Config, options: &DumpOptions) -> Result<String> {
    let ledger = open_ledger(config)?;
    let scan = JsonlCollection::new(&config.collection_file).scan()?;
    let secondary = ledger
        .read_secondary()
        .with_context(|| format!("reading {}", config.history_file.display()))?;

    let mut output = String::new();
    output.push_str("Ledger Dump\n");
    output.push_str("===========\n\n");
    output.push_str(&format!("Key fingerprint: {}\n\n", ledger.cipher().fingerprint()));

    let primary_entries = describe(
        &mut output,
        "Primary",
        &config.collection_file,
        &ledger,
        &scan.records,
    );
    for position in &scan.unreadable {
        output.push_str(&format!("  line {}: <unreadable>\n", position));
    }
    output.push('\n');
    let secondary_entries =
        describe(&mut output, "Secondary", &config.history_file, &ledger, &secondary);

    if let Some(path) = &options.export {
        let export = Export {
            primary: primary_entries,
            secondary: secondary_entries,
        };
        write_export(path, &export)?;
        output.push_str(&format!("\nExported to {}\n", path.display()));
    }

    Ok(output)
}

fn describe(
    output: &mut String,
    label: &str,
    path: &Path,
    ledger: &Ledger,
    records: &[HistoryRecord],
) -> Vec<HistoryEntry> {
    let mut entries = Vec::new();
    let mut failed = 0;
    let mut lines = String::new();

    for (index, record) in records.iter().enumerate() {
        match ledger.decrypt_record(record) {
            Ok(entry) => {
                lines.push_str(&format!(
                    "  [{}] {:?} -> {:?}\n",
                    index, entry.input, entry.output
                ));
                entries.push(entry);
            }
            Err(e) => {
                failed += 1;
                lines.push_str(&format!("  [{}] <undecryptable: {}>\n", index, e));
            }
        }
    }

    output.push_str(&format!(
        "{} ({}): {} records, {} undecryptable\n",
        label,
        path.display(),
        records.len(),
        failed
    ));
    output.push_str(&lines);
    entries
}

fn write_export(path: &Path, export: &Export) -> Result<()> {
    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .with_context(|| format!("creating {}", path.display()))?;
    file.write_all(&serde_json::to_vec_pretty(export)?)?;
    file.flush()?;
    Ok(())
}
