//! Rendering the ledger: screen dump, JSON lines, and the CSV table.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::record::{VerificationRecord, FIELD_NAMES};

/// One `Display` line per record, in ledger order.
pub fn write_text<W: Write>(out: &mut W, records: &[VerificationRecord]) -> Result<()> {
    for r in records {
        writeln!(out, "{}", r)?;
    }
    Ok(())
}

/// One JSON object per line.
pub fn write_json_lines<W: Write>(out: &mut W, records: &[VerificationRecord]) -> Result<()> {
    for r in records {
        serde_json::to_writer(&mut *out, r)?;
        writeln!(out)?;
    }
    Ok(())
}

/// CSV with a header row of the field names. With no records the file still gets its
/// header, so consumers can tell "nothing verified" from "no report requested".
pub fn write_csv_to<W: Write>(out: W, records: &[VerificationRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(FIELD_NAMES)?;
    for r in records {
        writer.write_record(r.values())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, records: &[VerificationRecord]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_csv_to(file, records).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = records.len(), "csv report written");
    Ok(())
}
