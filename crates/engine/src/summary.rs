//! Reduce discovered files to scan totals.

use tally_storage::FileRecord;
use tally_store::ScanTotals;

/// Running totals over a sequence of [`FileRecord`]s.
///
/// Byte counts are accumulated in a `u64` (good for 16 EiB) and saturate
/// rather than wrap.
#[derive(Clone, Debug, Default)]
pub struct Aggregator {
    totals: ScanTotals,
}
impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: &FileRecord) {
        let totals = &mut self.totals;
        totals.file_count += 1;
        totals.byte_count = totals.byte_count.saturating_add(record.size);
        *totals.type_histogram.entry(record.category).or_default() += 1;
        if record.ocr_eligible {
            totals.ocr_eligible_count += 1;
        }
    }

    /// Fold another aggregator's totals into this one.
    pub fn merge(&mut self, other: Aggregator) {
        let totals = &mut self.totals;
        totals.file_count += other.totals.file_count;
        totals.byte_count = totals.byte_count.saturating_add(other.totals.byte_count);
        for (category, count) in other.totals.type_histogram {
            *totals.type_histogram.entry(category).or_default() += count;
        }
        totals.ocr_eligible_count += other.totals.ocr_eligible_count;
    }

    pub fn finish(self) -> ScanTotals {
        self.totals
    }
}

/// Totals for a collection of records.
pub fn summarize<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> ScanTotals {
    let mut aggregator = Aggregator::new();
    for record in records {
        aggregator.push(record);
    }
    aggregator.finish()
}
