mod file;
mod scan;

pub(crate) use self::file::FileRow;
pub(crate) use self::scan::{ScanRow, TotalsRow};
pub use self::scan::{ScanJob, ScanStatus, ScanTotals};
