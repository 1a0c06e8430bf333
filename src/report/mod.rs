mod assemble;
mod summary;

pub use assemble::{assemble, ReportDocument, ReportInput, Section, SectionState};
pub use summary::write_run_files;
