//! Data module - table loading and processing

mod loader;
mod processor;

pub use loader::{DataLoader, DataSource, LoaderError};
pub use processor::{
    AnalysisInput, AnalysisMode, ColumnSelection, DataProcessor, InputKind, NamedColumn,
    ProcessorError,
};
