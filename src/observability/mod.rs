//! Console logging and output rendering.
//!
//! # Example
//!
//! ```no_run
//! use kubicorn::observability::{Logger, OutputWriter};
//! use std::io::Write;
//!
//! let logger = Logger::new(3, true);
//! logger.info(&mut std::io::stderr(), "Loading cluster profiles").unwrap();
//!
//! let mut stdout = std::io::stdout();
//! let mut out = OutputWriter::select(true, false).wrap(&mut stdout);
//! writeln!(out, "Kubernetes cluster management, without any magic").unwrap();
//! ```

pub mod logger;
pub mod writer;

// Re-export main types for convenience
pub use logger::{Level, Logger};
pub use writer::{rainbow, FabulousWriter, OutputWriter};
