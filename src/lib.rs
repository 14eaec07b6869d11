//! dbexport 导出目录导入引擎
//!
//! 读取由一个 `.sql` 头文件和若干 `.unl` 数据文件组成的导出目录，
//! 在目标关系型数据库中重建表、同义词视图、数据和索引。
//!
//! ```no_run
//! use dbexport_import::database::SqliteTarget;
//! use dbexport_import::importer::ImportOptions;
//! use dbexport_import::process::import_export_dir;
//!
//! let mut target = SqliteTarget::open("out/demo.db").unwrap();
//! let report = import_export_dir("export/demo.exp", &mut target, &ImportOptions::default())
//!     .unwrap();
//! println!("{report}");
//! ```

pub mod config;
pub mod database;
pub mod dbexport;
pub mod error;
pub mod export_dir;
pub mod importer;
#[cfg(feature = "logging")]
pub mod logging;
pub mod process;
pub mod report;

pub use error::{ImportError, Phase, Result};
pub use importer::{ImportOptions, ImportState, SchemaImporter};
pub use report::ImportReport;
