//! Error types for tdb_alloc
//! tdb_alloc 错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("bad layout: {0}")]
  Layout(#[from] std::alloc::LayoutError),

  #[error("aligned allocation of {size} bytes failed")]
  AllocFailed { size: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
