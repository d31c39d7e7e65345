//! Error types for tdb_layout
//! tdb_layout 错误类型

use tdb_compress::Codec;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  #[error("alloc: {0}")]
  Alloc(#[from] tdb_alloc::Error),

  #[error("compress: {0}")]
  Compress(#[from] tdb_compress::Error),

  #[error("corrupt: {0}")]
  Corrupt(&'static str),

  #[error("data file too short: {0} bytes")]
  TooShort(u64),

  #[error("codec mismatch: file has {file:?}, configured {conf:?}")]
  CodecMismatch { file: Codec, conf: Codec },
}

pub type Result<T> = std::result::Result<T, Error>;
