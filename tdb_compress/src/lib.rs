#![cfg_attr(docsrs, feature(doc_cfg))]

//! Per-block compression 块压缩
//!
//! `Codec::None` is a pass-through: `compress`/`decompress` return
//! `Ok(None)` and the caller keeps using its own buffer, no allocation
//! happens. `Codec::Snappy` allocates a fresh page-aligned output.
//! `Codec::None` 为直通：`compress`/`decompress` 返回 `Ok(None)`，
//! 调用者继续使用自己的缓冲区，不发生分配。`Codec::Snappy` 分配新的
//! 页对齐输出。

use tdb_alloc::AlignedBuf;
use thiserror::Error;

/// 压缩错误 Compression error
#[derive(Error, Debug)]
pub enum Error {
  #[error("snappy: {0}")]
  Snap(#[from] snap::Error),

  #[error("alloc: {0}")]
  Alloc(#[from] tdb_alloc::Error),

  #[error("unknown codec: {0}")]
  UnknownCodec(u8),

  #[error("inflated size mismatch: expected {expected}, got {got}")]
  SizeMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// 压缩算法 Compression codec
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Codec {
  #[default]
  None = 0,
  Snappy = 1,
}

impl Codec {
  /// 从 u8 转换 Convert from u8
  #[inline]
  pub fn from_u8(v: u8) -> Result<Self> {
    match v {
      0 => Ok(Self::None),
      1 => Ok(Self::Snappy),
      _ => Err(Error::UnknownCodec(v)),
    }
  }

  #[inline]
  pub const fn as_u8(self) -> u8 {
    self as u8
  }
}

/// Compress `src`. `None` means pass-through: the input is the output.
/// 压缩 `src`。返回 `None` 表示直通：输入即输出。
pub fn compress(codec: Codec, src: &[u8]) -> Result<Option<AlignedBuf>> {
  match codec {
    Codec::None => Ok(None),
    Codec::Snappy => {
      let mut out = AlignedBuf::zeroed(snap::raw::max_compress_len(src.len()))?;
      let n = snap::raw::Encoder::new().compress(src, &mut out)?;
      // n <= max_compress_len, the buffer always holds it
      // n <= max_compress_len，缓冲区必然容纳
      unsafe { out.set_len(n) };
      Ok(Some(out))
    }
  }
}

/// Decompress `src` into `inflated_len` bytes. `None` means pass-through.
/// 将 `src` 解压为 `inflated_len` 字节。返回 `None` 表示直通。
pub fn decompress(codec: Codec, src: &[u8], inflated_len: usize) -> Result<Option<AlignedBuf>> {
  match codec {
    Codec::None => {
      if src.len() != inflated_len {
        return Err(Error::SizeMismatch {
          expected: inflated_len,
          got: src.len(),
        });
      }
      Ok(None)
    }
    Codec::Snappy => {
      let mut out = AlignedBuf::zeroed(inflated_len)?;
      let n = snap::raw::Decoder::new().decompress(src, &mut out)?;
      if n != inflated_len {
        return Err(Error::SizeMismatch {
          expected: inflated_len,
          got: n,
        });
      }
      unsafe { out.set_len(n) };
      Ok(Some(out))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codec_byte() {
    assert_eq!(Codec::None.as_u8(), 0);
    assert_eq!(Codec::Snappy.as_u8(), 1);
    assert_eq!(Codec::from_u8(1).unwrap(), Codec::Snappy);
    assert!(Codec::from_u8(9).is_err());
  }

  #[test]
  fn none_is_pass_through() {
    let data = b"hello tdb";
    assert!(compress(Codec::None, data).unwrap().is_none());
    assert!(decompress(Codec::None, data, data.len()).unwrap().is_none());
    assert!(decompress(Codec::None, data, 1).is_err());
  }

  #[test]
  fn snappy_roundtrip() {
    let data: Vec<u8> = b"abcabcabc".repeat(500);
    let packed = compress(Codec::Snappy, &data).unwrap().unwrap();
    assert!(packed.len() < data.len());

    let unpacked = decompress(Codec::Snappy, &packed, data.len())
      .unwrap()
      .unwrap();
    assert_eq!(&unpacked[..], &data[..]);
  }

  #[test]
  fn snappy_rejects_garbage() {
    assert!(decompress(Codec::Snappy, &[0xFF; 64], 1024).is_err());
  }
}
