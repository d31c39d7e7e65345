//! Block abstraction 块抽象

use std::ops::{Deref, DerefMut};

use tdb_alloc::{AlignedBuf, page_round_up};

/// In-memory block: a page-aligned buffer plus a logical size.
/// The buffer capacity is always the page-rounded size.
/// 内存中的块：页对齐缓冲区加逻辑大小。容量始终为大小向上取整到页。
pub struct Block {
  buf: AlignedBuf,
}

impl Block {
  /// Zero-filled block of `size` logical bytes
  /// `size` 逻辑字节的零填充块
  pub fn zeroed(size: usize) -> crate::Result<Self> {
    Ok(Self {
      buf: AlignedBuf::zeroed(size)?,
    })
  }

  /// Block holding a copy of `data`
  /// 持有 `data` 副本的块
  pub fn copy_from(data: &[u8]) -> crate::Result<Self> {
    Ok(Self {
      buf: AlignedBuf::copy_from(data)?,
    })
  }

  /// Wrap a buffer whose first `size` bytes are the payload
  /// 包装缓冲区，前 `size` 字节为有效负载
  pub(crate) fn from_buf(mut buf: AlignedBuf, size: usize) -> Self {
    debug_assert!(size <= buf.cap());
    unsafe { buf.set_len(size) };
    Self { buf }
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.buf.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.buf.is_empty()
  }

  #[inline]
  pub fn cap(&self) -> usize {
    self.buf.cap()
  }

  /// Does the buffer satisfy the write precondition
  /// 缓冲区是否满足写入前提
  #[inline]
  pub fn is_page_rounded(&self) -> bool {
    self.cap() == page_round_up(self.len())
  }

  #[inline]
  pub(crate) fn into_buf(self) -> AlignedBuf {
    self.buf
  }
}

impl Deref for Block {
  type Target = [u8];

  #[inline]
  fn deref(&self) -> &[u8] {
    &self.buf
  }
}

impl DerefMut for Block {
  #[inline]
  fn deref_mut(&mut self) -> &mut [u8] {
    &mut self.buf
  }
}

impl std::fmt::Debug for Block {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Block")
      .field("len", &self.len())
      .field("cap", &self.cap())
      .finish()
  }
}
