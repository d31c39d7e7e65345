#![cfg_attr(docsrs, feature(doc_cfg))]

//! Page-aligned buffers for Direct I/O
//! Direct I/O 页对齐缓冲区
//!
//! Capacity is always a whole number of pages and the base address sits
//! on a page boundary, so a buffer can be handed to positioned reads and
//! writes as-is. The logical length tracks how many bytes are payload.
//! 容量始终为整页数，基地址落在页边界上，可直接用于定位读写。
//! 逻辑长度记录有效负载字节数。

mod consts;
mod error;

use std::{
  alloc::{Layout, alloc, alloc_zeroed, dealloc},
  ops::{Deref, DerefMut},
  ptr::NonNull,
};

use compio::buf::{IoBuf, IoBufMut, SetBufInit};
pub use consts::{PAGE_SIZE, is_page_aligned, page_round_up};
pub use error::{Error, Result};

/// Page-aligned buffer. `cap` is a page multiple, `len <= cap`.
/// 页对齐缓冲区。`cap` 为整页数，`len <= cap`。
pub struct AlignedBuf {
  ptr: NonNull<u8>,
  len: usize,
  cap: usize,
}

unsafe impl Send for AlignedBuf {}
unsafe impl Sync for AlignedBuf {}

impl AlignedBuf {
  fn layout(cap: usize) -> Result<(Layout, usize)> {
    let cap = page_round_up(cap.max(1));
    Ok((Layout::from_size_align(cap, PAGE_SIZE)?, cap))
  }

  /// Allocate with at least `cap` bytes of capacity, rounded up to whole
  /// pages. Length starts at 0.
  /// 分配至少 `cap` 字节容量，向上取整到整页。长度从 0 开始。
  pub fn with_cap(cap: usize) -> Result<Self> {
    let (layout, cap) = Self::layout(cap)?;
    let ptr = unsafe { alloc(layout) };
    let ptr = NonNull::new(ptr).ok_or(Error::AllocFailed { size: cap })?;
    Ok(Self { ptr, len: 0, cap })
  }

  /// Zero-initialized buffer with `len = size`
  /// 零初始化缓冲区，`len = size`
  pub fn zeroed(size: usize) -> Result<Self> {
    let (layout, cap) = Self::layout(size)?;
    let ptr = unsafe { alloc_zeroed(layout) };
    let ptr = NonNull::new(ptr).ok_or(Error::AllocFailed { size: cap })?;
    Ok(Self {
      ptr,
      len: size,
      cap,
    })
  }

  /// Aligned copy of `data`
  /// `data` 的对齐副本
  pub fn copy_from(data: &[u8]) -> Result<Self> {
    let mut buf = Self::with_cap(data.len())?;
    unsafe {
      std::ptr::copy_nonoverlapping(data.as_ptr(), buf.ptr.as_ptr(), data.len());
    }
    buf.len = data.len();
    Ok(buf)
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  #[inline]
  pub fn cap(&self) -> usize {
    self.cap
  }

  #[inline]
  pub fn as_ptr(&self) -> *const u8 {
    self.ptr.as_ptr()
  }

  #[inline]
  pub fn as_mut_ptr(&mut self) -> *mut u8 {
    self.ptr.as_ptr()
  }

  /// Set logical length (caller must ensure the bytes are initialized)
  /// 设置逻辑长度（调用者需确保字节已初始化）
  #[inline]
  pub unsafe fn set_len(&mut self, len: usize) {
    debug_assert!(len <= self.cap);
    self.len = len;
  }

  /// Zero the tail and advance `len` to the next page boundary
  /// 尾部清零并将 `len` 推进到下一个页边界
  pub fn pad_to_page(&mut self) {
    let padded = page_round_up(self.len);
    debug_assert!(padded <= self.cap);
    unsafe {
      std::ptr::write_bytes(self.ptr.as_ptr().add(self.len), 0, padded - self.len);
    }
    self.len = padded;
  }
}

impl Drop for AlignedBuf {
  fn drop(&mut self) {
    // cap came from Self::layout, so this cannot fail
    // cap 来自 Self::layout，不会失败
    if let Ok(layout) = Layout::from_size_align(self.cap, PAGE_SIZE) {
      unsafe { dealloc(self.ptr.as_ptr(), layout) }
    }
  }
}

impl Deref for AlignedBuf {
  type Target = [u8];

  #[inline]
  fn deref(&self) -> &[u8] {
    unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
  }
}

impl DerefMut for AlignedBuf {
  #[inline]
  fn deref_mut(&mut self) -> &mut [u8] {
    unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
  }
}

impl AsRef<[u8]> for AlignedBuf {
  #[inline]
  fn as_ref(&self) -> &[u8] {
    self
  }
}

impl AsMut<[u8]> for AlignedBuf {
  #[inline]
  fn as_mut(&mut self) -> &mut [u8] {
    self
  }
}

impl Clone for AlignedBuf {
  fn clone(&self) -> Self {
    let mut buf = Self::with_cap(self.cap).expect("clone alloc");
    unsafe {
      std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), buf.ptr.as_ptr(), self.len);
    }
    buf.len = self.len;
    buf
  }
}

impl std::fmt::Debug for AlignedBuf {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AlignedBuf")
      .field("len", &self.len)
      .field("cap", &self.cap)
      .finish()
  }
}

// compio buffer traits, so the buffer moves through positional I/O by value
// compio 缓冲区 trait，缓冲区按值流经定位 I/O

unsafe impl IoBuf for AlignedBuf {
  #[inline]
  fn as_buf_ptr(&self) -> *const u8 {
    self.ptr.as_ptr()
  }

  #[inline]
  fn buf_len(&self) -> usize {
    self.len
  }

  #[inline]
  fn buf_capacity(&self) -> usize {
    self.cap
  }
}

unsafe impl IoBufMut for AlignedBuf {
  #[inline]
  fn as_buf_mut_ptr(&mut self) -> *mut u8 {
    self.ptr.as_ptr()
  }
}

impl SetBufInit for AlignedBuf {
  #[inline]
  unsafe fn set_buf_init(&mut self, len: usize) {
    debug_assert!(len <= self.cap);
    if len > self.len {
      self.len = len;
    }
  }
}
