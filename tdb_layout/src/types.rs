//! Core types 核心类型
//! NewType pattern prevents primitive type misuse NewType 模式防止原生类型混用

use std::fmt;

use crate::consts::LEAF_MASK;

/// 64-bit block ID. The tree layer assigns them; this layer only looks
/// at the leaf bit, and only for statistics.
/// 64 位块 ID。由树层分配；本层只读叶子位，且仅用于统计。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Bid(pub u64);

impl Bid {
  #[inline]
  pub const fn new(v: u64) -> Self {
    Self(v)
  }

  /// Is this a leaf node ID 是否叶子节点 ID
  #[inline]
  pub const fn is_leaf(self) -> bool {
    self.0 & LEAF_MASK != 0
  }
}

impl From<u64> for Bid {
  #[inline]
  fn from(v: u64) -> Self {
    Self(v)
  }
}

impl fmt::LowerHex for Bid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::LowerHex::fmt(&self.0, f)
  }
}

/// Per-kind block counts and byte totals, logged at open
/// 按类型统计的块数与字节总量，打开时记录日志
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
  pub inner_count: usize,
  pub inner_inflated: u64,
  pub inner_compressed: u64,
  pub leaf_count: usize,
  pub leaf_inflated: u64,
  pub leaf_compressed: u64,
}
