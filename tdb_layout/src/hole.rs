//! Free-space holes 空洞（可回收空间）
//!
//! Offset-sorted list of reclaimable extents. Adjacent holes are merged
//! on insert, allocation is first-fit. A hole touching the file end is
//! never stored here; the layout absorbs it into the tail instead.
//! 按偏移排序的可回收区段列表。插入时合并相邻空洞，分配采用首次适应。
//! 触及文件末尾的空洞不会存入此处，而是由布局并入尾部。

use tdb_alloc::is_page_aligned;

/// Free, page-aligned extent 空闲的页对齐区段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hole {
  pub offset: u64,
  pub size: u64,
}

impl Hole {
  #[inline]
  pub fn end(&self) -> u64 {
    self.offset + self.size
  }
}

/// Hole list, sorted by offset, pairwise disjoint, never contiguous
/// 空洞列表，按偏移排序，两两不相交，互不毗邻
#[derive(Debug, Default)]
pub struct Holes(Vec<Hole>);

impl Holes {
  pub fn new() -> Self {
    Self(Vec::new())
  }

  /// Insert a freed extent, merging with its neighbors.
  /// Overlap with an existing hole is a logic bug upstream.
  /// 插入释放的区段并与邻居合并。与现有空洞重叠是上游逻辑错误。
  pub fn add(&mut self, offset: u64, size: u64) {
    debug_assert!(size > 0);
    debug_assert!(is_page_aligned(offset) && is_page_aligned(size));

    let i = self.0.partition_point(|h| h.offset < offset);
    debug_assert!(i == 0 || self.0[i - 1].end() <= offset);
    debug_assert!(i == self.0.len() || offset + size <= self.0[i].offset);

    let merge_prev = i > 0 && self.0[i - 1].end() == offset;
    let merge_next = i < self.0.len() && offset + size == self.0[i].offset;

    match (merge_prev, merge_next) {
      (true, true) => {
        let next_size = self.0[i].size;
        self.0[i - 1].size += size + next_size;
        self.0.remove(i);
      }
      (true, false) => self.0[i - 1].size += size,
      (false, true) => {
        let next = &mut self.0[i];
        next.offset = offset;
        next.size += size;
      }
      (false, false) => self.0.insert(i, Hole { offset, size }),
    }
  }

  /// First-fit allocation. An exact fit removes the hole, a larger one
  /// is shrunk from the front.
  /// 首次适应分配。精确匹配移除空洞，较大的从前端收缩。
  pub fn take(&mut self, size: u64) -> Option<u64> {
    debug_assert!(size > 0);
    let i = self.0.iter().position(|h| h.size >= size)?;
    let hole = &mut self.0[i];
    let offset = hole.offset;
    if hole.size == size {
      self.0.remove(i);
    } else {
      hole.offset += size;
      hole.size -= size;
    }
    Some(offset)
  }

  /// Pop the last hole when it reaches `end` (the file end just moved
  /// down onto it)
  /// 当最后一个空洞触及 `end` 时弹出（文件末尾刚下移到它上面）
  pub fn pop_tail(&mut self, end: u64) -> Option<Hole> {
    if self.0.last()?.end() == end {
      self.0.pop()
    } else {
      None
    }
  }

  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = &Hole> {
    self.0.iter()
  }
}
