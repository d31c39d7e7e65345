//! Layout facade 布局门面
//!
//! Owns the data file and composes the index, the hole list and the
//! superblock into the block read/write/delete/flush contract. Shared
//! state sits in cells; no borrow ever spans an await, and no two cells
//! are held at once: a mutation captures what it needs from one view,
//! releases it, then touches the next.
//! 持有数据文件，将索引、空洞列表和超级块组合成块的读/写/删/刷盘契约。
//! 共享状态放在 cell 中；借用绝不跨越 await，也绝不同时持有两个 cell：
//! 先从一个视图取出所需，释放后再触及下一个。

mod flush;
mod open;
mod rw;

use std::{
  cell::{Cell, RefCell},
  path::PathBuf,
  task::Waker,
};

use compio::fs::File;
use tdb_alloc::is_page_aligned;
use tdb_compress::Codec;

use crate::{
  Bid, Block, BlockMeta, Hole, Stats, SuperBlock, hole::Holes, index::BlockIndex,
};

/// File-end bookkeeping plus the in-memory superblock
/// 文件末尾信息与内存中的超级块
pub(crate) struct Eng {
  /// Logical end of data; tail allocations start here
  /// 数据逻辑末尾；尾部分配从这里开始
  pub end: u64,
  /// Cached physical file length 缓存的物理文件长度
  pub len: u64,
  pub superblock: SuperBlock,
}

/// Block layout engine over a single data file
/// 单数据文件上的块布局引擎
pub struct Layout {
  file: File,
  path: PathBuf,
  codec: Codec,
  eng: RefCell<Eng>,
  index: RefCell<BlockIndex>,
  holes: RefCell<Holes>,
  fly_reads: Cell<usize>,
  fly_writes: Cell<usize>,
  /// Index mutated since the last successful flush
  /// 自上次成功刷盘后索引是否被修改
  dirty: Cell<bool>,
  /// Parked by `flush` until the last in-flight write lands
  /// 由 `flush` 挂起，直到最后一个在途写入落盘
  drain: RefCell<Option<Waker>>,
}

impl Layout {
  /// Reserve `size` bytes: first-fit from the holes, else grow the tail
  /// 预留 `size` 字节：优先空洞首次适应，否则增长尾部
  pub(crate) fn get_offset(&self, size: u64) -> u64 {
    debug_assert!(size > 0 && is_page_aligned(size));
    if let Some(offset) = self.holes.borrow_mut().take(size) {
      return offset;
    }

    let mut eng = self.eng.borrow_mut();
    let offset = eng.end;
    eng.end += size;
    // the end can sit below the cached length after tail absorption
    // 尾部吸收后，末尾可能低于缓存长度
    if eng.end > eng.len {
      eng.len = eng.end;
    }
    offset
  }

  /// Release an extent. A hole touching the file end shrinks the end
  /// instead of entering the list, and the shrink cascades through any
  /// stored hole the end lands on.
  /// 释放区段。触及文件末尾的空洞直接收缩末尾而非进入列表，且收缩会
  /// 级联吞掉末尾落到的已存空洞。
  pub(crate) fn add_hole(&self, offset: u64, size: u64) {
    let absorbed = {
      let mut eng = self.eng.borrow_mut();
      if offset + size == eng.end {
        eng.end = offset;
        true
      } else {
        false
      }
    };
    if !absorbed {
      self.holes.borrow_mut().add(offset, size);
      return;
    }

    loop {
      let end = self.eng.borrow().end;
      let popped = self.holes.borrow_mut().pop_tail(end);
      match popped {
        Some(hole) => self.eng.borrow_mut().end = hole.offset,
        None => return,
      }
    }
  }

  #[inline]
  pub fn codec(&self) -> Codec {
    self.codec
  }

  /// Number of live blocks 存活块数量
  #[inline]
  pub fn block_count(&self) -> usize {
    self.index.borrow().len()
  }

  /// Metadata copy for one block 单个块的元数据副本
  #[inline]
  pub fn block_meta(&self, bid: Bid) -> Option<BlockMeta> {
    self.index.borrow().get(bid)
  }

  /// Logical end of the data file 数据文件逻辑末尾
  #[inline]
  pub fn file_end(&self) -> u64 {
    self.eng.borrow().end
  }

  /// In-flight `(reads, writes)` 在途 `(读, 写)` 数量
  #[inline]
  pub fn in_flight(&self) -> (usize, usize) {
    (self.fly_reads.get(), self.fly_writes.get())
  }

  /// Copy of the hole list 空洞列表副本
  pub fn holes_snapshot(&self) -> Vec<Hole> {
    self.holes.borrow().iter().copied().collect()
  }

  /// Every on-disk extent as `(offset, len)`, offset-ordered
  /// 全部磁盘区段 `(offset, len)`，按偏移排序
  pub fn extents_snapshot(&self) -> Vec<(u64, u64)> {
    self.index.borrow().extents()
  }

  /// Aligned scratch block, ready for the caller to fill and write
  /// 对齐的空白块，供调用者填充后写入
  pub fn new_block(&self, size: usize) -> crate::Result<Block> {
    Block::zeroed(size)
  }

  /// Leaf/inner block counts and byte totals
  /// 叶子/内部块数量与字节总量
  pub fn stats(&self) -> Stats {
    let index = self.index.borrow();
    let mut stats = Stats::default();
    for (bid, meta) in index.iter() {
      if bid.is_leaf() {
        stats.leaf_count += 1;
        stats.leaf_inflated += meta.inflated_size as u64;
        stats.leaf_compressed += meta.compressed_size as u64;
      } else {
        stats.inner_count += 1;
        stats.inner_inflated += meta.inflated_size as u64;
        stats.inner_compressed += meta.compressed_size as u64;
      }
    }
    stats
  }
}
