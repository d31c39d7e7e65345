//! Block index 块索引
//!
//! Two coordinated views over the same metadata set: `by_id` answers
//! lookups, `by_offset` orders every on-disk extent (blocks plus the
//! index block itself) for reopen-time hole derivation. Entries refer
//! to each other by `Bid`, a stable identifier, never by pointer.
//! 同一元数据集合上的两个协同视图：`by_id` 负责查找，`by_offset` 按磁盘
//! 区段排序（包括索引块自身），用于重开时推导空洞。条目之间用稳定的
//! `Bid` 引用，绝不用指针。
//!
//! ## Index block payload
//! ```text
//! | count(4) | count x ( bid(8) | BlockMeta(18) ) |
//! ```

use std::collections::BTreeMap;

use bytes::{Buf, BufMut};
use tdb_alloc::AlignedBuf;

use crate::{Bid, BlockMeta, Error, Result};

/// What an extent belongs to 区段归属
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
  Block(Bid),
  Index,
}

#[derive(Debug, Clone, Copy)]
struct Extent {
  owner: Owner,
  len: u64,
}

#[derive(Debug, Default)]
pub(crate) struct BlockIndex {
  by_id: BTreeMap<Bid, BlockMeta>,
  by_offset: BTreeMap<u64, Extent>,
}

impl BlockIndex {
  #[inline]
  pub fn get(&self, bid: Bid) -> Option<BlockMeta> {
    self.by_id.get(&bid).copied()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.by_id.len()
  }

  /// Install `meta` under `bid`. Returns the displaced extent
  /// `(offset, len)`; the caller turns it into a hole after this borrow
  /// ends, never while holding the index.
  /// 安装 `bid` 的 `meta`。返回被替换的区段 `(offset, len)`；调用者在
  /// 本借用结束后再将其转为空洞，绝不在持有索引时进行。
  pub fn set(&mut self, bid: Bid, meta: BlockMeta) -> Option<(u64, u64)> {
    let displaced = self.by_id.insert(bid, meta).map(|old| {
      let removed = self.by_offset.remove(&old.offset);
      debug_assert!(matches!(
        removed,
        Some(Extent {
          owner: Owner::Block(b),
          ..
        }) if b == bid
      ));
      (old.offset, old.extent_len())
    });
    self.by_offset.insert(
      meta.offset,
      Extent {
        owner: Owner::Block(bid),
        len: meta.extent_len(),
      },
    );
    displaced
  }

  /// Erase `bid` from both views, same displaced-extent contract as
  /// [`Self::set`].
  /// 从两个视图中删除 `bid`，被替换区段的约定同 [`Self::set`]。
  pub fn del(&mut self, bid: Bid) -> Option<(u64, u64)> {
    let old = self.by_id.remove(&bid)?;
    self.by_offset.remove(&old.offset);
    Some((old.offset, old.extent_len()))
  }

  /// Move the index block's own extent (at most one exists)
  /// 移动索引块自身的区段（至多存在一个）
  pub fn move_index_extent(&mut self, old_offset: Option<u64>, offset: u64, len: u64) {
    if let Some(old) = old_offset {
      let removed = self.by_offset.remove(&old);
      debug_assert!(matches!(
        removed,
        Some(Extent {
          owner: Owner::Index,
          ..
        })
      ));
    }
    self.by_offset.insert(
      offset,
      Extent {
        owner: Owner::Index,
        len,
      },
    );
  }

  /// Serialize every entry into an aligned payload buffer
  /// 将全部条目序列化到对齐的负载缓冲区
  pub fn encode(&self) -> Result<AlignedBuf> {
    let size = 4 + self.by_id.len() * (8 + BlockMeta::SIZE);
    let mut out = AlignedBuf::zeroed(size)?;
    let mut w = &mut out[..];
    w.put_u32_le(self.by_id.len() as u32);
    for (bid, meta) in &self.by_id {
      w.put_u64_le(bid.0);
      meta.write(&mut w);
    }
    debug_assert!(w.is_empty());
    Ok(out)
  }

  /// Decode an index block payload into `by_id`
  /// 将索引块负载解码到 `by_id`
  pub fn decode(&mut self, mut buf: &[u8]) -> Result<()> {
    debug_assert!(self.by_id.is_empty());
    if buf.remaining() < 4 {
      return Err(Error::Corrupt("index block count"));
    }
    let n = buf.get_u32_le();
    for _ in 0..n {
      if buf.remaining() < 8 + BlockMeta::SIZE {
        return Err(Error::Corrupt("index block entry"));
      }
      let bid = Bid(buf.get_u64_le());
      let meta = BlockMeta::read(&mut buf).ok_or(Error::Corrupt("index block entry"))?;
      self.by_id.insert(bid, meta);
    }
    Ok(())
  }

  /// Rebuild `by_offset` from `by_id` plus the index block's extent.
  /// A duplicate offset can only come from a damaged index block.
  /// 从 `by_id` 和索引块区段重建 `by_offset`。
  /// 偏移重复只可能来自损坏的索引块。
  pub fn rebuild_offsets(&mut self, index_meta: Option<&BlockMeta>) -> Result<()> {
    self.by_offset.clear();
    for (&bid, meta) in &self.by_id {
      let extent = Extent {
        owner: Owner::Block(bid),
        len: meta.extent_len(),
      };
      if self.by_offset.insert(meta.offset, extent).is_some() {
        return Err(Error::Corrupt("duplicate extent offset"));
      }
    }
    if let Some(meta) = index_meta {
      let extent = Extent {
        owner: Owner::Index,
        len: meta.extent_len(),
      };
      if self.by_offset.insert(meta.offset, extent).is_some() {
        return Err(Error::Corrupt("duplicate extent offset"));
      }
    }
    Ok(())
  }

  /// Walk extents in offset order: gaps between neighbors (starting at
  /// `start`) become holes, and the end of the last extent is the file
  /// end. Overlap means the index block was damaged.
  /// 按偏移顺序遍历区段：相邻间隙（从 `start` 起）成为空洞，最后区段的
  /// 末尾即文件末尾。重叠说明索引块已损坏。
  pub fn gaps(&self, start: u64) -> Result<(Vec<(u64, u64)>, u64)> {
    let mut holes = Vec::new();
    let mut last = start;
    for (&offset, extent) in &self.by_offset {
      if offset < last {
        return Err(Error::Corrupt("overlapping extents"));
      }
      if offset > last {
        holes.push((last, offset - last));
      }
      last = offset + extent.len;
    }
    Ok((holes, last))
  }

  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = (&Bid, &BlockMeta)> {
    self.by_id.iter()
  }

  /// Every on-disk extent as `(offset, len)`, offset-ordered
  /// 全部磁盘区段 `(offset, len)`，按偏移排序
  pub fn extents(&self) -> Vec<(u64, u64)> {
    self
      .by_offset
      .iter()
      .map(|(&offset, extent)| (offset, extent.len))
      .collect()
  }
}
