//! Block metadata record 块元数据记录

use bytes::{Buf, BufMut};
use tdb_alloc::page_round_up;

use crate::consts::BLOCK_META_SIZE;

/// Where one block lives on disk. The `crc` rides along for the layer
/// above; this layer never computes or checks it.
/// 一个块的磁盘位置。`crc` 由上层维护，本层只透传。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockMeta {
  /// Page-aligned file offset 页对齐的文件偏移
  pub offset: u64,
  /// Payload size before compression 压缩前负载大小
  pub inflated_size: u32,
  /// Exact payload size on disk 磁盘上的精确负载大小
  pub compressed_size: u32,
  /// Opaque checksum 透传校验和
  pub crc: u16,
}

impl BlockMeta {
  pub const SIZE: usize = BLOCK_META_SIZE;

  /// Read one record, `None` when the buffer is short
  /// 读取一条记录，缓冲区不足返回 `None`
  pub fn read(buf: &mut impl Buf) -> Option<Self> {
    if buf.remaining() < Self::SIZE {
      return None;
    }
    Some(Self {
      offset: buf.get_u64_le(),
      inflated_size: buf.get_u32_le(),
      compressed_size: buf.get_u32_le(),
      crc: buf.get_u16_le(),
    })
  }

  /// Write one record 写入一条记录
  pub fn write(&self, buf: &mut impl BufMut) {
    buf.put_u64_le(self.offset);
    buf.put_u32_le(self.inflated_size);
    buf.put_u32_le(self.compressed_size);
    buf.put_u16_le(self.crc);
  }

  /// On-disk extent length: the page-rounded payload
  /// 磁盘上的区段长度：负载向上取整到页
  #[inline]
  pub fn extent_len(&self) -> u64 {
    page_round_up(self.compressed_size as usize) as u64
  }

  /// One past the last byte of the extent 区段末尾
  #[inline]
  pub fn end(&self) -> u64 {
    self.offset + self.extent_len()
  }
}
