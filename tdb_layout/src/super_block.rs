//! Superblock record 超级块记录
//!
//! ## Wire layout (little-endian, tightly packed)
//! ```text
//! | magic(8) | major(1) | minor(1) | compress(1) | has_index(1) | index_meta(18)? | crc(2) |
//! ```
//!
//! Two redundant copies live at file offsets 0 and `SUPER_BLOCK_SIZE`;
//! a copy that fails to read or parse falls back to the other.
//! 两份冗余副本位于文件偏移 0 和 `SUPER_BLOCK_SIZE`；
//! 读取或解析失败的副本回退到另一份。

use bytes::{Buf, BufMut};
use tdb_compress::Codec;

use crate::{
  BlockMeta, Error, Result,
  consts::{MAGIC, MAJOR, MINOR},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
  pub magic: u64,
  pub major: u8,
  pub minor: u8,
  pub codec: Codec,
  /// Location of the serialized block index, if one was flushed
  /// 已刷盘的块索引位置（如有）
  pub index_meta: Option<BlockMeta>,
  /// Opaque checksum, preserved verbatim 透传校验和
  pub crc: u16,
}

impl SuperBlock {
  /// Fresh superblock for a new data file
  /// 新数据文件的超级块
  pub fn new(codec: Codec) -> Self {
    Self {
      magic: MAGIC,
      major: MAJOR,
      minor: MINOR,
      codec,
      index_meta: None,
      crc: 0,
    }
  }

  /// Parse one copy. Any structural problem is `Corrupt`: short buffer,
  /// wrong magic, unknown compress byte, bad index flag.
  /// 解析一份副本。任何结构问题都是 `Corrupt`：缓冲区过短、魔数错误、
  /// 未知压缩字节、索引标志非法。
  pub fn read(mut buf: &[u8]) -> Result<Self> {
    if buf.remaining() < 12 {
      return Err(Error::Corrupt("superblock truncated"));
    }

    let magic = buf.get_u64_le();
    if magic != MAGIC {
      return Err(Error::Corrupt("superblock magic"));
    }

    let major = buf.get_u8();
    let minor = buf.get_u8();
    let codec =
      Codec::from_u8(buf.get_u8()).map_err(|_| Error::Corrupt("superblock compress byte"))?;

    let index_meta = match buf.get_u8() {
      0 => None,
      1 => Some(BlockMeta::read(&mut buf).ok_or(Error::Corrupt("superblock index meta"))?),
      _ => return Err(Error::Corrupt("superblock index flag")),
    };

    if buf.remaining() < 2 {
      return Err(Error::Corrupt("superblock truncated"));
    }
    let crc = buf.get_u16_le();

    Ok(Self {
      magic,
      major,
      minor,
      codec,
      index_meta,
      crc,
    })
  }

  /// Encode into a superblock page. The record is tiny, the rest of the
  /// page stays as the caller provided it.
  /// 编码到超级块页。记录很小，页的其余部分保持调用者提供的内容。
  pub fn write(&self, mut buf: &mut [u8]) {
    buf.put_u64_le(self.magic);
    buf.put_u8(self.major);
    buf.put_u8(self.minor);
    buf.put_u8(self.codec.as_u8());
    match &self.index_meta {
      Some(meta) => {
        buf.put_u8(1);
        meta.write(&mut buf);
      }
      None => buf.put_u8(0),
    }
    buf.put_u16_le(self.crc);
  }
}
