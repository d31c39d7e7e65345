//! Block read/write/delete 块读/写/删

use compio::{
  BufResult,
  io::{AsyncReadAtExt, AsyncWriteAtExt},
};
use tdb_alloc::{AlignedBuf, page_round_up};

use super::Layout;
use crate::{Bid, Block, BlockMeta, Error, Result};

impl Layout {
  /// Read the block stored under `bid`. Absent bids are `Ok(None)`.
  /// A decompression failure on bytes that were read back intact means
  /// the store is damaged and surfaces as `Corrupt`.
  /// 读取 `bid` 对应的块。不存在返回 `Ok(None)`。已完整读回的字节解压
  /// 失败说明存储已损坏，返回 `Corrupt`。
  pub async fn read(&self, bid: Bid) -> Result<Option<Block>> {
    let Some(meta) = self.index.borrow().get(bid) else {
      log::debug!("read: no block {bid:x}");
      return Ok(None);
    };

    let block = self.read_block(&meta).await.inspect_err(|e| {
      log::error!(
        "read block {bid:x} failed, offset {}, compressed {}: {e}",
        meta.offset,
        meta.compressed_size
      );
    })?;

    log::trace!(
      "read block {bid:x} ok, offset {}, compressed {}, inflated {}",
      meta.offset,
      meta.compressed_size,
      meta.inflated_size
    );
    Ok(Some(block))
  }

  /// Write `block` under `bid`, consuming it. The old extent of an
  /// overwritten bid becomes a hole once the new write has landed; on
  /// I/O failure the reservation itself is reclaimed and the index is
  /// untouched, so the caller may retry.
  /// 以 `bid` 写入并消耗 `block`。覆盖写的旧区段在新写入落盘后转为
  /// 空洞；I/O 失败时回收预留区段且索引不变，调用者可重试。
  ///
  /// Concurrent writes to the same `bid` must be serialized by the
  /// caller.
  /// 对同一 `bid` 的并发写入须由调用者串行化。
  pub async fn write(&self, bid: Bid, block: Block) -> Result<()> {
    assert!(!block.is_empty());
    assert!(block.is_page_rounded());

    let inflated_size = block.len() as u32;
    let mut buf = match tdb_compress::compress(self.codec, &block)? {
      Some(out) => out,
      // pass-through writes from the block's own buffer
      // 直通模式直接写块自身的缓冲区
      None => block.into_buf(),
    };
    let compressed_size = buf.len() as u32;
    buf.pad_to_page();
    let size = buf.len() as u64;

    let offset = self.get_offset(size);
    let meta = BlockMeta {
      offset,
      inflated_size,
      compressed_size,
      crc: 0,
    };

    let BufResult(res, _) = self.write_data(offset, buf).await;
    match res {
      Ok(()) => {
        log::trace!("write block {bid:x} at {offset} ok, compressed {compressed_size}");
        let displaced = self.index.borrow_mut().set(bid, meta);
        self.dirty.set(true);
        if let Some((offset, size)) = displaced {
          self.add_hole(offset, size);
        }
        Ok(())
      }
      Err(e) => {
        log::error!("write block {bid:x} at {offset} failed: {e}");
        self.add_hole(offset, size);
        Err(e.into())
      }
    }
  }

  /// Drop `bid` and reclaim its extent 删除 `bid` 并回收其区段
  pub fn delete(&self, bid: Bid) {
    let displaced = self.index.borrow_mut().del(bid);
    match displaced {
      Some((offset, size)) => {
        self.dirty.set(true);
        self.add_hole(offset, size);
        log::trace!("delete block {bid:x}, freed {size} bytes at {offset}");
      }
      None => log::warn!("delete: no block {bid:x}"),
    }
  }

  /// Read one extent and inflate it into a block
  /// 读取一个区段并解压为块
  pub(crate) async fn read_block(&self, meta: &BlockMeta) -> Result<Block> {
    let buf = AlignedBuf::with_cap(meta.compressed_size as usize)?;
    debug_assert_eq!(buf.cap() as u64, meta.extent_len());

    let BufResult(res, buf) = self.read_data(meta.offset, buf).await;
    res?;

    let compressed = meta.compressed_size as usize;
    let inflated = meta.inflated_size as usize;
    match tdb_compress::decompress(self.codec, &buf[..compressed], inflated) {
      Ok(Some(out)) => Ok(Block::from_buf(out, inflated)),
      Ok(None) => Ok(Block::from_buf(buf, inflated)),
      Err(e) => {
        log::error!("decompress of stored block failed: {e}");
        Err(Error::Corrupt("block decompress"))
      }
    }
  }

  /// Positioned read with the in-flight counter
  /// 带在途计数的定位读
  pub(crate) async fn read_data(&self, offset: u64, buf: AlignedBuf) -> BufResult<(), AlignedBuf> {
    debug_assert_eq!(page_round_up(buf.cap()), buf.cap());
    self.fly_reads.set(self.fly_reads.get() + 1);
    let res = self.file.read_exact_at(buf, offset).await;
    self.fly_reads.set(self.fly_reads.get() - 1);
    res
  }

  /// Positioned write with the in-flight counter; wakes a parked flush
  /// when the last write lands
  /// 带在途计数的定位写；最后一个写入落盘时唤醒挂起的刷盘
  pub(crate) async fn write_data(&self, offset: u64, buf: AlignedBuf) -> BufResult<(), AlignedBuf> {
    self.fly_writes.set(self.fly_writes.get() + 1);
    let mut file = &self.file;
    let res = file.write_all_at(buf, offset).await;

    let left = self.fly_writes.get() - 1;
    self.fly_writes.set(left);
    if left == 0
      && let Some(waker) = self.drain.borrow_mut().take()
    {
      waker.wake();
    }
    res
  }
}
