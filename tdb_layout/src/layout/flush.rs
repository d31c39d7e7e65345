//! Flush and checkpoint 刷盘与检查点

use std::task::Poll;

use compio::BufResult;
use tdb_alloc::AlignedBuf;

use super::Layout;
use crate::{BlockMeta, Result, consts::SUPER_BLOCK_SIZE};

impl Layout {
  /// Persist metadata: wait out in-flight writes, write the index block
  /// and both superblocks, then trim the file tail. A repeated flush
  /// with no index change in between writes nothing new. Not reentrant;
  /// callers serialize flushes.
  /// 持久化元数据：等待在途写入结束，写出索引块和两份超级块，然后裁剪
  /// 文件尾部。期间索引未变的重复刷盘不产生新写入。不可重入；调用者需
  /// 串行化刷盘。
  pub async fn flush(&self) -> Result<()> {
    self.drain_writes().await;

    if self.dirty.get() {
      self.flush_index().await?;
      self.flush_superblock().await?;
      self.dirty.set(false);
    }

    self.file.sync_all().await?;
    self.truncate()
  }

  /// Final flush. After a failure here the store must be treated as
  /// damaged.
  /// 最终刷盘。此处失败后存储须视为已损坏。
  pub async fn close(&self) -> Result<()> {
    self.flush().await
  }

  /// Resolve once every previously submitted write has completed
  /// 在所有已提交写入完成后返回
  async fn drain_writes(&self) {
    std::future::poll_fn(|cx| {
      if self.fly_writes.get() == 0 {
        Poll::Ready(())
      } else {
        *self.drain.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
      }
    })
    .await
  }

  /// Write the serialized index as a normal block and repoint the
  /// in-memory superblock at it. The previous index extent becomes a
  /// hole only after the new block has landed, and the superblock on
  /// disk is rewritten only afterwards, so an interrupted flush leaves
  /// the previously committed pair intact.
  /// 将序列化索引作为普通块写出，并让内存超级块指向它。旧索引区段在新
  /// 块落盘后才转为空洞，磁盘上的超级块此后才重写，因此中断的刷盘保留
  /// 先前已提交的组合。
  pub(crate) async fn flush_index(&self) -> Result<()> {
    let payload = self.index.borrow().encode()?;
    let inflated_size = payload.len() as u32;

    let mut buf = match tdb_compress::compress(self.codec, &payload)? {
      Some(out) => out,
      None => payload,
    };
    let compressed_size = buf.len() as u32;
    buf.pad_to_page();
    let size = buf.len() as u64;

    let offset = self.get_offset(size);
    let BufResult(res, _) = self.write_data(offset, buf).await;
    if let Err(e) = res {
      log::error!("flush index block failed: {e}");
      self.add_hole(offset, size);
      return Err(e.into());
    }
    log::trace!("index block written at {offset}, {compressed_size} bytes");

    let old = {
      let mut eng = self.eng.borrow_mut();
      eng.superblock.index_meta.replace(BlockMeta {
        offset,
        inflated_size,
        compressed_size,
        crc: 0,
      })
    };
    self
      .index
      .borrow_mut()
      .move_index_extent(old.map(|m| m.offset), offset, size);
    if let Some(old) = old {
      self.add_hole(old.offset, old.extent_len());
    }
    Ok(())
  }

  /// Double-write the superblock, failing fast on either copy
  /// 双写超级块，任一副本失败立即返回
  pub(crate) async fn flush_superblock(&self) -> Result<()> {
    let mut buf = AlignedBuf::zeroed(SUPER_BLOCK_SIZE)?;
    self.eng.borrow().superblock.write(&mut buf[..]);

    let BufResult(res, buf) = self.write_data(0, buf).await;
    if let Err(e) = res {
      log::error!("flush 1st superblock failed: {e}");
      return Err(e.into());
    }
    let BufResult(res, _) = self.write_data(SUPER_BLOCK_SIZE as u64, buf).await;
    if let Err(e) = res {
      log::error!("flush 2nd superblock failed: {e}");
      return Err(e.into());
    }

    log::trace!("superblocks flushed");
    Ok(())
  }

  /// Release the file tail beyond the data end
  /// 释放数据末尾之后的文件尾部
  pub(crate) fn truncate(&self) -> Result<()> {
    let mut eng = self.eng.borrow_mut();
    if eng.end < eng.len {
      std::fs::OpenOptions::new()
        .write(true)
        .open(&self.path)?
        .set_len(eng.end)?;
      log::trace!("truncate {} -> {}", eng.len, eng.end);
      eng.len = eng.end;
    }
    Ok(())
  }
}
