//! Open and recovery 打开与恢复

use std::{
  cell::{Cell, RefCell},
  path::Path,
};

use compio::{BufResult, fs::OpenOptions};
use tdb_alloc::AlignedBuf;
use tdb_compress::Codec;

use super::{Eng, Layout};
use crate::{
  BlockMeta, Error, Result, SuperBlock,
  consts::{DATA_START, SUPER_BLOCK_SIZE},
  hole::Holes,
  index::BlockIndex,
};

impl Layout {
  /// Open the data file. `create` starts a fresh store: superblocks are
  /// double-written and the data region is empty. Otherwise the
  /// superblock is loaded (falling back to the second copy), the index
  /// block decoded, and the hole list derived from the gaps between
  /// extents. Either way the tail beyond the data end is trimmed.
  /// 打开数据文件。`create` 创建全新存储：双写超级块，数据区为空。
  /// 否则加载超级块（失败回退第二份），解码索引块，并从区段间隙推导
  /// 空洞列表。两种路径最后都裁剪数据末尾之后的部分。
  pub async fn open(path: impl AsRef<Path>, codec: Codec, create: bool) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(create)
      .open(&path)
      .await?;
    let len = std::fs::metadata(&path)?.len();

    let layout = Self {
      file,
      path,
      codec,
      eng: RefCell::new(Eng {
        end: DATA_START,
        len,
        superblock: SuperBlock::new(codec),
      }),
      index: RefCell::new(BlockIndex::default()),
      holes: RefCell::new(Holes::new()),
      fly_reads: Cell::new(0),
      fly_writes: Cell::new(0),
      dirty: Cell::new(false),
      drain: RefCell::new(None),
    };

    if create {
      layout.flush_superblock().await.inspect_err(|e| {
        log::error!("flush superblock during create failed: {e}");
      })?;
      let mut eng = layout.eng.borrow_mut();
      if eng.len < DATA_START {
        eng.len = DATA_START;
      }
    } else {
      if len < DATA_START {
        log::error!("data file too short: {len} bytes");
        return Err(Error::TooShort(len));
      }
      layout.load_superblock().await?;

      let (file_codec, index_meta) = {
        let eng = layout.eng.borrow();
        (eng.superblock.codec, eng.superblock.index_meta)
      };
      if file_codec != codec {
        log::error!("superblock codec {file_codec:?} does not match configured {codec:?}");
        return Err(Error::CodecMismatch {
          file: file_codec,
          conf: codec,
        });
      }
      if let Some(meta) = &index_meta {
        layout.load_index(meta).await?;
      }

      let (gaps, end) = {
        let mut index = layout.index.borrow_mut();
        index.rebuild_offsets(index_meta.as_ref())?;
        index.gaps(DATA_START)?
      };
      {
        let mut holes = layout.holes.borrow_mut();
        for (offset, size) in gaps {
          holes.add(offset, size);
        }
      }
      layout.eng.borrow_mut().end = end;

      let stats = layout.stats();
      log::info!("{} blocks found", layout.block_count());
      log::info!(
        "inner: {} blocks, {} inflated, {} compressed; leaf: {} blocks, {} inflated, {} compressed",
        stats.inner_count,
        stats.inner_inflated,
        stats.inner_compressed,
        stats.leaf_count,
        stats.leaf_inflated,
        stats.leaf_compressed
      );
    }

    layout.truncate()?;
    Ok(layout)
  }

  /// Load the superblock, falling back to the second copy
  /// 加载超级块，失败回退到第二份副本
  async fn load_superblock(&self) -> Result<()> {
    let sb = match self.read_superblock_at(0).await {
      Ok(sb) => {
        log::trace!("1st superblock ok");
        sb
      }
      Err(e) => {
        log::warn!("1st superblock unusable: {e}");
        match self.read_superblock_at(SUPER_BLOCK_SIZE as u64).await {
          Ok(sb) => {
            log::trace!("2nd superblock ok");
            sb
          }
          Err(e) => {
            log::error!("2nd superblock unusable: {e}");
            return Err(Error::Corrupt("both superblocks unusable"));
          }
        }
      }
    };
    self.eng.borrow_mut().superblock = sb;
    Ok(())
  }

  async fn read_superblock_at(&self, offset: u64) -> Result<SuperBlock> {
    let buf = AlignedBuf::with_cap(SUPER_BLOCK_SIZE)?;
    let BufResult(res, buf) = self.read_data(offset, buf).await;
    res?;
    SuperBlock::read(&buf)
  }

  /// Decode the index block referenced by the superblock
  /// 解码超级块引用的索引块
  async fn load_index(&self, meta: &BlockMeta) -> Result<()> {
    log::trace!("read index block at {}", meta.offset);
    let block = self.read_block(meta).await.inspect_err(|e| {
      log::error!("read index block failed: {e}");
    })?;
    self
      .index
      .borrow_mut()
      .decode(&block)
      .inspect_err(|e| log::error!("bad index block: {e}"))
  }
}
