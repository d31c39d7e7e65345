//! End-to-end layout scenarios 布局端到端场景

use std::path::{Path, PathBuf};

use tdb_layout::{Bid, Block, Codec, Error, Layout, consts::DATA_START};

fn data_path(dir: &tempfile::TempDir) -> PathBuf {
  dir.path().join("data.tdb")
}

fn payload(seed: u8, len: usize) -> Vec<u8> {
  (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

async fn write_bytes(layout: &Layout, bid: u64, data: &[u8]) {
  let block = Block::copy_from(data).unwrap();
  layout.write(Bid(bid), block).await.unwrap();
}

async fn assert_read(layout: &Layout, bid: u64, want: &[u8]) {
  let block = layout.read(Bid(bid)).await.unwrap().unwrap();
  assert_eq!(&block[..], want);
}

fn file_len(path: &Path) -> u64 {
  std::fs::metadata(path).unwrap().len()
}

/// Fresh create: two superblock pages and nothing else
/// 全新创建：两页超级块，别无其他
#[compio::test]
async fn fresh_create() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);

  let layout = Layout::open(&path, Codec::None, true).await.unwrap();
  layout.flush().await.unwrap();
  assert_eq!(layout.file_end(), DATA_START);
  assert_eq!(layout.block_count(), 0);
  drop(layout);

  assert_eq!(file_len(&path), 8192);
  let bytes = std::fs::read(&path).unwrap();
  // both copies carry the magic and are byte-identical
  // 两份副本都带魔数且字节一致
  assert_eq!(&bytes[..8], b"TDBLAYT1");
  assert_eq!(&bytes[..4096], &bytes[4096..8192]);
}

/// One small uncompressed block lands right after the superblocks
/// 一个未压缩小块紧跟在超级块之后
#[compio::test]
async fn single_write() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);

  let layout = Layout::open(&path, Codec::None, true).await.unwrap();
  let data = payload(7, 1000);
  write_bytes(&layout, 0x1, &data).await;

  assert_eq!(file_len(&path), 12288);
  let meta = layout.block_meta(Bid(0x1)).unwrap();
  assert_eq!(meta.offset, 8192);
  assert_eq!(meta.inflated_size, 1000);
  assert_eq!(meta.compressed_size, 1000);

  assert_read(&layout, 0x1, &data).await;
}

/// Overwrite: the new extent is reserved before the old one is freed,
/// so the replacement lands at the tail and the old extent becomes the
/// hole that the next write then reuses.
/// 覆盖写：新区段先预留、旧区段后释放，因此替换落在尾部，旧区段成为
/// 空洞，被下一次写入复用。
#[compio::test]
async fn overwrite_reclaims() {
  let dir = tempfile::tempdir().unwrap();
  let layout = Layout::open(data_path(&dir), Codec::None, true)
    .await
    .unwrap();

  write_bytes(&layout, 0x1, &payload(1, 4000)).await;
  assert_eq!(layout.file_end(), 12288);

  let second = payload(2, 4000);
  write_bytes(&layout, 0x1, &second).await;

  let meta = layout.block_meta(Bid(0x1)).unwrap();
  assert_eq!(meta.offset, 12288);
  assert_eq!(layout.file_end(), 16384);
  assert_eq!(layout.extents_snapshot(), vec![(12288, 4096)]);
  let holes: Vec<_> = layout
    .holes_snapshot()
    .iter()
    .map(|h| (h.offset, h.size))
    .collect();
  assert_eq!(holes, vec![(8192, 4096)]);

  // the freed extent is the first fit for the next write
  // 释放的区段被下一次写入首次适应命中
  let third = payload(3, 4000);
  write_bytes(&layout, 0x2, &third).await;
  assert_eq!(layout.block_meta(Bid(0x2)).unwrap().offset, 8192);
  assert!(layout.holes_snapshot().is_empty());
  assert_eq!(layout.file_end(), 16384);

  assert_read(&layout, 0x1, &second).await;
  assert_read(&layout, 0x2, &third).await;
}

/// Delete in the middle leaves a hole that a later write fills
/// 中间删除留下空洞，随后写入将其填充
#[compio::test]
async fn delete_creates_hole_in_middle() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);
  let layout = Layout::open(&path, Codec::None, true).await.unwrap();

  write_bytes(&layout, 0xA, &payload(0xA, 1000)).await;
  write_bytes(&layout, 0xB, &payload(0xB, 1000)).await;
  write_bytes(&layout, 0xC, &payload(0xC, 1000)).await;
  assert_eq!(layout.file_end(), 20480);

  layout.delete(Bid(0xB));
  let holes: Vec<_> = layout
    .holes_snapshot()
    .iter()
    .map(|h| (h.offset, h.size))
    .collect();
  assert_eq!(holes, vec![(12288, 4096)]);
  assert_eq!(layout.file_end(), 20480);
  assert_eq!(file_len(&path), 20480);

  write_bytes(&layout, 0xD, &payload(0xD, 1000)).await;
  assert_eq!(layout.block_meta(Bid(0xD)).unwrap().offset, 12288);
  assert!(layout.holes_snapshot().is_empty());
}

/// Shrinking the tail cascades through holes that end up touching it
/// 尾部收缩会级联吞掉触及末尾的空洞
#[compio::test]
async fn tail_absorption_cascades() {
  let dir = tempfile::tempdir().unwrap();
  let layout = Layout::open(data_path(&dir), Codec::None, true)
    .await
    .unwrap();

  write_bytes(&layout, 0xA, &payload(0xA, 1000)).await;
  write_bytes(&layout, 0xB, &payload(0xB, 1000)).await;
  assert_eq!(layout.file_end(), 16384);

  // first delete leaves a mid-file hole, second shrinks the tail onto it
  // 第一次删除留下文件中部空洞，第二次收缩尾部落到其上
  layout.delete(Bid(0xA));
  assert_eq!(layout.holes_snapshot().len(), 1);
  layout.delete(Bid(0xB));
  assert!(layout.holes_snapshot().is_empty());
  assert_eq!(layout.file_end(), DATA_START);
}

/// Reopen rebuilds the index, the offsets and the hole list
/// 重开重建索引、偏移视图与空洞列表
#[compio::test]
async fn reopen_rebuilds() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);

  {
    let layout = Layout::open(&path, Codec::None, true).await.unwrap();
    write_bytes(&layout, 0xA, &payload(0xA, 1000)).await;
    write_bytes(&layout, 0xB, &payload(0xB, 1000)).await;
    write_bytes(&layout, 0xC, &payload(0xC, 1000)).await;
    layout.delete(Bid(0xB));
    write_bytes(&layout, 0xD, &payload(0xD, 1000)).await;
    layout.close().await.unwrap();
  }

  let layout = Layout::open(&path, Codec::None, false).await.unwrap();
  assert_eq!(layout.block_count(), 3);
  assert!(layout.holes_snapshot().is_empty());
  assert!(layout.read(Bid(0xB)).await.unwrap().is_none());
  assert_read(&layout, 0xA, &payload(0xA, 1000)).await;
  assert_read(&layout, 0xC, &payload(0xC, 1000)).await;
  assert_read(&layout, 0xD, &payload(0xD, 1000)).await;
}

/// A hole in the middle survives a reopen
/// 中间的空洞在重开后保留
#[compio::test]
async fn reopen_rederives_holes() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);

  {
    let layout = Layout::open(&path, Codec::None, true).await.unwrap();
    write_bytes(&layout, 0xA, &payload(0xA, 1000)).await;
    write_bytes(&layout, 0xB, &payload(0xB, 6000)).await;
    write_bytes(&layout, 0xC, &payload(0xC, 1000)).await;
    layout.delete(Bid(0xB));
    layout.close().await.unwrap();
  }

  let layout = Layout::open(&path, Codec::None, false).await.unwrap();
  let holes: Vec<_> = layout
    .holes_snapshot()
    .iter()
    .map(|h| (h.offset, h.size))
    .collect();
  assert_eq!(holes, vec![(12288, 8192)]);
  assert_read(&layout, 0xA, &payload(0xA, 1000)).await;
  assert_read(&layout, 0xC, &payload(0xC, 1000)).await;
}

/// Zeroing the first superblock still opens from the second copy
/// 清零第一份超级块后仍可从第二份打开
#[compio::test]
async fn superblock_fallback() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);

  {
    let layout = Layout::open(&path, Codec::None, true).await.unwrap();
    write_bytes(&layout, 0xA, &payload(0xA, 1000)).await;
    write_bytes(&layout, 0xC, &payload(0xC, 1000)).await;
    layout.close().await.unwrap();
  }

  // wipe the primary copy 抹掉第一份副本
  {
    use std::{fs::OpenOptions, io::Write};
    let mut f = OpenOptions::new().write(true).open(&path).unwrap();
    f.write_all(&[0u8; 4096]).unwrap();
  }

  let layout = Layout::open(&path, Codec::None, false).await.unwrap();
  assert_read(&layout, 0xA, &payload(0xA, 1000)).await;
  assert_read(&layout, 0xC, &payload(0xC, 1000)).await;
}

/// Both superblocks gone means the store cannot open
/// 两份超级块都坏则无法打开
#[compio::test]
async fn both_superblocks_bad() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);

  {
    let layout = Layout::open(&path, Codec::None, true).await.unwrap();
    layout.close().await.unwrap();
  }
  std::fs::write(&path, vec![0u8; 8192]).unwrap();

  let err = Layout::open(&path, Codec::None, false)
    .await
    .err()
    .expect("open must fail");
  assert!(matches!(err, Error::Corrupt(_)), "got {err:?}");
}

/// A too-short file is rejected before any parsing
/// 过短的文件在解析前即被拒绝
#[compio::test]
async fn short_file_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);
  std::fs::write(&path, vec![0u8; 100]).unwrap();

  let err = Layout::open(&path, Codec::None, false)
    .await
    .err()
    .expect("open must fail");
  assert!(matches!(err, Error::TooShort(100)), "got {err:?}");
}

/// The stored codec must match the configured one
/// 存储的压缩算法必须与配置一致
#[compio::test]
async fn codec_mismatch_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);

  {
    let layout = Layout::open(&path, Codec::Snappy, true).await.unwrap();
    layout.close().await.unwrap();
  }

  let err = Layout::open(&path, Codec::None, false)
    .await
    .err()
    .expect("open must fail");
  assert!(matches!(err, Error::CodecMismatch { .. }), "got {err:?}");
}

/// Byte-for-byte round trip across a reopen, both codecs
/// 重开前后字节级往返，两种压缩算法
#[compio::test]
async fn roundtrip_none() {
  roundtrip(Codec::None).await;
}

#[compio::test]
async fn roundtrip_snappy() {
  roundtrip(Codec::Snappy).await;
}

async fn roundtrip(codec: Codec) {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);

  let blocks: Vec<(u64, Vec<u8>)> = vec![
    (0x1, payload(1, 100)),
    (0x2, payload(2, 4096)),
    (0x3, b"repeat".repeat(3000)),
    (0x8000_0000_0000_0001, payload(9, 10_000)),
  ];

  {
    let layout = Layout::open(&path, codec, true).await.unwrap();
    for (bid, data) in &blocks {
      write_bytes(&layout, *bid, data).await;
      assert_read(&layout, *bid, data).await;
    }
    layout.close().await.unwrap();
  }

  let layout = Layout::open(&path, codec, false).await.unwrap();
  assert_eq!(layout.block_count(), blocks.len());
  for (bid, data) in &blocks {
    assert_read(&layout, *bid, data).await;
  }
}

/// A second flush with no changes writes nothing new
/// 无变更的第二次刷盘不产生新写入
#[compio::test]
async fn idempotent_flush() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);

  let layout = Layout::open(&path, Codec::None, true).await.unwrap();
  write_bytes(&layout, 0x1, &payload(1, 2000)).await;
  write_bytes(&layout, 0x2, &payload(2, 5000)).await;
  layout.delete(Bid(0x1));

  layout.flush().await.unwrap();
  let first = std::fs::read(&path).unwrap();

  layout.flush().await.unwrap();
  let second = std::fs::read(&path).unwrap();
  assert_eq!(first, second);
}

/// Reads of unknown bids are not errors, deletes are logged no-ops
/// 未知 bid 的读取不是错误，删除则为记录日志的空操作
#[compio::test]
async fn missing_bid() {
  let dir = tempfile::tempdir().unwrap();
  let layout = Layout::open(data_path(&dir), Codec::None, true)
    .await
    .unwrap();

  assert!(layout.read(Bid(0x42)).await.unwrap().is_none());
  layout.delete(Bid(0x42));
  assert_eq!(layout.block_count(), 0);
}

/// Disjoint bids written concurrently all land, each exactly once
/// 并发写入的不同 bid 全部落盘，各恰好一次
#[compio::test]
async fn concurrent_disjoint_writes() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);
  let layout = Layout::open(&path, Codec::None, true).await.unwrap();

  let datas: Vec<(u64, Vec<u8>)> = (0..16u64)
    .map(|i| (i + 1, payload(i as u8, 500 + 337 * i as usize)))
    .collect();

  let writes = datas.iter().map(|(bid, data)| {
    let layout = &layout;
    async move {
      let block = Block::copy_from(data).unwrap();
      layout.write(Bid(*bid), block).await
    }
  });
  for res in futures::future::join_all(writes).await {
    res.unwrap();
  }

  assert_eq!(layout.in_flight(), (0, 0));
  assert_eq!(layout.block_count(), datas.len());

  // extents are pairwise disjoint and page-aligned
  // 区段两两不相交且页对齐
  let extents = layout.extents_snapshot();
  for window in extents.windows(2) {
    assert!(window[0].0 + window[0].1 <= window[1].0);
  }
  for (offset, len) in &extents {
    assert_eq!(offset % 4096, 0);
    assert_eq!(len % 4096, 0);
  }

  for (bid, data) in &datas {
    assert_read(&layout, *bid, data).await;
  }

  layout.close().await.unwrap();
  let layout = Layout::open(&path, Codec::None, false).await.unwrap();
  for (bid, data) in &datas {
    assert_read(&layout, *bid, data).await;
  }
}

/// A flush issued while a write is in flight waits for it
/// 写入在途时发起的刷盘会等待其完成
#[compio::test]
async fn flush_waits_for_inflight_write() {
  let dir = tempfile::tempdir().unwrap();
  let path = data_path(&dir);
  let layout = Layout::open(&path, Codec::None, true).await.unwrap();

  let data = payload(5, 60_000);
  let write = async {
    let block = Block::copy_from(&data).unwrap();
    layout.write(Bid(0x5), block).await
  };
  let (w, f) = futures::join!(write, layout.flush());
  w.unwrap();
  f.unwrap();

  // the flushed index covers the write the flush had to wait for
  // 刷出的索引包含刷盘所等待的那次写入
  drop(layout);
  let layout = Layout::open(&path, Codec::None, false).await.unwrap();
  assert_read(&layout, 0x5, &data).await;
}
