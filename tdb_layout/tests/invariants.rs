//! Randomized workload invariants 随机负载不变量
//!
//! After every settled step (no I/O in flight) the on-disk accounting
//! must tile the data region exactly: live extents and holes are
//! pairwise disjoint, page-aligned, and together with the superblocks
//! account for every byte up to the file end; no hole touches the end.
//! 每个完成的步骤后（无在途 I/O），磁盘记账必须精确平铺数据区：存活
//! 区段与空洞两两不相交、页对齐，连同超级块覆盖到文件末尾的每个字节；
//! 空洞不触及末尾。

use std::collections::HashMap;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tdb_layout::{Bid, Block, Codec, Layout, consts::DATA_START};

fn check_accounting(layout: &Layout) {
  let mut spans = layout.extents_snapshot();
  for hole in layout.holes_snapshot() {
    assert!(hole.size > 0);
    assert_eq!(hole.offset % 4096, 0, "hole offset aligned");
    assert_eq!(hole.size % 4096, 0, "hole size aligned");
    assert_ne!(hole.end(), layout.file_end(), "no hole at the tail");
    spans.push((hole.offset, hole.size));
  }
  spans.sort_unstable();

  let mut cursor = DATA_START;
  for (offset, len) in spans {
    assert_eq!(offset % 4096, 0, "extent offset aligned");
    assert_eq!(len % 4096, 0, "extent len aligned");
    assert_eq!(offset, cursor, "no gap and no overlap at {offset}");
    cursor = offset + len;
  }
  assert_eq!(cursor, layout.file_end(), "everything accounted for");
}

async fn random_workload(codec: Codec, seed: u64) {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("data.tdb");
  let mut rng = StdRng::seed_from_u64(seed);
  let mut model: HashMap<u64, Vec<u8>> = HashMap::new();

  {
    let layout = Layout::open(&path, codec, true).await.unwrap();
    for _ in 0..300 {
      match rng.gen_range(0u32..10) {
        // mostly writes, new bids and overwrites alike
        // 以写为主，新 bid 与覆盖写皆有
        0..=5 => {
          let bid = rng.gen_range(1u64..24);
          let len = rng.gen_range(1usize..12_000);
          let data: Vec<u8> = (&mut rng).sample_iter(rand::distributions::Standard).take(len).collect();
          let block = Block::copy_from(&data).unwrap();
          layout.write(Bid(bid), block).await.unwrap();
          model.insert(bid, data);
        }
        6..=7 => {
          let bid = rng.gen_range(1u64..24);
          layout.delete(Bid(bid));
          model.remove(&bid);
        }
        8 => layout.flush().await.unwrap(),
        _ => {
          let bid = rng.gen_range(1u64..24);
          let got = layout.read(Bid(bid)).await.unwrap();
          match model.get(&bid) {
            Some(want) => assert_eq!(&got.unwrap()[..], &want[..]),
            None => assert!(got.is_none()),
          }
        }
      }
      check_accounting(&layout);
    }
    layout.close().await.unwrap();
  }

  // everything survives the reopen, accounting included
  // 重开后一切保留，记账同样成立
  let layout = Layout::open(&path, codec, false).await.unwrap();
  check_accounting(&layout);
  assert_eq!(layout.block_count(), model.len());
  for (bid, want) in &model {
    let got = layout.read(Bid(*bid)).await.unwrap().unwrap();
    assert_eq!(&got[..], &want[..]);
  }
}

#[compio::test]
async fn random_workload_none() {
  random_workload(Codec::None, 7).await;
}

#[compio::test]
async fn random_workload_snappy() {
  random_workload(Codec::Snappy, 11).await;
}
