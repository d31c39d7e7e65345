#![cfg_attr(docsrs, feature(doc_cfg))]

//! On-disk block layout engine 磁盘块布局引擎
//!
//! One data file holds page-aligned, optionally compressed blocks keyed
//! by 64-bit IDs. Two redundant superblocks anchor a serialized block
//! index; the space freed by overwrites and deletes is tracked in a
//! coalescing hole list and handed back to later writes.
//! 单个数据文件保存按 64 位 ID 索引、页对齐、可选压缩的块。两份冗余
//! 超级块锚定序列化的块索引；覆盖写与删除释放的空间记录在可合并的空洞
//! 列表中，供后续写入复用。
//!
//! ## File layout
//! ```text
//! | superblock | superblock copy | blocks + index block, page-aligned, with holes |
//! 0            4096              8192                                    file end
//! ```

mod block;
pub mod consts;
mod error;
mod hole;
mod index;
mod layout;
mod meta;
mod super_block;
mod types;

pub use block::Block;
pub use error::{Error, Result};
pub use hole::Hole;
pub use layout::Layout;
pub use meta::BlockMeta;
pub use super_block::SuperBlock;
pub use tdb_alloc::{AlignedBuf, PAGE_SIZE, page_round_up};
pub use tdb_compress::Codec;
pub use types::{Bid, Stats};
