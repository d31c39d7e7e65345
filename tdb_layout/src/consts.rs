//! Layout constants 布局常量

/// 超级块大小 Superblock size (one page)
pub const SUPER_BLOCK_SIZE: usize = 4096;

/// Block data starts after the two superblock copies
/// 块数据从两份超级块之后开始
pub const DATA_START: u64 = (SUPER_BLOCK_SIZE * 2) as u64;

/// 文件魔数 File magic
pub const MAGIC: u64 = u64::from_le_bytes(*b"TDBLAYT1");

/// 主版本 Major version
pub const MAJOR: u8 = 1;

/// 次版本 Minor version
pub const MINOR: u8 = 0;

/// Block meta wire size: offset(8) + inflated(4) + compressed(4) + crc(2)
/// 块元数据序列化大小：offset(8) + inflated(4) + compressed(4) + crc(2)
pub const BLOCK_META_SIZE: usize = 18;

/// High bid bit marks a leaf node, only read for statistics
/// bid 最高位标记叶子节点，仅用于统计
pub const LEAF_MASK: u64 = 1 << 63;
