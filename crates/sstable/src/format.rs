//! Wire format shared by every on-disk structure in this crate: the
//! `InternalKey` entry encoding, `BlockHandle`, and the fixed `Table`
//! footer.
//!
//! Everything here is little-endian. There is deliberately no per-record
//! checksum and no compression — both are explicit non-goals of this core
//! — so a block's on-disk bytes are exactly its concatenated entry
//! encodings plus the trailing entry count.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use memtable::{InternalKey, ValueKind};

use crate::TableError;

/// Magic constant terminating every `Table` footer: `0xdb4775248b80fb57`.
pub const TABLE_MAGIC: u64 = 0xdb4775248b80fb57;

/// `BlockHandle` encoded size: two little-endian `u32`s.
pub const BLOCK_HANDLE_BYTES: usize = 8;

/// Footer size: two `BlockHandle`s (meta-index, index) plus the magic.
pub const FOOTER_BYTES: usize = 2 * BLOCK_HANDLE_BYTES + 8;

/// Locates a block within a `Table` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHandle {
    pub offset: u32,
    pub size: u32,
}

impl BlockHandle {
    pub fn encode(&self) -> [u8; BLOCK_HANDLE_BYTES] {
        let mut buf = [0u8; BLOCK_HANDLE_BYTES];
        {
            let mut w = &mut buf[..];
            w.write_u32::<LittleEndian>(self.offset).unwrap();
            w.write_u32::<LittleEndian>(self.size).unwrap();
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TableError> {
        if bytes.len() < BLOCK_HANDLE_BYTES {
            return Err(TableError::TableTooShort);
        }
        let mut r = Cursor::new(bytes);
        let offset = r.read_u32::<LittleEndian>()?;
        let size = r.read_u32::<LittleEndian>()?;
        Ok(BlockHandle { offset, size })
    }
}

/// The fixed footer written at the end of every `Table` file:
/// `meta_index_handle ‖ index_handle ‖ magic`. `meta_index_handle` is
/// reserved and always zero in this core (no meta-index block is written).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub meta_index_handle: BlockHandle,
    pub index_handle: BlockHandle,
}

impl Footer {
    pub fn encode(&self) -> [u8; FOOTER_BYTES] {
        let mut buf = [0u8; FOOTER_BYTES];
        buf[0..8].copy_from_slice(&self.meta_index_handle.encode());
        buf[8..16].copy_from_slice(&self.index_handle.encode());
        let mut magic_buf = &mut buf[16..24];
        magic_buf.write_u64::<LittleEndian>(TABLE_MAGIC).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TableError> {
        if bytes.len() < FOOTER_BYTES {
            return Err(TableError::TableTooShort);
        }
        let meta_index_handle = BlockHandle::decode(&bytes[0..8])?;
        let index_handle = BlockHandle::decode(&bytes[8..16])?;
        let magic = Cursor::new(&bytes[16..24]).read_u64::<LittleEndian>()?;
        if magic != TABLE_MAGIC {
            return Err(TableError::TableFileMagic);
        }
        Ok(Footer {
            meta_index_handle,
            index_handle,
        })
    }
}

/// Appends the wire encoding of `ik` to `buf`:
/// `sequence(u64) ‖ kind(i8) ‖ key_len(i32) ‖ key ‖ value_len(i32) ‖ value`.
pub fn encode_internal_key(ik: &InternalKey, buf: &mut Vec<u8>) {
    buf.write_u64::<LittleEndian>(ik.sequence).unwrap();
    buf.write_i8(ik.kind.as_i8()).unwrap();
    buf.write_i32::<LittleEndian>(ik.user_key.len() as i32)
        .unwrap();
    buf.extend_from_slice(&ik.user_key);
    buf.write_i32::<LittleEndian>(ik.user_value.len() as i32)
        .unwrap();
    buf.extend_from_slice(&ik.user_value);
}

/// Decodes one `InternalKey` starting at `buf[0]`, returning the key and
/// the number of bytes consumed.
pub fn decode_internal_key(buf: &[u8]) -> Result<(InternalKey, usize), TableError> {
    let mut r = Cursor::new(buf);
    let sequence = r.read_u64::<LittleEndian>()?;
    let kind_byte = r.read_i8()?;
    let kind = ValueKind::from_i8(kind_byte).ok_or(TableError::Corrupt("bad value kind"))?;
    let key_len = r.read_i32::<LittleEndian>()? as usize;
    let key_start = r.position() as usize;
    let key_end = key_start
        .checked_add(key_len)
        .ok_or(TableError::Corrupt("key length overflow"))?;
    if key_end > buf.len() {
        return Err(TableError::Corrupt("key runs past end of block"));
    }
    let user_key = buf[key_start..key_end].to_vec();
    r.set_position(key_end as u64);
    let val_len = r.read_i32::<LittleEndian>()? as usize;
    let val_start = r.position() as usize;
    let val_end = val_start
        .checked_add(val_len)
        .ok_or(TableError::Corrupt("value length overflow"))?;
    if val_end > buf.len() {
        return Err(TableError::Corrupt("value runs past end of block"));
    }
    let user_value = buf[val_start..val_end].to_vec();
    Ok((
        InternalKey::new(user_key, sequence, kind, user_value),
        val_end,
    ))
}
