//! Filenames, descriptor (`MANIFEST-<n>`) encode/decode, and the `CURRENT`
//! pointer file.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use memtable::{InternalKey, ValueKind};
use sstable::encode_internal_key;

use crate::version::FileMetaData;
use crate::{EngineError, Version};

pub fn table_file_name(dbname: &Path, number: u64) -> PathBuf {
    dbname.join(format!("{:06}.ldb", number))
}

pub fn descriptor_file_name(dbname: &Path, number: u64) -> PathBuf {
    dbname.join(format!("MANIFEST-{:06}", number))
}

pub fn current_file_name(dbname: &Path) -> PathBuf {
    dbname.join("CURRENT")
}

pub fn temp_file_name(dbname: &Path, number: u64) -> PathBuf {
    dbname.join(format!("{:06}.dbtmp", number))
}

/// Writes `number` to `CURRENT` via a temp-file-plus-rename, so the
/// pointer update is atomic even if the process dies mid-write.
pub fn set_current_file(dbname: &Path, descriptor_number: u64) -> Result<(), EngineError> {
    let tmp = temp_file_name(dbname, descriptor_number);
    fs::write(&tmp, descriptor_number.to_string())?;
    fs::rename(&tmp, current_file_name(dbname))?;
    Ok(())
}

/// Reads the descriptor number named by `CURRENT`, or `None` if the
/// database has no catalog yet (a fresh `dbname`).
pub fn read_current_file(dbname: &Path) -> Result<Option<u64>, EngineError> {
    let path = current_file_name(dbname);
    let contents = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    contents
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| EngineError::InvalidCurrent)
}

fn write_internal_key(w: &mut impl Write, ik: &InternalKey) -> std::io::Result<()> {
    let mut buf = Vec::new();
    encode_internal_key(ik, &mut buf);
    w.write_all(&buf)
}

fn read_internal_key(r: &mut impl Read) -> std::io::Result<InternalKey> {
    let sequence = r.read_u64::<LittleEndian>()?;
    let kind_byte = r.read_i8()?;
    let kind = ValueKind::from_i8(kind_byte)
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "bad value kind"))?;
    let key_len = r.read_i32::<LittleEndian>()? as usize;
    let mut user_key = vec![0u8; key_len];
    r.read_exact(&mut user_key)?;
    let val_len = r.read_i32::<LittleEndian>()? as usize;
    let mut user_value = vec![0u8; val_len];
    r.read_exact(&mut user_value)?;
    Ok(InternalKey::new(user_key, sequence, kind, user_value))
}

fn write_file_meta(w: &mut impl Write, meta: &FileMetaData) -> std::io::Result<()> {
    // Canonical field order `{allowed_seeks, file_size, number}` for both
    // encode and decode.
    w.write_u64::<LittleEndian>(meta.allowed_seeks)?;
    w.write_u64::<LittleEndian>(meta.file_size)?;
    w.write_u64::<LittleEndian>(meta.number)?;
    write_internal_key(w, &meta.smallest)?;
    write_internal_key(w, &meta.largest)?;
    Ok(())
}

fn read_file_meta(r: &mut impl Read) -> std::io::Result<FileMetaData> {
    let allowed_seeks = r.read_u64::<LittleEndian>()?;
    let file_size = r.read_u64::<LittleEndian>()?;
    let number = r.read_u64::<LittleEndian>()?;
    let smallest = read_internal_key(r)?;
    let largest = read_internal_key(r)?;
    Ok(FileMetaData {
        number,
        file_size,
        allowed_seeks,
        smallest,
        largest,
    })
}

impl Version {
    /// Encodes the descriptor: `next_file_number(u64) | sequence(u64) |`
    /// for each of the `NUM_LEVELS` levels, `count(i32)` followed by
    /// `count` `FileMetaData` entries.
    pub fn encode_to(&self, w: &mut impl Write) -> Result<(), EngineError> {
        w.write_u64::<LittleEndian>(self.next_file_number)?;
        w.write_u64::<LittleEndian>(self.sequence)?;
        for level in 0..config::NUM_LEVELS {
            w.write_i32::<LittleEndian>(self.files[level].len() as i32)?;
            for f in &self.files[level] {
                write_file_meta(w, f)?;
            }
        }
        Ok(())
    }

    pub fn decode_from(r: &mut impl Read) -> Result<Self, EngineError> {
        let mut v = Version::new();
        v.next_file_number = r.read_u64::<LittleEndian>()?;
        v.sequence = r.read_u64::<LittleEndian>()?;
        for level in 0..config::NUM_LEVELS {
            let count = r.read_i32::<LittleEndian>()?;
            for _ in 0..count {
                let meta = read_file_meta(r)?;
                v.add_file(level, meta);
            }
        }
        Ok(v)
    }

    /// Persists this catalog as a new `MANIFEST-<n>` descriptor, consuming
    /// (and returning) the next file number. Does not touch `CURRENT` —
    /// callers install the result via [`set_current_file`].
    pub fn save(&mut self, dbname: &Path) -> Result<u64, EngineError> {
        let descriptor_number = self.next_file_number;
        self.next_file_number += 1;
        let path = descriptor_file_name(dbname, descriptor_number);
        let mut file = File::create(&path)?;
        self.encode_to(&mut file)?;
        file.sync_all()?;
        Ok(descriptor_number)
    }

    /// Loads the descriptor named `MANIFEST-<number>` under `dbname`.
    pub fn load(dbname: &Path, number: u64) -> Result<Self, EngineError> {
        let path = descriptor_file_name(dbname, number);
        let mut file = File::open(&path)?;
        Version::decode_from(&mut file)
    }
}

#[cfg(test)]
#[path = "tests/manifest_tests.rs"]
mod manifest_tests;
