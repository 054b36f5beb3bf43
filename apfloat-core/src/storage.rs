//! `DataStorage` (§4.B): a uniform view over a digit array that may live in
//! RAM or on disk.
//!
//! Rather than a `dyn DataStorage` trait object with `get_array`/`iterator`
//! methods whose return types would have to unify a zero-copy memory slice
//! with a materialized disk block behind a lifetime, this follows §9's
//! "Iterator with lazy padding" guidance to prefer explicit, concrete code:
//! `Storage<D>` is a two-variant enum with a small uniform `read`/`write`
//! API (always an owned `Vec<D>` in, an owned `Vec<D>` or slice out) plus an
//! `as_memory_mut` fast path for components (Table FNT) that need true
//! in-place mutation when the backing is already RAM-resident.
use {
    crate::{context::Context, digit::Digit, error::Error},
    std::{
        fs::File,
        io::{Read, Seek, SeekFrom, Write},
        marker::PhantomData,
        path::PathBuf,
    },
    tracing::debug,
};

pub struct DiskStorage<D: Digit> {
    file: tempfile::NamedTempFile,
    path: PathBuf,
    len: usize,
    block_elems: usize,
    _marker: PhantomData<D>,
}

pub enum Storage<D: Digit> {
    Memory(Vec<D>),
    Disk(DiskStorage<D>),
}

const BYTES_PER_ELEM: usize = 8; // every Digit is round-tripped through u64

impl<D: Digit> Storage<D> {
    pub fn new_memory(len: usize) -> Self {
        Storage::Memory(vec![D::ZERO; len])
    }

    pub fn new_disk(ctx: &Context, len: usize) -> crate::error::Result<Self> {
        let file = tempfile::NamedTempFile::new_in(&ctx.temp_dir).map_err(|source| {
            Error::BackingStorage {
                path: ctx.temp_dir.clone(),
                source,
            }
        })?;
        let path = file.path().to_path_buf();
        debug!(?path, len, "created disk-backed DataStorage");
        let block_elems = (ctx.block_io_bytes / BYTES_PER_ELEM).max(1);
        let mut storage = DiskStorage {
            file,
            path,
            len: 0,
            block_elems,
            _marker: PhantomData,
        };
        storage.set_size(len)?;
        Ok(Storage::Disk(storage))
    }

    pub fn size(&self) -> usize {
        match self {
            Storage::Memory(v) => v.len(),
            Storage::Disk(d) => d.len,
        }
    }

    pub fn set_size(&mut self, n: usize) -> crate::error::Result<()> {
        match self {
            Storage::Memory(v) => {
                v.resize(n, D::ZERO);
                Ok(())
            }
            Storage::Disk(d) => d.set_size(n),
        }
    }

    /// Fast path for components that want to mutate an in-memory backing
    /// directly instead of going through `read`/`write`. Returns `None` for
    /// disk-backed storage — callers (Six-step, Two-pass) fall back to
    /// `read`/`write` streaming in that case.
    pub fn as_memory_mut(&mut self) -> Option<&mut [D]> {
        match self {
            Storage::Memory(v) => Some(v.as_mut_slice()),
            Storage::Disk(_) => None,
        }
    }

    pub fn read(&mut self, start: usize, len: usize) -> crate::error::Result<Vec<D>> {
        match self {
            Storage::Memory(v) => Ok(v[start..start + len].to_vec()),
            Storage::Disk(d) => d.read_block(start, len),
        }
    }

    pub fn write(&mut self, start: usize, data: &[D]) -> crate::error::Result<()> {
        match self {
            Storage::Memory(v) => {
                v[start..start + data.len()].copy_from_slice(data);
                Ok(())
            }
            Storage::Disk(d) => d.write_block(start, data),
        }
    }

    /// Copies `len` elements from `src` starting at `src_pos` into `self`
    /// starting at `dst_pos`, streaming through `block_elems`-sized chunks
    /// rather than materializing the whole range — the "transfer" operation
    /// of §4.B, used by the Two-pass FNT (§4.E) to move row bands.
    pub fn transfer_from(
        &mut self,
        src: &mut Storage<D>,
        src_pos: usize,
        dst_pos: usize,
        len: usize,
        block_elems: usize,
    ) -> crate::error::Result<()> {
        let mut done = 0;
        while done < len {
            let chunk = block_elems.min(len - done);
            let data = src.read(src_pos + done, chunk)?;
            self.write(dst_pos + done, &data)?;
            done += chunk;
        }
        Ok(())
    }
}

impl<D: Digit> DiskStorage<D> {
    fn set_size(&mut self, n: usize) -> crate::error::Result<()> {
        if n > self.len {
            let pad = vec![D::ZERO; n - self.len];
            self.write_block(self.len, &pad)?;
        } else {
            self.file
                .as_file()
                .set_len((n * BYTES_PER_ELEM) as u64)
                .map_err(|source| Error::BackingStorage {
                    path: self.path.clone(),
                    source,
                })?;
        }
        self.len = n;
        Ok(())
    }

    /// Reads `length` elements starting at `start`, looping through
    /// `block_elems`-sized buffers (never the 8 KiB default of a naive
    /// channel copy, per §4.B).
    fn read_block(&mut self, start: usize, length: usize) -> crate::error::Result<Vec<D>> {
        assert!(start + length <= self.len, "read past end of storage");
        let file: &mut File = self.file.as_file_mut();
        let mut out = Vec::with_capacity(length);
        let mut pos = start;
        let mut remaining = length;
        while remaining > 0 {
            let take = self.block_elems.min(remaining);
            file.seek(SeekFrom::Start((pos * BYTES_PER_ELEM) as u64))
                .map_err(|source| self.io_error(source))?;
            let mut buf = vec![0u8; take * BYTES_PER_ELEM];
            file.read_exact(&mut buf)
                .map_err(|source| self.io_error(source))?;
            out.extend(
                buf.chunks_exact(BYTES_PER_ELEM)
                    .map(|c| D::from_u64(u64::from_le_bytes(c.try_into().unwrap()))),
            );
            pos += take;
            remaining -= take;
        }
        Ok(out)
    }

    fn write_block(&mut self, start: usize, data: &[D]) -> crate::error::Result<()> {
        let file: &mut File = self.file.as_file_mut();
        let mut pos = start;
        for chunk in data.chunks(self.block_elems) {
            file.seek(SeekFrom::Start((pos * BYTES_PER_ELEM) as u64))
                .map_err(|source| self.io_error(source))?;
            let mut buf = Vec::with_capacity(chunk.len() * BYTES_PER_ELEM);
            for d in chunk {
                buf.extend_from_slice(&d.to_u64().to_le_bytes());
            }
            file.write_all(&buf).map_err(|source| self.io_error(source))?;
            pos += chunk.len();
        }
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::BackingStorage {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_roundtrips_write_then_read() {
        let mut s: Storage<u32> = Storage::new_memory(8);
        s.write(2, &[10, 20, 30]).unwrap();
        assert_eq!(s.read(2, 3).unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn memory_set_size_zero_pads() {
        let mut s: Storage<u32> = Storage::new_memory(2);
        s.write(0, &[5, 6]).unwrap();
        s.set_size(4).unwrap();
        assert_eq!(s.read(0, 4).unwrap(), vec![5, 6, 0, 0]);
    }

    #[test]
    fn disk_roundtrips_across_many_blocks() {
        let ctx = Context::default();
        let mut s: Storage<u32> = Storage::new_disk(&ctx, 0).unwrap();
        s.set_size(10_000).unwrap();
        let data: Vec<u32> = (0..10_000).map(|i| (i % 997) as u32).collect();
        s.write(0, &data).unwrap();
        assert_eq!(s.read(0, 10_000).unwrap(), data);
    }

    #[test]
    fn disk_partial_read_matches_memory_reference() {
        let ctx = Context::default();
        let mut disk: Storage<u32> = Storage::new_disk(&ctx, 500).unwrap();
        let mut mem: Storage<u32> = Storage::new_memory(500);
        let data: Vec<u32> = (0..500).map(|i| i as u32 * 3).collect();
        disk.write(0, &data).unwrap();
        mem.write(0, &data).unwrap();
        assert_eq!(disk.read(123, 50).unwrap(), mem.read(123, 50).unwrap());
    }

    #[test]
    fn transfer_from_streams_in_chunks() {
        let mut src: Storage<u32> = Storage::new_memory(100);
        let data: Vec<u32> = (0..100).collect();
        src.write(0, &data).unwrap();
        let mut dst: Storage<u32> = Storage::new_memory(100);
        dst.transfer_from(&mut src, 0, 0, 100, 7).unwrap();
        assert_eq!(dst.read(0, 100).unwrap(), data);
    }

    #[test]
    fn disk_storage_file_is_removed_on_drop() {
        let ctx = Context::default();
        let path = {
            let s: Storage<u32> = Storage::new_disk(&ctx, 16).unwrap();
            match &s {
                Storage::Disk(d) => d.path.clone(),
                _ => unreachable!(),
            }
        };
        assert!(!path.exists());
    }
}
