//! Chunked block store
//!
//! The data file is a sequence of chunks (see [`crate::format`]). Within a
//! chunk, space is a contiguous run of blocks. Allocation state lives in
//! memory and is rebuilt from block headers on open, so the only metadata
//! that must reach disk is the block headers themselves and the superblock.
//!
//! Container mutations are copy-on-write: a new body block is written, the
//! 8-byte body pointer in the container header is swapped, and the old body
//! is freed. Under [`DurabilityMode::Strict`] the store flushes after the
//! body write and after the swap, so a crash exposes either the old or the
//! new body, never a mix. A crash between the two steps leaks one block,
//! which the next GC reclaims.

use crate::allocator::FreeList;
use crate::codec::{decode_body, encode_body, Body};
use crate::durability::DurabilityMode;
use crate::error::FormatError;
use crate::format::{
    block_size_for, chunk_size_for, round_up, select_superblock, BlockHeader, BlockKind,
    ChunkHeader, ContainerRecord, Superblock, BLOCK_HEADER_SIZE, BODY_POINTER_OFFSET,
    CHUNK_HEADER_SIZE, CONTAINER_RECORD_SIZE, DEFAULT_CHUNK_SIZE, FIRST_DATA_OFFSET,
    MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, PAGE_SIZE, SUPERBLOCK_SLOTS, SUPERBLOCK_SLOT_SIZE,
};
use pongo_core::{ContainerKind, Location, PongoError, PongoResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Store configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Chunk size for a new file (an existing file keeps its persisted size)
    pub chunk_size: u64,
    /// Commit flush policy
    pub durability: DurabilityMode,
    /// Upper bound on the file size; growth beyond it is `ResourceExhausted`
    pub max_file_size: Option<u64>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            durability: DurabilityMode::default(),
            max_file_size: None,
        }
    }
}

/// Snapshot of allocator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// File length in bytes
    pub file_size: u64,
    /// Number of chunks
    pub chunks: usize,
    /// Chunk size used for future growth
    pub chunk_size: u64,
    /// Allocated blocks (container headers and bodies)
    pub allocated_blocks: usize,
    /// Bytes held by allocated blocks
    pub allocated_bytes: u64,
    /// Free extents
    pub free_extents: usize,
    /// Free bytes
    pub free_bytes: u64,
    /// Largest free extent
    pub largest_free: u64,
}

/// Clamp a requested chunk size into the accepted range, page aligned
pub fn normalize_chunk_size(size: u64) -> u64 {
    round_up(size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE), PAGE_SIZE)
}

/// Block store over one data file
#[derive(Debug)]
pub struct ChunkStore {
    path: PathBuf,
    file: File,
    chunks: Vec<ChunkHeader>,
    free: FreeList,
    blocks: BTreeMap<u64, BlockHeader>,
    superblock: Superblock,
    durability: DurabilityMode,
    max_file_size: Option<u64>,
    next_generation: u64,
}

impl ChunkStore {
    /// Open the data file at `path`, creating and formatting it if it is
    /// missing or empty
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> PongoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let len = file.metadata()?.len();

        let mut store = ChunkStore {
            path,
            file,
            chunks: Vec::new(),
            free: FreeList::new(),
            blocks: BTreeMap::new(),
            superblock: Superblock::new(normalize_chunk_size(options.chunk_size)),
            durability: options.durability,
            max_file_size: options.max_file_size,
            next_generation: 1,
        };

        if len == 0 {
            store.format()?;
        } else {
            store.load()?;
        }
        Ok(store)
    }

    fn format(&mut self) -> PongoResult<()> {
        let chunk_size = self.superblock.chunk_size;
        self.check_limit(chunk_size)?;
        self.file.set_len(chunk_size).map_err(|e| {
            PongoError::resource_exhausted(format!("cannot size data file: {}", e))
        })?;

        let chunk = ChunkHeader::new(0, chunk_size);
        let free_len = chunk_size - FIRST_DATA_OFFSET;
        self.write_block_header(
            FIRST_DATA_OFFSET,
            BlockHeader::new(free_len as u32, BlockKind::Free),
        )?;
        // Both slots start valid
        let mut superblock = self.superblock.clone();
        superblock.sequence = 0;
        self.write_superblock_slot(&superblock)?;
        superblock.sequence = self.superblock.sequence;
        self.write_superblock_slot(&superblock)?;
        self.write_at(0, &chunk.to_bytes())?;
        self.file.sync_all()?;

        self.chunks.push(chunk);
        self.free.insert(FIRST_DATA_OFFSET, free_len);
        info!(target: "pongo::store", path = %self.path.display(), chunk_size, "Created data file");
        Ok(())
    }

    fn load(&mut self) -> PongoResult<()> {
        let mut slots = [Vec::new(), Vec::new()];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = vec![0u8; SUPERBLOCK_SLOT_SIZE as usize];
            self.read_at(SUPERBLOCK_SLOTS[i], slot)?;
        }
        let a = Superblock::from_bytes(&slots[0]);
        let b = Superblock::from_bytes(&slots[1]);
        if a.is_err() != b.is_err() {
            warn!(target: "pongo::store", "One superblock slot is invalid; using the other");
        }
        self.superblock = select_superblock(a, b)?;
        self.next_generation = self.superblock.next_generation;

        self.scan_chunks()?;
        self.scan_blocks()?;
        info!(
            target: "pongo::store",
            path = %self.path.display(),
            chunks = self.chunks.len(),
            blocks = self.blocks.len(),
            free_bytes = self.free.total(),
            "Opened data file"
        );
        Ok(())
    }

    fn scan_chunks(&mut self) -> PongoResult<()> {
        self.chunks.clear();
        let file_len = self.file.metadata()?.len();
        let mut offset = 0u64;
        let mut buf = [0u8; CHUNK_HEADER_SIZE as usize];

        while offset < file_len {
            let parsed = if offset + CHUNK_HEADER_SIZE <= file_len {
                self.read_at(offset, &mut buf)?;
                ChunkHeader::from_bytes(&buf).ok()
            } else {
                None
            };
            match parsed {
                Some(h) if h.offset == offset && h.end() <= file_len => {
                    self.chunks.push(h);
                    offset = h.end();
                }
                _ if offset == 0 => {
                    return Err(PongoError::corruption("first chunk header is invalid"));
                }
                _ => {
                    warn!(
                        target: "pongo::store",
                        offset,
                        file_len,
                        "Truncating torn trailing chunk"
                    );
                    self.file.set_len(offset)?;
                    self.file.sync_all()?;
                    break;
                }
            }
        }
        Ok(())
    }

    fn scan_blocks(&mut self) -> PongoResult<()> {
        self.blocks.clear();
        self.free.clear();
        let mut max_generation = 0u64;
        let chunks = self.chunks.clone();

        for chunk in chunks {
            let start = chunk.data_start();
            let mut data = vec![0u8; (chunk.end() - start) as usize];
            self.read_at(start, &mut data)?;

            let mut pos = 0usize;
            let mut pending: Option<(u64, u64, bool)> = None;
            while pos < data.len() {
                let offset = start + pos as u64;
                let header = BlockHeader::from_bytes(&data[pos..], offset)?;
                let size = u64::from(header.size);
                if offset + size > chunk.end() {
                    return Err(FormatError::InvalidBlock {
                        offset,
                        reason: "block crosses chunk end".to_string(),
                    }
                    .into());
                }
                match header.kind {
                    BlockKind::Free => {
                        pending = Some(match pending {
                            Some((s, len, _)) => (s, len + size, true),
                            None => (offset, size, false),
                        });
                    }
                    kind => {
                        if let Some(run) = pending.take() {
                            self.flush_free_run(run)?;
                        }
                        if kind == BlockKind::Container {
                            if size < BLOCK_HEADER_SIZE + CONTAINER_RECORD_SIZE as u64 {
                                return Err(FormatError::InvalidBlock {
                                    offset,
                                    reason: "container block too small".to_string(),
                                }
                                .into());
                            }
                            let rec_at = pos + BLOCK_HEADER_SIZE as usize;
                            let record = ContainerRecord::from_bytes(
                                &data[rec_at..rec_at + CONTAINER_RECORD_SIZE],
                            )?;
                            max_generation = max_generation.max(record.generation);
                        }
                        self.blocks.insert(offset, header);
                    }
                }
                pos += size as usize;
            }
            if let Some(run) = pending.take() {
                self.flush_free_run(run)?;
            }
        }

        self.next_generation = self.next_generation.max(max_generation + 1);
        Ok(())
    }

    fn flush_free_run(&mut self, (offset, len, merged): (u64, u64, bool)) -> PongoResult<()> {
        if merged {
            debug!(target: "pongo::store", offset, len, "Coalesced free blocks");
            self.write_block_header(offset, BlockHeader::new(len as u32, BlockKind::Free))?;
        }
        self.free.insert(offset, len);
        Ok(())
    }

    /// Re-derive all allocator state from the file
    ///
    /// Used after a fork: the file handle is reopened and the in-memory
    /// free-list is rebuilt from block headers.
    pub fn reopen(&mut self) -> PongoResult<()> {
        self.file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        self.load()
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Allocate a block able to hold `payload_len` bytes, growing the file if
    /// needed. Returns the block offset.
    pub fn allocate(&mut self, kind: BlockKind, payload_len: usize) -> PongoResult<u64> {
        let size = block_size_for(payload_len as u64);
        if size > MAX_CHUNK_SIZE - CHUNK_HEADER_SIZE {
            return Err(PongoError::resource_exhausted(format!(
                "block of {} bytes exceeds the maximum chunk size",
                size
            )));
        }

        let (offset, granted, rest) = match self.free.take(size) {
            Some(found) => found,
            None => {
                self.grow(size)?;
                self.free
                    .take(size)
                    .ok_or_else(|| PongoError::resource_exhausted("no space after growth"))?
            }
        };

        // Remainder header first: a crash before the second write leaves the
        // original free header covering both.
        if let Some((r_off, r_len)) = rest {
            self.write_block_header(r_off, BlockHeader::new(r_len as u32, BlockKind::Free))?;
        }
        let header = BlockHeader::new(granted as u32, kind);
        self.write_block_header(offset, header)?;
        self.blocks.insert(offset, header);
        Ok(offset)
    }

    /// Free an allocated block
    pub fn free(&mut self, offset: u64) -> PongoResult<()> {
        let header = self.blocks.remove(&offset).ok_or_else(|| {
            PongoError::corruption(format!("free of unallocated block at {:#x}", offset))
        })?;
        let (start, len) = self.free.release(offset, u64::from(header.size));
        self.write_block_header(start, BlockHeader::new(len as u32, BlockKind::Free))
    }

    /// Header of an allocated block
    pub fn block(&self, offset: u64) -> Option<BlockHeader> {
        self.blocks.get(&offset).copied()
    }

    /// All allocated blocks in offset order
    pub fn allocated_blocks(&self) -> Vec<(u64, BlockHeader)> {
        self.blocks.iter().map(|(&o, &h)| (o, h)).collect()
    }

    /// Read the payload of an allocated block of `kind`
    pub fn read_payload(&mut self, offset: u64, kind: BlockKind) -> PongoResult<Vec<u8>> {
        let header = self.expect_block(offset, kind)?;
        let mut buf = vec![0u8; (u64::from(header.size) - BLOCK_HEADER_SIZE) as usize];
        self.read_at(offset + BLOCK_HEADER_SIZE, &mut buf)?;
        Ok(buf)
    }

    /// Overwrite the payload of an allocated block of `kind`
    pub fn write_payload(&mut self, offset: u64, kind: BlockKind, bytes: &[u8]) -> PongoResult<()> {
        let header = self.expect_block(offset, kind)?;
        if bytes.len() as u64 > u64::from(header.size) - BLOCK_HEADER_SIZE {
            return Err(PongoError::corruption(format!(
                "payload of {} bytes does not fit block at {:#x}",
                bytes.len(),
                offset
            )));
        }
        self.write_at(offset + BLOCK_HEADER_SIZE, bytes)
    }

    fn expect_block(&self, offset: u64, kind: BlockKind) -> PongoResult<BlockHeader> {
        match self.blocks.get(&offset) {
            Some(h) if h.kind == kind => Ok(*h),
            _ if kind == BlockKind::Container => Err(PongoError::StaleHandle { location: offset }),
            found => Err(PongoError::corruption(format!(
                "expected {:?} block at {:#x}, found {:?}",
                kind,
                offset,
                found.map(|h| h.kind)
            ))),
        }
    }

    // ========================================================================
    // Containers
    // ========================================================================

    /// Write a new container with an initial body
    pub fn create_container(
        &mut self,
        kind: ContainerKind,
        body: &Body,
    ) -> PongoResult<(Location, ContainerRecord)> {
        let body_at = self.write_body(kind, body)?;
        let location = match self.allocate(BlockKind::Container, CONTAINER_RECORD_SIZE) {
            Ok(loc) => loc,
            Err(e) => {
                self.free(body_at)?;
                return Err(e);
            }
        };
        let record = ContainerRecord {
            kind,
            generation: self.next_generation,
            body: body_at,
        };
        self.next_generation += 1;
        self.write_payload(location, BlockKind::Container, &record.to_bytes())?;
        self.barrier()?;
        Ok((Location(location), record))
    }

    /// Read a container header; a location that is not a live container
    /// header is `StaleHandle`
    pub fn read_container(&mut self, location: Location) -> PongoResult<ContainerRecord> {
        let bytes = self.read_payload(location.0, BlockKind::Container)?;
        Ok(ContainerRecord::from_bytes(&bytes)?)
    }

    /// Decode the current body of a container
    pub fn load_body(&mut self, record: &ContainerRecord) -> PongoResult<Body> {
        let bytes = self.read_payload(record.body, BlockKind::Body)?;
        let (kind, body) = decode_body(&bytes)?;
        if kind != record.kind {
            return Err(PongoError::corruption(format!(
                "body at {:#x} is a {} body, header says {}",
                record.body, kind, record.kind
            )));
        }
        Ok(body)
    }

    /// Replace a container's body copy-on-write
    ///
    /// Returns the new body location. The old body block is freed after the
    /// pointer swap.
    pub fn commit_body(
        &mut self,
        location: Location,
        record: &ContainerRecord,
        body: &Body,
    ) -> PongoResult<u64> {
        let new_body = self.write_body(record.kind, body)?;
        self.barrier()?;

        let pointer_at = location.0 + BLOCK_HEADER_SIZE + BODY_POINTER_OFFSET;
        self.write_at(pointer_at, &new_body.to_le_bytes())?;
        self.barrier()?;

        self.free(record.body)?;
        Ok(new_body)
    }

    fn write_body(&mut self, kind: ContainerKind, body: &Body) -> PongoResult<u64> {
        let bytes = encode_body(kind, body)?;
        let at = self.allocate(BlockKind::Body, bytes.len())?;
        self.write_payload(at, BlockKind::Body, &bytes)?;
        Ok(at)
    }

    // ========================================================================
    // Growth and durability
    // ========================================================================

    /// Append one chunk able to hold a block of `min_block` bytes
    ///
    /// Growth always flushes, whatever the durability mode: the free block
    /// header must be durable before the chunk header that publishes it.
    pub fn grow(&mut self, min_block: u64) -> PongoResult<()> {
        let offset = self.chunks.last().map_or(0, ChunkHeader::end);
        let size = chunk_size_for(self.superblock.chunk_size, min_block);
        self.check_limit(offset + size)?;

        let exhausted = |e: std::io::Error| {
            PongoError::resource_exhausted(format!("cannot grow data file: {}", e))
        };
        self.file.set_len(offset + size).map_err(exhausted)?;

        let chunk = ChunkHeader::new(offset, size);
        let data_start = chunk.data_start();
        let free_len = chunk.end() - data_start;
        self.write_block_header(data_start, BlockHeader::new(free_len as u32, BlockKind::Free))?;
        self.file.sync_data().map_err(exhausted)?;
        self.write_at(offset, &chunk.to_bytes())?;
        self.file.sync_data().map_err(exhausted)?;

        self.chunks.push(chunk);
        self.free.insert(data_start, free_len);
        debug!(target: "pongo::store", offset, size, "Grew data file");
        Ok(())
    }

    fn check_limit(&self, new_len: u64) -> PongoResult<()> {
        match self.max_file_size {
            Some(max) if new_len > max => Err(PongoError::resource_exhausted(format!(
                "data file would grow to {} bytes, limit is {}",
                new_len, max
            ))),
            _ => Ok(()),
        }
    }

    /// Flush if the durability mode requires it
    pub fn barrier(&mut self) -> PongoResult<()> {
        if self.durability.requires_fsync() {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Persist the superblock and flush everything
    pub fn sync(&mut self) -> PongoResult<()> {
        self.update_superblock(|_| {})?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Current durability mode
    pub fn durability(&self) -> DurabilityMode {
        self.durability
    }

    /// Change the durability mode for subsequent commits
    pub fn set_durability(&mut self, mode: DurabilityMode) {
        self.durability = mode;
    }

    // ========================================================================
    // Superblock
    // ========================================================================

    /// Current superblock
    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// Modify and persist the superblock into the alternate slot
    pub fn update_superblock(&mut self, f: impl FnOnce(&mut Superblock)) -> PongoResult<()> {
        let mut next = self.superblock.clone();
        f(&mut next);
        next.sequence += 1;
        next.next_generation = self.next_generation;
        self.write_superblock_slot(&next)?;
        self.barrier()?;
        self.superblock = next;
        Ok(())
    }

    fn write_superblock_slot(&mut self, sb: &Superblock) -> PongoResult<()> {
        let mut bytes = sb.to_bytes();
        bytes.resize(SUPERBLOCK_SLOT_SIZE as usize, 0);
        self.write_at(SUPERBLOCK_SLOTS[sb.slot()], &bytes)
    }

    /// Chunk size used for future growth
    pub fn chunk_size(&self) -> u64 {
        self.superblock.chunk_size
    }

    /// Change the chunk size for future growth; returns the size in effect
    pub fn set_chunk_size(&mut self, size: u64) -> PongoResult<u64> {
        let size = normalize_chunk_size(size);
        self.update_superblock(|sb| sb.chunk_size = size)?;
        Ok(size)
    }

    /// Generation the next created container will receive
    pub fn next_generation(&self) -> u64 {
        self.next_generation
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Path of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Allocator statistics
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            file_size: self.chunks.last().map_or(0, ChunkHeader::end),
            chunks: self.chunks.len(),
            chunk_size: self.superblock.chunk_size,
            allocated_blocks: self.blocks.len(),
            allocated_bytes: self.blocks.values().map(|h| u64::from(h.size)).sum(),
            free_extents: self.free.len(),
            free_bytes: self.free.total(),
            largest_free: self.free.largest(),
        }
    }

    // ========================================================================
    // Raw I/O
    // ========================================================================

    fn write_block_header(&mut self, offset: u64, header: BlockHeader) -> PongoResult<()> {
        self.write_at(offset, &header.to_bytes())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> PongoResult<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> PongoResult<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        Ok(())
    }
}
