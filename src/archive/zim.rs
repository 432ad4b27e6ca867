//! ZIM container reader
//!
//! Reads Kiwix ZIM files directly from a memory map. Only the parts of the
//! format needed for path lookup are parsed: the header, the MIME type list,
//! the path pointer list, directory entries and clusters.

use super::{ArchiveError, ArchiveReader};
use memmap2::Mmap;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Size of the fixed ZIM header in bytes
const HEADER_SIZE: usize = 80;

/// "ZIM\x04" read as a little-endian u32
const ZIM_MAGIC: u32 = 72_173_914;

/// MIME index marking a redirect entry
const MIME_REDIRECT: u16 = 0xffff;
/// MIME index marking a link target entry
const MIME_LINK_TARGET: u16 = 0xfffe;
/// MIME index marking a deleted entry
const MIME_DELETED: u16 = 0xfffd;

/// Upper bound on chained redirects before the archive is considered corrupt
const MAX_REDIRECT_DEPTH: usize = 16;

/// Upper bound on MIME list length
const MAX_MIME_TYPES: usize = 4096;

/// Parsed ZIM file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZimHeader {
    pub major_version: u16,
    pub minor_version: u16,
    pub uuid: [u8; 16],
    pub entry_count: u32,
    pub cluster_count: u32,
    pub path_ptr_pos: u64,
    pub title_ptr_pos: u64,
    pub cluster_ptr_pos: u64,
    pub mime_list_pos: u64,
    pub main_page: Option<u32>,
    pub layout_page: Option<u32>,
    pub checksum_pos: u64,
}

impl ZimHeader {
    fn parse(bytes: &[u8]) -> Result<Self, ArchiveError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ArchiveError::Corrupt(format!(
                "file too small for ZIM header: {} bytes",
                bytes.len()
            )));
        }

        let u16_at = |pos: usize| u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
        let u32_at = |pos: usize| {
            u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
        };
        let u64_at = |pos: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[pos..pos + 8]);
            u64::from_le_bytes(buf)
        };
        let optional_index = |value: u32| if value == u32::MAX { None } else { Some(value) };

        let magic = u32_at(0);
        if magic != ZIM_MAGIC {
            return Err(ArchiveError::Corrupt(format!(
                "bad magic number {:#010x}",
                magic
            )));
        }

        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&bytes[8..24]);

        Ok(Self {
            major_version: u16_at(4),
            minor_version: u16_at(6),
            uuid,
            entry_count: u32_at(24),
            cluster_count: u32_at(28),
            path_ptr_pos: u64_at(32),
            title_ptr_pos: u64_at(40),
            cluster_ptr_pos: u64_at(48),
            mime_list_pos: u64_at(56),
            main_page: optional_index(u32_at(64)),
            layout_page: optional_index(u32_at(68)),
            checksum_pos: u64_at(72),
        })
    }

    /// Whether all content lives in the `C` namespace (format 6.1 and later)
    pub fn uses_content_namespace(&self) -> bool {
        self.major_version > 6 || (self.major_version == 6 && self.minor_version >= 1)
    }

    /// UUID rendered as lowercase hex
    pub fn uuid_hex(&self) -> String {
        self.uuid.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// A parsed directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
enum DirEntry {
    Content {
        namespace: u8,
        path: String,
        cluster: u32,
        blob: u32,
    },
    Redirect {
        path: String,
        target: u32,
    },
    /// Link targets and deleted entries carry no content
    Empty,
}

/// Most recently decompressed cluster
struct CachedCluster {
    index: u32,
    extended: bool,
    data: Arc<Vec<u8>>,
}

/// Archive reader over a ZIM file
pub struct ZimArchive {
    path: PathBuf,
    mmap: Mmap,
    header: ZimHeader,
    mime_types: Vec<String>,
    root_path: String,
    cache: Mutex<Option<CachedCluster>>,
}

impl ZimArchive {
    /// Open a ZIM file and discover the article root path from its main
    /// entry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        Self::open_with_root(path, None)
    }

    /// Open a ZIM file, optionally overriding the discovered root path
    pub fn open_with_root(
        path: impl AsRef<Path>,
        root_override: Option<String>,
    ) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |reason: String| ArchiveError::Unavailable {
            path: path.clone(),
            reason,
        };

        if !path.exists() {
            return Err(unavailable("file does not exist".to_string()));
        }

        let file = File::open(&path).map_err(|e| unavailable(e.to_string()))?;
        let len = file
            .metadata()
            .map_err(|e| unavailable(e.to_string()))?
            .len();
        if len < HEADER_SIZE as u64 {
            return Err(unavailable(format!("file too small: {} bytes", len)));
        }

        // SAFETY: the archive is opened read-only and never modified while mapped
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| unavailable(e.to_string()))?;

        let header = ZimHeader::parse(&mmap).map_err(|e| unavailable(e.to_string()))?;

        let mut archive = Self {
            path: path.clone(),
            mmap,
            header,
            mime_types: Vec::new(),
            root_path: String::new(),
            cache: Mutex::new(None),
        };

        archive
            .validate_layout()
            .map_err(|e| unavailable(e.to_string()))?;
        archive.mime_types = archive
            .read_mime_list()
            .map_err(|e| unavailable(e.to_string()))?;

        archive.root_path = match root_override {
            Some(root) => root,
            None => archive
                .main_entry_path()
                .map_err(|e| unavailable(e.to_string()))?
                .unwrap_or_else(|| {
                    warn!("Archive has no main entry, resolving articles from the archive root");
                    String::new()
                }),
        };

        archive.log_banner(len);
        Ok(archive)
    }

    pub fn header(&self) -> &ZimHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_count(&self) -> u32 {
        self.header.entry_count
    }

    pub fn cluster_count(&self) -> u32 {
        self.header.cluster_count
    }

    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    /// Path of the item the main entry resolves to, following redirects.
    ///
    /// Old-namespace archives report the path with its namespace prefix
    /// (`A/...`), matching how such archives are addressed.
    pub fn main_entry_path(&self) -> Result<Option<String>, ArchiveError> {
        let Some(main) = self.header.main_page else {
            return Ok(None);
        };

        let mut index = main;
        for _ in 0..MAX_REDIRECT_DEPTH {
            match self.entry(index)? {
                DirEntry::Content {
                    namespace, path, ..
                } => return Ok(Some(self.display_path(namespace, &path))),
                DirEntry::Redirect { target, .. } => index = target,
                DirEntry::Empty => return Ok(None),
            }
        }

        Err(ArchiveError::Corrupt(format!(
            "redirect chain from main entry {} exceeds {} hops",
            main, MAX_REDIRECT_DEPTH
        )))
    }

    fn display_path(&self, namespace: u8, path: &str) -> String {
        if self.header.uses_content_namespace() {
            path.to_string()
        } else {
            format!("{}/{}", namespace as char, path)
        }
    }

    fn log_banner(&self, file_len: u64) {
        info!("ZIM file: {}", self.path.display());
        info!("File size: {:.2} MB", file_len as f64 / (1024.0 * 1024.0));
        info!(
            "Format version: {}.{}",
            self.header.major_version, self.header.minor_version
        );
        info!("Entries: {}", self.header.entry_count);
        info!("Clusters: {}", self.header.cluster_count);
        info!("MIME types: {}", self.mime_types.join(", "));
        info!("UUID: {}", self.header.uuid_hex());
        if self.root_path.is_empty() {
            info!("Article root path: <archive root>");
        } else {
            info!("Article root path: {}", self.root_path);
        }
    }

    fn validate_layout(&self) -> Result<(), ArchiveError> {
        let len = self.mmap.len() as u64;
        let h = &self.header;

        let path_list_end = h.path_ptr_pos.saturating_add(8 * h.entry_count as u64);
        if path_list_end > len {
            return Err(ArchiveError::Corrupt(format!(
                "path pointer list ends at {} beyond file length {}",
                path_list_end, len
            )));
        }

        let cluster_list_end = h
            .cluster_ptr_pos
            .saturating_add(8 * h.cluster_count as u64);
        if cluster_list_end > len {
            return Err(ArchiveError::Corrupt(format!(
                "cluster pointer list ends at {} beyond file length {}",
                cluster_list_end, len
            )));
        }

        if h.mime_list_pos >= len {
            return Err(ArchiveError::Corrupt(format!(
                "MIME list offset {} beyond file length {}",
                h.mime_list_pos, len
            )));
        }

        if let Some(main) = h.main_page {
            if main >= h.entry_count {
                return Err(ArchiveError::Corrupt(format!(
                    "main page index {} out of range ({} entries)",
                    main, h.entry_count
                )));
            }
        }

        Ok(())
    }

    fn read_mime_list(&self) -> Result<Vec<String>, ArchiveError> {
        let mut types = Vec::new();
        let mut pos = self.header.mime_list_pos;

        loop {
            let (bytes, next) = self.read_cstr(pos)?;
            if bytes.is_empty() {
                break;
            }
            types.push(String::from_utf8_lossy(bytes).into_owned());
            if types.len() > MAX_MIME_TYPES {
                return Err(ArchiveError::Corrupt("unterminated MIME list".to_string()));
            }
            pos = next;
        }

        Ok(types)
    }

    // Raw byte access

    fn bytes(&self, pos: u64, len: usize) -> Result<&[u8], ArchiveError> {
        let start = usize::try_from(pos)
            .map_err(|_| ArchiveError::Corrupt(format!("offset {} out of range", pos)))?;
        let end = start
            .checked_add(len)
            .ok_or_else(|| ArchiveError::Corrupt(format!("offset {} out of range", pos)))?;

        self.mmap.get(start..end).ok_or_else(|| {
            ArchiveError::Corrupt(format!(
                "read of {} bytes at offset {} past end of file",
                len, pos
            ))
        })
    }

    fn read_u16(&self, pos: u64) -> Result<u16, ArchiveError> {
        let b = self.bytes(pos, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&self, pos: u64) -> Result<u32, ArchiveError> {
        let b = self.bytes(pos, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&self, pos: u64) -> Result<u64, ArchiveError> {
        let b = self.bytes(pos, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a zero-terminated string, returning it and the offset past the
    /// terminator
    fn read_cstr(&self, pos: u64) -> Result<(&[u8], u64), ArchiveError> {
        let start = usize::try_from(pos)
            .map_err(|_| ArchiveError::Corrupt(format!("offset {} out of range", pos)))?;
        let rest = self
            .mmap
            .get(start..)
            .ok_or_else(|| ArchiveError::Corrupt(format!("string offset {} past end", pos)))?;
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| ArchiveError::Corrupt(format!("unterminated string at {}", pos)))?;

        Ok((&rest[..nul], pos + nul as u64 + 1))
    }

    // Directory entries

    fn entry_offset(&self, index: u32) -> Result<u64, ArchiveError> {
        if index >= self.header.entry_count {
            return Err(ArchiveError::Corrupt(format!(
                "entry index {} out of range ({} entries)",
                index, self.header.entry_count
            )));
        }
        self.read_u64(self.header.path_ptr_pos + 8 * index as u64)
    }

    /// Offset of the path string for the entry at `offset`
    fn path_offset(&self, offset: u64) -> Result<u64, ArchiveError> {
        let mime = self.read_u16(offset)?;
        Ok(match mime {
            MIME_REDIRECT => offset + 12,
            MIME_LINK_TARGET | MIME_DELETED => offset + 8,
            _ => offset + 16,
        })
    }

    /// Sort key of an entry: namespace byte and raw path bytes
    fn entry_key(&self, index: u32) -> Result<(u8, &[u8]), ArchiveError> {
        let offset = self.entry_offset(index)?;
        let namespace = self.bytes(offset + 3, 1)?[0];
        let (path, _) = self.read_cstr(self.path_offset(offset)?)?;
        Ok((namespace, path))
    }

    fn entry(&self, index: u32) -> Result<DirEntry, ArchiveError> {
        let offset = self.entry_offset(index)?;
        let mime = self.read_u16(offset)?;
        let namespace = self.bytes(offset + 3, 1)?[0];
        let (path, _) = self.read_cstr(self.path_offset(offset)?)?;
        let path = String::from_utf8_lossy(path).into_owned();

        Ok(match mime {
            MIME_REDIRECT => DirEntry::Redirect {
                path,
                target: self.read_u32(offset + 8)?,
            },
            MIME_LINK_TARGET | MIME_DELETED => DirEntry::Empty,
            _ => DirEntry::Content {
                namespace,
                path,
                cluster: self.read_u32(offset + 8)?,
                blob: self.read_u32(offset + 12)?,
            },
        })
    }

    /// Binary search the path pointer list for `(namespace, path)`
    fn find(&self, namespace: u8, path: &str) -> Result<Option<u32>, ArchiveError> {
        let needle = (namespace, path.as_bytes());
        let mut lo = 0u32;
        let mut hi = self.header.entry_count;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.entry_key(mid)?.cmp(&needle) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Ok(Some(mid)),
            }
        }

        Ok(None)
    }

    /// Resolve a user-facing path to an entry index
    fn lookup(&self, path: &str) -> Result<Option<u32>, ArchiveError> {
        if self.header.uses_content_namespace() {
            if let Some(index) = self.find(b'C', path)? {
                return Ok(Some(index));
            }
            if let Some((namespace, rest)) = split_namespace(path) {
                return self.find(namespace, rest);
            }
            return Ok(None);
        }

        if let Some((namespace, rest)) = split_namespace(path) {
            if let Some(index) = self.find(namespace, rest)? {
                return Ok(Some(index));
            }
        }
        for namespace in [b'A', b'I'] {
            if let Some(index) = self.find(namespace, path)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Content of the entry at `index`, following redirects
    fn content(&self, index: u32) -> Result<Option<Vec<u8>>, ArchiveError> {
        let mut current = index;
        for _ in 0..MAX_REDIRECT_DEPTH {
            match self.entry(current)? {
                DirEntry::Content { cluster, blob, .. } => {
                    return self.blob(cluster, blob).map(Some);
                }
                DirEntry::Redirect { target, path, .. } => {
                    debug!("Following redirect {} -> entry {}", path, target);
                    current = target;
                }
                DirEntry::Empty => return Ok(None),
            }
        }

        Err(ArchiveError::Corrupt(format!(
            "redirect chain from entry {} exceeds {} hops",
            index, MAX_REDIRECT_DEPTH
        )))
    }

    // Clusters

    fn cluster_bounds(&self, index: u32) -> Result<(u64, u64), ArchiveError> {
        if index >= self.header.cluster_count {
            return Err(ArchiveError::Corrupt(format!(
                "cluster index {} out of range ({} clusters)",
                index, self.header.cluster_count
            )));
        }

        let start = self.read_u64(self.header.cluster_ptr_pos + 8 * index as u64)?;
        let end = if index + 1 < self.header.cluster_count {
            self.read_u64(self.header.cluster_ptr_pos + 8 * (index as u64 + 1))?
        } else if self.header.checksum_pos > start {
            self.header.checksum_pos
        } else {
            self.mmap.len() as u64
        };

        if end <= start || end > self.mmap.len() as u64 {
            return Err(ArchiveError::Corrupt(format!(
                "cluster {} has invalid bounds {}..{}",
                index, start, end
            )));
        }

        Ok((start, end))
    }

    /// Decompressed cluster data and whether it uses 8-byte blob offsets
    fn cluster(&self, index: u32) -> Result<(Arc<Vec<u8>>, bool), ArchiveError> {
        if let Some(cached) = self.cache.lock().as_ref() {
            if cached.index == index {
                return Ok((cached.data.clone(), cached.extended));
            }
        }

        let (start, end) = self.cluster_bounds(index)?;
        let info = self.bytes(start, 1)?[0];
        let compression = info & 0x0f;
        let extended = info & 0x10 != 0;
        let raw = self.bytes(start + 1, (end - start - 1) as usize)?;

        let data = match compression {
            0 | 1 => raw.to_vec(),
            4 => {
                let mut out = Vec::new();
                xz2::read::XzDecoder::new(raw)
                    .read_to_end(&mut out)
                    .map_err(|e| {
                        ArchiveError::Corrupt(format!("cluster {}: xz decode failed: {}", index, e))
                    })?;
                out
            }
            5 => {
                let mut out = Vec::new();
                zstd::stream::read::Decoder::new(raw)?
                    .single_frame()
                    .read_to_end(&mut out)
                    .map_err(|e| {
                        ArchiveError::Corrupt(format!(
                            "cluster {}: zstd decode failed: {}",
                            index, e
                        ))
                    })?;
                out
            }
            other => {
                return Err(ArchiveError::Corrupt(format!(
                    "cluster {}: unsupported compression type {}",
                    index, other
                )));
            }
        };

        let data = Arc::new(data);
        *self.cache.lock() = Some(CachedCluster {
            index,
            extended,
            data: data.clone(),
        });

        Ok((data, extended))
    }

    fn blob(&self, cluster: u32, blob: u32) -> Result<Vec<u8>, ArchiveError> {
        let (data, extended) = self.cluster(cluster)?;
        let width = if extended { 8 } else { 4 };

        let offset_at = |i: usize| -> Result<usize, ArchiveError> {
            let pos = i * width;
            let bytes = data.get(pos..pos + width).ok_or_else(|| {
                ArchiveError::Corrupt(format!("cluster {}: truncated offset table", cluster))
            })?;
            let value = if extended {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                u64::from_le_bytes(buf)
            } else {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64
            };
            usize::try_from(value).map_err(|_| {
                ArchiveError::Corrupt(format!("cluster {}: offset {} out of range", cluster, value))
            })
        };

        let offset_count = offset_at(0)? / width;
        let blob = blob as usize;
        if blob + 1 >= offset_count {
            return Err(ArchiveError::Corrupt(format!(
                "cluster {}: blob {} out of range ({} blobs)",
                cluster,
                blob,
                offset_count.saturating_sub(1)
            )));
        }

        let start = offset_at(blob)?;
        let end = offset_at(blob + 1)?;
        data.get(start..end).map(<[u8]>::to_vec).ok_or_else(|| {
            ArchiveError::Corrupt(format!(
                "cluster {}: blob {} spans {}..{} beyond {} bytes",
                cluster,
                blob,
                start,
                end,
                data.len()
            ))
        })
    }
}

impl ArchiveReader for ZimArchive {
    fn root_path(&self) -> &str {
        &self.root_path
    }

    fn resolve(&self, path: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        match self.lookup(path)? {
            Some(index) => self.content(index),
            None => Ok(None),
        }
    }
}

/// Split an old-style `N/path` address into namespace and path
fn split_namespace(path: &str) -> Option<(u8, &str)> {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b'/' && bytes[0].is_ascii_graphic() {
        Some((bytes[0], &path[2..]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArticleId;
    use std::io::Write;

    enum TestEntry {
        Blob { cluster: u32, blob: u32 },
        Redirect(u32),
    }

    /// Assemble a format 6.1 archive. Entries must be given in
    /// (namespace, path) order.
    fn build_zim(entries: &[(u8, &str, TestEntry)], clusters: &[(u8, Vec<Vec<u8>>)], main_page: u32) -> Vec<u8> {
        let mime_list = b"text/html\0image/png\0\0".to_vec();
        let n = entries.len();
        let path_ptr_pos = HEADER_SIZE + mime_list.len();
        let title_ptr_pos = path_ptr_pos + 8 * n;
        let cluster_ptr_pos = title_ptr_pos + 4 * n;
        let dirent_pos = cluster_ptr_pos + 8 * clusters.len();

        let mut dirents = Vec::new();
        let mut dirent_offsets = Vec::new();
        for (namespace, path, entry) in entries {
            dirent_offsets.push((dirent_pos + dirents.len()) as u64);
            match entry {
                TestEntry::Blob { cluster, blob } => {
                    dirents.extend(0u16.to_le_bytes());
                    dirents.push(0);
                    dirents.push(*namespace);
                    dirents.extend(0u32.to_le_bytes());
                    dirents.extend(cluster.to_le_bytes());
                    dirents.extend(blob.to_le_bytes());
                }
                TestEntry::Redirect(target) => {
                    dirents.extend(MIME_REDIRECT.to_le_bytes());
                    dirents.push(0);
                    dirents.push(*namespace);
                    dirents.extend(0u32.to_le_bytes());
                    dirents.extend(target.to_le_bytes());
                }
            }
            dirents.extend(path.as_bytes());
            dirents.push(0);
            dirents.push(0); // empty title
        }

        let cluster_start = dirent_pos + dirents.len();
        let mut cluster_bytes = Vec::new();
        let mut cluster_offsets = Vec::new();
        for (compression, blobs) in clusters {
            cluster_offsets.push((cluster_start + cluster_bytes.len()) as u64);

            let mut body = Vec::new();
            let mut offset = (4 * (blobs.len() + 1)) as u32;
            body.extend(offset.to_le_bytes());
            for blob in blobs {
                offset += blob.len() as u32;
                body.extend(offset.to_le_bytes());
            }
            for blob in blobs {
                body.extend(blob);
            }

            cluster_bytes.push(*compression);
            match *compression {
                4 => {
                    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
                    encoder.write_all(&body).unwrap();
                    cluster_bytes.extend(encoder.finish().unwrap());
                }
                5 => cluster_bytes.extend(zstd::stream::encode_all(&body[..], 3).unwrap()),
                _ => cluster_bytes.extend(body),
            }
        }
        let checksum_pos = cluster_start + cluster_bytes.len();

        let mut out = Vec::new();
        out.extend(ZIM_MAGIC.to_le_bytes());
        out.extend(6u16.to_le_bytes());
        out.extend(1u16.to_le_bytes());
        out.extend([7u8; 16]);
        out.extend((n as u32).to_le_bytes());
        out.extend((clusters.len() as u32).to_le_bytes());
        out.extend((path_ptr_pos as u64).to_le_bytes());
        out.extend((title_ptr_pos as u64).to_le_bytes());
        out.extend((cluster_ptr_pos as u64).to_le_bytes());
        out.extend((HEADER_SIZE as u64).to_le_bytes());
        out.extend(main_page.to_le_bytes());
        out.extend(u32::MAX.to_le_bytes());
        out.extend((checksum_pos as u64).to_le_bytes());
        assert_eq!(out.len(), HEADER_SIZE);

        out.extend(mime_list);
        for offset in dirent_offsets {
            out.extend(offset.to_le_bytes());
        }
        for i in 0..n {
            out.extend((i as u32).to_le_bytes());
        }
        for offset in cluster_offsets {
            out.extend(offset.to_le_bytes());
        }
        out.extend(dirents);
        out.extend(cluster_bytes);
        out.extend([0u8; 16]);
        out
    }

    fn sample_archive() -> tempfile::NamedTempFile {
        let entries = [
            (b'C', "site/", TestEntry::Blob { cluster: 0, blob: 0 }),
            (b'C', "site/images/a b.png", TestEntry::Blob { cluster: 1, blob: 0 }),
            (b'C', "site/images/c.svg", TestEntry::Blob { cluster: 2, blob: 1 }),
            (b'C', "site/scp-001", TestEntry::Blob { cluster: 0, blob: 1 }),
            (b'C', "site/scp-002", TestEntry::Blob { cluster: 0, blob: 2 }),
            (b'C', "site/scp-003", TestEntry::Redirect(3)),
            (b'W', "mainPage", TestEntry::Redirect(0)),
        ];
        let clusters = [
            (
                1u8,
                vec![
                    b"<html>home</html>".to_vec(),
                    b"<div id=\"page-content\"><p>Hello</p></div>".to_vec(),
                    Vec::new(),
                ],
            ),
            (5u8, vec![vec![0x89, b'P', b'N', b'G']]),
            (4u8, vec![b"unused".to_vec(), b"<svg/>".to_vec()]),
        ];

        let bytes = build_zim(&entries, &clusters, 6);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_open_reads_header_and_root() {
        let file = sample_archive();
        let archive = ZimArchive::open(file.path()).unwrap();

        assert_eq!(archive.entry_count(), 7);
        assert_eq!(archive.cluster_count(), 3);
        assert!(archive.header().uses_content_namespace());
        assert_eq!(archive.mime_types(), &["text/html".to_string(), "image/png".to_string()]);
        assert_eq!(archive.root_path(), "site/");
    }

    #[test]
    fn test_fetch_article() {
        let file = sample_archive();
        let archive = ZimArchive::open(file.path()).unwrap();

        let html = archive.fetch_article(&ArticleId::new("scp", 1)).unwrap();
        assert_eq!(html, "<div id=\"page-content\"><p>Hello</p></div>");

        // Present but empty
        assert_eq!(archive.fetch_article(&ArticleId::new("scp", 2)).unwrap(), "");

        // Redirect to scp-001
        let redirected = archive.fetch_article(&ArticleId::new("scp", 3)).unwrap();
        assert_eq!(redirected, html);

        assert!(matches!(
            archive.fetch_article(&ArticleId::new("scp", 4)),
            Err(ArchiveError::NotFound(_))
        ));
    }

    #[test]
    fn test_fetch_image_from_zstd_cluster() {
        let file = sample_archive();
        let archive = ZimArchive::open(file.path()).unwrap();

        let png = archive.fetch_image("site/images/a%20b.png").unwrap();
        assert_eq!(png, vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_fetch_second_blob_from_xz_cluster() {
        let file = sample_archive();
        let archive = ZimArchive::open(file.path()).unwrap();

        let svg = archive.resolve("site/images/c.svg").unwrap().unwrap();
        assert_eq!(svg, b"<svg/>".to_vec());

        // Switching clusters replaces the cached one
        let png = archive.resolve("site/images/a b.png").unwrap().unwrap();
        assert_eq!(png, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(archive.resolve("site/images/c.svg").unwrap().unwrap(), svg);
    }

    #[test]
    fn test_namespace_prefixed_lookup() {
        let file = sample_archive();
        let archive = ZimArchive::open(file.path()).unwrap();

        // W/mainPage redirects to the home page
        let home = archive.resolve("W/mainPage").unwrap().unwrap();
        assert_eq!(home, b"<html>home</html>".to_vec());
    }

    #[test]
    fn test_root_override() {
        let file = sample_archive();
        let archive = ZimArchive::open_with_root(file.path(), Some("site/scp-".to_string())).unwrap();
        assert_eq!(archive.root_path(), "site/scp-");
    }

    #[test]
    fn test_open_missing_file() {
        let result = ZimArchive::open("/nonexistent/archive.zim");
        assert!(matches!(result, Err(ArchiveError::Unavailable { .. })));
    }

    #[test]
    fn test_open_rejects_bad_magic() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 128]).unwrap();
        file.flush().unwrap();

        let result = ZimArchive::open(file.path());
        assert!(matches!(result, Err(ArchiveError::Unavailable { .. })));
    }

    #[test]
    fn test_split_namespace() {
        assert_eq!(split_namespace("A/scp-001"), Some((b'A', "scp-001")));
        assert_eq!(split_namespace("scp-001"), None);
        assert_eq!(split_namespace("A"), None);
    }
}
