use std::io::SeekFrom;
use std::ops::Range;

use cask_types::{BucketName, Digest, ObjectKey};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, Take};

use crate::error::{StoreError, StoreResult};

/// Seekable byte source over a committed object.
pub trait ObjectRead: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin> ObjectRead for T {}

/// Metadata of a committed object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectInfo {
    pub bucket: BucketName,
    pub key: ObjectKey,
    /// Length in bytes.
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Result of a committed write.
///
/// Only produced after the object is visible under its final address, so
/// holding one means the digest describes bytes a reader can fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedObject {
    pub info: ObjectInfo,
    pub digest: Digest,
}

impl CreatedObject {
    /// Digest computed while the body streamed to storage.
    pub fn hash(&self) -> &Digest {
        &self.digest
    }

    pub fn size(&self) -> u64 {
        self.info.size
    }
}

/// A committed object opened for reading.
pub struct OpenedObject {
    info: ObjectInfo,
    reader: Box<dyn ObjectRead>,
}

impl OpenedObject {
    pub fn new(info: ObjectInfo, reader: Box<dyn ObjectRead>) -> Self {
        Self { info, reader }
    }

    pub fn info(&self) -> &ObjectInfo {
        &self.info
    }

    pub fn size(&self) -> u64 {
        self.info.size
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.info.last_modified
    }

    /// The whole object as a seekable stream.
    pub fn into_reader(self) -> Box<dyn ObjectRead> {
        self.reader
    }

    /// Stream the half-open byte range `range` without reading the rest.
    pub async fn read_range(mut self, range: Range<u64>) -> StoreResult<Take<Box<dyn ObjectRead>>> {
        if range.start > range.end || range.end > self.info.size {
            return Err(StoreError::RangeNotSatisfiable {
                start: range.start,
                end: range.end,
                size: self.info.size,
            });
        }
        self.reader.seek(SeekFrom::Start(range.start)).await?;
        Ok(self.reader.take(range.end - range.start))
    }

    /// Read the whole object into memory.
    pub async fn read_to_end(mut self) -> StoreResult<Vec<u8>> {
        let mut data = Vec::with_capacity(self.info.size as usize);
        self.reader.read_to_end(&mut data).await?;
        Ok(data)
    }
}

impl std::fmt::Debug for OpenedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedObject")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
