//! Fixed-size binary framing for carrying progress across a process
//! boundary.
//!
//! Each event is one 8-byte frame: the job index followed by the status
//! code, both little-endian `i32`. There is no header and no
//! acknowledgement. [`FrameNotifier`] writes frames to any [`AsyncWrite`]
//! from a background task; [`FrameReader`] decodes them on the other
//! side.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pixbatch_core::{JobIndex, ProgressStatus};

use crate::notifier::ProgressNotifier;

/// Size in bytes of one encoded frame.
pub const FRAME_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended part-way through a frame.
    #[error("Truncated frame: got {0} of 8 bytes")]
    Truncated(usize),

    #[error("Negative job index: {0}")]
    NegativeIndex(i32),

    #[error("Job index {0} does not fit in a frame")]
    IndexOutOfRange(JobIndex),

    #[error("Unknown status code: {0}")]
    UnknownStatus(i32),
}

// ---------------------------------------------------------------------------
// ProgressFrame
// ---------------------------------------------------------------------------

/// One decoded progress frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressFrame {
    pub index: JobIndex,
    pub status: ProgressStatus,
}

impl ProgressFrame {
    pub fn new(index: JobIndex, status: ProgressStatus) -> Self {
        Self { index, status }
    }

    /// Encode into the fixed `{index:int32, status:int32}` payload.
    pub fn encode(&self) -> Result<[u8; FRAME_LEN], WireError> {
        let index = i32::try_from(self.index).map_err(|_| WireError::IndexOutOfRange(self.index))?;
        let mut buf = [0u8; FRAME_LEN];
        buf[..4].copy_from_slice(&index.to_le_bytes());
        buf[4..].copy_from_slice(&self.status.code().to_le_bytes());
        Ok(buf)
    }

    /// Decode one frame from exactly [`FRAME_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < FRAME_LEN {
            return Err(WireError::Truncated(bytes.len()));
        }
        let index = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let code = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        let index = JobIndex::try_from(index).map_err(|_| WireError::NegativeIndex(index))?;
        let status = ProgressStatus::from_code(code).ok_or(WireError::UnknownStatus(code))?;
        Ok(Self { index, status })
    }
}

// ---------------------------------------------------------------------------
// FrameNotifier
// ---------------------------------------------------------------------------

/// Notifier that serializes events onto a byte stream.
///
/// `notify` only encodes and enqueues; a background task owns the writer
/// and drains the queue in order, so per-job ordering is preserved.
#[derive(Clone)]
pub struct FrameNotifier {
    sender: mpsc::UnboundedSender<[u8; FRAME_LEN]>,
}

impl FrameNotifier {
    /// Spawn the writer task for `writer` and return the notifier feeding it.
    ///
    /// The task exits once every clone of the notifier is dropped, after
    /// flushing and shutting down the writer. It resolves to the number of
    /// frames written, or the first I/O error.
    pub fn spawn<W>(writer: W) -> (Self, JoinHandle<Result<u64, WireError>>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(write_frames(writer, receiver));
        (Self { sender }, handle)
    }
}

impl ProgressNotifier for FrameNotifier {
    fn notify(&self, index: JobIndex, status: ProgressStatus) {
        match ProgressFrame::new(index, status).encode() {
            Ok(frame) => {
                let _ = self.sender.send(frame);
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "Dropping progress frame");
            }
        }
    }
}

async fn write_frames<W>(
    mut writer: W,
    mut receiver: mpsc::UnboundedReceiver<[u8; FRAME_LEN]>,
) -> Result<u64, WireError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(frame) = receiver.recv().await {
        writer.write_all(&frame).await?;
        writer.flush().await?;
        written += 1;
    }
    writer.shutdown().await?;
    tracing::debug!(frames = written, "Progress frame writer closed");
    Ok(written)
}

// ---------------------------------------------------------------------------
// FrameReader
// ---------------------------------------------------------------------------

/// Decodes progress frames from a byte stream.
pub struct FrameReader<R> {
    reader: R,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` on a clean end of stream (EOF on a frame
    /// boundary).
    pub async fn next_frame(&mut self) -> Result<Option<ProgressFrame>, WireError> {
        let mut buf = [0u8; FRAME_LEN];
        let mut filled = 0;
        while filled < FRAME_LEN {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                return if filled == 0 {
                    Ok(None)
                } else {
                    Err(WireError::Truncated(filled))
                };
            }
            filled += n;
        }
        ProgressFrame::decode(&buf).map(Some)
    }

    /// Give back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
