//! Response body that deletes the compressed file once the transfer ends.

use axum::body::Bytes;
use futures::Stream;
use pdfshrink::CompressedOutput;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

/// Why a download did not complete. Only ever logged: the status line has
/// already gone out by the time either can happen.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("download aborted by client after {sent} of {size} bytes")]
    Aborted { sent: u64, size: u64 },

    #[error("download error: {0}")]
    Io(#[from] io::Error),
}

/// Streams a [`CompressedOutput`] and drops it when the body finishes, fails,
/// or is dropped unread.
pub struct CleanupStream {
    // Declared first so the file handle closes before the output is removed.
    inner: ReaderStream<File>,
    output: Option<CompressedOutput>,
    sent: u64,
}

impl CleanupStream {
    pub fn new(file: File, output: CompressedOutput) -> Self {
        Self {
            inner: ReaderStream::new(file),
            output: Some(output),
            sent: 0,
        }
    }

    fn finish(&mut self, failure: Option<TransferError>) {
        let Some(output) = self.output.take() else {
            return;
        };
        match failure {
            None => log_complete(&output, self.sent),
            Some(e) => error!("{e}"),
        }
        drop(output);
    }
}

fn log_complete(output: &CompressedOutput, sent: u64) {
    info!(
        name = output.download_name(),
        bytes = sent,
        "Download complete"
    );
}

/// Outcome of a transfer that ended after `sent` of `size` bytes.
///
/// With `Content-Length` set, hyper stops polling once `size` bytes are out,
/// so a full transfer is usually dropped rather than run to end of stream.
fn drop_outcome(sent: u64, size: u64) -> Result<(), TransferError> {
    if sent >= size {
        Ok(())
    } else {
        Err(TransferError::Aborted { sent, size })
    }
}

impl Stream for CleanupStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                let reported = io::Error::new(e.kind(), e.to_string());
                this.finish(Some(TransferError::Io(e)));
                Poll::Ready(Some(Err(reported)))
            }
            Poll::Ready(None) => {
                this.finish(None);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for CleanupStream {
    fn drop(&mut self) {
        if let Some(output) = &self.output {
            match drop_outcome(self.sent, output.size()) {
                Ok(()) => log_complete(output, self.sent),
                Err(e) => info!("{e}"),
            }
        }
    }
}
