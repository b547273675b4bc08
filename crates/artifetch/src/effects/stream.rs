use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use flate2::write::GzDecoder;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use super::backend::{ByteStream, ContentEncoding};
use super::cancel::CancelToken;
use crate::error::TransferError;

/// Write `stream` to `dest`, decoding gzip on the fly. Returns the number of
/// bytes written to disk. `dest` is truncated first, so a retry starts over.
pub(crate) async fn write_stream(
    mut stream: ByteStream,
    dest: &Path,
    encoding: ContentEncoding,
    cancel: &CancelToken,
) -> Result<u64, TransferError> {
    let write_error = |source| artifetch_fs::Error::Write {
        path: dest.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::create(dest).await.map_err(write_error)?;
    let mut decoder = match encoding {
        ContentEncoding::Gzip => Some(GzDecoder::new(Vec::new())),
        ContentEncoding::Identity => None,
    };

    let mut written = 0u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            next = stream.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk?;

        let bytes: Cow<'_, [u8]> = match decoder.as_mut() {
            Some(decoder) => {
                decoder.write_all(&chunk)?;
                Cow::Owned(std::mem::take(decoder.get_mut()))
            }
            None => Cow::Borrowed(&chunk),
        };
        file.write_all(&bytes).await.map_err(write_error)?;
        written += bytes.len() as u64;
    }

    if let Some(decoder) = decoder {
        let rest = decoder.finish()?;
        file.write_all(&rest).await.map_err(write_error)?;
        written += rest.len() as u64;
    }
    file.flush().await.map_err(write_error)?;
    Ok(written)
}
