use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Upload progress observer, called with a percentage in `0..=100`.
///
/// Invoked zero or more times while the body is handed to the transport.
/// Purely advisory: it never gates completion of the request.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Size of the frames a [`RequestBody`] yields to the connection.
const CHUNK_SIZE: usize = 64 * 1024;

/// Request body used by the whole client stack.
///
/// Holds the fully encoded payload and yields it in 64 KiB frames so that an
/// optional [`ProgressCallback`] can observe how much has been written.
/// Empty bodies never report progress.
#[derive(Default)]
pub struct RequestBody {
    data: Bytes,
    total: usize,
    sent: usize,
    progress: Option<ProgressCallback>,
}

impl RequestBody {
    /// Create a body with no content
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a body from encoded bytes
    #[must_use]
    pub fn new(data: Bytes) -> Self {
        let total = data.len();
        Self {
            data,
            total,
            sent: 0,
            progress: None,
        }
    }

    /// Attach a progress observer
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Total encoded length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.total
    }

    /// Returns `true` if the body has no content
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBody")
            .field("total", &self.total)
            .field("sent", &self.sent)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

/// Rounded percentage of `sent` over `total`; `total` must be non-zero.
#[allow(clippy::integer_division)]
fn percent(sent: usize, total: usize) -> u8 {
    let sent = sent.min(total) as u128;
    let total = total as u128;
    u8::try_from((sent * 200 + total) / (total * 2)).unwrap_or(100)
}

impl Body for RequestBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.data.is_empty() {
            return Poll::Ready(None);
        }

        let chunk = this.data.split_to(this.data.len().min(CHUNK_SIZE));
        this.sent += chunk.len();
        if let Some(progress) = &this.progress {
            progress(percent(this.sent, this.total));
        }

        Poll::Ready(Some(Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        self.data.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(u64::try_from(self.data.len()).unwrap_or(u64::MAX))
    }
}
