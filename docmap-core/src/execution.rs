//! Execution styles: how terminal operations hand back their results.
//!
//! Builders are written once against [`Execution`]. The style decides what a
//! terminal returns:
//!
//! | Style        | single result                      | sequence result                    |
//! |--------------|------------------------------------|------------------------------------|
//! | [`Reactive`] | `BoxFuture<DataAccessResult<T>>`   | `BoxStream<DataAccessResult<T>>`   |
//! | [`Blocking`] | `DataAccessResult<T>`              | `DataAccessResult<Vec<T>>`         |

use std::fmt;
use std::sync::Arc;

use futures::TryStreamExt;
use tokio::runtime::{Builder, Runtime};

use crate::engine::{BoxFuture, BoxStream};
use crate::error::{DataAccessError, DataAccessResult};

/// Turns lazy futures and streams into the caller-visible result handles.
pub trait Execution: Send + Sync {
    /// Handle for a single result.
    type Single<'a, T: Send + 'a>;

    /// Handle for a sequence of results.
    type Many<'a, T: Send + 'a>;

    /// Adapt a single-result future.
    fn single<'a, T: Send + 'a>(
        &self,
        future: BoxFuture<'a, DataAccessResult<T>>,
    ) -> Self::Single<'a, T>;

    /// Adapt a result stream.
    fn many<'a, T: Send + 'a>(
        &self,
        stream: BoxStream<'a, DataAccessResult<T>>,
    ) -> Self::Many<'a, T>;
}

/// Hands back the lazy future or stream unchanged.
///
/// Nothing reaches the engine until the handle is polled. Dropping the
/// handle stops delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reactive;

impl Execution for Reactive {
    type Single<'a, T: Send + 'a> = BoxFuture<'a, DataAccessResult<T>>;
    type Many<'a, T: Send + 'a> = BoxStream<'a, DataAccessResult<T>>;

    fn single<'a, T: Send + 'a>(
        &self,
        future: BoxFuture<'a, DataAccessResult<T>>,
    ) -> Self::Single<'a, T> {
        future
    }

    fn many<'a, T: Send + 'a>(
        &self,
        stream: BoxStream<'a, DataAccessResult<T>>,
    ) -> Self::Many<'a, T> {
        stream
    }
}

/// Drives every handle to completion on a private runtime.
///
/// Must not be used from inside an async context: `block_on` panics when
/// called on a runtime worker thread.
#[derive(Clone)]
pub struct Blocking {
    runtime: Arc<Runtime>,
}

impl Blocking {
    /// Create a blocking style backed by a fresh current-thread runtime.
    pub fn new() -> DataAccessResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                DataAccessError::internal(format!("failed to start blocking runtime: {}", e))
                    .with_source(e)
            })?;
        Ok(Self::with_runtime(Arc::new(runtime)))
    }

    /// Share an existing runtime.
    pub fn with_runtime(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }

    /// The runtime handles are driven on.
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }
}

impl fmt::Debug for Blocking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blocking").finish_non_exhaustive()
    }
}

impl Execution for Blocking {
    type Single<'a, T: Send + 'a> = DataAccessResult<T>;
    type Many<'a, T: Send + 'a> = DataAccessResult<Vec<T>>;

    fn single<'a, T: Send + 'a>(
        &self,
        future: BoxFuture<'a, DataAccessResult<T>>,
    ) -> Self::Single<'a, T> {
        self.runtime.block_on(future)
    }

    fn many<'a, T: Send + 'a>(
        &self,
        stream: BoxStream<'a, DataAccessResult<T>>,
    ) -> Self::Many<'a, T> {
        self.runtime.block_on(stream.try_collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{FutureExt, StreamExt, stream};

    #[tokio::test]
    async fn test_reactive_passes_through() {
        let single = Reactive.single(async { Ok::<_, DataAccessError>(7) }.boxed());
        assert_eq!(single.await.unwrap(), 7);

        let many = Reactive.many(stream::iter(vec![Ok::<_, DataAccessError>(1), Ok(2)]).boxed());
        let items: Vec<_> = many.collect().await;
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_blocking_single() {
        let blocking = Blocking::new().unwrap();
        assert_eq!(blocking.single(async { Ok::<_, DataAccessError>("done") }.boxed()).unwrap(), "done");
    }

    #[test]
    fn test_blocking_many_collects_in_order() {
        let blocking = Blocking::new().unwrap();
        let items = blocking
            .many(stream::iter(vec![Ok::<_, DataAccessError>(1), Ok(2), Ok(3)]).boxed())
            .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_blocking_many_stops_at_first_error() {
        let blocking = Blocking::new().unwrap();
        let result = blocking.many(
            stream::iter(vec![
                Ok(1),
                Err(DataAccessError::execution("write failed")),
                Ok(3),
            ])
            .boxed(),
        );
        assert!(result.is_err());
    }
}
