//! Concurrent fan-out helper for independent read operations.

use futures::future::{BoxFuture, join_all};

use crate::error::AppError;
use crate::result::AppResult;

/// A boxed unit of work for [`parallelize`].
pub type ParallelOp<'a> = BoxFuture<'a, AppResult<()>>;

/// Run a fixed list of independent operations concurrently and collect
/// every error encountered, not just the first.
///
/// Waits for all operations to finish before returning. An empty return
/// vector means every operation succeeded.
///
/// Each operation issues its own reads outside transactional isolation,
/// so this must **not** be used for writes that have to participate in a
/// single transaction.
pub async fn parallelize(ops: Vec<ParallelOp<'_>>) -> Vec<AppError> {
    join_all(ops)
        .await
        .into_iter()
        .filter_map(Result::err)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn test_all_success_returns_no_errors() {
        let ops: Vec<ParallelOp<'_>> = vec![
            async { Ok(()) }.boxed(),
            async { Ok(()) }.boxed(),
            async { Ok(()) }.boxed(),
        ];
        assert!(parallelize(ops).await.is_empty());
    }

    #[tokio::test]
    async fn test_collects_every_error() {
        let ops: Vec<ParallelOp<'_>> = vec![
            async { Err(AppError::not_found("first")) }.boxed(),
            async { Ok(()) }.boxed(),
            async { Err(AppError::database("second")) }.boxed(),
        ];
        let errors = parallelize(ops).await;
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn test_waits_for_every_operation() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let ops: Vec<ParallelOp<'_>> = vec![
            async move {
                let _ = tx.send(());
                Ok(())
            }
            .boxed(),
            async move {
                rx.await.map_err(|_| AppError::internal("peer dropped"))?;
                Ok(())
            }
            .boxed(),
        ];
        assert!(parallelize(ops).await.is_empty());
    }
}
