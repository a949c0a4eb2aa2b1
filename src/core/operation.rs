//! Operation traits applied by the bounded mapper.

use async_trait::async_trait;

/// An operation applied to every work item of a batch.
///
/// Implementors carry whatever clients or configuration the work needs; the
/// mapper treats the operation as opaque. Errors are captured per item and
/// never abort sibling tasks.
///
/// Any `Fn(I) -> Future<Output = anyhow::Result<T>>` closure is an operation
/// via the blanket impl below.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use crawlmap::core::MapOperation;
///
/// struct ScoreLead {
///     threshold: f64,
/// }
///
/// #[async_trait]
/// impl MapOperation<f64, bool> for ScoreLead {
///     async fn run(&self, score: f64) -> anyhow::Result<bool> {
///         Ok(score >= self.threshold)
///     }
/// }
/// ```
#[async_trait]
pub trait MapOperation<I, T>: Send + Sync + 'static
where
    I: Send + 'static,
    T: Send + 'static,
{
    /// Execute the operation against one input.
    async fn run(&self, input: I) -> anyhow::Result<T>;
}

#[async_trait]
impl<F, Fut, I, T> MapOperation<I, T> for F
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<T>> + Send + 'static,
    I: Send + 'static,
    T: Send + 'static,
{
    async fn run(&self, input: I) -> anyhow::Result<T> {
        (self)(input).await
    }
}

/// An operation that borrows a pooled instance for the duration of one item.
///
/// The mapper acquires the instance before calling `run` and returns it to the
/// pool on every exit path, including operation errors and panics.
#[async_trait]
pub trait PooledOperation<R, I, T>: Send + Sync + 'static
where
    R: Send + Sync + 'static,
    I: Send + 'static,
    T: Send + 'static,
{
    /// Execute the operation against one input using a borrowed instance.
    async fn run(&self, instance: &R, input: I) -> anyhow::Result<T>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_is_an_operation() {
        let double = |n: u32| async move { Ok(n * 2) };
        assert_eq!(MapOperation::run(&double, 21).await.unwrap(), 42);
    }
}
