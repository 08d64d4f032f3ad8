use crate::pools::Pool;
use std::future::Future;
use tokio::task::JoinHandle;

/// Schedules `task` on `pool` in fire-and-forget style.
///
/// The returned handle completes once the task has finished, successfully or
/// not. Errors and panics inside the task are logged with the label and
/// swallowed: the caller has already moved on, so nothing may unwind into
/// the scheduling task, and nothing may disappear unlogged either.
pub fn spawn_logged<F>(pool: &Pool, label: impl Into<String>, task: F) -> JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let pool = pool.clone();
    let label = label.into();
    tokio::spawn(async move {
        let _permit = pool.acquire().await;
        match tokio::spawn(task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::error!("background task `{label}` on {} failed: {err:#}", pool.name());
            }
            Err(join_err) => {
                log::error!(
                    "background task `{label}` on {} panicked: {join_err}",
                    pool.name()
                );
            }
        }
    })
}
