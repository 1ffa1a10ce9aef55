// SPDX-License-Identifier: MIT

//! Cooperative-cancellation handle for a service unit's tracked
//! background activity: a [`ServiceUnit::start`] spawns
//! its long-running work onto the [`tokio::task::JoinSet`] here, and
//! [`crate::unit::ServiceUnit::stop`] cancels `cancel` before the
//! Lifecycle Engine awaits the set with a grace window.

use tokio_util::sync::CancellationToken;

pub struct BackgroundHandle {
    pub cancel: CancellationToken,
    pub tasks: tokio::task::JoinSet<()>,
}

impl BackgroundHandle {
    pub fn new() -> Self {
        Self { cancel: CancellationToken::new(), tasks: tokio::task::JoinSet::new() }
    }
}

impl Default for BackgroundHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_token_propagates_to_spawned_tasks() {
        let mut handle = BackgroundHandle::new();
        let cancel = handle.cancel.clone();
        handle.tasks.spawn(async move {
            cancel.cancelled().await;
        });
        handle.cancel.cancel();
        assert!(handle.tasks.join_next().await.unwrap().is_ok());
    }
}
