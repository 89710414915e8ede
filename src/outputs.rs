//! Eventual stack outputs.
//!
//! A convergence run resolves exactly once, into either its stack's output
//! map or a captured terminal error. [`StackOutputs`] is the read-only view
//! over that eventual result: every accessor waits for resolution on first
//! use, and afterwards keeps returning the same terminal value — a failed run
//! yields its captured error on every read, not just the first.
//!
//! The single-assignment cell is a `tokio::sync::watch` channel: the
//! background task holds the [`ResultSlot`] (the send half, consumed on
//! resolution) and every [`StackOutputs`] clone shares the receive half.

use std::collections::BTreeMap;

use tokio::sync::watch;

use crate::error::StackherdError;

/// Resolved stack outputs, keyed by output name.
pub type OutputMap = BTreeMap<String, String>;

/// The terminal result of one convergence run.
pub type StackResult = std::result::Result<OutputMap, StackherdError>;

/// The write half of a result cell. Resolving consumes it; the cell is
/// written exactly once.
#[derive(Debug)]
pub(crate) struct ResultSlot {
    tx: watch::Sender<Option<StackResult>>,
}

impl ResultSlot {
    /// Resolves the cell with the run's terminal result.
    pub(crate) fn resolve(self, result: StackResult) {
        // Receivers may all have been dropped; resolution is still complete.
        let _ = self.tx.send(Some(result));
    }
}

/// Read-only view over a stack's eventual outputs.
#[derive(Debug, Clone)]
pub struct StackOutputs {
    name: String,
    rx: watch::Receiver<Option<StackResult>>,
}

/// Creates a linked result cell and output view for the named stack.
pub(crate) fn result_cell(name: &str) -> (ResultSlot, StackOutputs) {
    let (tx, rx) = watch::channel(None);
    (
        ResultSlot { tx },
        StackOutputs {
            name: name.to_string(),
            rx,
        },
    )
}

impl StackOutputs {
    /// Returns the name of the stack these outputs belong to.
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.name
    }

    /// Waits for the run to resolve and applies `f` to the output map.
    async fn with_map<T>(&self, f: impl FnOnce(&OutputMap) -> T) -> Result<T, StackherdError> {
        let mut rx = self.rx.clone();
        let resolved = rx.wait_for(Option::is_some).await.map_err(|_| {
            StackherdError::internal(format!(
                "convergence of stack '{}' terminated without a result",
                self.name
            ))
        })?;
        match resolved.as_ref() {
            Some(Ok(map)) => Ok(f(map)),
            Some(Err(err)) => Err(err.clone()),
            // wait_for guarantees Some.
            None => Err(StackherdError::internal(format!(
                "result cell for stack '{}' observed empty after resolution",
                self.name
            ))),
        }
    }

    /// Waits for the run to resolve, discarding the outputs.
    ///
    /// # Errors
    ///
    /// Returns the run's captured error if it failed.
    pub async fn wait(&self) -> Result<(), StackherdError> {
        self.with_map(|_| ()).await
    }

    /// Waits for the run to resolve and returns the full output map.
    ///
    /// # Errors
    ///
    /// Returns the run's captured error if it failed.
    pub async fn resolved(&self) -> Result<OutputMap, StackherdError> {
        self.with_map(Clone::clone).await
    }

    /// Waits for the run to resolve and looks up a single output value.
    ///
    /// # Errors
    ///
    /// Returns the run's captured error if it failed.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StackherdError> {
        self.with_map(|map| map.get(key).cloned()).await
    }

    /// Waits for the run to resolve and checks for an output key.
    ///
    /// # Errors
    ///
    /// Returns the run's captured error if it failed.
    pub async fn contains_key(&self, key: &str) -> Result<bool, StackherdError> {
        self.with_map(|map| map.contains_key(key)).await
    }

    /// Waits for the run to resolve and returns the number of outputs.
    ///
    /// # Errors
    ///
    /// Returns the run's captured error if it failed.
    pub async fn len(&self) -> Result<usize, StackherdError> {
        self.with_map(BTreeMap::len).await
    }

    /// Waits for the run to resolve and checks whether it produced any
    /// outputs.
    ///
    /// # Errors
    ///
    /// Returns the run's captured error if it failed.
    pub async fn is_empty(&self) -> Result<bool, StackherdError> {
        self.with_map(BTreeMap::is_empty).await
    }

    /// Returns the terminal result without waiting, or `None` while the run
    /// is still in flight.
    #[must_use]
    pub fn try_result(&self) -> Option<StackResult> {
        self.rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    fn resolved_outputs() -> StackOutputs {
        let (slot, outputs) = result_cell("dummy");
        let mut map = OutputMap::new();
        map.insert(String::from("key"), String::from("value"));
        slot.resolve(Ok(map));
        outputs
    }

    #[tokio::test]
    async fn test_get() {
        let outputs = resolved_outputs();
        assert_eq!(outputs.get("key").await.unwrap(), Some(String::from("value")));
        assert_eq!(outputs.get("non-key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_contains() {
        let outputs = resolved_outputs();
        assert!(outputs.contains_key("key").await.unwrap());
        assert!(!outputs.contains_key("non-key").await.unwrap());
    }

    #[tokio::test]
    async fn test_len() {
        let outputs = resolved_outputs();
        assert_eq!(outputs.len().await.unwrap(), 1);
        assert!(!outputs.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_read_blocks_until_resolution() {
        let (slot, outputs) = result_cell("slow");
        let reader = tokio::spawn(async move { outputs.get("key").await });
        tokio::task::yield_now().await;

        let mut map = OutputMap::new();
        map.insert(String::from("key"), String::from("value"));
        slot.resolve(Ok(map));

        let value = reader.await.unwrap().unwrap();
        assert_eq!(value, Some(String::from("value")));
    }

    #[tokio::test]
    async fn test_failed_run_yields_same_error_on_every_read() {
        let (slot, outputs) = result_cell("broken");
        slot.resolve(Err(StackherdError::Service(ServiceError::api(
            None,
            "boom",
        ))));

        let first = outputs.get("key").await.unwrap_err();
        let second = outputs.resolved().await.unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
    }

    #[tokio::test]
    async fn test_dropped_slot_surfaces_internal_error() {
        let (slot, outputs) = result_cell("vanished");
        drop(slot);
        let err = outputs.wait().await.unwrap_err();
        assert!(matches!(err, StackherdError::Internal(_)));
    }

    #[tokio::test]
    async fn test_try_result_is_none_while_pending() {
        let (slot, outputs) = result_cell("pending");
        assert!(outputs.try_result().is_none());
        slot.resolve(Ok(OutputMap::new()));
        assert!(outputs.try_result().is_some());
    }
}
