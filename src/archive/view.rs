//! Sorted projection of the catalog.
//!
//! Combines the catalog's item stream with a sort-order stream and
//! republishes the fully sorted list whenever either changes. Both inputs
//! are `watch` channels, so each contributes only its latest value.

use std::cmp::Ordering;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{ArchiveItem, SortOrder};

/// Sort items into a total order.
///
/// - `ByDate`: newest `stored_at` first, ties broken by id, newest first.
/// - `ByName`: case-insensitive ascending, ties broken by exact name, then id.
pub fn sort_items(mut items: Vec<ArchiveItem>, order: SortOrder) -> Vec<ArchiveItem> {
    match order {
        SortOrder::ByDate => items.sort_by(compare_by_date),
        SortOrder::ByName => items.sort_by_cached_key(|item| {
            (
                item.display_name.to_lowercase(),
                item.display_name.clone(),
                item.id.clone(),
            )
        }),
    }
    items
}

fn compare_by_date(a: &ArchiveItem, b: &ArchiveItem) -> Ordering {
    b.stored_at
        .cmp(&a.stored_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Continuously sorted view over a catalog
pub struct SortedView {
    output: watch::Receiver<Vec<ArchiveItem>>,
    task: JoinHandle<()>,
}

impl SortedView {
    /// Start the view.
    ///
    /// The view stops updating when the item stream closes. If the order
    /// stream closes first, the last order stays in effect.
    pub fn spawn(
        mut items: watch::Receiver<Vec<ArchiveItem>>,
        mut order: watch::Receiver<SortOrder>,
    ) -> Self {
        let initial = sort_items(items.borrow_and_update().clone(), *order.borrow_and_update());
        let (tx, output) = watch::channel(initial);

        let task = tokio::spawn(async move {
            let mut order_open = true;

            loop {
                tokio::select! {
                    changed = items.changed() => {
                        if changed.is_err() {
                            tracing::debug!("Item stream closed, sorted view stopping");
                            break;
                        }
                    }
                    changed = order.changed(), if order_open => {
                        if changed.is_err() {
                            order_open = false;
                            continue;
                        }
                    }
                }

                let snapshot = items.borrow_and_update().clone();
                let current_order = *order.borrow_and_update();
                let sorted = sort_items(snapshot, current_order);

                tracing::debug!(order = %current_order, count = sorted.len(), "Re-sorted view");

                if tx.send(sorted).is_err() {
                    break;
                }
            }
        });

        Self { output, task }
    }

    /// Current sorted list
    pub fn current(&self) -> Vec<ArchiveItem> {
        self.output.borrow().clone()
    }

    /// Subscribe to sorted updates
    pub fn subscribe(&self) -> watch::Receiver<Vec<ArchiveItem>> {
        self.output.clone()
    }

    /// Wait until the sorted list satisfies `predicate`, then return it.
    ///
    /// Returns `None` if the view stopped before that happened.
    pub async fn wait_for<F>(&self, predicate: F) -> Option<Vec<ArchiveItem>>
    where
        F: FnMut(&Vec<ArchiveItem>) -> bool,
    {
        let mut rx = self.output.clone();
        let result = rx.wait_for(predicate).await.ok().map(|items| items.clone());
        result
    }
}

impl Drop for SortedView {
    fn drop(&mut self) {
        self.task.abort();
    }
}
