use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use crossbeam::channel::{bounded, Receiver, Sender};
use crossbeam::thread::scope;

/// Create and execute a worker pool.
///
/// The preprocessor feeds work items into a bounded channel that is shared by all workers.
/// Results are handed to the postprocessor in the order given by [`Orderable::index`],
/// regardless of the order in which workers finish them. Indices have to be consecutive,
/// starting at zero.
///
/// # Arguments
/// * `preprocessor` - Closure that generates the work items.
/// * `workers` - Closures that execute the work.
/// * `postprocessor` - Closure that consumes the results, in order.
///
/// The first error of any stage is returned, with postprocessor errors taking precedence.
/// Results that never became consecutive are only reported if all stages succeeded.
pub(crate) fn worker_pool<Post, Pre, Workers, W, U, T>(
    preprocessor: Pre,
    workers: Workers,
    mut postprocessor: Post,
    in_capacity: usize,
    out_capacity: usize,
) -> Result<()>
where
    Post: FnMut(Box<T>) -> Result<()>,
    Post: Send,
    Pre: FnOnce(Sender<U>) -> Result<()>,
    Pre: Send,
    Workers: Iterator<Item = W>,
    W: FnOnce(Receiver<U>, Sender<Box<T>>) -> Result<()>,
    W: Send,
    T: Send + Orderable,
    U: Send,
{
    scope(|scope| -> Result<()> {
        let (in_sender, in_receiver) = bounded(in_capacity);
        let (out_sender, out_receiver) = bounded::<Box<T>>(out_capacity);

        // dropping the sender at the end tells the workers that we are done
        let preprocessor = scope.spawn(move |_| preprocessor(in_sender));

        let workers: Vec<_> = workers
            .map(|worker: W| {
                let in_receiver = in_receiver.clone();
                let out_sender = out_sender.clone();
                scope.spawn(move |_| worker(in_receiver, out_sender))
            })
            .collect();
        // the postprocessor stops once all workers dropped their senders
        drop(in_receiver);
        drop(out_sender);

        // returns the number of results that could not be brought into order
        let postprocessor = scope.spawn(move |_| -> Result<usize> {
            let mut items = OrderedContainer::new();

            for item in out_receiver {
                items.insert(item);

                // Find continuous prefix, postprocess in order.
                for item in items.remove_continuous_prefix() {
                    postprocessor(item)?;
                }
            }

            Ok(items.len())
        });

        let unordered = postprocessor.join();
        let mut results: Vec<_> = workers.into_iter().map(|worker| worker.join()).collect();
        results.push(preprocessor.join());

        let unordered = unordered.map_err(|_| anyhow!("worker pool thread panicked"))??;
        for ret in results {
            ret.map_err(|_| anyhow!("worker pool thread panicked"))??;
        }
        if unordered > 0 {
            return Err(anyhow!(
                "worker pool finished with {} results out of order",
                unordered
            ));
        }
        Ok(())
    })
    .map_err(|_| anyhow!("worker pool thread panicked"))?
}

pub(crate) trait Orderable {
    fn index(&self) -> usize;
}

struct OrderedContainer<T> {
    inner: BTreeMap<usize, Box<T>>,
    next_index: usize,
}

impl<T> OrderedContainer<T>
where
    T: Orderable,
{
    fn new() -> Self {
        OrderedContainer {
            inner: BTreeMap::new(),
            next_index: 0,
        }
    }

    fn insert(&mut self, item: Box<T>) {
        self.inner.insert(item.index(), item);
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn remove_continuous_prefix(&mut self) -> Vec<Box<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.inner.remove(&self.next_index) {
            items.push(item);
            self.next_index += 1;
        }
        items
    }
}
