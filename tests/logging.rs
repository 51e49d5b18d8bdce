//! Log output of failed runs. Kept in its own test binary because it installs
//! a global subscriber, which also sees events from rayon worker threads.

use std::sync::atomic::{AtomicUsize, Ordering};

use huddle::cluster::{Dbscan, NeighborStrategy};
use huddle::ErrorKind;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

static WARNINGS: AtomicUsize = AtomicUsize::new(0);

/// Counts warnings emitted by this crate.
struct CountWarnings;

impl<S: Subscriber> Layer<S> for CountWarnings {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() == Level::WARN && meta.target().starts_with("huddle") {
            WARNINGS.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn degenerate_vector_warns_once_per_run() {
    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(CountWarnings))
        .expect("no other subscriber in this binary");

    // Every row is compared against the zero vector at the end, so every row fails.
    let mut data: Vec<Vec<f32>> = (0..50)
        .map(|i| {
            let a = i as f32 * 0.1;
            vec![a.cos(), a.sin()]
        })
        .collect();
    data.push(vec![0.0, 0.0]);

    for strategy in [
        NeighborStrategy::Eager,
        NeighborStrategy::Parallel,
        NeighborStrategy::Lazy,
    ] {
        WARNINGS.store(0, Ordering::SeqCst);
        let err = Dbscan::new(0.9, 2)
            .with_strategy(strategy)
            .cluster(&data)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateVector);
        assert_eq!(WARNINGS.load(Ordering::SeqCst), 1, "{strategy:?}");
    }
}
