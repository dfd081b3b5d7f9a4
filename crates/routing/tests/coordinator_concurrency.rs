use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use herald_routing::schema::{Config, ConfigOpts, Receiver, Route};
use herald_routing::{Coordinator, Result, SubscriberResult};

fn coordinator() -> Arc<Coordinator> {
    let loader = |_: &mut Config| -> Result<()> { Ok(()) };
    let c = Arc::new(Coordinator::new(ConfigOpts::default(), Box::new(loader)));
    c.reload().unwrap();
    c
}

#[test]
fn concurrent_adds_are_all_applied() {
    let c = coordinator();
    let before = c.config().unwrap().receivers.len();
    let installs = Arc::new(AtomicUsize::new(0));
    let counter = installs.clone();
    c.subscribe(move |_: &Config| -> SubscriberResult {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    const N: usize = 32;
    let handles: Vec<_> = (0..N)
        .map(|i| {
            let c = c.clone();
            thread::spawn(move || {
                let name = format!("channel-{i}");
                c.add_route(Route::for_receiver(&name), Receiver::new(&name))
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }

    let cfg = c.config().unwrap();
    assert_eq!(cfg.receivers.len(), before + N);
    assert_eq!(cfg.root_route().unwrap().routes.len(), N);
    assert_eq!(installs.load(Ordering::SeqCst), N);
}

#[test]
fn concurrent_duplicate_adds_admit_exactly_one() {
    let c = coordinator();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let c = c.clone();
            thread::spawn(move || c.add_route(Route::for_receiver("same"), Receiver::new("same")))
        })
        .collect();
    let ok = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(ok, 1);
    assert_eq!(c.config().unwrap().receivers.len(), 2);
}

#[test]
fn readers_never_see_partial_edits() {
    let c = coordinator();
    let writer = {
        let c = c.clone();
        thread::spawn(move || {
            for i in 0..50 {
                let name = format!("r{i}");
                c.add_route(Route::for_receiver(&name), Receiver::new(&name)).unwrap();
                c.delete_route(&name).unwrap();
            }
        })
    };
    for _ in 0..200 {
        let cfg = c.config().unwrap();
        // Every child route has a matching receiver in the same snapshot.
        for route in &cfg.root_route().unwrap().routes {
            assert!(cfg.receiver(&route.receiver).is_some());
        }
    }
    writer.join().unwrap();
}
