//! End-to-End Active Object Tests
//!
//! Drives active objects through the public API only: producers on several
//! threads, graceful stop, counters and observers.

use active_object::{
    ActiveBehavior, ActiveObject, ActiveObjectConfig, FnBehavior, ProcessingContext, PushPolicy,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Collects every processed value, in processing order
fn collector(
    name: &str,
    capacity: usize,
) -> (
    ActiveObject<impl ActiveBehavior<Message = Option<u64>>>,
    Arc<Mutex<Vec<u64>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let behavior = FnBehavior::new(move |_ctx: &ProcessingContext<'_, Option<u64>>, message: &Option<u64>| {
        if let Some(value) = message {
            sink.lock().push(*value);
        }
        Ok(())
    });
    let config = ActiveObjectConfig::named(name).with_capacity(capacity);
    (ActiveObject::with_config(config, behavior).unwrap(), seen)
}

#[test]
fn test_capacity_four_scenario() {
    let (object, seen) = collector("scenario", 4);
    assert!(object.start(TIMEOUT));

    for value in 1..=3 {
        assert!(object.post_message(Some(value)));
    }
    assert!(object.stop(TIMEOUT));

    assert_eq!(object.messages_processed(), 3);
    assert_eq!(*seen.lock(), vec![1, 2, 3]);

    let started = Instant::now();
    assert!(!object.post_message(Some(4)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_single_producer_fifo() {
    let (object, seen) = collector("fifo", 8);
    assert!(object.start(TIMEOUT));

    for value in 0..2_000 {
        assert!(object.post_message(Some(value)));
    }
    assert!(object.stop(TIMEOUT));

    assert_eq!(*seen.lock(), (0..2_000).collect::<Vec<_>>());
}

#[test]
fn test_everything_posted_before_stop_is_processed() {
    let (object, seen) = collector("drain", 16);
    let object = Arc::new(object);
    assert!(object.start(TIMEOUT));

    let producers: Vec<_> = (0..4u64)
        .map(|producer| {
            let object = Arc::clone(&object);
            thread::spawn(move || {
                for i in 0..250 {
                    assert!(object.post_message(Some(producer * 1_000 + i)));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert!(object.stop(TIMEOUT));
    assert_eq!(object.messages_posted(), 1_000);
    assert_eq!(object.messages_processed(), 1_000);

    // Each producer's own values keep their relative order
    let seen = seen.lock();
    for producer in 0..4u64 {
        let own: Vec<u64> = seen
            .iter()
            .copied()
            .filter(|value| value / 1_000 == producer)
            .collect();
        assert_eq!(own, (0..250).map(|i| producer * 1_000 + i).collect::<Vec<_>>());
    }
}

#[test]
fn test_processing_is_never_reentrant() {
    let busy = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let behavior = {
        let busy = Arc::clone(&busy);
        let overlaps = Arc::clone(&overlaps);
        FnBehavior::new(move |_ctx: &ProcessingContext<'_, Option<u32>>, _message: &Option<u32>| {
            if busy.swap(true, Ordering::SeqCst) {
                overlaps.fetch_add(1, Ordering::SeqCst);
            }
            thread::yield_now();
            busy.store(false, Ordering::SeqCst);
            Ok(())
        })
    };
    let object = Arc::new(ActiveObject::new("reentrancy", behavior).unwrap());
    assert!(object.start(TIMEOUT));

    let producers: Vec<_> = (0..8)
        .map(|_| {
            let object = Arc::clone(&object);
            thread::spawn(move || {
                for i in 0..200 {
                    object.post_message(Some(i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert!(object.stop(TIMEOUT));
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(object.messages_processed(), 1_600);
}

#[test]
fn test_processed_never_exceeds_posted() {
    let (object, _seen) = collector("counters", 4);
    let object = Arc::new(object);
    assert!(object.start(TIMEOUT));

    let done = Arc::new(AtomicBool::new(false));
    let watcher = {
        let object = Arc::clone(&object);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                let stats = object.stats();
                assert!(stats.messages_processed <= stats.messages_posted);
            }
        })
    };

    for value in 0..5_000 {
        object.post_message(Some(value));
    }
    assert!(object.stop(TIMEOUT));
    done.store(true, Ordering::SeqCst);
    watcher.join().unwrap();

    assert_eq!(object.messages_processed(), object.messages_posted());
}

#[test]
fn test_concurrent_stop_performs_one_shutdown() {
    let after_calls = Arc::new(AtomicUsize::new(0));

    struct Counting(Arc<AtomicUsize>);

    impl ActiveBehavior for Counting {
        type Message = Option<u32>;

        fn is_stop_message(message: &Option<u32>) -> bool {
            message.is_none()
        }

        fn stop_message() -> Option<u32> {
            None
        }

        fn process_message(&mut self, _ctx: &ProcessingContext<'_, Option<u32>>, _message: &Option<u32>) -> anyhow::Result<()> {
            Ok(())
        }

        fn after_process_messages(&mut self, _ctx: &ProcessingContext<'_, Option<u32>>) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let object = Arc::new(ActiveObject::new("double-stop", Counting(Arc::clone(&after_calls))).unwrap());
    assert!(object.start(TIMEOUT));
    assert!(object.post_message(Some(1)));

    let first = {
        let object = Arc::clone(&object);
        thread::spawn(move || object.stop(TIMEOUT))
    };
    let second = {
        let object = Arc::clone(&object);
        thread::spawn(move || object.stop(TIMEOUT))
    };
    assert!(first.join().unwrap());
    assert!(second.join().unwrap());

    assert!(object.wait_for_exit(TIMEOUT));
    assert_eq!(after_calls.load(Ordering::SeqCst), 1);
    assert_eq!(object.messages_processed(), 1);
}

#[test]
fn test_blocked_producer_released_by_stop() {
    let gate = Arc::new(AtomicBool::new(false));
    let behavior = {
        let gate = Arc::clone(&gate);
        FnBehavior::new(move |_ctx: &ProcessingContext<'_, Option<u32>>, _message: &Option<u32>| {
            while !gate.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        })
    };
    let config = ActiveObjectConfig::named("backpressure").with_capacity(1);
    let object = Arc::new(ActiveObject::with_config(config, behavior).unwrap());
    assert!(object.start(TIMEOUT));

    // One message held by the worker, one filling the queue
    assert!(object.post_message(Some(1)));
    assert!(object.post_message(Some(2)));

    let producer = {
        let object = Arc::clone(&object);
        thread::spawn(move || object.post_message(Some(3)))
    };
    thread::sleep(Duration::from_millis(50));

    // The stop sentinel cannot get in either; closing wakes the producer
    assert!(!object.stop(Duration::from_millis(50)));
    assert!(!producer.join().unwrap());

    gate.store(true, Ordering::SeqCst);
    assert!(object.wait_for_exit(TIMEOUT));
    assert_eq!(object.messages_processed(), 2);
}

#[test]
fn test_reject_policy_never_blocks() {
    let gate = Arc::new(AtomicBool::new(false));
    let behavior = {
        let gate = Arc::clone(&gate);
        FnBehavior::new(move |_ctx: &ProcessingContext<'_, Option<u32>>, _message: &Option<u32>| {
            while !gate.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        })
    };
    let mut config = ActiveObjectConfig::named("rejecting").with_capacity(2);
    config.queue.push_policy = PushPolicy::Reject;
    let object = ActiveObject::with_config(config, behavior).unwrap();
    assert!(object.start(TIMEOUT));

    let accepted = (0..10).filter(|i| object.post_message(Some(*i))).count();
    assert!((2..=3).contains(&accepted));
    assert_eq!(object.messages_posted(), accepted as u64);

    gate.store(true, Ordering::SeqCst);
    assert!(object.stop(TIMEOUT));
    assert_eq!(object.messages_processed(), accepted as u64);
}
