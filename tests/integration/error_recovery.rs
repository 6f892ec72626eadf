//! Error Recovery & Resilience Tests
//!
//! One bad message, observer or hook must never take the worker down or lose
//! messages queued behind it.

use active_object::{
    ActiveBehavior, ActiveObject, ActiveObjectError, FnBehavior, ProcessingContext,
    ProcessingFailure, WorkerState,
};
use anyhow::{bail, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
enum Job {
    Benign(u32),
    Raise,
    Panic,
    Stop,
}

struct Worker;

impl ActiveBehavior for Worker {
    type Message = Job;

    fn is_stop_message(message: &Job) -> bool {
        *message == Job::Stop
    }

    fn stop_message() -> Job {
        Job::Stop
    }

    fn process_message(&mut self, _ctx: &ProcessingContext<'_, Job>, message: &Job) -> Result<()> {
        match message {
            Job::Raise => bail!("job refused"),
            Job::Panic => panic!("job exploded"),
            _ => Ok(()),
        }
    }
}

struct Observed {
    object: ActiveObject<Worker>,
    processed: Arc<Mutex<Vec<Job>>>,
    failures: Arc<Mutex<Vec<ProcessingFailure>>>,
}

fn observed(name: &str) -> Observed {
    let object = ActiveObject::new(name, Worker).unwrap();
    let processed = Arc::new(Mutex::new(Vec::new()));
    let failures = Arc::new(Mutex::new(Vec::new()));
    {
        let processed = Arc::clone(&processed);
        object.notifications().subscribe_processed(move |job: &Job| processed.lock().push(job.clone()));
        let failures = Arc::clone(&failures);
        object.notifications().subscribe_exception(move |failure: &ProcessingFailure| failures.lock().push(failure.clone()));
    }
    Observed {
        object,
        processed,
        failures,
    }
}

#[test]
fn test_exception_then_benign_message() {
    let observed = observed("raise-then-benign");
    assert!(observed.object.start(TIMEOUT));

    assert!(observed.object.post_message(Job::Raise));
    assert!(observed.object.post_message(Job::Benign(1)));
    assert!(observed.object.stop(TIMEOUT));

    assert_eq!(observed.failures.lock().len(), 1);
    assert_eq!(*observed.processed.lock(), vec![Job::Benign(1)]);
    assert_eq!(observed.object.messages_processed(), 2);
    assert_eq!(observed.object.messages_failed(), 1);
}

#[test]
fn test_panicking_message_is_contained() {
    let observed = observed("panic-then-benign");
    assert!(observed.object.start(TIMEOUT));

    assert!(observed.object.post_message(Job::Panic));
    assert!(observed.object.post_message(Job::Benign(2)));
    assert!(observed.object.post_message(Job::Panic));
    assert!(observed.object.post_message(Job::Benign(3)));
    assert!(observed.object.stop(TIMEOUT));

    let failures = observed.failures.lock();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(ProcessingFailure::is_panic));
    assert_eq!(failures[0].sequence, 0);
    assert_eq!(failures[1].sequence, 2);
    assert!(failures[0].detail.contains("job exploded"));

    assert_eq!(*observed.processed.lock(), vec![Job::Benign(2), Job::Benign(3)]);
    assert_eq!(observed.object.state(), WorkerState::Exited);
}

#[test]
fn test_panicking_processed_observer_is_reported() {
    let observed = observed("bad-observer");
    observed.object.notifications().subscribe_processed(|job: &Job| {
        if *job == Job::Benign(13) {
            panic!("unlucky");
        }
    });
    assert!(observed.object.start(TIMEOUT));

    assert!(observed.object.post_message(Job::Benign(13)));
    assert!(observed.object.post_message(Job::Benign(14)));
    assert!(observed.object.stop(TIMEOUT));

    let failures = observed.failures.lock();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].detail.contains("unlucky"));
    assert_eq!(observed.object.messages_processed(), 2);
    assert_eq!(observed.object.messages_failed(), 1);
}

#[test]
fn test_panicking_exception_observer_does_not_stop_worker() {
    let observed = observed("bad-exception-observer");
    observed.object.notifications().subscribe_exception(|_failure: &ProcessingFailure| {
        panic!("observer failed too");
    });
    assert!(observed.object.start(TIMEOUT));

    assert!(observed.object.post_message(Job::Raise));
    assert!(observed.object.post_message(Job::Benign(5)));
    assert!(observed.object.stop(TIMEOUT));

    // Registered earlier, so it still saw the failure
    assert_eq!(observed.failures.lock().len(), 1);
    assert_eq!(*observed.processed.lock(), vec![Job::Benign(5)]);
}

#[test]
fn test_unsubscribed_observer_stops_receiving() {
    let object = ActiveObject::new("unsubscribe", Worker).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let id = {
        let calls = Arc::clone(&calls);
        object.notifications().subscribe_exception(move |_failure: &ProcessingFailure| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    assert!(object.notifications().unsubscribe(id));
    assert!(!object.notifications().unsubscribe(id));

    assert!(object.start(TIMEOUT));
    assert!(object.post_message(Job::Raise));
    assert!(object.stop(TIMEOUT));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(object.messages_failed(), 1);
}

#[test]
fn test_failing_setup_reports_hook_error() {
    struct BrokenSetup(Arc<AtomicUsize>);

    impl ActiveBehavior for BrokenSetup {
        type Message = Option<u8>;

        fn is_stop_message(message: &Option<u8>) -> bool {
            message.is_none()
        }

        fn stop_message() -> Option<u8> {
            None
        }

        fn before_process_messages(&mut self, _ctx: &ProcessingContext<'_, Option<u8>>) -> Result<()> {
            bail!("device unavailable")
        }

        fn process_message(&mut self, _ctx: &ProcessingContext<'_, Option<u8>>, _message: &Option<u8>) -> Result<()> {
            Ok(())
        }

        fn after_process_messages(&mut self, _ctx: &ProcessingContext<'_, Option<u8>>) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let teardowns = Arc::new(AtomicUsize::new(0));
    let object = ActiveObject::new("broken-setup", BrokenSetup(Arc::clone(&teardowns))).unwrap();

    let err = object.launch(TIMEOUT).unwrap_err();
    assert!(matches!(err, ActiveObjectError::Hook { hook: "before_process_messages", .. }));
    assert!(err.to_string().contains("device unavailable"));
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);

    // Nothing is consuming, but stop and post still return promptly
    assert!(!object.is_started());
    assert!(object.stop(TIMEOUT));
    assert!(!object.post_message(Some(1)));
}

#[test]
fn test_failing_teardown_still_exits() {
    struct BrokenTeardown;

    impl ActiveBehavior for BrokenTeardown {
        type Message = Option<u8>;

        fn is_stop_message(message: &Option<u8>) -> bool {
            message.is_none()
        }

        fn stop_message() -> Option<u8> {
            None
        }

        fn process_message(&mut self, _ctx: &ProcessingContext<'_, Option<u8>>, message: &Option<u8>) -> Result<()> {
            if *message == Some(0) {
                panic!("zero");
            }
            Ok(())
        }

        fn after_process_messages(&mut self, _ctx: &ProcessingContext<'_, Option<u8>>) -> Result<()> {
            bail!("release failed")
        }
    }

    let object = ActiveObject::new("broken-teardown", BrokenTeardown).unwrap();
    assert!(object.start(TIMEOUT));
    assert!(object.post_message(Some(0)));
    assert!(object.post_message(Some(1)));

    // The worker still exits; the teardown error is only logged
    assert!(object.stop(TIMEOUT));
    assert_eq!(object.state(), WorkerState::Exited);
    assert_eq!(object.messages_processed(), 2);
    assert_eq!(object.messages_failed(), 1);
}

#[test]
fn test_closure_behavior_survives_panics() {
    let object = ActiveObject::new(
        "closure-panics",
        FnBehavior::new(|_ctx: &ProcessingContext<'_, Option<u8>>, message: &Option<u8>| {
            if matches!(message, Some(value) if value % 2 == 0) {
                panic!("even");
            }
            Ok(())
        }),
    )
    .unwrap();

    assert!(object.start(TIMEOUT));
    for value in 0..10 {
        assert!(object.post_message(Some(value)));
    }
    assert!(object.stop(TIMEOUT));
    assert_eq!(object.messages_processed(), 10);
    assert_eq!(object.messages_failed(), 5);
}

#[test]
fn test_request_after_stop_is_rejected() {
    struct Echo;

    enum EchoMessage {
        Ask(active_object::active::ReplySender<u32>),
        Stop,
    }

    impl ActiveBehavior for Echo {
        type Message = EchoMessage;

        fn is_stop_message(message: &EchoMessage) -> bool {
            matches!(message, EchoMessage::Stop)
        }

        fn stop_message() -> EchoMessage {
            EchoMessage::Stop
        }

        fn process_message(&mut self, ctx: &ProcessingContext<'_, EchoMessage>, message: &EchoMessage) -> Result<()> {
            if let EchoMessage::Ask(reply) = message {
                reply.send(ctx.sequence() as u32);
            }
            Ok(())
        }
    }

    let object = ActiveObject::new("echo", Echo).unwrap();
    assert!(object.start(TIMEOUT));
    assert_eq!(object.request(EchoMessage::Ask, TIMEOUT).unwrap(), 0);
    assert_eq!(object.request(EchoMessage::Ask, TIMEOUT).unwrap(), 1);
    assert!(object.stop(TIMEOUT));

    assert!(matches!(
        object.request(EchoMessage::Ask, TIMEOUT),
        Err(ActiveObjectError::Stopped { .. })
    ));
}
