use glamx::UVec2;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tessel_asset::{Image, LazyResource, LoadError, LoadPolicy};
use web_time::Duration;

fn checker_image(generation: usize) -> Image {
    Image::new(UVec2::new(2, 2), vec![generation as u8; 16])
}

#[test]
fn ready_value_resolves_without_loading() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let resource = LazyResource::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, io::Error>(checker_image(0))
    });

    assert!(!resource.is_ready());

    let first = resource.get().wait().unwrap();
    assert!(resource.is_ready());

    let mut second = resource.get();
    let second = second.try_resolve().expect("ready values resolve immediately").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(resource.load_count(), 1);
}

#[test]
fn requests_during_a_load_share_its_result() {
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let resource = {
        let started = started.clone();
        let release = release.clone();
        LazyResource::new(move || {
            started.wait();
            release.wait();
            Ok::<_, io::Error>(checker_image(1))
        })
    };

    let first_requester = {
        let resource = resource.clone();
        thread::spawn(move || resource.get().wait())
    };

    // the first requester is now inside the loader
    started.wait();
    assert!(resource.is_loading());

    let mut late_requests: Vec<_> = (0..8).map(|_| resource.get()).collect();
    for request in &mut late_requests {
        assert!(request.try_resolve().is_none());
    }

    release.wait();

    let first = first_requester.join().unwrap().unwrap();
    for request in late_requests {
        let value = request.wait().unwrap();
        assert!(Arc::ptr_eq(&first, &value));
    }

    assert_eq!(resource.load_count(), 1);
}

#[test]
fn eager_load_during_a_load_does_not_start_another() {
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let resource = {
        let started = started.clone();
        let release = release.clone();
        LazyResource::new(move || {
            started.wait();
            release.wait();
            Ok::<_, io::Error>(checker_image(1))
        })
    };

    let first_requester = {
        let resource = resource.clone();
        thread::spawn(move || resource.get().wait())
    };

    started.wait();
    resource.load();
    assert_eq!(resource.load_count(), 1);

    let mut late = resource.get();
    assert!(late.try_resolve().is_none());

    release.wait();

    let first = first_requester.join().unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &late.wait().unwrap()));
    assert_eq!(resource.load_count(), 1);
}

#[test]
fn concurrent_requests_from_many_threads_load_once() {
    let resource = LazyResource::with_policy(LoadPolicy::Detached, || {
        thread::sleep(Duration::from_millis(20));
        Ok::<_, io::Error>(checker_image(2))
    });

    let start = Arc::new(Barrier::new(8));
    let requesters: Vec<_> = (0..8)
        .map(|_| {
            let resource = resource.clone();
            let start = start.clone();
            thread::spawn(move || {
                start.wait();
                resource.get().wait()
            })
        })
        .collect();

    let values: Vec<_> = requesters
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .collect();

    assert_eq!(resource.load_count(), 1);
    assert!(values.iter().all(|value| Arc::ptr_eq(value, &values[0])));
}

#[test]
fn dropping_every_strong_reference_forgets_the_result() {
    let generation = Arc::new(AtomicUsize::new(0));
    let counter = generation.clone();
    let resource = LazyResource::new(move || {
        let generation = counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, io::Error>(checker_image(generation))
    });

    let first = resource.get().wait().unwrap();
    let also_first = resource.get().wait().unwrap();
    assert_eq!(first.pixels()[0], 0);

    drop(first);
    assert!(resource.is_ready(), "one strong reference is still alive");

    drop(also_first);
    assert!(!resource.is_ready());

    let second = resource.get().wait().unwrap();
    assert_eq!(second.pixels()[0], 1);
    assert_eq!(resource.load_count(), 2);
}

#[test]
fn loader_failure_reaches_every_requester_and_allows_retry() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let resource = {
        let attempts = attempts.clone();
        let started = started.clone();
        let release = release.clone();
        LazyResource::new(move || {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                started.wait();
                release.wait();
                return Err(io::Error::new(io::ErrorKind::NotFound, "missing file"));
            }
            Ok(checker_image(3))
        })
    };

    let first_requester = {
        let resource = resource.clone();
        thread::spawn(move || resource.get().wait())
    };

    started.wait();
    let waiting = resource.get();
    release.wait();

    let first_err = first_requester.join().unwrap().unwrap_err();
    let waiting_err = waiting.wait().unwrap_err();

    assert!(matches!(first_err, LoadError::Loader { .. }));
    assert!(matches!(waiting_err, LoadError::Loader { .. }));
    assert_eq!(first_err.asset(), resource.id());
    assert!(first_err.to_string().contains("missing file"));
    assert!(!resource.is_ready());
    assert!(!resource.is_loading());

    let retried = resource.get().wait().unwrap();
    assert_eq!(retried.size(), UVec2::new(2, 2));
    assert_eq!(resource.load_count(), 2);
}

#[test]
fn detached_loads_resolve_later() {
    let release = Arc::new(Barrier::new(2));
    let resource = {
        let release = release.clone();
        LazyResource::named("late texture", LoadPolicy::Detached, move || {
            release.wait();
            Ok::<_, io::Error>(checker_image(4))
        })
    };

    let mut request = resource.get();
    assert!(request.try_resolve().is_none());
    assert!(resource.is_loading());

    release.wait();

    let value = request.wait().unwrap();
    assert_eq!(value.pixels()[0], 4);
    assert_eq!(resource.label(), "late texture");
}

#[test]
fn eager_load_resolves_queued_requests() {
    let resource = LazyResource::new(|| Ok::<_, io::Error>(checker_image(5)));

    resource.load();
    // nothing held on to the eager result
    assert!(!resource.is_ready());
    assert_eq!(resource.load_count(), 1);

    let value = resource.get().wait().unwrap();
    assert_eq!(value.pixels()[0], 5);
    assert_eq!(resource.load_count(), 2);
}
