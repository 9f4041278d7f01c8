use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use bookscan::{
    write_ranking, AnalysisPool, AnalysisQueue, AnalysisWorker, BookId, Pattern, RankEntry,
    Reporter, SharedStore, Shutdown, REPORT_HEADER,
};
use crossbeam_utils::thread;

mod common;
use common::SharedBuf;

fn cat() -> Pattern {
    Pattern::new("cat").unwrap()
}

#[test]
fn ranking_is_printed_as_title_and_count() {
    let ranking = vec![
        RankEntry { book: BookId(2), title: Some("Moby Dick".into()), count: 7 },
        RankEntry { book: BookId(1), title: None, count: 2 },
    ];
    let mut out = Vec::new();
    assert!(write_ranking(&mut out, &ranking).unwrap());
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!("{}\nMoby Dick: 7\nUnknown Book: 2\n", REPORT_HEADER)
    );
}

#[test]
fn empty_ranking_prints_nothing() {
    let mut out = Vec::new();
    assert!(!write_ranking(&mut out, &[]).unwrap());
    assert!(out.is_empty());
}

#[test]
fn report_is_not_due_before_one_interval() {
    let reporter = Reporter::new(Duration::from_secs(60), Vec::new());
    let store = SharedStore::new();
    assert!(!reporter.is_due(Instant::now()));
    assert!(!reporter.report_if_due(&store).unwrap());
}

#[test]
fn report_fires_once_per_interval() {
    let interval = Duration::from_secs(5);
    let out = SharedBuf::default();
    let reporter = Reporter::new(interval, out.clone());
    let store = SharedStore::new();
    store.append("cat", BookId(1));
    store.refresh_frequency(BookId(1), &cat());

    let start = Instant::now();
    assert!(reporter.report_if_due_at(start + interval, &store).unwrap());
    assert!(!reporter.report_if_due_at(start + interval + Duration::from_secs(1), &store).unwrap());
    assert!(reporter.report_if_due_at(start + interval * 2 + Duration::from_millis(10), &store).unwrap());

    let printed = out.contents();
    assert_eq!(printed.matches(REPORT_HEADER).count(), 2);
    assert!(printed.contains("Unknown Book: 1"));
}

#[test]
fn racing_workers_print_a_single_report() {
    const WORKERS: usize = 10;
    let interval = Duration::from_millis(200);
    let out = SharedBuf::default();
    let reporter = Reporter::new(interval, out.clone());
    let store = SharedStore::new();
    store.append("cat", BookId(1));
    store.set_title(BookId(1), "Cats");
    store.refresh_frequency(BookId(1), &cat());

    std::thread::sleep(interval + Duration::from_millis(50));
    let fired = AtomicUsize::new(0);
    let barrier = Barrier::new(WORKERS);

    thread::scope(|s| {
        for _ in 0..WORKERS {
            s.spawn(|_| {
                barrier.wait();
                if reporter.report_if_due(&store).unwrap() {
                    fired.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    })
    .expect("reporting threads panicked");

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(out.contents(), format!("{}\nCats: 1\n", REPORT_HEADER));
}

#[test]
fn worker_step_refreshes_queued_book() {
    let store = SharedStore::new();
    let queue = AnalysisQueue::new();
    let reporter = Arc::new(Reporter::new(Duration::from_millis(20), io::sink()));
    let worker =
        AnalysisWorker::new(store.clone(), queue.clone(), cat(), reporter, Shutdown::new());

    store.append("the cat sat", BookId(1));
    store.append("cat cat", BookId(1));
    queue.push(BookId(1));

    assert!(worker.step());
    assert_eq!(store.frequency(BookId(1)), Some(3));
    // nothing queued, the step waits one interval and returns
    assert!(!worker.step());
}

#[test]
fn duplicate_queue_entries_are_harmless() {
    let store = SharedStore::new();
    let queue = AnalysisQueue::new();
    let reporter = Arc::new(Reporter::new(Duration::from_millis(20), io::sink()));
    let worker =
        AnalysisWorker::new(store.clone(), queue.clone(), cat(), reporter, Shutdown::new());

    store.append("cat", BookId(5));
    for _ in 0..3 {
        queue.push(BookId(5));
    }
    while worker.step() {}
    assert_eq!(store.ranked_by_frequency(), vec![(BookId(5), 1)]);
    assert!(queue.is_empty());
}

#[test]
fn pool_processes_queue_and_stops_on_shutdown() {
    let interval = Duration::from_millis(50);
    let store = SharedStore::new();
    let queue = AnalysisQueue::new();
    let out = SharedBuf::default();
    let reporter = Arc::new(Reporter::new(interval, out.clone()));
    let shutdown = Shutdown::new();

    let pool = AnalysisPool::spawn(
        3,
        store.clone(),
        queue.clone(),
        cat(),
        reporter,
        shutdown.clone(),
    )
    .unwrap();
    assert_eq!(pool.len(), 3);

    for book in 1..=3 {
        for _ in 0..book {
            store.append("cat", BookId(book));
        }
        store.set_title(BookId(book), format!("Book {}", book));
        queue.push(BookId(book));
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while store.ranked_by_frequency().len() < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    // give the workers time to print at least one report of the full ranking
    std::thread::sleep(interval * 4);

    let started = Instant::now();
    pool.shutdown();
    assert!(!shutdown.is_running());
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(
        store.ranked_by_frequency(),
        vec![(BookId(3), 3), (BookId(2), 2), (BookId(1), 1)]
    );
    let printed = out.contents();
    assert!(printed.contains(&format!("{}\nBook 3: 3\nBook 2: 2\nBook 1: 1\n", REPORT_HEADER)));
}

#[test]
fn queue_is_fifo_and_times_out_when_empty() {
    let queue = AnalysisQueue::new();
    queue.push(BookId(2));
    queue.push(BookId(1));
    queue.push(BookId(2));
    assert_eq!(queue.len(), 3);

    let wait = Duration::from_millis(10);
    assert_eq!(queue.pop_timeout(wait), Some(BookId(2)));
    assert_eq!(queue.pop_timeout(wait), Some(BookId(1)));
    assert_eq!(queue.pop_timeout(wait), Some(BookId(2)));

    let started = Instant::now();
    assert_eq!(queue.pop_timeout(wait), None);
    assert!(started.elapsed() >= wait);
}
