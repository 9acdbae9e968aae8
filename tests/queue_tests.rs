use std::sync::Arc;
use std::time::Duration;

use files_manager::queue::{DurableQueue, JobQueue};
use files_manager::storage::models::Job;
use files_manager::storage::Database;
use files_manager::Error;

fn test_queue(
    visibility_timeout: Duration,
    max_attempts: u32,
) -> (tempfile::TempDir, Database, DurableQueue) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let queue = DurableQueue::new(db.clone(), visibility_timeout, max_attempts)
        .with_poll_interval(Duration::from_millis(20));
    (dir, db, queue)
}

#[tokio::test]
async fn test_enqueue_dequeue_complete() {
    let (_dir, db, queue) = test_queue(Duration::from_secs(60), 3);

    queue.enqueue(Job::new("f1", "u1")).await.unwrap();
    let delivery = queue.dequeue().await.unwrap();
    assert_eq!(delivery.job, Job::new("f1", "u1"));
    assert_eq!(delivery.attempt, 1);

    // Leased jobs are not handed out twice
    assert!(queue.try_dequeue().unwrap().is_none());

    queue.complete(&delivery, &Ok(())).await.unwrap();
    assert_eq!(db.job_count().unwrap(), 0);
}

#[tokio::test]
async fn test_rejected_job_is_not_redelivered() {
    let (_dir, db, queue) = test_queue(Duration::from_secs(60), 3);

    queue.enqueue(Job::default()).await.unwrap();
    let delivery = queue.dequeue().await.unwrap();
    queue
        .complete(&delivery, &Err(Error::invalid("Missing fileId")))
        .await
        .unwrap();

    assert_eq!(db.job_count().unwrap(), 0);
}

#[tokio::test]
async fn test_failed_job_is_redelivered_until_attempts_run_out() {
    let (_dir, db, queue) = test_queue(Duration::from_secs(60), 2);
    let failure = || {
        Err(Error::GenerationFailure {
            size: 250,
            reason: "boom".to_string(),
        })
    };

    queue.enqueue(Job::new("f1", "u1")).await.unwrap();

    let first = queue.dequeue().await.unwrap();
    queue.complete(&first, &failure()).await.unwrap();

    let second = queue.try_dequeue().unwrap().expect("job should be redelivered");
    assert_eq!(second.seq, first.seq);
    assert_eq!(second.attempt, 2);

    queue.complete(&second, &failure()).await.unwrap();
    assert!(queue.try_dequeue().unwrap().is_none());
    assert_eq!(db.job_count().unwrap(), 0);
}

#[tokio::test]
async fn test_expired_lease_is_redelivered() {
    let (_dir, _db, queue) = test_queue(Duration::from_millis(50), 3);

    queue.enqueue(Job::new("f1", "u1")).await.unwrap();
    let first = queue.try_dequeue().unwrap().unwrap();
    assert!(queue.try_dequeue().unwrap().is_none());

    // The worker holding the lease never completes it
    tokio::time::sleep(Duration::from_millis(100)).await;

    let again = queue.try_dequeue().unwrap().expect("lease should have expired");
    assert_eq!(again.seq, first.seq);
    assert_eq!(again.attempt, 2);
}

#[tokio::test]
async fn test_late_completion_does_not_disturb_current_lease() {
    let (_dir, db, queue) = test_queue(Duration::from_millis(300), 3);

    queue.enqueue(Job::new("f1", "u1")).await.unwrap();
    let slow = queue.try_dequeue().unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    let current = queue.try_dequeue().unwrap().expect("lease should have expired");
    assert_eq!(current.attempt, 2);

    // The slow worker finally reports a failure, then a success
    queue
        .complete(
            &slow,
            &Err(Error::GenerationFailure {
                size: 500,
                reason: "boom".to_string(),
            }),
        )
        .await
        .unwrap();
    assert!(queue.try_dequeue().unwrap().is_none());
    queue.complete(&slow, &Ok(())).await.unwrap();
    assert_eq!(db.job_count().unwrap(), 1);

    queue.complete(&current, &Ok(())).await.unwrap();
    assert_eq!(db.job_count().unwrap(), 0);
}

#[tokio::test]
async fn test_dequeue_waits_for_enqueue() {
    let (_dir, _db, queue) = test_queue(Duration::from_secs(60), 3);
    let queue = Arc::new(queue);

    let waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.dequeue().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.enqueue(Job::new("f9", "u1")).await.unwrap();

    let delivery = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("dequeue should wake up")
        .unwrap()
        .unwrap();
    assert_eq!(delivery.job.file_id.as_deref(), Some("f9"));
}

#[tokio::test]
async fn test_jobs_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open(dir.path().join("data")).unwrap();
        let queue = DurableQueue::new(db, Duration::from_secs(60), 3);
        queue.enqueue(Job::new("f1", "u1")).await.unwrap();
    }

    let db = Database::open(dir.path().join("data")).unwrap();
    let queue = DurableQueue::new(db, Duration::from_secs(60), 3);
    let delivery = queue.try_dequeue().unwrap().unwrap();
    assert_eq!(delivery.job, Job::new("f1", "u1"));
}
