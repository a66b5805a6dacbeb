//! Queue integration tests against a live Redis.

use vanon_models::AnonymizeJob;
use vanon_queue::JobQueue;

/// Test the enqueue, consume, acknowledge cycle.
#[tokio::test]
#[ignore = "requires Redis"]
async fn enqueue_consume_ack_cycle() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = AnonymizeJob::new("videos", "integration/clip.mp4");
    let job_id = job.job_id.clone();

    let message_id = queue.enqueue(&job).await.expect("Failed to enqueue");
    println!("Enqueued job {} with message ID {}", job_id, message_id);

    let delivery = queue
        .consume_one("test-consumer", 1000)
        .await
        .expect("Failed to consume")
        .expect("No delivery received");

    let consumed: AnonymizeJob =
        serde_json::from_str(&delivery.payload).expect("Failed to parse payload");
    assert_eq!(consumed.job_id, job_id);

    queue.ack(&delivery.message_id).await.expect("Failed to ack");
    println!("Job {} acknowledged", job_id);
}

/// Test that a rejected delivery lands on the rejected stream and is never
/// redelivered.
#[tokio::test]
#[ignore = "requires Redis"]
async fn reject_moves_delivery_to_rejected_stream() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = AnonymizeJob::new("videos", "integration/reject.mp4");
    queue.enqueue(&job).await.expect("Failed to enqueue");

    let before = queue
        .rejected_len()
        .await
        .expect("Failed to get rejected length");

    let delivery = queue
        .consume_one("test-consumer", 1000)
        .await
        .expect("Failed to consume")
        .expect("No delivery received");

    queue
        .reject(&delivery, "integration test rejection")
        .await
        .expect("Failed to reject");

    let after = queue
        .rejected_len()
        .await
        .expect("Failed to get rejected length");
    assert_eq!(after, before + 1);

    // The original must be gone for good
    let redelivered = queue
        .consume_one("test-consumer", 500)
        .await
        .expect("Failed to consume");
    assert!(redelivered.is_none());
}
