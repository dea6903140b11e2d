//! Time-ordered job queue for one campaign

use chrono::{DateTime, Utc};
use smsrust_common::types::{CampaignId, ContactId, DeviceId};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// One pending send for one contact.
///
/// Jobs carry a snapshot of the contact's number taken at enqueue time; a
/// later opt-out does not pull an already-enqueued job. A job is never
/// mutated once built: a retry is a fresh job from
/// [`retry`](DispatchJob::retry) with the attempt count advanced.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub campaign_id: CampaignId,
    pub contact_id: ContactId,
    pub phone_number: String,
    pub device_id: DeviceId,
    /// Earliest instant this job may be claimed
    pub not_before: DateTime<Utc>,
    /// Stable key for gateway-side deduplication, shared across retries
    pub idempotency_key: String,
    /// Send attempts consumed so far
    pub attempts: u32,
}

impl DispatchJob {
    pub fn new(
        campaign_id: CampaignId,
        contact_id: ContactId,
        phone_number: String,
        device_id: DeviceId,
        not_before: DateTime<Utc>,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        let idempotency_key = format!(
            "{}:{}:{}",
            campaign_id,
            phone_number,
            enqueued_at.timestamp_millis()
        );
        Self {
            campaign_id,
            contact_id,
            phone_number,
            device_id,
            not_before,
            idempotency_key,
            attempts: 0,
        }
    }

    /// Successor job for the next attempt, eligible at `not_before`
    pub fn retry(&self, not_before: DateTime<Utc>) -> Self {
        Self {
            not_before,
            attempts: self.attempts + 1,
            ..self.clone()
        }
    }
}

/// Heap entry; `seq` breaks ties so equal deadlines keep insertion order
struct QueuedJob {
    not_before: DateTime<Utc>,
    seq: u64,
    job: DispatchJob,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.not_before == other.not_before && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.not_before, self.seq).cmp(&(other.not_before, other.seq))
    }
}

struct QueueState {
    jobs: BinaryHeap<Reverse<QueuedJob>>,
    paused: bool,
    closed: bool,
    seq: u64,
}

/// Priority queue of dispatch jobs ordered by their eligibility time.
///
/// A single worker blocks on [`claim_next`](DispatchQueue::claim_next);
/// control operations (enqueue, pause, resume, drain) wake it through the
/// internal notifier.
pub struct DispatchQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

enum Claim {
    /// Job is due now
    Due(DispatchJob),
    /// Head exists but is not eligible yet
    NotYet(Duration),
    /// Nothing queued and the queue is open
    Empty,
    /// Queue paused; wait for resume
    Paused,
    /// Drained; no job will ever be claimable again
    Closed,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: BinaryHeap::new(),
                paused: false,
                closed: false,
                seq: 0,
            }),
            notify: Notify::new(),
        }
    }

    /// Add a job; ignored after [`drain`](DispatchQueue::drain)
    pub fn enqueue(&self, job: DispatchJob) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.closed {
                return;
            }
            let seq = state.seq;
            state.seq += 1;
            state.jobs.push(Reverse(QueuedJob {
                not_before: job.not_before,
                seq,
                job,
            }));
        }
        self.notify.notify_waiters();
    }

    /// Claim the next eligible job, waiting until its `not_before` passes.
    ///
    /// Returns `None` when the queue is empty or drained; a paused queue
    /// blocks instead. Jobs are never handed out before their `not_before`.
    pub async fn claim_next(&self) -> Option<DispatchJob> {
        loop {
            // Register for wakeups before inspecting state so a notify that
            // lands between the unlock and the await is not lost
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let claim = {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                if state.closed {
                    Claim::Closed
                } else if state.paused {
                    Claim::Paused
                } else {
                    let now = Utc::now();
                    let head = state.jobs.peek().map(|Reverse(h)| h.not_before);
                    match head {
                        None => Claim::Empty,
                        Some(not_before) if not_before <= now => match state.jobs.pop() {
                            Some(Reverse(entry)) => Claim::Due(entry.job),
                            None => Claim::Empty,
                        },
                        Some(not_before) => {
                            let wait = (not_before - now).to_std().unwrap_or(Duration::ZERO);
                            Claim::NotYet(wait)
                        }
                    }
                }
            };

            match claim {
                Claim::Due(job) => return Some(job),
                Claim::Closed | Claim::Empty => return None,
                Claim::Paused => notified.await,
                Claim::NotYet(wait) => {
                    // Wake early if something changes the head or pauses us
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = &mut notified => {}
                    }
                }
            }
        }
    }

    /// Stop handing out jobs until [`resume`](DispatchQueue::resume)
    pub fn pause(&self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).paused = true;
        self.notify.notify_waiters();
    }

    pub fn resume(&self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).paused = false;
        self.notify.notify_waiters();
    }

    /// Discard all queued jobs and close the queue; returns the number
    /// discarded. No claim can begin after this returns.
    pub fn drain(&self) -> usize {
        let discarded = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.closed = true;
            let n = state.jobs.len();
            state.jobs.clear();
            n
        };
        self.notify.notify_waiters();
        discarded
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).paused
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).closed
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    fn job_at(not_before: DateTime<Utc>) -> DispatchJob {
        DispatchJob::new(
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
            "+14165550199".to_string(),
            uuid::Uuid::new_v4(),
            not_before,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_claims_in_deadline_order() {
        let queue = DispatchQueue::new();
        let now = Utc::now();
        let late = job_at(now + ChronoDuration::milliseconds(40));
        let early = job_at(now + ChronoDuration::milliseconds(10));
        let late_contact = late.contact_id;
        let early_contact = early.contact_id;

        queue.enqueue(late);
        queue.enqueue(early);

        let first = queue.claim_next().await.unwrap();
        let second = queue.claim_next().await.unwrap();
        assert_eq!(first.contact_id, early_contact);
        assert_eq!(second.contact_id, late_contact);
    }

    #[tokio::test]
    async fn test_never_claims_before_not_before() {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            let queue = DispatchQueue::new();
            let lo = rng.gen_range(1..40);
            let hi = rng.gen_range(lo..=80);
            for _ in 0..5 {
                let delay = rng.gen_range(lo..=hi);
                queue.enqueue(job_at(Utc::now() + ChronoDuration::milliseconds(delay)));
            }

            while let Some(job) = queue.claim_next().await {
                assert!(Utc::now() >= job.not_before);
            }
        }
    }

    #[test]
    fn test_retry_advances_attempts_and_keeps_key() {
        let original = job_at(Utc::now());
        let later = Utc::now() + ChronoDuration::seconds(5);
        let next = original.retry(later);

        assert_eq!(next.attempts, original.attempts + 1);
        assert_eq!(next.not_before, later);
        assert_eq!(next.idempotency_key, original.idempotency_key);
        // The original is untouched
        assert_eq!(original.attempts, 0);
    }

    #[tokio::test]
    async fn test_empty_queue_returns_none() {
        let queue = DispatchQueue::new();
        assert!(queue.claim_next().await.is_none());
    }

    #[tokio::test]
    async fn test_paused_queue_blocks_until_resume() {
        let queue = Arc::new(DispatchQueue::new());
        queue.enqueue(job_at(Utc::now()));
        queue.pause();

        let claimer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.claim_next().await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!claimer.is_finished());

        queue.resume();
        let job = claimer.await.unwrap();
        assert!(job.is_some());
    }

    #[tokio::test]
    async fn test_drain_discards_and_closes() {
        let queue = DispatchQueue::new();
        queue.enqueue(job_at(Utc::now() + ChronoDuration::seconds(60)));
        queue.enqueue(job_at(Utc::now() + ChronoDuration::seconds(120)));

        assert_eq!(queue.drain(), 2);
        assert!(queue.is_closed());
        assert!(queue.claim_next().await.is_none());

        // Enqueues after drain are dropped
        queue.enqueue(job_at(Utc::now()));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_earlier_enqueue_preempts_waiting_claim() {
        let queue = Arc::new(DispatchQueue::new());
        queue.enqueue(job_at(Utc::now() + ChronoDuration::seconds(30)));

        let claimer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.claim_next().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let urgent = job_at(Utc::now());
        let urgent_contact = urgent.contact_id;
        queue.enqueue(urgent);

        let job = claimer.await.unwrap().unwrap();
        assert_eq!(job.contact_id, urgent_contact);
    }
}
