//! Bucket priority queue over small non-negative integer priorities.
//!
//! The queue never stores its items. Each item is an index into some external arena,
//! and the arena provides both the item's priority and a "next with same priority"
//! slot through [`QueueLinks`]. Every bucket is a singly-linked list threaded through
//! those slots, so enqueueing and dequeueing never allocate.
//!
//! Buckets are addressed by `priority % bucket_count`, which is only sound while every
//! bucketed priority lies in a window of `bucket_count` priorities starting at the
//! current minimum. Items beyond that window wait in an unordered overflow list. When
//! an item falls beyond the window, the queue first doubles its bucket count, up to
//! [`BucketQueue::MAX_BUCKET_COUNT`]; items beyond even that window overflow. Once the
//! buckets run dry, the window moves to the lowest overflowed priority and refills.

use log::debug;

/// Storage for the intrusive links of a [`BucketQueue`].
pub trait QueueLinks {
    /// Current priority of `item`.
    fn priority(&self, item: usize) -> u32;

    /// The item following `item` in its bucket.
    fn next_with_same_priority(&self, item: usize) -> Option<usize>;

    fn set_next_with_same_priority(&mut self, item: usize, next: Option<usize>);
}

/// Min-priority queue whose buckets are linked lists threaded through [`QueueLinks`].
#[derive(Clone, Debug)]
pub struct BucketQueue {
    buckets: Vec<Option<usize>>,
    /// Bucket count restored by [`BucketQueue::clear`].
    initial_bucket_count: usize,
    /// Number of items in `buckets`.
    bucketed: usize,
    /// No bucketed item has a priority below this.
    minimum: u32,
    /// Every bucketed item has a priority below this; every overflowed item is at or above it.
    limit: u64,
    overflow: Vec<usize>,
}

impl BucketQueue {
    pub const DEFAULT_BUCKET_COUNT: usize = 64;

    /// The bucket count never grows beyond this.
    pub const MAX_BUCKET_COUNT: usize = 1 << 16;

    pub fn new() -> Self {
        Self::with_bucket_count(Self::DEFAULT_BUCKET_COUNT)
    }

    /// `bucket_count` is rounded up to a power of two, at most [`Self::MAX_BUCKET_COUNT`].
    pub fn with_bucket_count(bucket_count: usize) -> Self {
        let bucket_count = bucket_count.clamp(1, Self::MAX_BUCKET_COUNT).next_power_of_two();
        BucketQueue {
            buckets: vec![None; bucket_count],
            initial_bucket_count: bucket_count,
            bucketed: 0,
            minimum: 0,
            limit: bucket_count as u64,
            overflow: Vec::new(),
        }
    }

    /// Number of items in the queue.
    pub fn len(&self) -> usize {
        self.bucketed + self.overflow.len()
    }

    /// `true` when the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Forget every item, and release any buckets grown since construction.
    pub fn clear(&mut self) {
        if self.buckets.len() != self.initial_bucket_count {
            debug!(
                "shrinking bucket queue from {} to {} buckets",
                self.buckets.len(),
                self.initial_bucket_count
            );
            self.buckets = vec![None; self.initial_bucket_count];
        } else {
            self.buckets.iter_mut().for_each(|head| *head = None);
        }
        self.overflow.clear();
        self.bucketed = 0;
        self.minimum = 0;
        self.limit = self.buckets.len() as u64;
    }

    fn bucket_of(&self, priority: u32) -> usize {
        priority as usize % self.buckets.len()
    }

    /// Add `item` to the queue at its current priority.
    ///
    /// `item` must not already be in the queue.
    pub fn enqueue(&mut self, links: &mut impl QueueLinks, item: usize) {
        let priority = links.priority(item);
        let wide = u64::from(priority);

        if self.is_empty() {
            self.minimum = priority;
            self.limit = wide + self.buckets.len() as u64;
        } else if self.bucketed == 0 {
            self.overflow.push(item);
            self.refill(links);
            return;
        } else if priority < self.minimum {
            self.minimum = priority;
            let span = self.limit - wide;
            if span > self.buckets.len() as u64 {
                // beyond the largest window, the highest bucketed items overflow instead
                self.rebuild(links, span.min(Self::MAX_BUCKET_COUNT as u64));
            }
        } else if wide >= self.limit {
            let span = wide - u64::from(self.minimum) + 1;
            if span <= Self::MAX_BUCKET_COUNT as u64 {
                self.rebuild(links, span);
            }
        }

        if wide < self.limit {
            self.push(links, item, priority);
        } else {
            self.overflow.push(item);
        }
    }

    fn push(&mut self, links: &mut impl QueueLinks, item: usize, priority: u32) {
        let bucket = self.bucket_of(priority);
        links.set_next_with_same_priority(item, self.buckets[bucket]);
        self.buckets[bucket] = Some(item);
        self.bucketed += 1;
    }

    /// Redistribute every item over a window of at least `span` priorities from the
    /// current minimum. The bucket count only grows.
    fn rebuild(&mut self, links: &mut impl QueueLinks, span: u64) {
        let mut items = Vec::with_capacity(self.len());
        for head in self.buckets.iter_mut() {
            let mut current = head.take();
            while let Some(item) = current {
                current = links.next_with_same_priority(item);
                items.push(item);
            }
        }
        items.append(&mut self.overflow);

        let wanted = span.clamp(1, Self::MAX_BUCKET_COUNT as u64) as usize;
        let bucket_count = wanted.next_power_of_two().max(self.buckets.len());
        if bucket_count != self.buckets.len() {
            debug!(
                "growing bucket queue from {} to {} buckets for {} items",
                self.buckets.len(),
                bucket_count,
                items.len()
            );
            self.buckets = vec![None; bucket_count];
        }

        self.bucketed = 0;
        self.limit = u64::from(self.minimum) + bucket_count as u64;
        for item in items {
            let priority = links.priority(item);
            if u64::from(priority) < self.limit {
                self.push(links, item, priority);
            } else {
                self.overflow.push(item);
            }
        }
    }

    /// Move the window to the lowest overflowed priority.
    fn refill(&mut self, links: &mut impl QueueLinks) {
        debug_assert_eq!(self.bucketed, 0);
        if let Some(minimum) = self.overflow.iter().map(|&item| links.priority(item)).min() {
            self.minimum = minimum;
            self.rebuild(links, 0);
        }
    }

    /// Remove and return an item with the lowest priority.
    pub fn dequeue(&mut self, links: &mut impl QueueLinks) -> Option<usize> {
        if self.bucketed == 0 {
            if self.overflow.is_empty() {
                return None;
            }
            self.refill(links);
        }

        let mut priority = self.minimum;
        loop {
            let bucket = self.bucket_of(priority);
            if let Some(item) = self.buckets[bucket] {
                self.buckets[bucket] = links.next_with_same_priority(item);
                links.set_next_with_same_priority(item, None);
                self.bucketed -= 1;
                self.minimum = priority;
                return Some(item);
            }
            debug_assert!(
                u64::from(priority) + 1 < self.limit,
                "queue count out of sync with buckets"
            );
            priority += 1;
        }
    }

    /// Move `item` to the position matching its current priority.
    ///
    /// The arena must already report the new priority for `item`; `old_priority` is
    /// the priority it had when it was enqueued or last changed.
    pub fn change(&mut self, links: &mut impl QueueLinks, item: usize, old_priority: u32) {
        if u64::from(old_priority) >= self.limit {
            let position = self.overflow.iter().position(|&candidate| candidate == item);
            debug_assert!(position.is_some(), "changed item {} was not in the queue", item);
            let Some(position) = position else {
                return;
            };
            self.overflow.swap_remove(position);
            self.enqueue(links, item);
            return;
        }

        let bucket = self.bucket_of(old_priority);
        let mut current = self.buckets[bucket];
        let mut previous: Option<usize> = None;
        while let Some(candidate) = current {
            if candidate == item {
                break;
            }
            previous = Some(candidate);
            current = links.next_with_same_priority(candidate);
        }
        debug_assert!(current.is_some(), "changed item {} was not in the queue", item);
        if current.is_none() {
            return;
        }

        let next = links.next_with_same_priority(item);
        match previous {
            None => self.buckets[bucket] = next,
            Some(previous) => links.set_next_with_same_priority(previous, next),
        }
        links.set_next_with_same_priority(item, None);
        self.bucketed -= 1;

        self.enqueue(links, item);
    }
}

impl Default for BucketQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Arena {
        priorities: Vec<u32>,
        next: Vec<Option<usize>>,
    }

    impl Arena {
        fn new(priorities: &[u32]) -> Self {
            Arena {
                priorities: priorities.to_vec(),
                next: vec![None; priorities.len()],
            }
        }
    }

    impl QueueLinks for Arena {
        fn priority(&self, item: usize) -> u32 {
            self.priorities[item]
        }

        fn next_with_same_priority(&self, item: usize) -> Option<usize> {
            self.next[item]
        }

        fn set_next_with_same_priority(&mut self, item: usize, next: Option<usize>) {
            self.next[item] = next;
        }
    }

    fn drain(queue: &mut BucketQueue, arena: &mut Arena) -> Vec<u32> {
        let mut out = Vec::new();
        while let Some(item) = queue.dequeue(arena) {
            out.push(arena.priorities[item]);
        }
        out
    }

    #[test]
    fn test_dequeue_in_priority_order() {
        let mut arena = Arena::new(&[5, 3, 9, 3, 0, 7]);
        let mut queue = BucketQueue::with_bucket_count(16);
        for item in 0..6 {
            queue.enqueue(&mut arena, item);
        }
        assert_eq!(queue.len(), 6);
        assert_eq!(drain(&mut queue, &mut arena), vec![0, 3, 3, 5, 7, 9]);
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue(&mut arena), None);
    }

    #[test]
    fn test_change_moves_item_forward() {
        let mut arena = Arena::new(&[4, 4, 4, 8]);
        let mut queue = BucketQueue::with_bucket_count(16);
        for item in 0..4 {
            queue.enqueue(&mut arena, item);
        }

        // item 1 sits in the middle of its bucket's list
        arena.priorities[1] = 2;
        queue.change(&mut arena, 1, 4);
        arena.priorities[3] = 3;
        queue.change(&mut arena, 3, 8);

        assert_eq!(queue.len(), 4);
        assert_eq!(queue.dequeue(&mut arena), Some(1));
        assert_eq!(queue.dequeue(&mut arena), Some(3));
        assert_eq!(drain(&mut queue, &mut arena), vec![4, 4]);
    }

    #[test]
    fn test_wraps_around_bucket_ring() {
        let mut arena = Arena::new(&[6, 7, 9, 11]);
        let mut queue = BucketQueue::with_bucket_count(8);
        queue.enqueue(&mut arena, 0);
        queue.enqueue(&mut arena, 1);
        assert_eq!(queue.dequeue(&mut arena), Some(0));
        // 9 and 11 share buckets with 1 and 3
        queue.enqueue(&mut arena, 2);
        queue.enqueue(&mut arena, 3);
        assert_eq!(queue.bucket_count(), 8);
        assert_eq!(drain(&mut queue, &mut arena), vec![7, 9, 11]);
    }

    #[test]
    fn test_grows_when_span_exceeds_buckets() {
        let mut arena = Arena::new(&[1, 2, 40, 100, 3]);
        let mut queue = BucketQueue::with_bucket_count(4);
        for item in 0..5 {
            queue.enqueue(&mut arena, item);
        }
        assert!(queue.bucket_count() >= 100);
        assert!(queue.bucket_count().is_power_of_two());
        assert_eq!(drain(&mut queue, &mut arena), vec![1, 2, 3, 40, 100]);
    }

    #[test]
    fn test_enqueue_below_minimum() {
        let mut arena = Arena::new(&[10, 12, 2]);
        let mut queue = BucketQueue::with_bucket_count(16);
        queue.enqueue(&mut arena, 0);
        queue.enqueue(&mut arena, 1);
        queue.enqueue(&mut arena, 2);
        assert_eq!(drain(&mut queue, &mut arena), vec![2, 10, 12]);
    }

    #[test]
    fn test_clear() {
        let mut arena = Arena::new(&[1, 2]);
        let mut queue = BucketQueue::new();
        queue.enqueue(&mut arena, 0);
        queue.enqueue(&mut arena, 1);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue(&mut arena), None);

        queue.enqueue(&mut arena, 1);
        assert_eq!(queue.dequeue(&mut arena), Some(1));
    }

    #[test]
    fn test_far_priorities_overflow() {
        let far = 1 << 22;
        let mut arena = Arena::new(&[0, far, 5, far + 1, 1 << 30, 70_000]);
        let mut queue = BucketQueue::new();
        for item in 0..6 {
            queue.enqueue(&mut arena, item);
        }
        assert_eq!(queue.len(), 6);
        assert!(queue.bucket_count() <= BucketQueue::MAX_BUCKET_COUNT);
        assert_eq!(
            drain(&mut queue, &mut arena),
            vec![0, 5, 70_000, far, far + 1, 1 << 30]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_change_overflowed_item() {
        let mut arena = Arena::new(&[3, 1 << 24, 9]);
        let mut queue = BucketQueue::new();
        for item in 0..3 {
            queue.enqueue(&mut arena, item);
        }
        arena.priorities[1] = 4;
        queue.change(&mut arena, 1, 1 << 24);
        assert_eq!(queue.len(), 3);
        assert_eq!(drain(&mut queue, &mut arena), vec![3, 4, 9]);
    }

    #[test]
    fn test_lower_priority_evicts_at_the_cap() {
        let max = BucketQueue::MAX_BUCKET_COUNT as u32;
        let mut arena = Arena::new(&[max, 2 * max - 1, 10]);
        let mut queue = BucketQueue::new();
        queue.enqueue(&mut arena, 0);
        queue.enqueue(&mut arena, 1);
        assert_eq!(queue.bucket_count(), BucketQueue::MAX_BUCKET_COUNT);
        // the window now starts at 10, so 2 * max - 1 no longer fits
        queue.enqueue(&mut arena, 2);
        assert_eq!(queue.bucket_count(), BucketQueue::MAX_BUCKET_COUNT);
        assert_eq!(drain(&mut queue, &mut arena), vec![10, max, 2 * max - 1]);
    }

    #[test]
    fn test_clear_releases_grown_buckets() {
        let mut arena = Arena::new(&[0, 1000]);
        let mut queue = BucketQueue::new();
        queue.enqueue(&mut arena, 0);
        queue.enqueue(&mut arena, 1);
        assert_eq!(queue.bucket_count(), 1024);
        queue.clear();
        assert_eq!(queue.bucket_count(), BucketQueue::DEFAULT_BUCKET_COUNT);

        queue.enqueue(&mut arena, 1);
        queue.enqueue(&mut arena, 0);
        assert_eq!(drain(&mut queue, &mut arena), vec![0, 1000]);
    }
}
