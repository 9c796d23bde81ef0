use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::solver::best_solution_event::BestSolutionEvent;

/// Downstream consumer of forwarded best solutions.
///
/// Called from the run controller task, in order, so implementations must not block.
pub trait RoutePublisher: Send + Sync {
    fn publish(&self, event: &BestSolutionEvent);
}

/// Fans events out to any number of async subscribers.
///
/// Every subscriber owns an unbounded queue, so a slow subscriber receives
/// every event in order instead of skipping ahead. Subscribers whose receiver
/// was dropped are pruned on the next publish.
#[derive(Debug, Clone, Default)]
pub struct ChannelPublisher {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<BestSolutionEvent>>>>,
}

impl ChannelPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<BestSolutionEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().push(sender);
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl RoutePublisher for ChannelPublisher {
    fn publish(&self, event: &BestSolutionEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());

        if subscribers.is_empty() {
            debug!(generation = event.generation, "No subscriber for best solution");
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPublisher;

impl RoutePublisher for LoggingPublisher {
    fn publish(&self, event: &BestSolutionEvent) {
        info!(
            generation = event.generation,
            score = %event.score,
            routes = event.route_plan.non_empty_routes_iter().count(),
            unassigned = event.route_plan.unassigned.len(),
            "New best solution"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::{problem::route_plan::RoutePlan, solver::score::Score};

    use super::*;

    fn event(soft: f64) -> BestSolutionEvent {
        BestSolutionEvent::new(1, Score::soft(soft), RoutePlan::default())
    }

    #[tokio::test]
    async fn test_channel_publisher_delivers_in_order() {
        let publisher = ChannelPublisher::new();
        let mut receiver = publisher.subscribe();

        publisher.publish(&event(20.0));
        publisher.publish(&event(10.0));

        assert_eq!(receiver.recv().await.unwrap().score, Score::soft(20.0));
        assert_eq!(receiver.recv().await.unwrap().score, Score::soft(10.0));
    }

    #[tokio::test]
    async fn test_slow_subscriber_misses_nothing() {
        let publisher = ChannelPublisher::new();
        let mut slow = publisher.subscribe();
        let mut fast = publisher.subscribe();

        for soft in (0..2_000).rev() {
            publisher.publish(&event(soft as f64));
            assert_eq!(fast.recv().await.unwrap().score, Score::soft(soft as f64));
        }

        for soft in (0..2_000).rev() {
            assert_eq!(slow.try_recv().unwrap().score, Score::soft(soft as f64));
        }
        assert!(slow.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let publisher = ChannelPublisher::new();
        let kept = publisher.subscribe();
        drop(publisher.subscribe());
        assert_eq!(publisher.subscriber_count(), 2);

        publisher.publish(&event(1.0));

        assert_eq!(publisher.subscriber_count(), 1);
        drop(kept);
        publisher.publish(&event(0.5));
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_without_subscriber_is_fine() {
        ChannelPublisher::default().publish(&event(0.0));
        LoggingPublisher.publish(&BestSolutionEvent::new(1, Score::ZERO, RoutePlan::default()));
    }
}
