//! What the orchestrator hands out after every run.

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::devices::DeviceId;
use crate::ea::StopReason;
use crate::scheduling::trigger::TriggerReason;
use crate::sim::{Objectives, Schedule};

/// Summary of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Trigger time; every published schedule is anchored here.
    pub reference_time: i64,
    pub trigger: TriggerReason,
    pub generations: usize,
    pub evaluations: usize,
    /// Objectives of the published solution.
    pub objectives: Objectives,
    pub fitness: f64,
    /// Devices whose schedule was published empty.
    pub failed_devices: Vec<DeviceId>,
    /// None when nothing was controllable and the search was skipped.
    pub stop_reason: Option<StopReason>,
    pub runtime_ms: u64,
}

/// Output of the orchestrator, in publication order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEvent {
    Schedule(Schedule),
    Summary(RunSummary),
}

/// Receiver of schedules and run summaries.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: SchedulerEvent);
}

/// Sink forwarding into a crossbeam channel.
///
/// Schedules are never dropped: on a full bounded channel publishing waits
/// for the receiver. Summaries are informational and are dropped with a
/// warning instead.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<SchedulerEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<SchedulerEvent>) -> Self {
        Self { sender }
    }

    /// Sink plus the receiving end of a new unbounded channel.
    pub fn unbounded() -> (Self, Receiver<SchedulerEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::Schedule(_) => {
                if self.sender.send(event).is_err() {
                    tracing::warn!("schedule not delivered, receiver disconnected");
                }
            }
            SchedulerEvent::Summary(_) => {
                if let Err(e) = self.sender.try_send(event) {
                    tracing::warn!(error = %e, "run summary dropped");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards() {
        let (sink, rx) = ChannelSink::unbounded();
        sink.publish(SchedulerEvent::Schedule(Schedule::empty(DeviceId::new("pv"), "PV")));
        assert!(matches!(rx.try_recv(), Ok(SchedulerEvent::Schedule(s)) if s.device_id.as_str() == "pv"));
    }

    fn summary(reference_time: i64) -> SchedulerEvent {
        SchedulerEvent::Summary(RunSummary {
            reference_time,
            trigger: TriggerReason::Manual,
            generations: 0,
            evaluations: 0,
            objectives: Objectives::default(),
            fitness: 0.0,
            failed_devices: Vec::new(),
            stop_reason: None,
            runtime_ms: 0,
        })
    }

    #[test]
    fn full_channel_drops_summaries_without_blocking() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let sink = ChannelSink::new(tx);
        sink.publish(summary(1));
        sink.publish(summary(2));
        assert_eq!(rx.len(), 1);
        assert!(matches!(rx.try_recv(), Ok(SchedulerEvent::Summary(s)) if s.reference_time == 1));
    }

    #[test]
    fn full_channel_waits_to_deliver_schedules() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let sink = ChannelSink::new(tx);
        let received = std::thread::scope(|scope| {
            let publisher = scope.spawn(|| {
                for id in ["a", "b", "c"] {
                    sink.publish(SchedulerEvent::Schedule(Schedule::empty(DeviceId::new(id), "PV")));
                }
            });
            let received: Vec<String> = (0..3)
                .map(|_| match rx.recv().unwrap() {
                    SchedulerEvent::Schedule(s) => s.device_id.as_str().to_string(),
                    SchedulerEvent::Summary(_) => panic!("unexpected summary"),
                })
                .collect();
            publisher.join().unwrap();
            received
        });
        assert_eq!(received, vec!["a", "b", "c"]);
    }

    #[test]
    fn disconnected_receiver_does_not_block_schedules() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let sink = ChannelSink::new(tx);
        sink.publish(SchedulerEvent::Schedule(Schedule::empty(DeviceId::new("a"), "PV")));
    }
}
