use serde::Serialize;
use tracing::info;

/// Progress notifications emitted by the optimizer. Advisory only: nothing in
/// the search depends on how they are handled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    InitialEstimate { value: f64 },
    Improved { iteration: usize, value: f64 },
    Final { value: f64 },
}

pub trait ProgressObserver {
    fn on_event(&mut self, event: &ProgressEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_event(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::InitialEstimate { value } => {
                info!(makespan = value, "Initial makespan estimate: {:.2}", value)
            }
            ProgressEvent::Improved { iteration, value } => {
                info!(iteration, makespan = value, "Iteration {}: new makespan estimate {:.2}", iteration, value)
            }
            ProgressEvent::Final { value } => {
                info!(makespan = value, "AOA finished, best makespan estimate: {:.2}", value)
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_event(&mut self, _event: &ProgressEvent) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<ProgressEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn improvements(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.events.iter().filter_map(|event| match event {
            ProgressEvent::Improved { iteration, value } => Some((*iteration, *value)),
            _ => None,
        })
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_event(&mut self, event: &ProgressEvent) {
        self.events.push(event.clone());
    }
}

/// Forwards each event to every wrapped observer.
pub struct Fanout<'a> {
    observers: Vec<&'a mut dyn ProgressObserver>,
}

impl<'a> Fanout<'a> {
    pub fn new(observers: Vec<&'a mut dyn ProgressObserver>) -> Self {
        Self { observers }
    }
}

impl ProgressObserver for Fanout<'_> {
    fn on_event(&mut self, event: &ProgressEvent) {
        for observer in self.observers.iter_mut() {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_observer_keeps_order() {
        let mut recorder = RecordingObserver::new();
        recorder.on_event(&ProgressEvent::InitialEstimate { value: 4.0 });
        recorder.on_event(&ProgressEvent::Improved { iteration: 3, value: 3.0 });
        recorder.on_event(&ProgressEvent::Final { value: 3.0 });

        assert_eq!(recorder.events.len(), 3);
        assert_eq!(recorder.improvements().collect::<Vec<_>>(), vec![(3, 3.0)]);
    }

    #[test]
    fn fanout_reaches_every_observer() {
        let mut first = RecordingObserver::new();
        let mut second = RecordingObserver::new();
        let mut tracer = TracingObserver;
        {
            let mut fanout = Fanout::new(vec![
                &mut first as &mut dyn ProgressObserver,
                &mut second as &mut dyn ProgressObserver,
                &mut tracer as &mut dyn ProgressObserver,
            ]);
            fanout.on_event(&ProgressEvent::Final { value: 1.0 });
        }
        assert_eq!(first.events, second.events);
        assert_eq!(first.events, vec![ProgressEvent::Final { value: 1.0 }]);
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_string(&ProgressEvent::Improved { iteration: 2, value: 1.5 }).unwrap();
        assert_eq!(json, r#"{"event":"improved","iteration":2,"value":1.5}"#);
    }
}
