// BroadcastChannelManager: change notifications for UI consumers
// Single Responsibility: broadcast channel lifecycle and subscription

use serde::Serialize;
use tokio::sync::broadcast;

use crate::analysis::Prediction;
use crate::records::MeasurementType;
use crate::series::{AxisSelection, SeriesKey};

/// Something a UI bound to the pipeline may want to redraw for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A record was appended to the log and indexed
    RecordStored {
        row: usize,
        row_label: String,
        measurement_type: MeasurementType,
        series: SeriesKey,
    },
    /// The baseline was set or cleared
    CalibrationChanged {
        calibrated: bool,
        session_calibration_count: u32,
        lifetime_calibration_count: u32,
    },
    /// The probability view changed; None means the bars read zero
    PredictionUpdated { prediction: Option<Prediction> },
    /// A capture used the dummy vector instead of a device reading
    DummyDataUsed { reason: String },
    /// Normalized axes hit nulls and the view switched to SNV
    AxesFellBack { axes: AxisSelection },
    /// A dataset replaced the record log
    DatasetLoaded {
        records: usize,
        calibration_records: usize,
    },
}

/// Owns the pipeline event channel
///
/// # Notes
/// - Buffer size: 64 events; slow subscribers lag and lose the oldest
/// - Publishing with no subscribers is not an error
pub struct BroadcastChannelManager {
    events: broadcast::Sender<PipelineEvent>,
}

impl BroadcastChannelManager {
    const CAPACITY: usize = 64;

    pub fn new() -> Self {
        let (events, _) = broadcast::channel(Self::CAPACITY);
        Self { events }
    }

    /// Independent receiver for every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Sender handle for components that publish on their own
    pub fn sender(&self) -> broadcast::Sender<PipelineEvent> {
        self.events.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Publish an event, returning how many subscribers received it
    pub fn publish(&self, event: PipelineEvent) -> usize {
        match self.events.send(event) {
            Ok(count) => count,
            Err(broadcast::error::SendError(event)) => {
                log::debug!("[Broadcast] No subscribers for {:?}", event);
                0
            }
        }
    }
}

impl Default for BroadcastChannelManager {
    fn default() -> Self {
        Self::new()
    }
}
