use crate::errors::ExError;
use crate::model::DataPoint;
use crate::shaper::{DefaultShaper, Shaper};

/// Delivers published data points to the pipeline
pub trait DataTransport {
    /// Send a batch
    ///
    /// # Errors
    ///
    /// If any data point cannot be delivered the whole batch is rejected.
    fn send(&mut self, data_points: Vec<DataPoint>) -> Result<(), ExError>;
}

/// In-process transport that keeps what it is sent
///
/// Each batch is validated, and data-carrying points without a producer
/// shape are shaped, before anything is kept.
#[derive(Debug, Default)]
pub struct CollectingTransport<S = DefaultShaper> {
    shaper: S,
    sent: Vec<DataPoint>,
    batches: usize,
}

impl CollectingTransport<DefaultShaper> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: Shaper> CollectingTransport<S> {
    pub fn with_shaper(shaper: S) -> Self {
        Self {
            shaper,
            sent: Vec::new(),
            batches: 0,
        }
    }

    pub fn sent(&self) -> &[DataPoint] {
        &self.sent
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn into_data_points(self) -> Vec<DataPoint> {
        self.sent
    }

    fn prepare(&self, mut data_point: DataPoint) -> Result<DataPoint, ExError> {
        data_point
            .validate()
            .map_err(|e| ExError::from(e).with_op("send").with_entity(&data_point.entity))?;

        if data_point.action.carries_data() && !data_point.is_shaped() {
            data_point.shape = self
                .shaper
                .get_shape(&data_point.key_names, &data_point.data)
                .map_err(|e| ExError::from(e).with_op("send").with_entity(&data_point.entity))?;
        }
        Ok(data_point)
    }
}

impl<S: Shaper> DataTransport for CollectingTransport<S> {
    fn send(&mut self, data_points: Vec<DataPoint>) -> Result<(), ExError> {
        let prepared = data_points
            .into_iter()
            .map(|dp| self.prepare(dp))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = prepared.len(), "batch collected");
        self.sent.extend(prepared);
        self.batches += 1;
        Ok(())
    }
}
