//! Subscriber ingest loop with boundary logging.
//!
//! For every data point: run the configured activities, validate, resolve the
//! record's shape (producer-declared or inferred), compare it with the shape
//! on record for the entity, persist the canonical shape when it changed, and
//! hand `(ShapeInfo, DataPoint)` to the subscriber.
//!
//! Control actions (start/end of publish, abend, ...) carry no record and go
//! straight to the subscriber with an unchanged shape info.
//!
//! ## Logging Ownership
//!
//! The engine owns lifecycle logging for the ingest operation:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Per-record outcomes (`shape_changed`, `quarantined`) are single events.

#![allow(clippy::result_large_err)]

use datapipe_core::diff::{adopt_key_names, compare_shapes, ShapeInfo};
use datapipe_core::errors::ExError;
use datapipe_core::model::{DataPoint, Shape};
use datapipe_core::ops::ShapeStore;
use datapipe_core::plugin::{Activity, ActivityHandle, PluginContext, Subscriber};
use datapipe_core::shaper::{DefaultShaper, Shaper};
use datapipe_core::types::schema::{EVENT_QUARANTINED, EVENT_SHAPE_CHANGED};
use datapipe_core::{log_op_end, log_op_error, log_op_start};
use datapipe_store::errors::Result;
use serde::Deserialize;

/// What to do with a record that can never be processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuarantinePolicy {
    /// Log, count and keep the record aside; continue with the next one
    #[default]
    Skip,
    /// Stop the run with the record's error
    Abort,
}

/// Counters for one ingest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Data points taken from the source, before activities
    pub received: u64,
    /// Data points handed to the subscriber
    pub delivered: u64,
    /// Deliveries whose shape info reported a change
    pub shape_changes: u64,
    pub quarantined: u64,
}

/// A rejected data point and the reason
#[derive(Debug, Clone)]
pub struct QuarantinedRecord {
    /// `None` when the source could not decode the record at all
    pub data_point: Option<DataPoint>,
    pub error: ExError,
}

/// Single-subscriber ingest loop
///
/// Holds `&mut` on its shape store, so the read-compare-write sequence for an
/// entity cannot interleave with another writer through the same store.
pub struct Ingestor<'a, S> {
    ctx: &'a PluginContext,
    store: &'a mut S,
    subscriber: &'a mut dyn Subscriber,
    shaper: &'a dyn Shaper,
    activities: Vec<ActivityHandle>,
    policy: QuarantinePolicy,
    quarantine: Vec<QuarantinedRecord>,
}

impl<'a, S: ShapeStore> Ingestor<'a, S> {
    pub fn new(
        ctx: &'a PluginContext,
        store: &'a mut S,
        subscriber: &'a mut dyn Subscriber,
    ) -> Self {
        Self {
            ctx,
            store,
            subscriber,
            shaper: &DefaultShaper,
            activities: Vec::new(),
            policy: QuarantinePolicy::default(),
            quarantine: Vec::new(),
        }
    }

    pub fn with_shaper(mut self, shaper: &'a dyn Shaper) -> Self {
        self.shaper = shaper;
        self
    }

    /// Append an activity; activities run in the order they were added
    pub fn with_activity(mut self, activity: ActivityHandle) -> Self {
        self.activities.push(activity);
        self
    }

    pub fn with_policy(mut self, policy: QuarantinePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Records set aside so far
    pub fn quarantine(&self) -> &[QuarantinedRecord] {
        &self.quarantine
    }

    /// Initialize the activities that need it
    ///
    /// # Errors
    ///
    /// The first activity `init` failure.
    pub fn init(&mut self) -> Result<()> {
        for activity in &mut self.activities {
            activity.init(self.ctx)?;
        }
        Ok(())
    }

    /// Run every data point through the pipeline
    ///
    /// # Errors
    ///
    /// Store and subscriber failures abort the run, as do record rejections
    /// under [`QuarantinePolicy::Abort`]. Counters up to the failure are lost
    /// with the error; persisted shapes are not rolled back.
    ///
    /// A changed shape is persisted before the subscriber receives the record.
    /// If `receive` then fails, a re-run of the same input compares against
    /// the already persisted shape and reports no change for that record, so
    /// a subscriber that must act on the change has to do so before failing.
    pub fn ingest<I>(&mut self, data_points: I) -> Result<IngestStats>
    where
        I: IntoIterator<Item = DataPoint>,
    {
        self.ingest_results(data_points.into_iter().map(Ok))
    }

    /// Like [`Ingestor::ingest`], for sources that can fail per item
    ///
    /// A failed item with a record-rejection kind (e.g. an undecodable line)
    /// follows the quarantine policy; any other failure aborts the run.
    ///
    /// # Errors
    ///
    /// As [`Ingestor::ingest`], plus non-rejection source failures.
    pub fn ingest_results<I>(&mut self, items: I) -> Result<IngestStats>
    where
        I: IntoIterator<Item = Result<DataPoint>>,
    {
        log_op_start!(
            "ingest",
            repository = self.ctx.repository.as_str(),
            request_id = self.ctx.request.request_id.as_str()
        );
        let start = std::time::Instant::now();

        let result = self.ingest_impl(items).map_err(|e| {
            log_op_error!(
                "ingest",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "ingest",
            duration_ms = start.elapsed().as_millis() as u64,
            received = result.received,
            delivered = result.delivered,
            shape_changes = result.shape_changes,
            quarantined = result.quarantined
        );

        Ok(result)
    }

    fn ingest_impl<I>(&mut self, items: I) -> Result<IngestStats>
    where
        I: IntoIterator<Item = Result<DataPoint>>,
    {
        let mut stats = IngestStats::default();
        for item in items {
            stats.received += 1;

            let data_point = match item {
                Ok(dp) => dp,
                Err(e) if e.kind().is_record_rejection() => {
                    self.reject(None, e, &mut stats)?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let transformed = if self.activities.is_empty() {
                vec![data_point]
            } else {
                let original = data_point.clone();
                match run_activities(&mut self.activities, self.ctx, data_point) {
                    Ok(out) => out,
                    Err(e) if e.kind().is_record_rejection() => {
                        self.reject(Some(original), e, &mut stats)?;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            };

            for data_point in transformed {
                self.deliver(data_point, &mut stats)?;
            }
        }
        Ok(stats)
    }

    fn deliver(&mut self, mut data_point: DataPoint, stats: &mut IngestStats) -> Result<()> {
        if let Err(e) = data_point.validate() {
            let err = ExError::from(e)
                .with_op("validate")
                .with_entity(&data_point.entity);
            return self.reject(Some(data_point), err, stats);
        }

        let info = if data_point.action.carries_data() {
            let shape = match self.resolve_shape(&data_point) {
                Ok(shape) => shape,
                Err(e) => return self.reject(Some(data_point), e, stats),
            };
            let info = self.compare_and_persist(&data_point.entity, shape.clone())?;
            data_point.shape = shape;
            info
        } else {
            let current = self.store.get_shape(&data_point.entity)?.unwrap_or_default();
            ShapeInfo::unchanged(current)
        };

        if info.has_changes() {
            stats.shape_changes += 1;
        }

        self.subscriber
            .receive(self.ctx, &info, &data_point)
            .map_err(|e| e.with_entity(&data_point.entity))?;
        stats.delivered += 1;
        Ok(())
    }

    fn resolve_shape(&self, data_point: &DataPoint) -> std::result::Result<Shape, ExError> {
        if data_point.is_shaped() {
            return Ok(adopt_key_names(
                data_point.shape.clone(),
                &data_point.key_names,
            ));
        }
        self.shaper
            .get_shape(&data_point.key_names, &data_point.data)
            .map_err(|e| ExError::from(e).with_entity(&data_point.entity))
    }

    fn compare_and_persist(&mut self, entity: &str, shape: Shape) -> Result<ShapeInfo> {
        let prior = self.store.get_shape(entity)?;
        let info = compare_shapes(prior.as_ref(), shape);

        if info.has_changes() {
            self.store.put_shape(entity, &info.shape)?;
            tracing::info!(
                component = module_path!(),
                op = "ingest",
                event = EVENT_SHAPE_CHANGED,
                entity = entity,
                is_new = info.is_new,
                has_key_changes = info.has_key_changes,
                new_property_count = info.new_properties.len() as u64,
                property_hash = info.shape.property_hash,
            );
        }
        Ok(info)
    }

    fn reject(
        &mut self,
        data_point: Option<DataPoint>,
        error: ExError,
        stats: &mut IngestStats,
    ) -> Result<()> {
        if self.policy == QuarantinePolicy::Abort {
            return Err(error);
        }

        tracing::warn!(
            component = module_path!(),
            op = "ingest",
            event = EVENT_QUARANTINED,
            entity = data_point.as_ref().map_or("", |dp| dp.entity.as_str()),
            err.code = error.code(),
            err.message = error.message(),
        );
        stats.quarantined += 1;
        self.quarantine.push(QuarantinedRecord { data_point, error });
        Ok(())
    }
}

/// Feed a data point through each activity in turn
///
/// An activity may fan out or drop; an empty result ends the chain.
fn run_activities(
    activities: &mut [ActivityHandle],
    ctx: &PluginContext,
    data_point: DataPoint,
) -> Result<Vec<DataPoint>> {
    let mut current = vec![data_point];
    for activity in activities {
        if current.is_empty() {
            break;
        }
        let mut next: Vec<DataPoint> = Vec::with_capacity(current.len());
        for dp in current {
            activity.execute(ctx, &mut next, dp)?;
        }
        current = next;
    }
    Ok(current)
}
