use crate::diff::ShapeInfo;
use crate::errors::ExError;
use crate::model::DataPoint;
use crate::plugin::{Initialize, PluginContext};

/// Downstream sink for data points
pub trait Subscriber {
    /// Handle one data point
    ///
    /// `info` describes how the data point's shape relates to the last one
    /// this subscriber saw for the entity; a target that keeps a schema uses
    /// it to add columns or rebuild keys before writing.
    ///
    /// # Errors
    ///
    /// Any error aborts the ingest run.
    fn receive(
        &mut self,
        ctx: &PluginContext,
        info: &ShapeInfo,
        data_point: &DataPoint,
    ) -> Result<(), ExError>;

    /// Release resources once the run is over
    fn dispose(&mut self) {}
}

/// A subscriber that also needs [`Initialize::init`] before receiving
pub trait InitializableSubscriber: Subscriber + Initialize {}

impl<T: Subscriber + Initialize> InitializableSubscriber for T {}

pub enum SubscriberHandle {
    Plain(Box<dyn Subscriber + Send>),
    Initializable(Box<dyn InitializableSubscriber + Send>),
}

pub type SubscriberFactory = Box<dyn Fn() -> SubscriberHandle + Send + Sync>;

impl SubscriberHandle {
    pub fn plain(subscriber: impl Subscriber + Send + 'static) -> Self {
        SubscriberHandle::Plain(Box::new(subscriber))
    }

    pub fn initializable(subscriber: impl Subscriber + Initialize + Send + 'static) -> Self {
        SubscriberHandle::Initializable(Box::new(subscriber))
    }

    pub fn is_initializable(&self) -> bool {
        matches!(self, SubscriberHandle::Initializable(_))
    }

    /// # Errors
    ///
    /// Whatever the subscriber's `init` returns.
    pub fn init(&mut self, ctx: &PluginContext) -> Result<(), ExError> {
        match self {
            SubscriberHandle::Plain(_) => Ok(()),
            SubscriberHandle::Initializable(s) => s.init(ctx),
        }
    }
}

impl Subscriber for SubscriberHandle {
    fn receive(
        &mut self,
        ctx: &PluginContext,
        info: &ShapeInfo,
        data_point: &DataPoint,
    ) -> Result<(), ExError> {
        match self {
            SubscriberHandle::Plain(s) => s.receive(ctx, info, data_point),
            SubscriberHandle::Initializable(s) => s.receive(ctx, info, data_point),
        }
    }

    fn dispose(&mut self) {
        match self {
            SubscriberHandle::Plain(s) => s.dispose(),
            SubscriberHandle::Initializable(s) => s.dispose(),
        }
    }
}
