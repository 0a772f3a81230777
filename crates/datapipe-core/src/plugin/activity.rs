use crate::errors::ExError;
use crate::model::DataPoint;
use crate::plugin::{Initialize, PluginContext};

/// Receives the data points an activity emits
pub trait OutputCollector {
    /// # Errors
    ///
    /// Collectors that forward elsewhere may fail; the activity propagates it.
    fn emit(&mut self, data_point: DataPoint) -> Result<(), ExError>;
}

impl OutputCollector for Vec<DataPoint> {
    fn emit(&mut self, data_point: DataPoint) -> Result<(), ExError> {
        self.push(data_point);
        Ok(())
    }
}

/// In-flight transformation between publisher and subscriber
///
/// An activity may emit zero, one or many data points per input; emitting
/// nothing drops the input.
pub trait Activity {
    /// # Errors
    ///
    /// An error rejects the input data point.
    fn execute(
        &mut self,
        ctx: &PluginContext,
        output: &mut dyn OutputCollector,
        data_point: DataPoint,
    ) -> Result<(), ExError>;
}

pub trait InitializableActivity: Activity + Initialize {}

impl<T: Activity + Initialize> InitializableActivity for T {}

pub enum ActivityHandle {
    Plain(Box<dyn Activity + Send>),
    Initializable(Box<dyn InitializableActivity + Send>),
}

pub type ActivityFactory = Box<dyn Fn() -> ActivityHandle + Send + Sync>;

impl ActivityHandle {
    pub fn plain(activity: impl Activity + Send + 'static) -> Self {
        ActivityHandle::Plain(Box::new(activity))
    }

    pub fn initializable(activity: impl Activity + Initialize + Send + 'static) -> Self {
        ActivityHandle::Initializable(Box::new(activity))
    }

    pub fn is_initializable(&self) -> bool {
        matches!(self, ActivityHandle::Initializable(_))
    }

    /// # Errors
    ///
    /// Whatever the activity's `init` returns.
    pub fn init(&mut self, ctx: &PluginContext) -> Result<(), ExError> {
        match self {
            ActivityHandle::Plain(_) => Ok(()),
            ActivityHandle::Initializable(a) => a.init(ctx),
        }
    }
}

impl Activity for ActivityHandle {
    fn execute(
        &mut self,
        ctx: &PluginContext,
        output: &mut dyn OutputCollector,
        data_point: DataPoint,
    ) -> Result<(), ExError> {
        match self {
            ActivityHandle::Plain(a) => a.execute(ctx, output, data_point),
            ActivityHandle::Initializable(a) => a.execute(ctx, output, data_point),
        }
    }
}
