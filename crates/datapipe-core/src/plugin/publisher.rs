use crate::errors::ExError;
use crate::plugin::transport::DataTransport;
use crate::plugin::{Initialize, PluginContext};

/// Source of data points
pub trait Publisher {
    /// Read from the source and send everything through `transport`
    ///
    /// # Errors
    ///
    /// Source failures and transport failures are both returned as-is.
    fn publish(
        &mut self,
        ctx: &PluginContext,
        transport: &mut dyn DataTransport,
    ) -> Result<(), ExError>;
}

/// A publisher that also needs [`Initialize::init`] before publishing
pub trait InitializablePublisher: Publisher + Initialize {}

impl<T: Publisher + Initialize> InitializablePublisher for T {}

/// What a publisher factory hands back
pub enum PublisherHandle {
    Plain(Box<dyn Publisher + Send>),
    Initializable(Box<dyn InitializablePublisher + Send>),
}

/// Builds a fresh publisher per run
pub type PublisherFactory = Box<dyn Fn() -> PublisherHandle + Send + Sync>;

impl PublisherHandle {
    pub fn plain(publisher: impl Publisher + Send + 'static) -> Self {
        PublisherHandle::Plain(Box::new(publisher))
    }

    pub fn initializable(publisher: impl Publisher + Initialize + Send + 'static) -> Self {
        PublisherHandle::Initializable(Box::new(publisher))
    }

    pub fn is_initializable(&self) -> bool {
        matches!(self, PublisherHandle::Initializable(_))
    }

    /// Run setup if the publisher has any; a no-op for `Plain`
    ///
    /// # Errors
    ///
    /// Whatever the publisher's `init` returns.
    pub fn init(&mut self, ctx: &PluginContext) -> Result<(), ExError> {
        match self {
            PublisherHandle::Plain(_) => Ok(()),
            PublisherHandle::Initializable(p) => p.init(ctx),
        }
    }
}

impl Publisher for PublisherHandle {
    fn publish(
        &mut self,
        ctx: &PluginContext,
        transport: &mut dyn DataTransport,
    ) -> Result<(), ExError> {
        match self {
            PublisherHandle::Plain(p) => p.publish(ctx, transport),
            PublisherHandle::Initializable(p) => p.publish(ctx, transport),
        }
    }
}
