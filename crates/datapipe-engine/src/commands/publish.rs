//! Publisher runs and end-to-end pipeline runs over the plugin registry.

#![allow(clippy::result_large_err)]

use datapipe_core::errors::ExError;
use datapipe_core::model::DataPoint;
use datapipe_core::ops::ShapeStore;
use datapipe_core::plugin::{CollectingTransport, PluginContext, Publisher, Subscriber};
use datapipe_core::registry::PluginRegistry;
use datapipe_core::{log_op_end, log_op_error, log_op_start};
use datapipe_store::errors::Result;

use crate::commands::ingest::{IngestStats, Ingestor, QuarantinePolicy};

/// Build the named publisher, initialize it if needed, and collect what it sends
///
/// # Errors
///
/// `FactoryNotFound`, the publisher's own `init`/`publish` failures, or a
/// batch rejected by the transport.
pub fn publish(registry: &PluginRegistry, name: &str, ctx: &PluginContext) -> Result<Vec<DataPoint>> {
    log_op_start!("publish", publisher = name);
    let start = std::time::Instant::now();

    let result = publish_impl(registry, name, ctx).map_err(|e| {
        log_op_error!(
            "publish",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "publish",
        duration_ms = start.elapsed().as_millis() as u64,
        count = result.len() as u64
    );
    Ok(result)
}

fn publish_impl(
    registry: &PluginRegistry,
    name: &str,
    ctx: &PluginContext,
) -> Result<Vec<DataPoint>> {
    let factory = registry.publishers.get(name).map_err(ExError::from)?;
    let mut publisher = factory();
    publisher.init(ctx)?;

    let mut transport = CollectingTransport::new();
    publisher.publish(ctx, &mut transport)?;
    Ok(transport.into_data_points())
}

/// Publish with one registered publisher and ingest into one registered subscriber
///
/// The subscriber is disposed whether or not the ingest succeeded.
///
/// # Errors
///
/// As [`publish`] and [`Ingestor::ingest`], plus the subscriber's `init`.
pub fn run_pipeline<S: ShapeStore>(
    registry: &PluginRegistry,
    publisher: &str,
    subscriber: &str,
    ctx: &PluginContext,
    store: &mut S,
    policy: QuarantinePolicy,
) -> Result<IngestStats> {
    let data_points = publish(registry, publisher, ctx)?;

    let factory = registry.subscribers.get(subscriber).map_err(ExError::from)?;
    let mut handle = factory();
    handle.init(ctx)?;

    let result = Ingestor::new(ctx, store, &mut handle)
        .with_policy(policy)
        .ingest(data_points);

    handle.dispose();
    result
}
