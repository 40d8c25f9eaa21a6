//! InfluxDB sink.
//!
//! Writes through the `influxdb` crate's v1-compatible `/write` endpoint,
//! authenticated with an InfluxDB 2 API token. The bucket doubles as the
//! database name.

use anyhow::{Context, Result};
use async_trait::async_trait;
use influxdb::{Client, Timestamp, WriteQuery};
use tracing::debug;

use super::{DataPoint, PointSink};
use crate::config::InfluxConfig;

pub struct InfluxWriter {
    client: Client,
}

impl InfluxWriter {
    pub fn new(config: &InfluxConfig, token: String) -> Self {
        let client = Client::new(config.url.as_str(), config.bucket.as_str()).with_token(token);
        Self { client }
    }
}

/// Convert a point into a write query with millisecond precision.
fn to_query(point: DataPoint) -> Result<WriteQuery> {
    let millis = u128::try_from(point.timestamp.timestamp_millis())
        .with_context(|| format!("Timestamp before the epoch: {}", point.timestamp))?;

    let mut query = WriteQuery::new(Timestamp::Milliseconds(millis), point.measurement);
    for (key, value) in point.tags {
        query = query.add_tag(key, value);
    }
    for (key, value) in point.fields {
        query = query.add_field(key, value);
    }
    Ok(query)
}

#[async_trait]
impl PointSink for InfluxWriter {
    async fn write_points(&self, points: Vec<DataPoint>) -> Result<()> {
        let count = points.len();
        let queries = points.into_iter().map(to_query).collect::<Result<Vec<_>>>()?;

        self.client
            .query(queries)
            .await
            .context("Failed to write points to InfluxDB")?;

        debug!(count, "Points written");
        Ok(())
    }
}
