//! DynamoDB usage store.
//!
//! Table layout: partition key `sessionId` (S), attributes `count` (N) and
//! `lastUsed` (N, epoch milliseconds).

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::config::{Builder, Region};
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use tracing::debug;

use nw_models::SessionId;

use crate::error::{LedgerError, LedgerResult};
use crate::store::{IncrementOutcome, UsageRecord, UsageStore};

const KEY_ATTR: &str = "sessionId";
const COUNT_ATTR: &str = "count";
const LAST_USED_ATTR: &str = "lastUsed";

/// Configuration for the DynamoDB ledger.
#[derive(Debug, Clone)]
pub struct DynamoConfig {
    /// AWS region
    pub region: String,
    /// Table name
    pub table_name: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Custom endpoint (DynamoDB Local, LocalStack)
    pub endpoint_url: Option<String>,
}

impl DynamoConfig {
    /// Create config from environment variables.
    pub fn from_env() -> LedgerResult<Self> {
        Ok(Self {
            region: required_env("AWS_REGION")?,
            table_name: required_env("DYNAMO_TABLE")?,
            access_key_id: required_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required_env("AWS_SECRET_ACCESS_KEY")?,
            endpoint_url: std::env::var("DYNAMO_ENDPOINT_URL").ok().filter(|s| !s.is_empty()),
        })
    }
}

fn required_env(name: &str) -> LedgerResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| LedgerError::config_error(format!("{} not set", name)))
}

/// Usage store backed by a DynamoDB table.
#[derive(Clone)]
pub struct DynamoUsageStore {
    client: Client,
    table: String,
}

impl DynamoUsageStore {
    /// Create a new store from configuration.
    pub fn new(config: &DynamoConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "neverwrite",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            table: config.table_name.clone(),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> LedgerResult<Self> {
        Ok(Self::new(&DynamoConfig::from_env()?))
    }

    fn key(session: &SessionId) -> AttributeValue {
        AttributeValue::S(session.as_str().to_string())
    }
}

fn read_number(
    attributes: Option<&HashMap<String, AttributeValue>>,
    name: &str,
) -> LedgerResult<Option<i64>> {
    let Some(value) = attributes.and_then(|a| a.get(name)) else {
        return Ok(None);
    };
    let raw = value
        .as_n()
        .map_err(|_| LedgerError::malformed(format!("{} is not a number", name)))?;
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| LedgerError::malformed(format!("{} = {:?}", name, raw)))
}

fn read_count(attributes: Option<&HashMap<String, AttributeValue>>) -> LedgerResult<u32> {
    let count = read_number(attributes, COUNT_ATTR)?.unwrap_or(0);
    u32::try_from(count).map_err(|_| LedgerError::malformed(format!("count = {}", count)))
}

#[async_trait]
impl UsageStore for DynamoUsageStore {
    async fn increment_below(
        &self,
        session: &SessionId,
        ceiling: u32,
        now_ms: i64,
    ) -> LedgerResult<IncrementOutcome> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .key(KEY_ATTR, Self::key(session))
            .update_expression("ADD #count :one SET #last_used = :now")
            .condition_expression("attribute_not_exists(#count) OR #count < :ceiling")
            .expression_attribute_names("#count", COUNT_ATTR)
            .expression_attribute_names("#last_used", LAST_USED_ATTR)
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .expression_attribute_values(":ceiling", AttributeValue::N(ceiling.to_string()))
            .expression_attribute_values(":now", AttributeValue::N(now_ms.to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await;

        match result {
            Ok(output) => {
                let count = read_count(output.attributes())?;
                debug!(session_id = %session, count, "Usage counter incremented");
                Ok(IncrementOutcome::Accepted { count })
            }
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Ok(IncrementOutcome::Exhausted)
            }
            Err(e) => Err(LedgerError::Dynamo(e.to_string())),
        }
    }

    async fn get(&self, session: &SessionId) -> LedgerResult<UsageRecord> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(KEY_ATTR, Self::key(session))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| LedgerError::Dynamo(e.to_string()))?;

        let item = output.item();
        Ok(UsageRecord {
            count: read_count(item)?,
            last_used_ms: read_number(item, LAST_USED_ATTR)?,
        })
    }

    async fn check_connectivity(&self) -> LedgerResult<()> {
        self.client
            .describe_table()
            .table_name(&self.table)
            .send()
            .await
            .map_err(|e| LedgerError::Dynamo(format!("DynamoDB connectivity check failed: {}", e)))?;
        Ok(())
    }
}
