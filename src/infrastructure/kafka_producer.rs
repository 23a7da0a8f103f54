use std::time::Duration;

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

use super::config::KafkaConfig;
use crate::domain::entity::event::DomainEvent;

/// EventPublisher はドメインイベント配信のポート。
/// at-least-once 配信。発行失敗は先行するミューテーションをロールバックしない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// ブローカーの ack を待って発行する。失敗時は固定バックオフで再試行する。
    async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()>;
    /// ack を待たずに一括投入する。配信結果はバックグラウンドのドレインが回収する。
    async fn batch_publish(&self, events: &[DomainEvent]) -> anyhow::Result<()>;
    async fn close(&self) -> anyhow::Result<()>;
}

/// イベントのトピックを解決する。`<topic_prefix><snake_case_suffix>`。
pub fn resolve_topic(prefix: &str, event: &DomainEvent) -> String {
    format!("{}{}", prefix, event.topic_suffix())
}

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(100);
const SEND_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_QUEUE_SIZE: usize = 1024;

/// KafkaEventPublisher は rdkafka FutureProducer によるイベント発行実装。
/// 配信未確認の DeliveryFuture は有界キューを通じて常駐ドレインタスクが
/// 回収し、shutdown シグナルで停止する。
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    topic_prefix: String,
    drain_tx: mpsc::Sender<rdkafka::producer::DeliveryFuture>,
    shutdown_tx: watch::Sender<bool>,
}

impl KafkaEventPublisher {
    pub fn new(config: &KafkaConfig) -> anyhow::Result<Self> {
        use rdkafka::config::ClientConfig;

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.broker)
            .set("acks", "all")
            .set("message.timeout.ms", "5000")
            .set("retry.backoff.ms", "100")
            .create()
            .map_err(|e| anyhow::anyhow!("failed to create kafka producer: {}", e))?;

        let (drain_tx, drain_rx) = mpsc::channel(DRAIN_QUEUE_SIZE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(drain_deliveries(drain_rx, shutdown_rx));

        Ok(Self {
            producer,
            topic_prefix: config.topic_prefix.clone(),
            drain_tx,
            shutdown_tx,
        })
    }
}

/// 配信結果のドレイン。成功はデバッグログ、失敗はエラーログに残す。
/// プロセス全体の shutdown シグナルで停止する。リクエストスコープの
/// コンテキストは保持しない。
async fn drain_deliveries(
    mut rx: mpsc::Receiver<rdkafka::producer::DeliveryFuture>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            delivery = rx.recv() => {
                match delivery {
                    Some(fut) => match fut.await {
                        Ok(Ok((partition, offset))) => {
                            debug!(partition, offset, "event delivered");
                        }
                        Ok(Err((e, _msg))) => {
                            error!(error = %e, "event delivery failed");
                        }
                        Err(_) => {
                            warn!("event delivery future canceled");
                        }
                    },
                    None => break,
                }
            }
            _ = shutdown.changed() => {
                debug!("event drain task shutting down");
                break;
            }
        }
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(event)?;
        let topic = resolve_topic(&self.topic_prefix, event);
        let key = event.user_id().to_string();

        let mut last_err = None;
        for attempt in 1..=RETRY_ATTEMPTS {
            let record = FutureRecord::to(&topic).key(&key).payload(&payload);
            match self.producer.send(record, SEND_TIMEOUT).await {
                Ok(_) => return Ok(()),
                Err((e, _)) => {
                    warn!(topic = %topic, attempt, error = %e, "event publish attempt failed");
                    last_err = Some(e);
                    if attempt < RETRY_ATTEMPTS {
                        tokio::time::sleep(RETRY_BACKOFF).await;
                    }
                }
            }
        }

        Err(anyhow::anyhow!(
            "failed to publish event to {} after {} attempts: {}",
            topic,
            RETRY_ATTEMPTS,
            last_err.expect("retry loop records an error before exiting")
        ))
    }

    async fn batch_publish(&self, events: &[DomainEvent]) -> anyhow::Result<()> {
        for event in events {
            let payload = match serde_json::to_vec(event) {
                Ok(p) => p,
                Err(e) => {
                    error!(error = %e, "failed to marshal event in batch");
                    continue;
                }
            };
            let topic = resolve_topic(&self.topic_prefix, event);
            let key = event.user_id().to_string();
            let record = FutureRecord::to(&topic).key(&key).payload(&payload);

            match self.producer.send_result(record) {
                Ok(delivery) => {
                    // 有界キューが満杯なら配信結果の観測だけ諦める
                    if self.drain_tx.try_send(delivery).is_err() {
                        warn!(topic = %topic, "delivery drain queue full, result unobserved");
                    }
                }
                Err((e, _)) => {
                    error!(topic = %topic, error = %e, "failed to enqueue event");
                }
            }
        }
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.producer
            .flush(SEND_TIMEOUT)
            .map_err(|e| anyhow::anyhow!("failed to flush kafka producer: {}", e))?;
        Ok(())
    }
}

/// NoopEventPublisher は Kafka 未設定時のフォールバック。
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()> {
        debug!(topic_suffix = event.topic_suffix(), "event publisher not configured, dropping event");
        Ok(())
    }

    async fn batch_publish(&self, events: &[DomainEvent]) -> anyhow::Result<()> {
        debug!(count = events.len(), "event publisher not configured, dropping batch");
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
