use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};

use fluvio_future::task::spawn;
use fluvio_future::timer::sleep;
use cfs_storage::PartitionStorage;
use cfs_types::event::SharedStopSignal;

use crate::config::SchedulerConfig;
use super::{DataPartition, Partition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Status,
    Metrics,
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Status => write!(f, "status"),
            Self::Metrics => write!(f, "metrics"),
        }
    }
}

/// Background loop of a partition.
/// Each partition runs a status loop and a metrics loop until its stop signal fires.
pub(crate) struct PartitionScheduler<S> {
    tick: Tick,
    interval: Duration,
    partition: Arc<DataPartition<S>>,
}

impl<S> PartitionScheduler<S>
where
    S: PartitionStorage,
{
    pub(crate) fn start_all(partition: &Arc<DataPartition<S>>, config: &SchedulerConfig) {
        let stop = partition.stop_signal();
        Self::start(
            Tick::Status,
            config.status_interval,
            partition.clone(),
            stop.clone(),
        );
        Self::start(Tick::Metrics, config.metrics_interval, partition.clone(), stop);
    }

    fn start(
        tick: Tick,
        interval: Duration,
        partition: Arc<DataPartition<S>>,
        stop: SharedStopSignal,
    ) {
        let scheduler = Self {
            tick,
            interval,
            partition,
        };

        spawn(async move {
            scheduler.dispatch_loop(stop).await;
        });
    }

    #[instrument(skip(self, stop), fields(partition = self.partition.id(), tick = %self.tick))]
    async fn dispatch_loop(&self, stop: SharedStopSignal) {
        use tokio::select;

        loop {
            if stop.is_stopped() {
                info!("partition stopped");
                break;
            }

            select! {
                _ = stop.stopped() => {
                    debug!("stop signal received");
                    break;
                },
                _ = sleep(self.interval) => {
                    match self.tick {
                        Tick::Status => self.partition.status_update().await,
                        Tick::Metrics => self.partition.metrics().recompute_latency(),
                    }
                }
            }
        }

        debug!("scheduler end");
    }
}
