use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::classifier::classify;
use super::error::{CheckError, CycleError};
use super::ports::{DeviceNotifier, DeviceStore};
use super::prober::{ProbeTarget, ReachabilityProber};
use super::resolver::AddressResolver;
use super::state::{DeviceState, Reachability};
use crate::db::entities::monitor_device;
use crate::db::models::DeviceUpdate;

/// Encodes a UTC instant as the HHMM integer used by monitor windows.
pub fn time_of_day_utc(now: DateTime<Utc>) -> i32 {
    (now.hour() * 100 + now.minute()) as i32
}

/// What one monitor run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub time_utc: i32,
    pub selected: usize,
    /// Devices whose resolve+probe sequence failed.
    pub excluded: usize,
    pub notified: usize,
    pub deleted: u64,
    pub updated: usize,
    pub reconciliation_failures: usize,
}

/// Runs the select → probe → classify → notify → reconcile sequence.
pub struct MonitorCycle {
    store: Arc<dyn DeviceStore>,
    notifier: Arc<dyn DeviceNotifier>,
    resolver: Arc<dyn AddressResolver>,
    prober: Arc<dyn ReachabilityProber>,
}

impl MonitorCycle {
    pub fn new(
        store: Arc<dyn DeviceStore>,
        notifier: Arc<dyn DeviceNotifier>,
        resolver: Arc<dyn AddressResolver>,
        prober: Arc<dyn ReachabilityProber>,
    ) -> Self {
        Self {
            store,
            notifier,
            resolver,
            prober,
        }
    }

    pub async fn run(&self) -> Result<CycleReport, CycleError> {
        self.run_at(time_of_day_utc(Utc::now())).await
    }

    pub async fn run_at(&self, time_utc: i32) -> Result<CycleReport, CycleError> {
        info!(time_utc, "Starting monitor run.");
        let devices = self
            .store
            .get_active_devices(time_utc)
            .await
            .map_err(CycleError::Selection)?;

        let mut report = CycleReport {
            time_utc,
            selected: devices.len(),
            ..Default::default()
        };
        info!(count = devices.len(), "Retrieved devices from monitor queue.");

        if devices.is_empty() {
            info!("No devices in queue, exiting monitor run.");
            return Ok(report);
        }

        let states = self.check_devices(devices).await;
        debug!("Connectivity checks finished, checking need to send notifications.");

        let mut to_notify = Vec::new();
        let mut classified = 0;
        for mut state in states {
            let Reachability::Reachable(reachable) = state.reachability else {
                continue;
            };
            classified += 1;

            let device = &state.device;
            let decision = classify(
                reachable,
                device.monitor_trigger,
                device.persist,
                device.been_notified,
            );
            debug!(
                device_id = device.id,
                reachable,
                trigger = %device.monitor_trigger,
                persistent = device.persist,
                notify = decision.notify,
                "Device classified."
            );

            state.persistent_alarm_ended = decision.alarm_ended;
            if decision.notify {
                to_notify.push(state);
            }
        }
        report.excluded = report.selected - classified;

        if to_notify.is_empty() {
            info!("No devices triggered for notification. Monitor run finished.");
            return Ok(report);
        }

        info!(count = to_notify.len(), "Devices triggered for notification.");
        let batch: Vec<monitor_device::Model> =
            to_notify.iter().map(|state| state.device.clone()).collect();
        self.notifier
            .notify(&batch)
            .await
            .map_err(CycleError::Dispatch)?;
        report.notified = batch.len();

        self.reconcile(&to_notify, &mut report).await;
        info!(?report, "Monitor run finished.");
        Ok(report)
    }

    /// Resolves and probes every device concurrently, one task per device,
    /// and waits for all of them.
    async fn check_devices(&self, devices: Vec<monitor_device::Model>) -> Vec<DeviceState> {
        let mut tasks = JoinSet::new();
        for device in devices {
            let resolver = Arc::clone(&self.resolver);
            let prober = Arc::clone(&self.prober);
            tasks.spawn(async move {
                let mut state = DeviceState::new(device);
                if let Err(e) =
                    check_device(resolver.as_ref(), prober.as_ref(), &mut state).await
                {
                    warn!(
                        device_id = state.device.id,
                        identifier = %state.device.identifier,
                        error = %e,
                        "Skipping device for this run: connectivity check failed."
                    );
                }
                state
            });
        }

        let mut states = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(state) => states.push(state),
                Err(e) => error!(error = %e, "Device check task did not complete."),
            }
        }
        states
    }

    /// Removes one-shot devices that fired and records the notified flag of
    /// persistent ones. The two batches are independent and not retried.
    async fn reconcile(&self, notified: &[DeviceState], report: &mut CycleReport) {
        let (persistent, one_shot): (Vec<&DeviceState>, Vec<&DeviceState>) =
            notified.iter().partition(|state| state.device.persist);

        if one_shot.is_empty() {
            debug!("No devices marked for removal.");
        } else {
            let ids: Vec<i32> = one_shot.iter().map(|state| state.device.id).collect();
            info!(ids = ?ids, "Deleting devices from queue.");
            match self.store.delete_devices(&ids).await {
                Ok(deleted) => report.deleted = deleted,
                Err(e) => {
                    error!(ids = ?ids, error = %e, "Failed to delete notified one-shot devices.");
                    report.reconciliation_failures += 1;
                }
            }
        }

        if !persistent.is_empty() {
            let updates: Vec<DeviceUpdate> = persistent
                .iter()
                .map(|state| {
                    DeviceUpdate::been_notified(state.device.id, !state.persistent_alarm_ended)
                })
                .collect();
            let count = updates.len();
            match self.store.update_devices(updates).await {
                Ok(()) => report.updated = count,
                Err(e) => {
                    error!(
                        count,
                        error = %e,
                        "Failed to update notified flag of persistent devices."
                    );
                    report.reconciliation_failures += 1;
                }
            }
        }
    }
}

async fn check_device(
    resolver: &dyn AddressResolver,
    prober: &dyn ReachabilityProber,
    state: &mut DeviceState,
) -> Result<(), CheckError> {
    let target = ProbeTarget::for_device(&state.device)?;
    let address = resolver.resolve(&state.device.identifier).await?;
    state.current_address = Some(address);

    let reachable = prober.probe(address, target).await?;
    debug!(
        device_id = state.device.id,
        address = %address,
        reachable,
        "Connectivity tested."
    );
    state.reachability = Reachability::Reachable(reachable);
    Ok(())
}
