// src/pipeline/scheduler.rs

//! Periodic season rollover check.
//!
//! Every interval the scheduler compares the sync marker with the current
//! calendar season. When they differ (or no marker exists yet) the current
//! year is resynced. Failures are logged and the loop keeps going; only
//! cancellation stops it.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::pipeline::sync::{YearReport, YearSyncer};

/// What one check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    UpToDate,
    Synced(YearReport),
}

/// Runs [`YearSyncer::sync_year`] whenever the season rolls over.
pub struct SyncScheduler<'a> {
    syncer: &'a YearSyncer,
    interval: Duration,
}

impl<'a> SyncScheduler<'a> {
    pub fn new(syncer: &'a YearSyncer, interval: Duration) -> Self {
        Self { syncer, interval }
    }

    /// Compare the marker with today's season and sync if it moved.
    pub async fn check_once(&self) -> Result<TickOutcome> {
        let (year, season) = self.syncer.clock().current_season();

        let meta = match self.syncer.storage().load_sync_meta().await {
            Ok(meta) => meta,
            Err(e) => {
                log::warn!("[Scheduler] sync marker unreadable: {}", e);
                None
            }
        };

        if meta.as_ref().is_some_and(|m| !m.is_stale(year, season)) {
            log::debug!("[Scheduler] {} {} is current", season, year);
            return Ok(TickOutcome::UpToDate);
        }

        match &meta {
            Some(meta) => log::info!(
                "[Scheduler] season changed {} {} -> {} {}, syncing {}",
                meta.last_season,
                meta.last_year,
                season,
                year,
                year
            ),
            None => log::info!("[Scheduler] no sync marker, syncing {}", year),
        }
        let report = self.syncer.sync_year(year).await?;
        Ok(TickOutcome::Synced(report))
    }

    /// Check every interval until `token` is cancelled.
    ///
    /// The first check happens one interval after start. Cancellation also
    /// abandons a sync that is still running.
    pub async fn run(&self, token: CancellationToken) {
        log::info!(
            "[Scheduler] started, checking every {}s",
            self.interval.as_secs()
        );
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = token.cancelled() => {
                            log::warn!("[Scheduler] cancelled during sync");
                            break;
                        }
                        result = self.check_once() => match result {
                            Ok(TickOutcome::UpToDate) => {}
                            Ok(TickOutcome::Synced(report)) => log::info!(
                                "[Scheduler] synced {} ({} entries)",
                                report.year,
                                report.entries
                            ),
                            Err(e) => log::error!("[Scheduler] sync failed: {}", e),
                        },
                    }
                }
            }
        }
        log::info!("[Scheduler] stopped");
    }
}
