// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Surface lifecycle reconciliation.
//!
//! Opened/destroyed callbacks arrive from the host with an `instance_id`;
//! destruction of anything but the tracked instance is a stale callback and
//! is dropped. Destroying the tracked surface additionally reconciles any
//! offering state the surface owned.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::WakeReason;
use crate::state::{QtState, SurfaceTracking, Tables};

use super::{Coordinator, DESTROY_FALLBACK_OFFER_AGE_MS};

impl Coordinator {
    pub fn on_surface_opened(
        &self,
        app: &str,
        session_id: Uuid,
        wake_reason: WakeReason,
        instance_id: u64,
    ) {
        let now = self.now_ms();
        let mut tables = self.tables.lock();
        if let Some(ref prior) = tables.surface {
            // The host guarantees destroy-before-open per instance, but not
            // across instances; the newer surface wins.
            warn!(
                prior_instance = prior.instance_id,
                instance = instance_id,
                "surface opened while another was tracked"
            );
        }
        tables.surface = Some(SurfaceTracking {
            instance_id,
            app: app.to_owned(),
            session_id,
            wake_reason,
            started_at: now,
        });
        if wake_reason == WakeReason::ShowIntervention {
            let entry = tables.app(app);
            if entry.qt_state == QtState::Idle {
                entry.qt_state = QtState::InterventionActive;
            }
        }
        info!(app, session = %session_id, wake = wake_reason.as_str(), instance = instance_id, "surface opened");
    }

    /// `app`, `session_id`, and `wake_reason` may be unavailable on some
    /// hosts' destroy callbacks; the fallback path then reconciles against
    /// the current foreground conservatively.
    pub fn on_surface_destroyed(
        &self,
        app: Option<&str>,
        session_id: Option<Uuid>,
        wake_reason: Option<WakeReason>,
        instance_id: u64,
    ) {
        let now = self.now_ms();
        let mut tables = self.tables.lock();

        match tables.surface {
            Some(ref tracked) if tracked.instance_id == instance_id => {}
            Some(ref tracked) => {
                info!(
                    instance = instance_id,
                    tracked = tracked.instance_id,
                    "stale surface destroy ignored"
                );
                return;
            }
            None => {
                debug!(instance = instance_id, "destroy with no tracked surface ignored");
                return;
            }
        }
        tables.surface = None;
        info!(instance = instance_id, "surface destroyed");

        match (wake_reason, app, session_id) {
            (Some(WakeReason::ShowQuickTask), Some(app), Some(session_id)) => {
                let entry = tables.app(app);
                if entry.qt_state == QtState::Offering && entry.offer_session == Some(session_id) {
                    info!(app, session = %session_id, "offer surface destroyed, offer cleared");
                    entry.offer_session = None;
                    entry.offer_started_at = None;
                    entry.qt_state = QtState::Idle;
                } else {
                    // A newer offer already exists; it owns the state now.
                    debug!(app, session = %session_id, "destroyed offer surface was superseded, keeping state");
                }
            }
            (Some(WakeReason::ShowPostQuickTaskChoice), ..) => {
                // Post-choice never owns an offer.
                debug!("post-choice surface destroyed, keeping state");
            }
            (Some(WakeReason::ShowIntervention), Some(app), _) => {
                let entry = tables.app(app);
                if entry.qt_state == QtState::InterventionActive {
                    if entry.preserved_intervention {
                        info!(app, "intervention surface destroyed, intervention preserved");
                    } else {
                        info!(app, "intervention surface destroyed");
                        entry.qt_state = QtState::Idle;
                    }
                }
            }
            (Some(WakeReason::FinishSurface), ..) => {
                debug!("finish surface destroyed, keeping state");
            }
            _ => {
                // Identity unavailable: conservative fallback.
                self.destroy_fallback(&mut tables, now);
            }
        }
    }

    /// Clear an offering without surface identity, but only when the
    /// evidence is strong: the current foreground app has a live offer that
    /// started within the last few seconds.
    fn destroy_fallback(&self, tables: &mut Tables, now: u64) {
        let Some((foreground, _)) = self.foreground.current_foreground() else {
            debug!("destroy fallback: no current foreground, keeping state");
            return;
        };
        let entry = tables.app(&foreground);
        let fresh_offer = entry.qt_state == QtState::Offering
            && entry.offer_session.is_some()
            && entry
                .offer_started_at
                .is_some_and(|at| now.saturating_sub(at) < DESTROY_FALLBACK_OFFER_AGE_MS);
        if fresh_offer {
            warn!(app = %foreground, "destroy fallback: clearing fresh offer for foreground app");
            entry.offer_session = None;
            entry.offer_started_at = None;
            entry.qt_state = QtState::Idle;
        } else {
            debug!(app = %foreground, "destroy fallback: keeping state");
        }
    }
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
