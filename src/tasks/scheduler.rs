use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::core::state::AppState;
use crate::db::types::SubmitTrigger;
use crate::repositories::sessions;
use crate::services::finalize::finalize_session;

const SWEEP_BATCH: i64 = 100;

/// Background sweep that submits sessions whose deadline passed without the
/// client ever coming back. Request-time enforcement handles the common
/// case; this catches closed laptops and dropped connections.
pub(crate) async fn run(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(Duration::from_secs(state.settings().exam().sweep_interval_seconds));
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = sweep_expired_sessions(&state).await {
                    tracing::error!(error = %err, "sweep_expired_sessions failed");
                }
            }
        }
    }
    tracing::info!("session sweep stopped");
}

async fn sweep_expired_sessions(state: &AppState) -> anyhow::Result<()> {
    loop {
        let expired = sessions::list_expired_active(
            state.db(),
            crate::core::time::primitive_now_utc(),
            SWEEP_BATCH,
        )
        .await?;
        let batch_len = expired.len();

        for session in expired {
            // One broken session must not stall the rest of the batch.
            if let Err(err) = finalize_session(state, &session.id, SubmitTrigger::Timer).await {
                tracing::error!(
                    session_id = %session.id,
                    error = %err,
                    "Failed to submit expired session"
                );
            } else {
                metrics::counter!("exam_sessions_swept_total").increment(1);
            }
        }

        if (batch_len as i64) < SWEEP_BATCH {
            return Ok(());
        }
    }
}
