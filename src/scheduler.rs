use crate::rate_limit::RateLimiter;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

/// Start a cron job that evicts expired rate-limit keys.
///
/// Cron format: "second minute hour day month day_of_week",
/// e.g. "0 */10 * * * *" sweeps every ten minutes.
pub async fn start_sweeper(cron_expr: &str, limiter: Arc<RateLimiter>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron_expr, move |_uuid, _l| {
        let limiter = Arc::clone(&limiter);

        Box::pin(async move {
            let removed = limiter.sweep();
            debug!(
                "Rate-limit sweep removed {} keys, {} remain",
                removed,
                limiter.tracked_keys()
            );
        })
    })
    .context(format!("Invalid RATE_LIMIT_SWEEP_CRON: '{}'", cron_expr))?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!("✓ Rate-limit sweep scheduled ({})", cron_expr);

    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateKey;
    use std::time::Duration;

    #[tokio::test]
    async fn test_invalid_cron_is_rejected() {
        let limiter = Arc::new(RateLimiter::default());
        let result = start_sweeper("every ten minutes", limiter).await;

        let Err(err) = result else {
            panic!("Invalid cron expression should be rejected");
        };
        assert!(err.to_string().contains("RATE_LIMIT_SWEEP_CRON"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sweep_job_evicts_expired_keys() {
        let limiter = Arc::new(RateLimiter::new(Duration::ZERO));
        limiter.allow(RateKey::new(1, 1));
        limiter.allow(RateKey::new(2, 2));
        assert_eq!(limiter.tracked_keys(), 2);

        let mut scheduler = start_sweeper("* * * * * *", limiter.clone())
            .await
            .expect("Should start");

        let mut swept = false;
        for _ in 0..50 {
            if limiter.tracked_keys() == 0 {
                swept = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        scheduler.shutdown().await.expect("Should shut down");

        assert!(swept, "Sweep job should have run within 5 seconds");
    }
}
