//! Background scheduled tasks for the reward service.
//!
//! Call `spawn_all` once during startup. Both jobs are idempotent: pool creation is an
//! upsert and cleanup only deletes rows older than the retention windows.

use crate::models::CleanupRequest;
use crate::services::AdminService;
use std::time::Duration;

const POOL_ENSURE_INTERVAL: Duration = Duration::from_secs(3600);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 3600);

/// Spawn all background tasks. Detaches via `tokio::spawn`; does not block.
pub fn spawn_all(admin_service: AdminService) {
    // 每小时确保今日预算池存在（跨日后第一次查票前即可就绪）
    {
        let svc = admin_service.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = svc.ensure_today_pools().await {
                    log::error!("Failed to ensure today's reward pools: {e:?}");
                }
                tokio::time::sleep(POOL_ENSURE_INTERVAL).await;
            }
        });
    }

    // 历史数据清理（每天一次，按配置的保留天数）
    {
        let svc = admin_service;
        tokio::spawn(async move {
            loop {
                match svc.cleanup(&CleanupRequest::default()).await {
                    Ok(report) => log::debug!("Scheduled reward cleanup finished: {report:?}"),
                    Err(e) => log::error!("Scheduled reward cleanup failed: {e:?}"),
                }
                tokio::time::sleep(CLEANUP_INTERVAL).await;
            }
        });
    }
}
