pub const MSG_STATUS_PENDING: &str = "⏳ Fetching system status...";
pub const MSG_LOGS_EMPTY: &str = "📋 Logs are empty";
pub const MSG_RESTARTING: &str = "🔄 Restarting {app}...";
pub const MSG_BACKUP_STARTED: &str = "💾 Creating a backup...";
pub const MSG_BACKUP_FILE_FALLBACK: &str = "File created";
pub const MSG_UPDATE_CHECKING: &str = "🔍 Checking {app} versions...";
pub const MSG_UPDATE_UP_TO_DATE: &str = "✅ The latest version is already installed!";
pub const MSG_UPDATE_BACKUP: &str = "💾 Creating a backup before updating...";
pub const MSG_UPDATE_BACKUP_DONE: &str = "✅ Backup created";
pub const MSG_UPDATE_BACKUP_FAILED: &str =
    "⚠️ Could not create a backup, continuing the update anyway...";
pub const MSG_UPDATE_STOPPING: &str = "⏹ Stopping {app}...";
pub const MSG_UPDATE_BUILDING: &str = "🔨 Rebuilding the {app} image (this can take 5-10 minutes)...";
pub const MSG_UPDATE_STARTING: &str = "🚀 Starting the updated {app}...";
pub const MSG_UPDATE_SETTLING: &str = "⏳ Waiting for the service to come up...";
pub const MSG_UPDATE_PRUNING: &str = "🧹 Removing stale images...";
pub const MSG_BUSY: &str = "⏳ /{command} is still running. Wait for it to finish.";

/// Placeholder for a status field whose query failed.
pub const NOT_AVAILABLE: &str = "N/A";
/// Placeholder for a version that could not be determined.
pub const UNKNOWN: &str = "unknown";

pub const HELP_TEXT_TEMPLATE: &str = "\
<b>{app} management bot</b>

Available commands:

/status — Server and container status
/logs [N] — Last N log lines (default 50)
/update — Update {app} to the latest version
/backup — Create a backup
/restart — Restart {app}
/disk — Disk space usage
/help — Show this help

<i>The bot manages {app} through Docker</i>";

/// Substitute the `{app}` placeholder in a message template.
pub fn with_app(template: &str, app: &str) -> String {
    template.replace("{app}", app)
}
