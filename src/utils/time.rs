use chrono::NaiveDateTime;

/// Human-readable age of a timestamp, computed at response-shaping time.
/// Never stored; clients get a fresh value on every read.
pub fn time_ago(created_at: NaiveDateTime) -> String {
    time_ago_at(created_at, chrono::Utc::now().naive_utc())
}

fn time_ago_at(created_at: NaiveDateTime, now: NaiveDateTime) -> String {
    let elapsed = now.signed_duration_since(created_at);
    let seconds = elapsed.num_seconds();

    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else if seconds < 86400 * 30 {
        format!("{}d ago", seconds / 86400)
    } else {
        created_at.format("%Y-%m-%d").to_string()
    }
}
