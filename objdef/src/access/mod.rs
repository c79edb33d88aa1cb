//! Row access filters declared on an object, resolved for one user type.

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;

/// Condition that matches no rows.
pub const DENY_ALL: &str = "0=1";

/// Placeholder replaced by the Unix timestamp of the day's UTC midnight.
pub const TODAY_TOKEN: &str = "TODAYUNIX";

/// Resolve the access condition for `user_type` from `rules`, an array of
/// `{"usertype": "a,b", "access": "<condition>"}` rows.
///
/// `None` means unrestricted. Without a matching row access is denied.
pub fn resolve_access(user_type: &str, rules: &Value, today: NaiveDate) -> Option<String> {
    let rows = rules.as_array()?;
    let condition = rows
        .iter()
        .find(|row| {
            row.get("usertype")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .any(|t| t == "all" || t == user_type)
        })
        .map(|row| {
            row.get("access")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .replace(TODAY_TOKEN, &midnight_timestamp(today).to_string())
        })
        .unwrap_or_else(|| DENY_ALL.to_string());
    (condition != "*").then_some(condition)
}

/// [`resolve_access`] against the current UTC date.
pub fn resolve_access_now(user_type: &str, rules: &Value) -> Option<String> {
    resolve_access(user_type, rules, Utc::now().date_naive())
}

fn midnight_timestamp(day: NaiveDate) -> i64 {
    Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN))
        .timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_not_an_array_is_unrestricted() {
        assert_eq!(resolve_access("staff", &json!(null), day()), None);
        assert_eq!(resolve_access("staff", &json!({"usertype": "all"}), day()), None);
    }

    #[test]
    fn test_default_is_deny() {
        let rules = json!([{"usertype": "admin", "access": "*"}]);
        assert_eq!(resolve_access("staff", &rules, day()).as_deref(), Some(DENY_ALL));
        assert_eq!(resolve_access("staff", &json!([]), day()).as_deref(), Some(DENY_ALL));
    }

    #[test]
    fn test_first_matching_row_wins() {
        let rules = json!([
            {"usertype": "guest", "access": "published=1"},
            {"usertype": "staff,admin", "access": "*"},
            {"usertype": "all", "access": "owner_id=0"}
        ]);
        assert_eq!(resolve_access("admin", &rules, day()), None);
        assert_eq!(resolve_access("guest", &rules, day()).as_deref(), Some("published=1"));
        assert_eq!(resolve_access("member", &rules, day()).as_deref(), Some("owner_id=0"));
    }

    #[test]
    fn test_today_token() {
        let rules = json!([{"usertype": "all", "access": "expires>TODAYUNIX"}]);
        assert_eq!(
            resolve_access("member", &rules, day()).as_deref(),
            Some("expires>1709251200")
        );
    }
}
