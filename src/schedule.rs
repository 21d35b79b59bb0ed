//! Scheduling: time parsing, multi-platform fan-out and the calendar view

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use futures::future::join_all;

use crate::api::ScheduleStore;
use crate::composer::Composer;
use crate::error::{FlowError, ValidationError};
use crate::models::{Platform, ScheduledPost, day_key};

/// Posts shown in a calendar cell before the overflow counter
pub const MAX_VISIBLE_PER_DAY: usize = 3;

/// Parse a schedule time relative to the local clock
///
/// Accepted forms:
/// - Relative: "in 45m", "in 2h", "dans 3 jours", "in 1 week"
/// - Time of day: "18:30", "9am" (tomorrow if already past)
/// - Date and time: "2026-11-02 09:00", "2026-11-02T09:00"
/// - RFC 3339: "2026-11-02T09:00:00+01:00"
pub fn parse_schedule_time(input: &str) -> Result<DateTime<Utc>> {
    parse_schedule_time_at(input, Local::now())
}

/// Same as [`parse_schedule_time`], against an explicit clock and zone
pub fn parse_schedule_time_at<Tz: TimeZone>(input: &str, now: DateTime<Tz>) -> Result<DateTime<Utc>> {
    let input = input.trim().to_lowercase();
    let tz = now.timezone();

    if let Some(rest) = input.strip_prefix("in ").or_else(|| input.strip_prefix("dans ")) {
        return parse_offset(rest)
            .and_then(|offset| now.checked_add_signed(offset))
            .map(|at| at.with_timezone(&Utc))
            .ok_or_else(|| anyhow!("Unrecognized delay '{rest}' (try '45m', '2h', '3 days')"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&input) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dt%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dt%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&input, format) {
            return resolve_local(&tz, naive);
        }
    }

    if let Some(time) = parse_clock(&input) {
        let today = now.date_naive();
        let candidate = resolve_local(&tz, today.and_time(time))?;
        if candidate > now.with_timezone(&Utc) {
            return Ok(candidate);
        }
        return resolve_local(&tz, (today + Duration::days(1)).and_time(time));
    }

    Err(anyhow!(
        "Could not parse schedule time '{input}'. Use 'in 2h', '18:30' or 'YYYY-MM-DD HH:MM'."
    ))
}

/// "45m", "2h", "3d", "1w" or "30 minutes", "2 heures", "3 jours"
fn parse_offset(input: &str) -> Option<Duration> {
    let input = input.trim();
    let split = input.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = input.split_at(split);
    let amount: i64 = digits.parse().ok()?;

    match unit.trim().trim_end_matches('s') {
        "m" | "min" | "minute" => Duration::try_minutes(amount),
        "h" | "hour" | "heure" => Duration::try_hours(amount),
        "d" | "j" | "day" | "jour" => Duration::try_days(amount),
        "w" | "week" | "semaine" => Duration::try_weeks(amount),
        _ => None,
    }
}

/// "18:30", "18h30", "9am", "9:15pm"
fn parse_clock(input: &str) -> Option<NaiveTime> {
    let compact = input.replace(' ', "");
    if let Ok(time) = NaiveTime::parse_from_str(&compact, "%H:%M") {
        return Some(time);
    }
    if let Ok(time) = NaiveTime::parse_from_str(&compact, "%Hh%M") {
        return Some(time);
    }

    let (clock, pm) = if let Some(rest) = compact.strip_suffix("pm") {
        (rest, true)
    } else {
        (compact.strip_suffix("am")?, false)
    };
    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        None => (clock.parse::<u32>().ok()?, 0),
    };
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("{naive} does not exist in the local time zone"))
}

/// One scheduling action, fanned out to every platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    /// Target platforms, one record each
    pub platforms: Vec<Platform>,
    /// Publication time
    pub scheduled_for: DateTime<Utc>,
    /// Caption
    pub caption: String,
    /// Hashtags with leading `#`
    pub hashtags: Vec<String>,
    /// Library item to publish
    pub media_ref: Option<String>,
    /// Resolved media URL
    pub media_url: Option<String>,
}

/// Result of a fan-out. Records that succeeded stay in place when others fail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleReport {
    /// Records created
    pub succeeded: Vec<ScheduledPost>,
    /// Platforms whose create call failed, with the error
    pub failed: Vec<(Platform, String)>,
}

impl ScheduleReport {
    /// Whether every platform got its record
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Platforms to retry
    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.failed.iter().map(|(p, _)| *p).collect()
    }

    /// Message for the user
    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!("Publication programmée sur {} plateforme(s).", self.succeeded.len())
        } else if self.succeeded.is_empty() {
            format!("Échec de la programmation sur {} plateforme(s).", self.failed.len())
        } else {
            format!(
                "Programmée sur {} plateforme(s), échec sur {} plateforme(s).",
                self.succeeded.len(),
                self.failed.len()
            )
        }
    }
}

/// Creates scheduled posts through a [`ScheduleStore`]
pub struct Scheduler<'a, S> {
    store: &'a S,
}

impl<'a, S: ScheduleStore> Scheduler<'a, S> {
    /// Scheduler over a store
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create one record per platform, concurrently and without rollback
    pub async fn schedule(
        &self,
        request: &ScheduleRequest,
        now: DateTime<Utc>,
    ) -> Result<ScheduleReport, FlowError> {
        let mut platforms: Vec<Platform> = Vec::new();
        for platform in &request.platforms {
            if !platforms.contains(platform) {
                platforms.push(*platform);
            }
        }
        if platforms.is_empty() {
            return Err(ValidationError::NoPlatform.into());
        }
        if request.scheduled_for <= now {
            return Err(ValidationError::PastSchedule.into());
        }
        for platform in &platforms {
            Composer::with_content(*platform, &request.caption, &request.hashtags).validate()?;
        }

        let posts: Vec<ScheduledPost> = platforms
            .iter()
            .map(|platform| {
                let mut post = ScheduledPost::new(
                    *platform,
                    request.scheduled_for,
                    request.caption.clone(),
                    request.hashtags.clone(),
                );
                post.media_ref.clone_from(&request.media_ref);
                post.media_url.clone_from(&request.media_url);
                post
            })
            .collect();

        let results = join_all(posts.iter().map(|post| self.store.create_scheduled_post(post))).await;

        let mut report = ScheduleReport::default();
        for (post, result) in posts.iter().zip(results) {
            match result {
                Ok(created) => report.succeeded.push(created),
                Err(e) => {
                    tracing::warn!("Scheduling on {} failed: {e:#}", post.platform);
                    report.failed.push((post.platform, format!("{e:#}")));
                }
            }
        }
        tracing::info!(
            "Scheduled for {}: {} ok, {} failed",
            request.scheduled_for,
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Current scheduled posts
    pub async fn list(&self) -> Result<Vec<ScheduledPost>, FlowError> {
        self.store
            .list_scheduled_posts()
            .await
            .map_err(|e| FlowError::service("list-scheduled-posts", &e))
    }

    /// Delete a scheduled post
    pub async fn delete(&self, id: uuid::Uuid) -> Result<(), FlowError> {
        self.store
            .delete_scheduled_post(id)
            .await
            .map_err(|e| FlowError::service("delete-scheduled-post", &e))
    }
}

/// Group posts by local calendar day, keeping input order inside a day
pub fn group_by_day<'a, Tz: TimeZone>(
    posts: &'a [ScheduledPost],
    tz: &Tz,
) -> HashMap<String, Vec<&'a ScheduledPost>> {
    let mut days: HashMap<String, Vec<&ScheduledPost>> = HashMap::new();
    for post in posts {
        days.entry(post.day_key(tz)).or_default().push(post);
    }
    days
}

/// One calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
    /// Calendar date
    pub date: NaiveDate,
    /// Posts on that day, in input order
    pub posts: Vec<&'a ScheduledPost>,
}

impl<'a> DayCell<'a> {
    /// Grouping key of this cell
    pub fn key(&self) -> String {
        day_key(self.date.year(), self.date.month(), self.date.day())
    }

    /// Posts rendered in the cell
    pub fn visible(&self) -> &[&'a ScheduledPost] {
        &self.posts[..self.posts.len().min(MAX_VISIBLE_PER_DAY)]
    }

    /// Posts hidden behind the "+N" counter
    pub fn overflow(&self) -> usize {
        self.posts.len().saturating_sub(MAX_VISIBLE_PER_DAY)
    }
}

/// Every day of a month with its posts
pub fn month_view<'a, Tz: TimeZone>(
    posts: &'a [ScheduledPost],
    year: i32,
    month: u32,
    tz: &Tz,
) -> Option<Vec<DayCell<'a>>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let mut groups = group_by_day(posts, tz);

    let cells = first
        .iter_days()
        .take_while(|date| date.month() == month)
        .map(|date| {
            let key = day_key(date.year(), date.month(), date.day());
            DayCell {
                date,
                posts: groups.remove(&key).unwrap_or_default(),
            }
        })
        .collect();
    Some(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};
    use std::cell::Cell;
    use uuid::Uuid;

    struct FlakyStore {
        failing: Platform,
        calls: Cell<u32>,
    }

    impl ScheduleStore for FlakyStore {
        async fn list_scheduled_posts(&self) -> Result<Vec<ScheduledPost>> {
            Ok(Vec::new())
        }

        async fn create_scheduled_post(&self, post: &ScheduledPost) -> Result<ScheduledPost> {
            self.calls.set(self.calls.get() + 1);
            if post.platform == self.failing {
                anyhow::bail!("tiktok token revoked");
            }
            Ok(post.clone())
        }

        async fn delete_scheduled_post(&self, _id: Uuid) -> Result<()> {
            Ok(())
        }
    }

    fn request(platforms: Vec<Platform>, at: DateTime<Utc>) -> ScheduleRequest {
        ScheduleRequest {
            platforms,
            scheduled_for: at,
            caption: "Soirée dégustation".to_string(),
            hashtags: vec!["#vin".to_string()],
            media_ref: Some("img-1".to_string()),
            media_url: Some("https://cdn/img-1.png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successes() {
        let store = FlakyStore {
            failing: Platform::Tiktok,
            calls: Cell::new(0),
        };
        let now = Utc::now();
        let report = Scheduler::new(&store)
            .schedule(
                &request(vec![Platform::Instagram, Platform::Tiktok], now + Duration::days(1)),
                now,
            )
            .await
            .unwrap();

        assert_eq!(store.calls.get(), 2);
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.succeeded[0].platform, Platform::Instagram);
        assert_eq!(report.failed_platforms(), vec![Platform::Tiktok]);
        assert!(report.summary().contains("échec sur 1 plateforme(s)"));
    }

    #[tokio::test]
    async fn test_rejects_past_time_and_no_platform() {
        let store = FlakyStore {
            failing: Platform::Tiktok,
            calls: Cell::new(0),
        };
        let scheduler = Scheduler::new(&store);
        let now = Utc::now();

        let past = scheduler
            .schedule(&request(vec![Platform::Instagram], now - Duration::hours(1)), now)
            .await;
        assert!(matches!(past, Err(FlowError::Validation(ValidationError::PastSchedule))));

        let none = scheduler.schedule(&request(Vec::new(), now + Duration::hours(1)), now).await;
        assert!(matches!(none, Err(FlowError::Validation(ValidationError::NoPlatform))));
        assert_eq!(store.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_platforms_fan_out_once() {
        let store = FlakyStore {
            failing: Platform::Twitter,
            calls: Cell::new(0),
        };
        let now = Utc::now();
        let report = Scheduler::new(&store)
            .schedule(
                &request(vec![Platform::Linkedin, Platform::Linkedin], now + Duration::hours(2)),
                now,
            )
            .await
            .unwrap();
        assert_eq!(store.calls.get(), 1);
        assert!(report.is_complete());
        assert_eq!(report.succeeded[0].media_ref.as_deref(), Some("img-1"));
    }

    #[test]
    fn test_same_day_posts_share_a_cell() {
        let morning = Utc.with_ymd_and_hms(2026, 11, 3, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2026, 11, 3, 19, 45, 0).unwrap();
        let next = Utc.with_ymd_and_hms(2026, 11, 4, 9, 0, 0).unwrap();
        let posts = vec![
            ScheduledPost::new(Platform::Instagram, evening, "b", Vec::new()),
            ScheduledPost::new(Platform::Tiktok, morning, "a", Vec::new()),
            ScheduledPost::new(Platform::Linkedin, next, "c", Vec::new()),
        ];

        let days = group_by_day(&posts, &Utc);
        let cell = &days["2026-11-3"];
        assert_eq!(cell.len(), 2);
        assert_eq!(cell[0].caption, "b");
        assert_eq!(cell[1].caption, "a");
        assert_eq!(days["2026-11-4"].len(), 1);
    }

    #[test]
    fn test_cell_overflow() {
        let at = Utc.with_ymd_and_hms(2026, 11, 10, 12, 0, 0).unwrap();
        let posts: Vec<ScheduledPost> = (0..5)
            .map(|i| ScheduledPost::new(Platform::Instagram, at, format!("p{i}"), Vec::new()))
            .collect();

        let month = month_view(&posts, 2026, 11, &Utc).unwrap();
        assert_eq!(month.len(), 30);
        let cell = &month[9];
        assert_eq!(cell.key(), "2026-11-10");
        assert_eq!(cell.visible().len(), 3);
        assert_eq!(cell.overflow(), 2);
        assert_eq!(month[0].overflow(), 0);
        assert!(month_view(&posts, 2026, 13, &Utc).is_none());
    }

    #[test]
    fn test_parse_relative() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_schedule_time_at("in 45m", now).unwrap(), now + Duration::minutes(45));
        assert_eq!(parse_schedule_time_at("dans 3 jours", now).unwrap(), now + Duration::days(3));
        assert_eq!(parse_schedule_time_at("in 2 hours", now).unwrap(), now + Duration::hours(2));
        assert!(parse_schedule_time_at("in soon", now).is_err());
    }

    #[test]
    fn test_parse_relative_out_of_range() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap();
        assert!(parse_schedule_time_at("in 999999999999999w", now).is_err());
        assert!(parse_schedule_time_at("dans 99999999 jours", now).is_err());
        assert!(parse_schedule_time_at("in 99999999999999999999m", now).is_err());
    }

    #[test]
    fn test_parse_clock_rolls_to_tomorrow() {
        let paris = FixedOffset::east_opt(3600).unwrap();
        let now = paris.with_ymd_and_hms(2026, 6, 1, 20, 0, 0).unwrap();

        let later = parse_schedule_time_at("21:30", now).unwrap();
        assert_eq!(later.with_timezone(&paris).day(), 1);
        assert_eq!(later.with_timezone(&paris).hour(), 21);

        let earlier = parse_schedule_time_at("9am", now).unwrap();
        assert_eq!(earlier.with_timezone(&paris).day(), 2);
        assert_eq!(earlier.with_timezone(&paris).hour(), 9);
    }

    #[test]
    fn test_parse_absolute() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap();
        let dt = parse_schedule_time_at("2030-01-15 14:30", now).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2030, 1, 15, 14));
        assert!(parse_schedule_time_at("tomorrow-ish", now).is_err());
    }
}
