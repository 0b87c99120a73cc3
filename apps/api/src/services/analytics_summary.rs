//! Dashboard figures computed from raw analytics events

use chrono::{DateTime, Duration, NaiveDate, Utc};
use inkpost_orm::{AnalyticsEvent, DailyCount};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use url::Url;

pub const PAGE_VIEW: &str = "page_view";
pub const COMMENT: &str = "comment";

const TOP_PAGES: usize = 5;
const TOP_SOURCES: usize = 5;
pub const SERIES_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodVisitors {
    pub total_visitors: usize,
    pub page_visitors: usize,
    pub comment_visitors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopPage {
    pub page: String,
    pub views: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficSource {
    pub source: String,
    pub visitors: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub current_period: PeriodVisitors,
    pub previous_period: PeriodVisitors,
    pub top_pages: Vec<TopPage>,
    pub avg_session: String,
    pub traffic_sources: Vec<TrafficSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitorSeries {
    pub current_period: Vec<DayCount>,
    pub previous_period: Vec<DayCount>,
}

/// Midnight UTC of the day containing `now`
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Start of the window `summarize` needs: midnight yesterday
pub fn summary_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    day_start(now) - Duration::days(1)
}

/// Today against yesterday (UTC) for `events`, which should cover at least
/// `summary_window_start(now)..=now`
pub fn summarize(events: &[AnalyticsEvent], now: DateTime<Utc>) -> AnalyticsSummary {
    let today = day_start(now);
    let yesterday = today - Duration::days(1);

    let current: Vec<&AnalyticsEvent> = events.iter().filter(|e| e.created_at >= today).collect();
    let previous: Vec<&AnalyticsEvent> = events
        .iter()
        .filter(|e| e.created_at >= yesterday && e.created_at < today)
        .collect();

    AnalyticsSummary {
        current_period: period_visitors(&current),
        previous_period: period_visitors(&previous),
        top_pages: top_pages(&current),
        avg_session: format_duration(average_session_secs(&current)),
        traffic_sources: traffic_sources(&current),
    }
}

fn unique_ips<'a>(events: impl Iterator<Item = &'a AnalyticsEvent>) -> usize {
    events
        .filter_map(|e| e.ip_address.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

fn period_visitors(events: &[&AnalyticsEvent]) -> PeriodVisitors {
    PeriodVisitors {
        total_visitors: unique_ips(events.iter().copied()),
        page_visitors: unique_ips(events.iter().copied().filter(|e| e.event == PAGE_VIEW)),
        comment_visitors: unique_ips(events.iter().copied().filter(|e| e.event == COMMENT)),
    }
}

fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Largest counts first, ties by name
fn ranked(counts: HashMap<String, usize>, limit: usize) -> Vec<(String, usize)> {
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

fn top_pages(events: &[&AnalyticsEvent]) -> Vec<TopPage> {
    let views: Vec<_> = events.iter().filter(|e| e.event == PAGE_VIEW).collect();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for event in &views {
        if let Some(path) = event.metadata_str("path") {
            *counts.entry(path.to_string()).or_default() += 1;
        }
    }
    ranked(counts, TOP_PAGES)
        .into_iter()
        .map(|(page, count)| TopPage {
            percentage: percentage(count, views.len()),
            page,
            views: count,
        })
        .collect()
}

/// Mean first-to-last span per IP, counting only spans longer than zero
fn average_session_secs(events: &[&AnalyticsEvent]) -> i64 {
    let mut spans: HashMap<&str, (DateTime<Utc>, DateTime<Utc>)> = HashMap::new();
    for event in events {
        let Some(ip) = event.ip_address.as_deref() else {
            continue;
        };
        spans
            .entry(ip)
            .and_modify(|(first, last)| {
                *first = (*first).min(event.created_at);
                *last = (*last).max(event.created_at);
            })
            .or_insert((event.created_at, event.created_at));
    }

    let durations: Vec<i64> = spans
        .values()
        .map(|(first, last)| (*last - *first).num_seconds())
        .filter(|secs| *secs > 0)
        .collect();
    if durations.is_empty() {
        return 0;
    }
    (durations.iter().sum::<i64>() as f64 / durations.len() as f64).round() as i64
}

/// `M:SS`
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Bucket a referrer into a traffic source name
pub fn classify_referrer(referrer: Option<&str>) -> String {
    let referrer = match referrer.map(str::trim) {
        None | Some("") | Some("direct") => return "Direct".to_string(),
        Some(referrer) => referrer,
    };
    let Some(host) = Url::parse(referrer)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
    else {
        return referrer.to_string();
    };
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    const SOCIAL: [&str; 4] = ["facebook", "twitter", "instagram", "linkedin"];
    if host.contains("google") {
        "Search Engines".to_string()
    } else if host == "t.co" || SOCIAL.iter().any(|name| host.contains(name)) {
        "Social Media".to_string()
    } else {
        host
    }
}

fn traffic_sources(events: &[&AnalyticsEvent]) -> Vec<TrafficSource> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for event in events {
        *counts
            .entry(classify_referrer(event.metadata_str("referrer")))
            .or_default() += 1;
    }
    ranked(counts, TOP_SOURCES)
        .into_iter()
        .map(|(source, visitors)| TrafficSource {
            percentage: percentage(visitors, events.len()),
            source,
            visitors,
        })
        .collect()
}

/// Range to query for `visitor_series`: `[from, to)`
pub fn series_window(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = today - Duration::days(2 * SERIES_DAYS - 1);
    let to = today + Duration::days(1);
    (
        from.and_time(chrono::NaiveTime::MIN).and_utc(),
        to.and_time(chrono::NaiveTime::MIN).and_utc(),
    )
}

/// Zero-filled daily counts: the 30 days ending today and the 30 before
pub fn visitor_series(counts: &[DailyCount], today: NaiveDate) -> VisitorSeries {
    let by_day: HashMap<NaiveDate, i64> = counts.iter().map(|c| (c.day, c.count)).collect();
    let days = |last: NaiveDate| -> Vec<DayCount> {
        (0..SERIES_DAYS)
            .rev()
            .map(|back| {
                let day = last - Duration::days(back);
                DayCount {
                    date: day.format("%Y-%m-%d").to_string(),
                    count: by_day.get(&day).copied().unwrap_or(0),
                }
            })
            .collect()
    };
    VisitorSeries {
        current_period: days(today),
        previous_period: days(today - Duration::days(SERIES_DAYS)),
    }
}
