//! Recurring date filter.
//!
//! Recurrence data is stored in UTC in the per content type events table,
//! one row per recurring date entry:
//! `item_id, field_key, start_date, end_date, frequency, repeat_unit,
//! repeat_end`. Submitted windows are site-local and converted to UTC at query
//! time. Open window ends use sentinel literals that are never converted.
//!
//! For each entry the query computes the first occurrence that can still
//! match the window: the first one ending at or after the window start when
//! ongoing occurrences count, otherwise the first one starting at or after it.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::query::{Direction, IndexQuery};
use crate::schema::{ColumnDef, ColumnType, IndexSchemaBuilder, IndexValues, KeyDef, KeyKind, ITEM_ID_COLUMN};
use crate::sql::{qualified, quote_identifier, SqlFragment, SqlParam};
use crate::types::{
    resolve_path, ContentItem, DateBound, DateRange, FieldValue, ParsedValue, RawValue,
    RecurrenceRule, RepeatUnit, DATETIME_FORMAT,
};

use super::controls::{common_controls, ControlSpec};
use super::{Filter, FilterContext};

/// Lower sentinel of an open window.
pub const MIN_DATETIME: &str = "1000-01-01 00:00:00";

/// Upper sentinel of an open window.
pub const MAX_DATETIME: &str = "9999-12-31 23:59:59";

/// Named windows resolved against the current site-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatePreset {
    /// The whole of today.
    Today,
    /// Tomorrow.
    Tomorrow,
    /// Today until Sunday.
    ThisWeek,
    /// Saturday and Sunday of this week.
    ThisWeekend,
    /// Monday to Sunday of next week.
    NextWeek,
    /// Today until the end of the month.
    ThisMonth,
    /// The whole next month.
    NextMonth,
    /// From now on.
    Upcoming,
}

impl DatePreset {
    /// Every preset.
    pub const ALL: [DatePreset; 8] = [
        DatePreset::Today,
        DatePreset::Tomorrow,
        DatePreset::ThisWeek,
        DatePreset::ThisWeekend,
        DatePreset::NextWeek,
        DatePreset::ThisMonth,
        DatePreset::NextMonth,
        DatePreset::Upcoming,
    ];

    /// Wire name.
    pub fn slug(&self) -> &'static str {
        match self {
            DatePreset::Today => "today",
            DatePreset::Tomorrow => "tomorrow",
            DatePreset::ThisWeek => "this-week",
            DatePreset::ThisWeekend => "this-weekend",
            DatePreset::NextWeek => "next-week",
            DatePreset::ThisMonth => "this-month",
            DatePreset::NextMonth => "next-month",
            DatePreset::Upcoming => "upcoming",
        }
    }

    /// Parses a wire name.
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.slug() == slug)
    }

    /// Resolves the window for a site-local `now`.
    pub fn window(&self, now: NaiveDateTime) -> Option<(DateBound, DateBound)> {
        let today = now.date();
        let weekday = i64::from(today.weekday().num_days_from_monday());
        let days = |n: i64| today.checked_add_signed(Duration::days(n));

        let (first, last) = match self {
            DatePreset::Upcoming => return Some((DateBound::At(now), DateBound::Unbounded)),
            DatePreset::Today => (today, today),
            DatePreset::Tomorrow => (days(1)?, days(1)?),
            DatePreset::ThisWeek => (today, days(6 - weekday)?),
            DatePreset::ThisWeekend => (days((5 - weekday).max(0))?, days(6 - weekday)?),
            DatePreset::NextWeek => (days(7 - weekday)?, days(13 - weekday)?),
            DatePreset::ThisMonth => {
                let next = today.with_day(1)?.checked_add_months(Months::new(1))?;
                (today, next.pred_opt()?)
            }
            DatePreset::NextMonth => {
                let first = today.with_day(1)?.checked_add_months(Months::new(1))?;
                let next = first.checked_add_months(Months::new(1))?;
                (first, next.pred_opt()?)
            }
        };
        Some((DateBound::At(start_of(first)?), DateBound::At(end_of(last)?)))
    }
}

fn start_of(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}

fn end_of(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(23, 59, 59)
}

/// Parses one side of `start..end`. Empty and sentinel values are unbounded;
/// date-only ends cover the whole day.
fn parse_bound(text: &str, is_end: bool) -> Option<DateBound> {
    let text = text.trim();
    if text.is_empty() || text == MIN_DATETIME || text == MAX_DATETIME {
        return Some(DateBound::Unbounded);
    }
    for format in [DATETIME_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(DateBound::At(datetime));
        }
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    let datetime = if is_end { end_of(date)? } else { start_of(date)? };
    Some(DateBound::At(datetime))
}

fn advance(datetime: NaiveDateTime, unit: RepeatUnit, count: u32) -> Option<NaiveDateTime> {
    match unit {
        RepeatUnit::Day => datetime.checked_add_signed(Duration::days(i64::from(count))),
        RepeatUnit::Week => datetime.checked_add_signed(Duration::weeks(i64::from(count))),
        RepeatUnit::Month => datetime.checked_add_months(Months::new(count)),
        RepeatUnit::Year => datetime.checked_add_months(Months::new(count.checked_mul(12)?)),
    }
}

/// Whole units certainly elapsed between two instants; never more than the
/// exact count.
fn units_between(from: NaiveDateTime, to: NaiveDateTime, unit: RepeatUnit) -> i64 {
    let months = |a: NaiveDateTime| i64::from(a.year()) * 12 + i64::from(a.month0());
    let units = match unit {
        RepeatUnit::Day => (to - from).num_days(),
        RepeatUnit::Week => (to - from).num_days() / 7,
        RepeatUnit::Month => months(to) - months(from) - 1,
        RepeatUnit::Year => i64::from(to.year() - from.year()) - 1,
    };
    units.max(0)
}

/// First occurrence whose end (or start) is at or after `threshold`.
///
/// Returns `(start, end)` in UTC, or `None` if the entry has no such
/// occurrence before its repeat end.
pub fn next_occurrence(
    rule: &RecurrenceRule,
    threshold: NaiveDateTime,
    by_end: bool,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let anchor = if by_end { rule.end } else { rule.start };
    if anchor >= threshold {
        return Some((rule.start, rule.end));
    }
    if rule.frequency == 0 {
        return None;
    }

    let estimate = units_between(anchor, threshold, rule.unit) / i64::from(rule.frequency);
    let first = u32::try_from(estimate).ok()?;
    for n in first..first.saturating_add(8) {
        let steps = n.checked_mul(rule.frequency)?;
        let start = advance(rule.start, rule.unit, steps)?;
        let end = advance(rule.end, rule.unit, steps)?;
        if rule.until.is_some_and(|until| start > until) {
            return None;
        }
        if (if by_end { end } else { start }) >= threshold {
            return Some((start, end));
        }
    }
    None
}

/// Recurring date filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringDateFilter {
    /// Filter key.
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Default wire value.
    #[serde(default)]
    pub default: Option<String>,
    /// Source recurrence field key.
    pub source: String,
    /// Whether occurrences in progress at the window start match.
    #[serde(default = "default_match_ongoing")]
    pub match_ongoing: bool,
    /// Presets accepted on the wire.
    #[serde(default = "default_presets")]
    pub presets: Vec<DatePreset>,
}

fn default_match_ongoing() -> bool {
    true
}

fn default_presets() -> Vec<DatePreset> {
    DatePreset::ALL.to_vec()
}

impl RecurringDateFilter {
    /// Creates a filter over a recurrence field.
    pub fn new(key: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            default: None,
            source: source.into(),
            match_ongoing: default_match_ongoing(),
            presets: default_presets(),
        }
    }

    /// Sets the ongoing match mode.
    pub fn with_match_ongoing(mut self, match_ongoing: bool) -> Self {
        self.match_ongoing = match_ongoing;
        self
    }

    fn rules(&self, item: &dyn ContentItem) -> Vec<RecurrenceRule> {
        resolve_path(item, &self.source)
            .into_iter()
            .flat_map(|value| match value {
                FieldValue::Recurrence(rules) => rules,
                _ => Vec::new(),
            })
            .collect()
    }

    /// Converts a site-local bound to UTC; unbounded ends stay `None`.
    fn to_utc(bound: DateBound, ctx: &FilterContext<'_>) -> Option<NaiveDateTime> {
        let offset = Duration::seconds(i64::from(ctx.config.utc_offset.local_minus_utc()));
        bound.datetime().and_then(|dt| dt.checked_sub_signed(offset))
    }

    fn window_param(bound: DateBound, sentinel: &str, ctx: &FilterContext<'_>) -> SqlParam {
        match Self::to_utc(bound, ctx) {
            Some(utc) => SqlParam::string(utc.format(DATETIME_FORMAT).to_string()),
            None => SqlParam::string(sentinel),
        }
    }

}

/// SQL rendering of the occurrence computation.
struct OccurrenceSql {
    events: String,
    window_start: String,
}

impl OccurrenceSql {
    fn column(&self, name: &str) -> String {
        qualified(&self.events, name)
    }

    /// Index of the first occurrence whose `anchor` is at or after the window
    /// start, for one repeat unit.
    fn index(&self, anchor: &str, unit: RepeatUnit) -> String {
        let anchor = self.column(anchor);
        let unit = unit.sql_unit();
        let elapsed = format!("TIMESTAMPDIFF({}, {}, {})", unit, anchor, self.window_start);
        format!(
            "GREATEST(0, CEIL(({elapsed} + IF(DATE_ADD({anchor}, INTERVAL {elapsed} {unit}) < {ws}, 1, 0)) / {freq}))",
            elapsed = elapsed,
            anchor = anchor,
            unit = unit,
            ws = self.window_start,
            freq = self.column("frequency"),
        )
    }

    /// `start_date` or `end_date` of that occurrence.
    fn bound(&self, column: &str, anchor: &str) -> String {
        let base = self.column(column);
        let frequency = self.column("frequency");
        let arms: Vec<String> = RepeatUnit::ALL
            .iter()
            .map(|unit| {
                format!(
                    "WHEN '{}' THEN DATE_ADD({}, INTERVAL {} * {} {})",
                    unit.as_str(),
                    base,
                    self.index(anchor, *unit),
                    frequency,
                    unit.sql_unit()
                )
            })
            .collect();
        format!(
            "(CASE WHEN {freq} = 0 THEN {base} ELSE CASE {unit} {arms} ELSE {base} END END)",
            freq = frequency,
            base = base,
            unit = self.column("repeat_unit"),
            arms = arms.join(" "),
        )
    }
}

impl Filter for RecurringDateFilter {
    fn key(&self) -> &str {
        &self.key
    }

    fn filter_type(&self) -> &'static str {
        "recurring_date"
    }

    fn setup(&self, schema: &mut IndexSchemaBuilder) {
        schema.add_column(ColumnDef::new(self.column(), ColumnType::DateTime));
        schema.add_key(KeyDef::on(KeyKind::Index, self.column()));
    }

    fn index(&self, item: &dyn ContentItem, ctx: &FilterContext<'_>) -> IndexValues {
        let now = ctx.now.naive_utc();
        let next = self
            .rules(item)
            .iter()
            .filter_map(|rule| next_occurrence(rule, now, true))
            .map(|(start, _)| start)
            .min();

        let param = match next {
            Some(start) => SqlParam::string(start.format(DATETIME_FORMAT).to_string()),
            None => SqlParam::Null,
        };
        let mut values = IndexValues::new();
        values.insert(self.column(), SqlFragment::param(param));
        values
    }

    fn parse_value(&self, raw: &RawValue, ctx: &FilterContext<'_>) -> Option<ParsedValue> {
        let text = raw.as_str()?.trim();
        if text.is_empty() {
            return None;
        }

        let (start, end) = match DatePreset::from_slug(text) {
            Some(preset) if self.presets.contains(&preset) => {
                let now = ctx.now.with_timezone(&ctx.config.utc_offset).naive_local();
                preset.window(now)?
            }
            Some(_) => return None,
            None => {
                let (start, end) = text.split_once("..")?;
                (parse_bound(start, false)?, parse_bound(end, true)?)
            }
        };

        match (start, end) {
            (DateBound::Unbounded, DateBound::Unbounded) => return None,
            (DateBound::At(s), DateBound::At(e)) if s > e => return None,
            _ => {}
        }

        Some(ParsedValue::DateRange(DateRange {
            start,
            end,
            match_ongoing: self.match_ongoing,
        }))
    }

    fn apply(&self, query: &mut IndexQuery, value: &ParsedValue, ctx: &FilterContext<'_>) {
        let ParsedValue::DateRange(range) = value else {
            return;
        };

        let window = format!("window_{}", self.key);
        let events = format!("events_{}", self.key);
        query.join(
            window.clone(),
            SqlFragment::with_params(
                format!(
                    "CROSS JOIN (SELECT CAST(? AS DATETIME) AS `window_start`, CAST(? AS DATETIME) AS `window_end`) AS {}",
                    quote_identifier(&window)
                ),
                vec![
                    Self::window_param(range.start, MIN_DATETIME, ctx),
                    Self::window_param(range.end, MAX_DATETIME, ctx),
                ],
            ),
        );
        query.join(
            events.clone(),
            SqlFragment::with_params(
                format!(
                    "INNER JOIN {} AS {} ON {} = {} AND {} = ?",
                    quote_identifier(&ctx.satellite_table(&ctx.config.tables.events)),
                    quote_identifier(&events),
                    qualified(&events, ITEM_ID_COLUMN),
                    IndexQuery::column(ITEM_ID_COLUMN),
                    qualified(&events, "field_key"),
                ),
                vec![SqlParam::string(self.source.clone())],
            ),
        );

        let sql = OccurrenceSql {
            events,
            window_start: qualified(&window, "window_start"),
        };
        let window_end = qualified(&window, "window_end");
        let anchor = if range.match_ongoing { "end_date" } else { "start_date" };
        let start = sql.bound("start_date", anchor);

        let window_match = if range.match_ongoing {
            let end = sql.bound("end_date", anchor);
            format!("{} <= {} AND {} >= {}", start, window_end, end, sql.window_start)
        } else {
            format!("{} >= {} AND {} <= {}", start, sql.window_start, start, window_end)
        };
        let repeat_end = sql.column("repeat_end");
        query.filter(SqlFragment::new(format!(
            "{} AND ({} IS NULL OR {} <= {})",
            window_match, repeat_end, start, repeat_end
        )));
        query.group_by_item();
    }

    fn order(&self, query: &mut IndexQuery, _raw: Option<&RawValue>, _ctx: &FilterContext<'_>) -> bool {
        let column = IndexQuery::column(&self.column());
        query.order_by(format!("{} IS NULL", column), Direction::Asc);
        query.order_by(column, Direction::Asc);
        true
    }

    fn controls(&self) -> Vec<ControlSpec> {
        let mut controls = common_controls(&self.label);
        controls.push(ControlSpec::text("source", "Recurring date field"));
        controls.push(
            ControlSpec::switcher("match_ongoing", "Include ongoing").with_default(self.match_ongoing),
        );
        let presets: Vec<(&str, &str)> = self.presets.iter().map(|p| (p.slug(), p.slug())).collect();
        controls.push(ControlSpec::select("presets", "Presets", &presets));
        controls
    }

    fn default_value(&self) -> Option<String> {
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};

    use super::*;
    use crate::config::SearchConfig;
    use crate::filters::test_support::{context, term_cache};
    use crate::types::StaticItem;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).unwrap()
    }

    fn weekly(start: &str, end: &str) -> RecurrenceRule {
        RecurrenceRule {
            start: dt(start),
            end: dt(end),
            frequency: 1,
            unit: RepeatUnit::Week,
            until: None,
        }
    }

    fn once(start: &str, end: &str) -> RecurrenceRule {
        RecurrenceRule {
            frequency: 0,
            ..weekly(start, end)
        }
    }

    fn range(start: &str, end: &str, match_ongoing: bool) -> DateRange {
        DateRange {
            start: DateBound::At(dt(start)),
            end: DateBound::At(dt(end)),
            match_ongoing,
        }
    }

    #[test]
    fn test_parse_explicit_ranges() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let filter = RecurringDateFilter::new("when", "dates");
        let parse = |s: &str| filter.parse_value(&RawValue::single(s), &ctx);

        assert_eq!(
            parse("2024-05-01..2024-05-31"),
            Some(ParsedValue::DateRange(range(
                "2024-05-01 00:00:00",
                "2024-05-31 23:59:59",
                true
            )))
        );
        let open = parse("2024-05-01 10:00..").unwrap();
        assert_eq!(open.to_wire(), "2024-05-01 10:00:00..");
        assert_eq!(parse(&open.to_wire()), Some(open));
        assert!(parse("..").is_none());
        assert_eq!(parse("2024-05-31..2024-05-01"), None);
        assert_eq!(parse("yesterday"), None);
        assert_eq!(parse("2024-13-01..2024-14-01"), None);
    }

    #[test]
    fn test_presets() {
        // Wednesday 2024-05-15 12:00 UTC
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let filter = RecurringDateFilter::new("when", "dates");
        let window = |s: &str| match filter.parse_value(&RawValue::single(s), &ctx) {
            Some(ParsedValue::DateRange(range)) => range,
            other => panic!("unexpected {:?}", other),
        };

        assert_eq!(window("today"), range("2024-05-15 00:00:00", "2024-05-15 23:59:59", true));
        assert_eq!(window("tomorrow"), range("2024-05-16 00:00:00", "2024-05-16 23:59:59", true));
        assert_eq!(window("this-week"), range("2024-05-15 00:00:00", "2024-05-19 23:59:59", true));
        assert_eq!(window("this-weekend"), range("2024-05-18 00:00:00", "2024-05-19 23:59:59", true));
        assert_eq!(window("next-week"), range("2024-05-20 00:00:00", "2024-05-26 23:59:59", true));
        assert_eq!(window("this-month"), range("2024-05-15 00:00:00", "2024-05-31 23:59:59", true));
        assert_eq!(window("next-month"), range("2024-06-01 00:00:00", "2024-06-30 23:59:59", true));
        assert_eq!(window("upcoming").end, DateBound::Unbounded);
    }

    #[test]
    fn test_disabled_preset_is_absent() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let mut filter = RecurringDateFilter::new("when", "dates");
        filter.presets = vec![DatePreset::Today];
        assert!(filter.parse_value(&RawValue::single("tomorrow"), &ctx).is_none());
    }

    #[test]
    fn test_window_is_converted_to_utc() {
        let config = SearchConfig::default().with_utc_offset(FixedOffset::east_opt(2 * 3600).unwrap());
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let filter = RecurringDateFilter::new("when", "dates");

        let mut query = IndexQuery::new("facets_place");
        filter.query(&mut query, Some(&RawValue::single("2024-05-01..")), &ctx);
        let compiled = query.compile();
        assert_eq!(
            compiled.statement.params,
            vec![
                SqlParam::string("2024-04-30 22:00:00"),
                SqlParam::string(MAX_DATETIME),
                SqlParam::string("dates"),
            ]
        );
        let sql = &compiled.statement.sql;
        assert!(sql.contains("INNER JOIN `facets_place_events` AS `events_when`"));
        assert!(sql.contains("GROUP BY `idx`.`item_id`"));
        assert!(sql.contains("`events_when`.`repeat_end` IS NULL"));
    }

    #[test]
    fn test_ongoing_predicate_shape() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let raw = RawValue::single("2024-05-01..2024-05-31");

        let mut query = IndexQuery::new("facets_place");
        RecurringDateFilter::new("when", "dates").query(&mut query, Some(&raw), &ctx);
        let sql = query.compile().statement.sql;
        assert!(sql.contains("TIMESTAMPDIFF(WEEK, `events_when`.`end_date`, `window_when`.`window_start`)"));
        assert!(sql.contains(">= `window_when`.`window_start` AND ("));

        let mut query = IndexQuery::new("facets_place");
        RecurringDateFilter::new("when", "dates")
            .with_match_ongoing(false)
            .query(&mut query, Some(&raw), &ctx);
        let sql = query.compile().statement.sql;
        assert!(sql.contains("TIMESTAMPDIFF(WEEK, `events_when`.`start_date`, `window_when`.`window_start`)"));
        assert!(!sql.contains("TIMESTAMPDIFF(WEEK, `events_when`.`end_date`"));
    }

    #[test]
    fn test_ongoing_window_match_for_single_event() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let raw = RawValue::single("2024-05-01..2024-05-31");
        let base = |column: &str| {
            format!("(CASE WHEN `events_when`.`frequency` = 0 THEN `events_when`.`{}` ELSE", column)
        };

        // An event that started before the window overlaps it through its end.
        let mut query = IndexQuery::new("facets_place");
        RecurringDateFilter::new("when", "dates").query(&mut query, Some(&raw), &ctx);
        let sql = query.compile().statement.sql;
        assert!(sql.contains(&format!("WHERE ({}", base("start_date"))));
        assert!(sql.contains(&format!("END END) <= `window_when`.`window_end` AND {}", base("end_date"))));
        assert!(sql.contains("END END) >= `window_when`.`window_start` AND (`events_when`.`repeat_end` IS NULL"));

        // Without ongoing matches its start must fall inside the window.
        let mut query = IndexQuery::new("facets_place");
        RecurringDateFilter::new("when", "dates")
            .with_match_ongoing(false)
            .query(&mut query, Some(&raw), &ctx);
        let sql = query.compile().statement.sql;
        assert!(sql.contains(&format!("END END) >= `window_when`.`window_start` AND {}", base("start_date"))));
        assert!(sql.contains("END END) <= `window_when`.`window_end` AND (`events_when`.`repeat_end` IS NULL"));
        assert!(!sql.contains("`events_when`.`end_date`"));
    }

    #[test]
    fn test_single_event_occurrence() {
        // Started before the threshold, still running.
        let rule = once("2024-04-28 10:00:00", "2024-05-02 18:00:00");
        let threshold = dt("2024-05-01 00:00:00");
        assert_eq!(
            next_occurrence(&rule, threshold, true),
            Some((dt("2024-04-28 10:00:00"), dt("2024-05-02 18:00:00")))
        );
        assert_eq!(next_occurrence(&rule, threshold, false), None);
        assert_eq!(next_occurrence(&rule, dt("2024-05-03 00:00:00"), true), None);
    }

    #[test]
    fn test_weekly_occurrences() {
        // Wednesdays 18:00 to 20:00 from January on.
        let mut rule = weekly("2024-01-03 18:00:00", "2024-01-03 20:00:00");
        assert_eq!(
            next_occurrence(&rule, dt("2024-05-15 00:00:00"), false),
            Some((dt("2024-05-15 18:00:00"), dt("2024-05-15 20:00:00")))
        );
        assert_eq!(
            next_occurrence(&rule, dt("2024-05-16 00:00:00"), false),
            Some((dt("2024-05-22 18:00:00"), dt("2024-05-22 20:00:00")))
        );

        rule.until = Some(dt("2024-03-01 00:00:00"));
        assert_eq!(next_occurrence(&rule, dt("2024-05-15 00:00:00"), false), None);
    }

    #[test]
    fn test_monthly_occurrence_clamps_to_month_end() {
        let rule = RecurrenceRule {
            start: dt("2024-01-31 09:00:00"),
            end: dt("2024-01-31 10:00:00"),
            frequency: 1,
            unit: RepeatUnit::Month,
            until: None,
        };
        assert_eq!(
            next_occurrence(&rule, dt("2024-02-10 00:00:00"), false),
            Some((dt("2024-02-29 09:00:00"), dt("2024-02-29 10:00:00")))
        );
    }

    #[test]
    fn test_index_next_occurrence() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let filter = RecurringDateFilter::new("when", "dates");

        let item = StaticItem::new(1).with_field(
            "dates",
            FieldValue::Recurrence(vec![
                weekly("2024-01-03 18:00:00", "2024-01-03 20:00:00"),
                once("2024-05-16 09:00:00", "2024-05-16 10:00:00"),
            ]),
        );
        assert_eq!(
            filter.index(&item, &ctx)["filter_when"].params,
            vec![SqlParam::string("2024-05-15 18:00:00")]
        );

        let past = StaticItem::new(2).with_field(
            "dates",
            FieldValue::Recurrence(vec![once("2024-01-01 09:00:00", "2024-01-01 10:00:00")]),
        );
        let ctx = ctx.at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(filter.index(&past, &ctx)["filter_when"].params, vec![SqlParam::Null]);
    }

    #[test]
    fn test_upcoming_order() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let mut query = IndexQuery::new("facets_place");
        assert!(RecurringDateFilter::new("when", "dates").order(&mut query, None, &ctx));
        assert!(query.compile().statement.sql.contains(
            "ORDER BY `idx`.`filter_when` IS NULL ASC, `idx`.`filter_when` ASC, `idx`.`item_id` DESC"
        ));
    }
}
